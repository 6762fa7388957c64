//! Error types for the worker supervisor.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Worker pool size must be at least 1")]
    EmptyPool,

    #[error("Worker pool already started")]
    AlreadyStarted,

    #[error("Cannot locate the server executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    #[error("Cannot encode settings for workers: {0}")]
    Settings(#[from] serde_json::Error),
}
