//! Worker supervisor.
//!
//! Runs in the coordinating process. Workers are separate processes that
//! share the listening port; the supervisor only starts, stops and
//! replaces them.
//!
//! ```text
//!            start_all_workers
//!   Idle ------------------------> Running <------------+
//!                                   |   ^                |
//!                 rebuild succeeded |   | crash: replace |
//!                                   v   |  one worker    |
//!                                Draining ---------------+
//!                                   (last old worker exited)
//! ```
//!
//! A failed rebuild changes nothing. A successful rebuild that arrives
//! while draining is folded into one more drain after the refill.

mod error;
mod pool;
mod process;
mod worker;

pub use error::SupervisorError;
pub use pool::{PoolState, PoolStatus, Supervisor, SupervisorConfig};
pub use process::{ChildProcess, ProcessLauncher, READY_LINE, WORKER_ID_ENV};
pub use worker::{ExitOutcome, WorkerId, WorkerLauncher, WorkerProcess, WorkerRecord, WorkerState};
