//! Worker identity and the process seam the supervisor drives.

use std::fmt;
use std::io;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Supervisor-assigned worker number. Never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Spawned, not yet listening.
    Starting,
    /// Reported ready; accepting requests.
    Running,
    /// Process has ended.
    Exited,
}

/// Supervisor-side bookkeeping for one live worker.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub pid: Option<u32>,
    /// Pool generation the worker was started in.
    pub generation: u64,
    pub state: WorkerState,
    /// Cancelled when the supervisor wants the worker gone.
    pub stop: CancellationToken,
}

impl WorkerRecord {
    /// Whether the exit, when it comes, was asked for.
    pub fn is_planned_exit(&self) -> bool {
        self.stop.is_cancelled()
    }
}

/// How a worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, `None` when killed by a signal or not observable.
    pub code: Option<i32>,
    /// The grace period ran out and the worker was killed.
    pub forced: bool,
}

/// A running worker process.
#[async_trait]
pub trait WorkerProcess: Send {
    fn pid(&self) -> Option<u32>;

    /// Resolve once the worker is accepting requests; `false` if it went
    /// away first.
    async fn ready(&mut self) -> bool;

    /// Wait for the process to end and return its exit code.
    async fn wait(&mut self) -> io::Result<Option<i32>>;

    /// Ask the worker to stop accepting work and exit after in-flight
    /// requests complete.
    fn shutdown(&mut self);

    /// Terminate immediately.
    async fn kill(&mut self) -> io::Result<()>;
}

/// Starts worker processes.
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, id: WorkerId) -> io::Result<Box<dyn WorkerProcess>>;
}
