//! Worker processes backed by `roost worker` child processes.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::error::SupervisorError;
use super::worker::{WorkerId, WorkerLauncher, WorkerProcess};
use crate::config::{Settings, WORKER_SETTINGS_ENV};

/// Prefix of the line a worker prints on stdout once it is listening.
pub const READY_LINE: &str = "ROOST_READY";

/// Environment variable carrying the worker's id.
pub const WORKER_ID_ENV: &str = "ROOST_WORKER_ID";

/// Launches workers by re-running the server executable.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
    settings_json: String,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, settings: &Settings) -> Result<Self, SupervisorError> {
        Ok(Self {
            program: program.into(),
            args,
            settings_json: settings.to_worker_env()?,
        })
    }

    /// Launcher running `<current exe> worker`.
    pub fn for_current_exe(settings: &Settings) -> Result<Self, SupervisorError> {
        let program = std::env::current_exe().map_err(SupervisorError::CurrentExe)?;
        Self::new(program, vec!["worker".to_string()], settings)
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, id: WorkerId) -> io::Result<Box<dyn WorkerProcess>> {
        let mut cmd = Command::new(&self.program);
        cmd.kill_on_drop(true);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());
        cmd.args(&self.args)
            .env(WORKER_SETTINGS_ENV, &self.settings_json)
            .env(WORKER_ID_ENV, id.to_string());

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take().map(|out| BufReader::new(out).lines());

        Ok(Box::new(ChildProcess {
            id,
            child,
            stdin,
            stdout,
        }))
    }
}

/// A `roost worker` child.
///
/// Closing its stdin is the graceful stop request.
pub struct ChildProcess {
    id: WorkerId,
    child: Child,
    stdin: Option<ChildStdin>,
    // Held open after the ready line so late writes never hit a closed pipe
    stdout: Option<Lines<BufReader<ChildStdout>>>,
}

#[async_trait]
impl WorkerProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn ready(&mut self) -> bool {
        let Some(lines) = self.stdout.as_mut() else {
            return false;
        };
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(addr) = line.strip_prefix(READY_LINE) {
                        crate::debug_event!("supervisor", "ready line", "{} on {}", self.id, addr.trim());
                        return true;
                    }
                    tracing::trace!("[supervisor] {} stdout: {line}", self.id);
                }
                Ok(None) => return false,
                Err(e) => {
                    tracing::warn!("[supervisor] reading {} stdout: {e}", self.id);
                    return false;
                }
            }
        }
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        self.child.wait().await.map(|status| status.code())
    }

    fn shutdown(&mut self) {
        // Dropping the handle closes the pipe
        self.stdin.take();
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}
