//! Pool state machine.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::error::SupervisorError;
use super::worker::{ExitOutcome, WorkerId, WorkerLauncher, WorkerProcess, WorkerRecord, WorkerState};
use crate::config::Settings;
use crate::watcher::RebuildEvent;

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Pool size.
    pub workers: usize,
    /// Time a stopping worker gets before it is killed.
    pub grace: Duration,
    /// Delay before a crashed (or unlaunchable) worker is replaced.
    pub restart_delay: Duration,
}

impl SupervisorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            workers: settings.workers.count,
            grace: Duration::from_millis(settings.workers.grace_period_ms),
            restart_delay: Duration::from_millis(settings.workers.restart_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Idle,
    Running,
    Draining,
}

/// Snapshot published after every pool change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    pub state: PoolState,
    /// Bumped at the start of every drain.
    pub generation: u64,
    /// Workers not yet exited.
    pub live: usize,
    /// Workers that reported ready.
    pub ready: usize,
    /// Live workers started before the current generation.
    pub stale: usize,
    /// Unplanned exits replaced so far.
    pub restarts: u64,
    /// Drains started so far.
    pub drains: u64,
}

#[derive(Debug)]
enum PoolEvent {
    Ready { id: WorkerId },
    Exited { id: WorkerId, outcome: ExitOutcome },
    Respawn { generation: u64 },
}

/// Owns the worker pool.
///
/// A successful rebuild replaces the whole pool: every live worker is
/// stopped and the new pool starts only once the last one has exited.
/// A crash outside a drain replaces just that worker.
pub struct Supervisor {
    config: SupervisorConfig,
    launcher: Arc<dyn WorkerLauncher>,
    workers: BTreeMap<WorkerId, WorkerRecord>,
    next_id: u64,
    generation: u64,
    state: PoolState,
    pending_drain: bool,
    shutting_down: bool,
    restarts: u64,
    drains: u64,
    events_tx: mpsc::UnboundedSender<PoolEvent>,
    events_rx: mpsc::UnboundedReceiver<PoolEvent>,
    status_tx: watch::Sender<PoolStatus>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, launcher: Arc<dyn WorkerLauncher>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(PoolStatus {
            state: PoolState::Idle,
            generation: 0,
            live: 0,
            ready: 0,
            stale: 0,
            restarts: 0,
            drains: 0,
        });
        Self {
            config,
            launcher,
            workers: BTreeMap::new(),
            next_id: 1,
            generation: 0,
            state: PoolState::Idle,
            pending_drain: false,
            shutting_down: false,
            restarts: 0,
            drains: 0,
            events_tx,
            events_rx,
            status_tx,
        }
    }

    /// Subscribe to pool snapshots.
    pub fn status(&self) -> watch::Receiver<PoolStatus> {
        self.status_tx.subscribe()
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Idle -> Running: start the full pool.
    pub fn start_all_workers(&mut self) -> Result<(), SupervisorError> {
        if self.config.workers == 0 {
            return Err(SupervisorError::EmptyPool);
        }
        if self.state != PoolState::Idle {
            return Err(SupervisorError::AlreadyStarted);
        }

        crate::log_event!("supervisor", "starting", "{} worker(s)", self.config.workers);
        self.state = PoolState::Running;
        self.fill_pool();
        self.publish();
        Ok(())
    }

    /// Drive the pool until `shutdown` is cancelled.
    ///
    /// Rebuild signals are optional: once `rebuilds` closes the pool keeps
    /// running with crash recovery only.
    pub async fn run(
        mut self,
        mut rebuilds: mpsc::Receiver<RebuildEvent>,
        shutdown: CancellationToken,
    ) -> Result<(), SupervisorError> {
        if self.state == PoolState::Idle {
            self.start_all_workers()?;
        }

        let mut rebuilds_open = true;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                event = rebuilds.recv(), if rebuilds_open => match event {
                    Some(event) => self.on_rebuild(event),
                    None => {
                        crate::debug_event!("supervisor", "rebuild signals closed");
                        rebuilds_open = false;
                    }
                },

                Some(event) = self.events_rx.recv() => self.on_pool_event(event),
            }
        }

        self.shutdown().await;
        Ok(())
    }

    fn on_rebuild(&mut self, event: RebuildEvent) {
        match event {
            RebuildEvent::Started => crate::debug_event!("supervisor", "rebuild started"),
            RebuildEvent::Finished { success: false } => {
                tracing::error!(
                    "[supervisor] build failed; generation {} keeps serving",
                    self.generation
                );
            }
            RebuildEvent::Finished { success: true } => match self.state {
                PoolState::Running => self.begin_drain(),
                PoolState::Draining => {
                    crate::log_event!("supervisor", "rebuild during drain", "one more drain queued");
                    self.pending_drain = true;
                }
                PoolState::Idle => {}
            },
        }
    }

    fn on_pool_event(&mut self, event: PoolEvent) {
        match event {
            PoolEvent::Ready { id } => {
                if let Some(record) = self.workers.get_mut(&id) {
                    record.state = WorkerState::Running;
                    crate::debug_event!("supervisor", "worker ready", "{id}");
                }
            }
            PoolEvent::Exited { id, outcome } => self.on_exit(id, outcome),
            PoolEvent::Respawn { generation } => {
                if self.state == PoolState::Running
                    && !self.shutting_down
                    && generation == self.generation
                {
                    self.fill_pool();
                }
            }
        }
        self.publish();
    }

    fn on_exit(&mut self, id: WorkerId, outcome: ExitOutcome) {
        let Some(mut record) = self.workers.remove(&id) else {
            return;
        };
        record.state = WorkerState::Exited;

        if record.is_planned_exit() {
            if outcome.forced {
                tracing::warn!("[supervisor] {id} killed after grace period");
            } else {
                crate::debug_event!(
                    "supervisor",
                    "worker stopped",
                    "{id} generation={} code={:?}",
                    record.generation,
                    outcome.code
                );
            }
        } else if !self.shutting_down {
            tracing::warn!(
                "[supervisor] {id} (pid {:?}) exited unexpectedly with code {:?}; replacing",
                record.pid,
                outcome.code
            );
            self.restarts += 1;
            self.schedule_respawn();
        }

        if self.state == PoolState::Draining && self.workers.is_empty() && !self.shutting_down {
            self.finish_drain();
        }
    }

    /// Running -> Draining: stop every live worker.
    fn begin_drain(&mut self) {
        self.state = PoolState::Draining;
        self.generation += 1;
        self.drains += 1;
        crate::log_event!(
            "supervisor",
            "draining",
            "{} worker(s) for generation {}",
            self.workers.len(),
            self.generation
        );

        for record in self.workers.values() {
            record.stop.cancel();
        }
        if self.workers.is_empty() {
            self.finish_drain();
        }
    }

    /// Draining -> Running: the old pool is gone, start the new one.
    fn finish_drain(&mut self) {
        self.state = PoolState::Running;
        crate::log_event!("supervisor", "drained", "starting generation {}", self.generation);
        self.fill_pool();

        if self.pending_drain {
            self.pending_drain = false;
            self.begin_drain();
        }
    }

    fn fill_pool(&mut self) {
        while self.workers.len() < self.config.workers {
            if !self.spawn_worker() {
                break;
            }
        }
    }

    /// Launch one worker; on failure a retry is scheduled.
    fn spawn_worker(&mut self) -> bool {
        let id = WorkerId(self.next_id);
        self.next_id += 1;

        let process = match self.launcher.launch(id) {
            Ok(process) => process,
            Err(e) => {
                tracing::error!(
                    "[supervisor] failed to launch {id}; retrying in {:?}: {e}",
                    self.config.restart_delay
                );
                self.schedule_respawn();
                return false;
            }
        };

        let stop = CancellationToken::new();
        let record = WorkerRecord {
            id,
            pid: process.pid(),
            generation: self.generation,
            state: WorkerState::Starting,
            stop: stop.clone(),
        };
        crate::debug_event!("supervisor", "worker launched", "{id} pid={:?}", record.pid);
        self.workers.insert(id, record);

        tokio::spawn(supervise_worker(
            id,
            process,
            stop,
            self.config.grace,
            self.events_tx.clone(),
        ));
        true
    }

    fn schedule_respawn(&self) {
        let events = self.events_tx.clone();
        let delay = self.config.restart_delay;
        let generation = self.generation;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(PoolEvent::Respawn { generation });
        });
    }

    /// Stop everything and wait until every worker has exited.
    async fn shutdown(&mut self) {
        self.shutting_down = true;
        crate::log_event!("supervisor", "shutting down", "{} worker(s)", self.workers.len());

        for record in self.workers.values() {
            record.stop.cancel();
        }
        while !self.workers.is_empty() {
            match self.events_rx.recv().await {
                Some(PoolEvent::Exited { id, outcome }) => self.on_exit(id, outcome),
                Some(_) => {}
                None => break,
            }
            self.publish();
        }

        self.state = PoolState::Idle;
        self.publish();
        crate::log_event!("supervisor", "stopped");
    }

    fn publish(&self) {
        let ready = self
            .workers
            .values()
            .filter(|record| record.state == WorkerState::Running)
            .count();
        let stale = self
            .workers
            .values()
            .filter(|record| record.generation < self.generation)
            .count();
        self.status_tx.send_replace(PoolStatus {
            state: self.state,
            generation: self.generation,
            live: self.workers.len(),
            ready,
            stale,
            restarts: self.restarts,
            drains: self.drains,
        });
    }
}

/// Per-worker task: readiness, then exit, honouring a stop request.
async fn supervise_worker(
    id: WorkerId,
    mut process: Box<dyn WorkerProcess>,
    stop: CancellationToken,
    grace: Duration,
    events: mpsc::UnboundedSender<PoolEvent>,
) {
    let ready = tokio::select! {
        ready = process.ready() => ready,
        _ = stop.cancelled() => false,
    };
    if ready {
        let _ = events.send(PoolEvent::Ready { id });
    }

    let outcome = if stop.is_cancelled() {
        stop_process(id, process.as_mut(), grace).await
    } else {
        tokio::select! {
            status = process.wait() => ExitOutcome {
                code: status.ok().flatten(),
                forced: false,
            },
            _ = stop.cancelled() => stop_process(id, process.as_mut(), grace).await,
        }
    };

    let _ = events.send(PoolEvent::Exited { id, outcome });
}

async fn stop_process(id: WorkerId, process: &mut dyn WorkerProcess, grace: Duration) -> ExitOutcome {
    process.shutdown();
    match tokio::time::timeout(grace, process.wait()).await {
        Ok(status) => ExitOutcome {
            code: status.ok().flatten(),
            forced: false,
        },
        Err(_) => {
            if let Err(e) = process.kill().await {
                tracing::error!("[supervisor] failed to kill {id}: {e}");
            }
            ExitOutcome {
                code: process.wait().await.ok().flatten(),
                forced: true,
            }
        }
    }
}
