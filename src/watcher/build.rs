//! Build watcher: turns source changes into rebuild signals.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};

use super::debouncer::Debouncer;
use super::error::WatchError;
use crate::config::Settings;

/// Signals emitted once per build cycle, always in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildEvent {
    Started,
    Finished { success: bool },
}

/// External build step run for each burst of source changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BuildCommand {
    /// Split `["program", "arg", ...]`; `None` for an empty list.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl std::fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Run one build and report whether it succeeded.
///
/// Without a command the source change itself is the build and always
/// succeeds. A command that cannot be spawned counts as a failed build.
pub async fn run_build(command: Option<&BuildCommand>, dir: &Path) -> bool {
    let Some(command) = command else {
        return true;
    };

    let status = tokio::process::Command::new(&command.program)
        .args(&command.args)
        .current_dir(dir)
        .stdin(std::process::Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            tracing::error!("[watcher] build `{command}` failed: {status}");
            false
        }
        Err(e) => {
            tracing::error!("[watcher] build `{command}` could not start: {e}");
            false
        }
    }
}

/// Watches the components tree and runs the build on change.
pub struct BuildWatcher {
    source_dir: PathBuf,
    workdir: PathBuf,
    ignore: Vec<PathBuf>,
    command: Option<BuildCommand>,
    debouncer: Debouncer,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    watcher: notify::RecommendedWatcher,
}

impl BuildWatcher {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> BuildWatcherBuilder {
        BuildWatcherBuilder::new()
    }

    /// Watcher for the components tree of `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, WatchError> {
        let mut builder = Self::builder()
            .source_dir(settings.components_dir())
            .workdir(&settings.home)
            .debounce_ms(settings.build.debounce_ms)
            .ignore(settings.cache_dir());
        for path in &settings.build.ignore {
            builder = builder.ignore(settings.home.join(path));
        }
        if let Some(command) = BuildCommand::from_argv(&settings.build.command) {
            builder = builder.command(command);
        }
        builder.build()
    }

    /// Run until the receiving side of `tx` goes away.
    ///
    /// Each quiet burst of changes produces `Started` followed by exactly
    /// one `Finished`, whatever the build outcome.
    pub async fn watch(mut self, tx: mpsc::Sender<RebuildEvent>) -> Result<(), WatchError> {
        self.watcher
            .watch(&self.source_dir, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: self.source_dir.clone(),
                reason: e.to_string(),
            })?;

        match &self.command {
            Some(command) => crate::log_event!(
                "watcher",
                "started",
                "{} (build: {command})",
                self.source_dir.display()
            ),
            None => crate::log_event!("watcher", "started", "{}", self.source_dir.display()),
        }

        loop {
            // Periodic check for debounced events
            let timeout = sleep(Duration::from_millis(100));
            tokio::pin!(timeout);

            tokio::select! {
                Some(res) = self.event_rx.recv() => {
                    match res {
                        Ok(event) => self.handle_event(event),
                        Err(e) => tracing::error!("[watcher] file watch error: {e}"),
                    }
                }

                _ = &mut timeout => {
                    let ready = self.debouncer.take_ready();
                    if !ready.is_empty() {
                        self.build_cycle(&tx, ready.len()).await?;
                    }
                }

                _ = tx.closed() => {
                    crate::debug_event!("watcher", "stopped");
                    return Ok(());
                }
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        if matches!(event.kind, EventKind::Access(_) | EventKind::Other) {
            return;
        }
        // Removals trigger a build like any other change
        for path in event.paths {
            if self.is_ignored(&path) {
                continue;
            }
            crate::debug_event!("watcher", "changed", "{:?} {}", event.kind, path.display());
            self.debouncer.record(path);
        }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore.iter().any(|prefix| path.starts_with(prefix))
    }

    async fn build_cycle(
        &self,
        tx: &mpsc::Sender<RebuildEvent>,
        changes: usize,
    ) -> Result<(), WatchError> {
        crate::log_event!("watcher", "rebuild started", "{changes} changed path(s)");
        tx.send(RebuildEvent::Started)
            .await
            .map_err(|_| WatchError::ChannelClosed)?;

        let success = run_build(self.command.as_ref(), &self.workdir).await;

        crate::log_event!("watcher", "rebuild finished", "success={success}");
        tx.send(RebuildEvent::Finished { success })
            .await
            .map_err(|_| WatchError::ChannelClosed)
    }
}

/// Builder for [`BuildWatcher`].
pub struct BuildWatcherBuilder {
    source_dir: Option<PathBuf>,
    workdir: Option<PathBuf>,
    ignore: Vec<PathBuf>,
    command: Option<BuildCommand>,
    debounce_ms: u64,
}

impl BuildWatcherBuilder {
    fn new() -> Self {
        Self {
            source_dir: None,
            workdir: None,
            ignore: Vec::new(),
            command: None,
            debounce_ms: 300,
        }
    }

    /// Directory watched recursively.
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    /// Directory the build command runs in (defaults to the source dir).
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Ignore changes under `prefix`.
    pub fn ignore(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.ignore.push(prefix.into());
        self
    }

    pub fn command(mut self, command: BuildCommand) -> Self {
        self.command = Some(command);
        self
    }

    /// Set the debounce duration in milliseconds.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn build(self) -> Result<BuildWatcher, WatchError> {
        let source_dir = self.source_dir.ok_or_else(|| WatchError::InitFailed {
            reason: "Source directory is required".to_string(),
        })?;
        let workdir = self.workdir.unwrap_or_else(|| source_dir.clone());

        let (tx, rx) = mpsc::channel(100);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        Ok(BuildWatcher {
            source_dir,
            workdir,
            ignore: self.ignore,
            command: self.command,
            debouncer: Debouncer::new(self.debounce_ms),
            event_rx: rx,
            watcher,
        })
    }
}
