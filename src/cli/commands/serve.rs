//! Serve command - supervisor, build watcher and worker pool.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::server;
use crate::supervisor::{ProcessLauncher, Supervisor, SupervisorConfig};
use crate::watcher::BuildWatcher;

/// Arguments for the serve command.
pub struct ServeArgs {
    pub single: bool,
    pub no_watch: bool,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, settings: Settings) -> anyhow::Result<()> {
    let settings = Arc::new(settings);

    crate::log_event!(
        "serve",
        "starting",
        "{} ({}) from {}",
        settings.name,
        settings.mode,
        settings.home.display()
    );
    if !settings.components_dir().is_dir() {
        tracing::warn!(
            "[serve] {} does not exist; every request will fall through",
            settings.components_dir().display()
        );
    }

    if args.single {
        return serve_single(settings).await;
    }

    let launcher = Arc::new(ProcessLauncher::for_current_exe(&settings)?);
    let supervisor = Supervisor::new(SupervisorConfig::from_settings(&settings), launcher);

    // Create cancellation token for coordinated shutdown
    let ct = CancellationToken::new();
    let (rebuild_tx, rebuild_rx) = mpsc::channel(16);

    if settings.build.watch && !args.no_watch {
        match BuildWatcher::from_settings(&settings) {
            Ok(watcher) => {
                tokio::spawn(async move {
                    if let Err(e) = watcher.watch(rebuild_tx).await {
                        tracing::error!("[watcher] stopped: {e}");
                    }
                });
            }
            Err(e) => tracing::error!("[watcher] disabled: {e}"),
        }
    } else {
        drop(rebuild_tx);
        crate::log_event!("watcher", "disabled");
    }

    let mut status = supervisor.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let snapshot = status.borrow_and_update().clone();
            crate::debug_event!(
                "supervisor",
                "status",
                "{:?} generation={} ready={}/{} stale={} restarts={} drains={}",
                snapshot.state,
                snapshot.generation,
                snapshot.ready,
                snapshot.live,
                snapshot.stale,
                snapshot.restarts,
                snapshot.drains
            );
        }
    });

    let signal_ct = ct.clone();
    tokio::spawn(async move {
        server::shutdown_signal().await;
        crate::log_event!("serve", "shutdown requested");
        signal_ct.cancel();
    });

    supervisor.run(rebuild_rx, ct).await?;
    Ok(())
}

/// One in-process server, no pool and no watcher.
async fn serve_single(settings: Arc<Settings>) -> anyhow::Result<()> {
    let app = server::build_app(settings.clone())?;
    let listener = server::bind_listener(&settings)
        .await
        .with_context(|| format!("cannot listen on {}", settings.listen_addr()))?;
    let addr = listener.local_addr()?;

    crate::log_event!("serve", "listening", "http://{addr}");
    server::serve(listener, app, server::shutdown_signal()).await?;
    crate::log_event!("serve", "stopped");
    Ok(())
}
