//! Worker command - one HTTP server process of the pool.

use std::sync::Arc;

use anyhow::Context;

use crate::config::Settings;
use crate::server;
use crate::supervisor::WORKER_ID_ENV;

/// Serve until the supervisor closes our stdin or a signal arrives.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let worker_id = std::env::var(WORKER_ID_ENV).unwrap_or_else(|_| "standalone".to_string());
    let settings = Arc::new(settings);

    let app = server::build_app(settings.clone())?;
    let listener = server::bind_listener(&settings)
        .await
        .with_context(|| format!("cannot listen on {}", settings.listen_addr()))?;
    let addr = listener.local_addr()?;

    server::announce_ready(addr);
    crate::log_event!(
        "worker",
        "listening",
        "{worker_id} (pid {}) on http://{addr}",
        std::process::id()
    );

    let shutdown = async {
        tokio::select! {
            _ = server::stdin_closed() => {}
            _ = server::shutdown_signal() => {}
        }
    };
    server::serve(listener, app, shutdown).await?;

    crate::log_event!("worker", "stopped", "{worker_id}");
    Ok(())
}
