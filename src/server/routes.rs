//! Router assembly.

use axum::Router;
use axum::handler::Handler;
use axum::middleware;
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use super::handlers;
use super::services::ServiceRegistry;
use super::static_files::{StaticFiles, serve_static_first};
use super::AppState;

/// Build the worker's router.
///
/// Precedence: static files, then `/assets`, then service routes over
/// component routes at the same path, then the catch-all redirect. A
/// missing asset also ends at the catch-all.
pub fn router(state: AppState, services: &ServiceRegistry) -> Router {
    let static_files = StaticFiles::new(state.settings.static_dir());
    let assets = ServeDir::new(state.settings.assets_dir())
        .fallback(handlers::fallback.with_state(state.clone()));
    let compression = state.settings.compression_enabled();

    let router = Router::new()
        .route("/{component}", get(handlers::component_view))
        .route(
            "/{component}/config/objects.json",
            get(handlers::component_config),
        )
        .route("/{component}/{subcomponent}", get(handlers::subcomponent_view))
        .route(
            "/{component}/{subcomponent}/config/objects.json",
            get(handlers::subcomponent_config),
        )
        .nest_service("/assets", assets)
        .fallback(handlers::fallback)
        .with_state(state);

    let router = services
        .mount(router)
        .layer(middleware::from_fn_with_state(static_files, serve_static_first));

    if compression {
        router.layer(CompressionLayer::new())
    } else {
        router
    }
}
