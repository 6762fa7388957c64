//! HTTP side of a worker.
//!
//! # Routes
//!
//! | Path | Response |
//! |---|---|
//! | `/{component}` | rendered view, or redirect to the entrypoint |
//! | `/{component}/{subcomponent}` | rendered view; unknown subcomponent goes to the catch-all |
//! | `/{component}/config/objects.json` | resolved config document |
//! | `/{component}/{subcomponent}/config/objects.json` | resolved config document |
//! | `/assets/...` | files under the assets directory |
//! | service prefixes | sub-routers from `*service*.json` manifests |
//! | anything else | 302 to the entrypoint |
//!
//! Files in the static directory shadow all of the above for GET/HEAD.

mod handlers;
mod render;
mod routes;
mod runtime;
mod services;
mod static_files;

pub use render::{RenderError, Rendered, Renderer, TemplateRenderer, view_content_type};
pub use routes::router;
pub use runtime::{announce_ready, bind_addr, bind_listener, serve, shutdown_signal, stdin_closed};
pub use services::{MountedService, ServiceError, ServiceRegistry, load_service, mount_prefix};
pub use static_files::StaticFiles;

use std::sync::Arc;

use crate::cache::{self, CacheStore, ConfigCache, StoreError};
use crate::components::PathResolver;
use crate::config::Settings;

/// Shared state of one worker's handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub cache: ConfigCache,
    pub renderer: Arc<dyn Renderer>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, store: Arc<dyn CacheStore>) -> Self {
        let resolver = PathResolver::new(&settings.home);
        let cache = ConfigCache::new(store, resolver, settings.cache_timeout());
        Self {
            settings,
            cache,
            renderer: Arc::new(TemplateRenderer::new()),
        }
    }

    /// State backed by the store selected in `settings`.
    pub fn from_settings(settings: Arc<Settings>) -> Result<Self, StoreError> {
        let store = cache::open_store(&settings)?;
        Ok(Self::new(settings, store))
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

/// Full application for `settings`: state, services and routes.
pub fn build_app(settings: Arc<Settings>) -> Result<axum::Router, StoreError> {
    let state = AppState::from_settings(settings)?;
    let services = ServiceRegistry::discover(state.cache.resolver().components_root());
    Ok(router(state, &services))
}
