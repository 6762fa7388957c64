//! Component-oriented application server.
//!
//! A supervisor process watches the component sources, runs the build, and
//! keeps a pool of worker processes serving `{home}/components`. Workers
//! share resolved component configuration through a [`cache::CacheStore`].

pub mod cache;
pub mod cli;
pub mod components;
pub mod config;
pub mod logging;
pub mod server;
pub mod supervisor;
pub mod watcher;

pub use cache::{CacheStore, ConfigCache, ConfigDocument, StoreError};
pub use components::{ComponentKey, KeyError, PathResolver};
pub use config::Settings;
pub use server::AppState;
pub use supervisor::{PoolState, PoolStatus, Supervisor, SupervisorConfig};
pub use watcher::{BuildWatcher, RebuildEvent};
