//! Component configuration cache.
//!
//! Resolved config documents are stored in a [`CacheStore`] shared by every
//! worker process. The store is an accelerator for disk access, never the
//! source of truth: a miss, a timeout, or an unreachable store all fall back
//! to reading the component's config files.
//!
//! # Architecture
//!
//! ```text
//! ConfigCache::resolve_and_cache(key)
//!   - PathResolver::config_candidates(key)
//!   - resolve::load_first_valid(candidates)   disk, first valid JSON wins
//!   - CacheStore::set(key, json)              awaited, bounded by timeout
//! ```

mod document;
mod error;
mod file_store;
mod memory;
pub mod resolve;
mod store;

pub use document::ConfigDocument;
pub use error::StoreError;
pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use resolve::Resolution;
pub use store::{CacheStore, ConfigCache};

use std::sync::Arc;

use crate::config::{CacheBackend, Settings};

/// Open the store selected by `cache.backend`.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn CacheStore>, StoreError> {
    match settings.cache.backend {
        CacheBackend::File => {
            let store = FileStore::open(settings.cache_dir())?;
            Ok(Arc::new(store))
        }
        CacheBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
