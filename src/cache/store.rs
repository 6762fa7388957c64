//! Store protocol and the config cache built on top of it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::resolve::{self, Resolution};
use super::{ConfigDocument, StoreError};
use crate::components::{ComponentKey, PathResolver};

/// Key/value store reachable by every worker process.
///
/// `get`/`set` must be atomic per key. Values are JSON text produced by
/// [`ConfigCache::resolve_and_cache`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Stored value for `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite `key` unconditionally.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Config cache: disk resolution plus a write-through to the shared store.
#[derive(Clone)]
pub struct ConfigCache {
    store: Arc<dyn CacheStore>,
    resolver: PathResolver,
    timeout: Duration,
}

impl ConfigCache {
    /// `timeout` bounds every store round-trip.
    pub fn new(store: Arc<dyn CacheStore>, resolver: PathResolver, timeout: Duration) -> Self {
        Self {
            store,
            resolver,
            timeout,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Stored document for `key`.
    ///
    /// `Ok(None)` is a miss, distinct from a stored `{}`. A stored value
    /// that fails to parse is reported as a miss rather than an error.
    pub async fn get(&self, key: &ComponentKey) -> Result<Option<ConfigDocument>, StoreError> {
        let Some(text) = self.bounded(self.store.get(key.as_str())).await? else {
            return Ok(None);
        };
        match ConfigDocument::from_json_str(&text) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                tracing::warn!("[cache] discarding malformed entry for {key}: {e}");
                Ok(None)
            }
        }
    }

    /// Replace the stored document for `key`. Last writer wins.
    pub async fn set(&self, key: &ComponentKey, document: &ConfigDocument) -> Result<(), StoreError> {
        self.bounded(self.store.set(key.as_str(), document.to_json_string()))
            .await
    }

    /// Resolve `key` from disk, store the result, and return it.
    ///
    /// Never fails: a missing or malformed config yields `{}`, and a store
    /// that cannot be written only costs the cache update.
    pub async fn resolve_and_cache(&self, key: &ComponentKey) -> ConfigDocument {
        self.resolve_traced(key).await.document
    }

    /// Same as [`resolve_and_cache`](Self::resolve_and_cache), keeping the
    /// record of which candidates were read.
    pub async fn resolve_traced(&self, key: &ComponentKey) -> Resolution {
        let candidates = self.resolver.config_candidates(key);
        let resolution = resolve::load_first_valid(&candidates).await;

        match &resolution.source {
            Some(path) => crate::debug_event!("cache", "resolved", "{key} from {}", path.display()),
            None => crate::debug_event!("cache", "resolved", "{key} to default {{}}"),
        }

        if let Err(e) = self.set(key, &resolution.document).await {
            tracing::warn!("[cache] {e}; serving {key} from disk");
        }
        resolution
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                backend: self.store.name().to_string(),
                after: self.timeout,
            }),
        }
    }
}
