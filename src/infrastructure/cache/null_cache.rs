//! No-op lookup cache.

use super::service::{CacheResult, CachedLookup, LookupCache};
use async_trait::async_trait;
use tracing::debug;

/// A cache that never stores anything; every lookup goes to the store.
///
/// Selected with `CACHE_BACKEND=none`.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupCache for NullCache {
    async fn get(&self, _hash: &str) -> CacheResult<Option<CachedLookup>> {
        Ok(None)
    }

    async fn put_if_absent(&self, _hash: &str, _value: CachedLookup) -> CacheResult<bool> {
        Ok(false)
    }

    async fn set(&self, _hash: &str, _value: CachedLookup) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _hash: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
