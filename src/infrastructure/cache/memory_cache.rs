//! In-process cache backed by a concurrent map.

use super::service::{CacheResult, CachedLookup, LookupCache};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::debug;

/// Lookup cache living for the lifetime of the process.
///
/// Entries never expire; they are replaced or removed by explicit writes.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, CachedLookup>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        debug!("Using in-memory lookup cache");
        Self::default()
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl LookupCache for MemoryCache {
    async fn get(&self, hash: &str) -> CacheResult<Option<CachedLookup>> {
        Ok(self.inner.get(hash).map(|entry| *entry.value()))
    }

    async fn put_if_absent(&self, hash: &str, value: CachedLookup) -> CacheResult<bool> {
        match self.inner.entry(hash.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }

    async fn set(&self, hash: &str, value: CachedLookup) -> CacheResult<()> {
        self.inner.insert(hash.to_string(), value);
        Ok(())
    }

    async fn invalidate(&self, hash: &str) -> CacheResult<()> {
        if self.inner.remove(hash).is_some() {
            debug!("Cache INVALIDATE: {}", hash);
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
