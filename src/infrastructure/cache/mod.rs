//! Caching layer for redirect lookups.
//!
//! Provides a [`LookupCache`] trait with three implementations:
//! - [`MemoryCache`] - In-process concurrent map (default)
//! - [`RedisCache`] - Redis-backed cache shared across instances
//! - [`NullCache`] - No-op implementation for disabled caching

mod memory_cache;
mod null_cache;
mod redis_cache;
mod service;

pub use memory_cache::MemoryCache;
pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, CachedLookup, LookupCache};

#[cfg(test)]
pub use service::MockLookupCache;
