//! Lookup cache trait and error types.

use async_trait::async_trait;
use std::fmt;

use crate::domain::entities::RuleId;

/// Errors that can occur during cache operations.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Memoized outcome of resolving a path hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedLookup {
    /// The hash resolves to this rule.
    Rule(RuleId),
    /// The store holds no rule for the hash.
    Missing,
}

impl CachedLookup {
    /// Wire representation; `0` marks a negative entry.
    pub fn to_raw(self) -> i64 {
        match self {
            Self::Rule(id) => id,
            Self::Missing => 0,
        }
    }

    pub fn from_raw(raw: i64) -> Self {
        if raw > 0 {
            Self::Rule(raw)
        } else {
            Self::Missing
        }
    }
}

/// Cache of `from_hash` → rule resolution for the live redirect path.
///
/// Implementations must be thread-safe and fail open: backend errors are
/// logged and reported as a miss so requests fall through to the store.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process map, the default
/// - [`crate::infrastructure::cache::RedisCache`] - Shared Redis cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LookupCache: Send + Sync {
    /// Returns the memoized lookup for a hash.
    ///
    /// - `Ok(Some(_))` on cache hit, including negative entries
    /// - `Ok(None)` on cache miss or backend error
    async fn get(&self, hash: &str) -> CacheResult<Option<CachedLookup>>;

    /// Stores a value only if the hash has no entry yet.
    ///
    /// Returns `Ok(true)` if the value was written.
    async fn put_if_absent(&self, hash: &str, value: CachedLookup) -> CacheResult<bool>;

    /// Stores a value, replacing any existing entry.
    async fn set(&self, hash: &str, value: CachedLookup) -> CacheResult<()>;

    /// Removes the entry for a hash.
    ///
    /// Called after every write that may change how the hash resolves, before
    /// the write is reported as done.
    async fn invalidate(&self, hash: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
