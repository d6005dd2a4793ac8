//! Redis-backed lookup cache.

use super::service::{CacheError, CacheResult, CachedLookup, LookupCache};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, info, warn};

/// Redis cache shared between resolver instances.
///
/// Uses `ConnectionManager` for connection reuse. Every entry carries the
/// configured TTL. All operations are fail-open: errors are logged but don't
/// propagate to callers.
pub struct RedisCache {
    client: ConnectionManager,
    ttl_seconds: u64,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            ttl_seconds,
            key_prefix: "legacy-redirect:".to_string(),
        })
    }

    fn build_key(&self, hash: &str) -> String {
        format!("{}{}", self.key_prefix, hash)
    }
}

#[async_trait]
impl LookupCache for RedisCache {
    async fn get(&self, hash: &str) -> CacheResult<Option<CachedLookup>> {
        let key = self.build_key(hash);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<i64>>(&key).await {
            Ok(Some(raw)) => {
                debug!("Cache HIT: {} -> {}", hash, raw);
                Ok(Some(CachedLookup::from_raw(raw)))
            }
            Ok(None) => {
                debug!("Cache MISS: {}", hash);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", hash, e);
                Ok(None)
            }
        }
    }

    async fn put_if_absent(&self, hash: &str, value: CachedLookup) -> CacheResult<bool> {
        let key = self.build_key(hash);
        let mut conn = self.client.clone();

        let reply: Result<Option<String>, _> = redis::cmd("SET")
            .arg(&key)
            .arg(value.to_raw())
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async(&mut conn)
            .await;

        match reply {
            Ok(written) => Ok(written.is_some()),
            Err(e) => {
                warn!("Redis SET NX error for {}: {}", hash, e);
                Ok(false)
            }
        }
    }

    async fn set(&self, hash: &str, value: CachedLookup) -> CacheResult<()> {
        let key = self.build_key(hash);
        let mut conn = self.client.clone();

        if let Err(e) = conn
            .set_ex::<_, _, ()>(&key, value.to_raw(), self.ttl_seconds)
            .await
        {
            warn!("Redis SET error for {}: {}", hash, e);
        }
        Ok(())
    }

    async fn invalidate(&self, hash: &str) -> CacheResult<()> {
        let key = self.build_key(hash);
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&key).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!("Cache INVALIDATE: {}", hash);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Redis DEL error for {}: {}", hash, e);
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
