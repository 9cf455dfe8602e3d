//! The idempotency lock abstracted behind a single `acquire_once`
//! interface (spec §9: "Redis-based idempotency lock is retained but
//! abstracted... so a non-Redis KV can substitute"). Grounded in
//! `packages/treasury/src/lock.rs`'s local/Redis duality.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use carbonledger_core::error::AppResult;
use parking_lot::Mutex;

/// Atomically acquire a key for the given TTL, returning `true` if this
/// call was the one to create it (i.e. the event should be processed) and
/// `false` if it already existed (i.e. the event should be skipped).
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn acquire_once(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// Release a key early, so a failed attempt can be retried without
    /// waiting out the full TTL (spec §4.B: "On failure, the key is
    /// released so retry can re-acquire").
    async fn release(&self, key: &str) -> AppResult<()>;
}

/// `SET key value EX ttl NX`, implemented in-process with a `HashMap`.
/// Used in tests and single-node deployments without Redis configured.
#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    keys: Mutex<HashMap<String, Instant>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_expired(keys: &mut HashMap<String, Instant>) {
        let now = Instant::now();
        keys.retain(|_, expires_at| *expires_at > now);
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn acquire_once(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let mut keys = self.keys.lock();
        Self::sweep_expired(&mut keys);

        if keys.contains_key(key) {
            return Ok(false);
        }

        keys.insert(key.to_string(), Instant::now() + ttl);
        Ok(true)
    }

    async fn release(&self, key: &str) -> AppResult<()> {
        self.keys.lock().remove(key);
        Ok(())
    }
}

#[cfg(feature = "distributed")]
pub use redis_backend::RedisIdempotencyStore;

#[cfg(feature = "distributed")]
mod redis_backend {
    use super::*;
    use carbonledger_core::error::AppError;
    use redis::AsyncCommands;

    /// Distributed idempotency store backed by Redis `SET NX EX`.
    pub struct RedisIdempotencyStore {
        client: redis::Client,
    }

    impl RedisIdempotencyStore {
        pub fn new(redis_url: &str) -> AppResult<Self> {
            let client = redis::Client::open(redis_url)
                .map_err(|e| AppError::Internal(format!("invalid redis url: {e}")))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl IdempotencyStore for RedisIdempotencyStore {
        async fn acquire_once(&self, key: &str, ttl: Duration) -> AppResult<bool> {
            let mut conn = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| AppError::Transient(format!("redis connect failed: {e}")))?;

            let acquired: bool = redis::cmd("SET")
                .arg(key)
                .arg(1)
                .arg("NX")
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async::<Option<String>>(&mut conn)
                .await
                .map(|reply| reply.is_some())
                .map_err(|e| AppError::Transient(format!("redis SET NX failed: {e}")))?;

            Ok(acquired)
        }

        async fn release(&self, key: &str) -> AppResult<()> {
            let mut conn = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| AppError::Transient(format!("redis connect failed: {e}")))?;
            let _: () = conn
                .del(key)
                .await
                .map_err(|e| AppError::Transient(format!("redis DEL failed: {e}")))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_within_ttl_is_skipped() {
        let store = InMemoryIdempotencyStore::new();
        assert!(store
            .acquire_once("processed_event:abc", Duration::from_secs(3600))
            .await
            .unwrap());
        assert!(!store
            .acquire_once("processed_event:abc", Duration::from_secs(3600))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn release_allows_reacquire() {
        let store = InMemoryIdempotencyStore::new();
        assert!(store
            .acquire_once("processed_event:xyz", Duration::from_secs(3600))
            .await
            .unwrap());
        store.release("processed_event:xyz").await.unwrap();
        assert!(store
            .acquire_once("processed_event:xyz", Duration::from_secs(3600))
            .await
            .unwrap());
    }
}
