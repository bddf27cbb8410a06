//! Pagination-size counters keyed by (user, thread).
//!
//! Key conventions mirror the write paths: (0, 0) counts threads globally,
//! (uid, 0) threads per user, (0, tid) replies per thread, (uid, tid)
//! replies per user per thread. Counts are advisory sizing for pagination;
//! the authoritative rollup is `threads.posts`.
//!
//! Same backend split as the cooldown limiter: in-memory HashMap for a
//! single instance, Redis INCR/DECR when REDIS_URL is configured. Failures
//! are logged and swallowed; `get` defaults to 0.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct CounterService {
    inner: CounterInner,
}

#[derive(Clone)]
enum CounterInner {
    Memory {
        counts: Arc<RwLock<HashMap<(i64, i64), i64>>>,
    },
    Redis {
        conn: redis::aio::MultiplexedConnection,
    },
}

impl CounterService {
    /// Create a new in-memory counter service
    pub fn new_memory() -> Self {
        Self {
            inner: CounterInner::Memory {
                counts: Arc::new(RwLock::new(HashMap::new())),
            },
        }
    }

    /// Create a new Redis-backed counter service
    pub async fn new_redis(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            inner: CounterInner::Redis { conn },
        })
    }

    /// Create a counter service from configuration.
    /// Uses Redis if REDIS_URL is configured, otherwise falls back to in-memory.
    pub async fn from_config(redis_url: Option<&str>) -> Self {
        if let Some(url) = redis_url {
            match tokio::time::timeout(Duration::from_secs(5), Self::new_redis(url)).await {
                Ok(Ok(service)) => {
                    tracing::info!("Using Redis-backed counters");
                    return service;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Redis connection failed: {}. Falling back to in-memory.", e);
                }
                Err(_) => {
                    tracing::warn!("Redis connection timed out. Falling back to in-memory.");
                }
            }
        }
        tracing::info!("Using in-memory counters (single instance only)");
        Self::new_memory()
    }

    pub async fn add(&self, user_key: i64, thread_key: i64) {
        self.apply(user_key, thread_key, 1).await;
    }

    pub async fn sub(&self, user_key: i64, thread_key: i64) {
        self.apply(user_key, thread_key, -1).await;
    }

    pub async fn get(&self, user_key: i64, thread_key: i64) -> i64 {
        match &self.inner {
            CounterInner::Memory { counts } => counts
                .read()
                .await
                .get(&(user_key, thread_key))
                .copied()
                .unwrap_or(0),
            CounterInner::Redis { conn } => {
                let mut conn = conn.clone();
                let result: Result<Option<i64>, redis::RedisError> = redis::cmd("GET")
                    .arg(counter_key(user_key, thread_key))
                    .query_async(&mut conn)
                    .await;

                match result {
                    Ok(count) => count.unwrap_or(0),
                    Err(e) => {
                        tracing::error!("Redis counter get failed: {}", e);
                        0
                    }
                }
            }
        }
    }

    async fn apply(&self, user_key: i64, thread_key: i64, delta: i64) {
        match &self.inner {
            CounterInner::Memory { counts } => {
                let mut counts = counts.write().await;
                *counts.entry((user_key, thread_key)).or_insert(0) += delta;
            }
            CounterInner::Redis { conn } => {
                let mut conn = conn.clone();
                let result: Result<i64, redis::RedisError> = redis::cmd("INCRBY")
                    .arg(counter_key(user_key, thread_key))
                    .arg(delta)
                    .query_async(&mut conn)
                    .await;

                if let Err(e) = result {
                    tracing::error!("Redis counter update failed: {}", e);
                }
            }
        }
    }
}

fn counter_key(user_key: i64, thread_key: i64) -> String {
    format!("counter:{}:{}", user_key, thread_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_sub_get() {
        let counters = CounterService::new_memory();
        counters.add(0, 5).await;
        counters.add(0, 5).await;
        counters.sub(0, 5).await;
        assert_eq!(counters.get(0, 5).await, 1);
    }

    #[tokio::test]
    async fn test_missing_key_defaults_to_zero() {
        let counters = CounterService::new_memory();
        assert_eq!(counters.get(7, 9).await, 0);
    }

    #[tokio::test]
    async fn test_user_and_global_keys_are_independent() {
        let counters = CounterService::new_memory();
        counters.add(0, 0).await;
        counters.add(3, 0).await;
        assert_eq!(counters.get(0, 0).await, 1);
        assert_eq!(counters.get(3, 0).await, 1);
        assert_eq!(counters.get(0, 3).await, 0);
    }

    #[test]
    fn test_counter_key_format() {
        assert_eq!(counter_key(2, 9), "counter:2:9");
    }
}
