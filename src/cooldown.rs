//! Per-user posting cooldown.
//!
//! Supports two backends:
//! - In-memory: HashMap of last-post timestamps (single instance)
//! - Redis: external key-value store for multi-instance deployments
//!
//! Keys live in the negative-uid keyspace (`cooldown:-<uid>`) to stay
//! separate from the counter keys. Configure via REDIS_URL to use Redis.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;

/// Cooldown limiter gating create-thread and create-reply per user.
#[derive(Clone)]
pub struct CooldownLimiter {
    inner: CooldownInner,
    /// Seconds a user must wait between writes
    window_secs: i64,
}

#[derive(Clone)]
enum CooldownInner {
    Memory {
        last_write: Arc<RwLock<HashMap<i64, i64>>>,
    },
    Redis {
        conn: redis::aio::MultiplexedConnection,
    },
}

impl CooldownLimiter {
    /// Create a new in-memory cooldown limiter
    pub fn new_memory(window_secs: i64) -> Self {
        Self {
            inner: CooldownInner::Memory {
                last_write: Arc::new(RwLock::new(HashMap::new())),
            },
            window_secs,
        }
    }

    /// Create a new Redis-backed cooldown limiter
    pub async fn new_redis(redis_url: &str, window_secs: i64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            inner: CooldownInner::Redis { conn },
            window_secs,
        })
    }

    /// Create a cooldown limiter from configuration.
    /// Uses Redis if REDIS_URL is configured, otherwise falls back to in-memory.
    pub async fn from_config(redis_url: Option<&str>, window_secs: i64) -> Self {
        if let Some(url) = redis_url {
            match tokio::time::timeout(
                Duration::from_secs(5),
                Self::new_redis(url, window_secs),
            )
            .await
            {
                Ok(Ok(limiter)) => {
                    tracing::info!("Using Redis-backed posting cooldown");
                    return limiter;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Redis connection failed: {}. Falling back to in-memory.", e);
                }
                Err(_) => {
                    tracing::warn!("Redis connection timed out. Falling back to in-memory.");
                }
            }
        }
        tracing::info!("Using in-memory posting cooldown (single instance only)");
        Self::new_memory(window_secs)
    }

    /// Whether `uid` may write at `now`. Does not record anything; call
    /// [`touch`](Self::touch) after the write succeeds.
    pub async fn check(&self, uid: i64, now: i64) -> bool {
        let last = match &self.inner {
            CooldownInner::Memory { last_write } => {
                last_write.read().await.get(&uid).copied()
            }
            CooldownInner::Redis { conn } => self.get_redis(conn.clone(), uid).await,
        };

        match last {
            Some(last) => now - last >= self.window_secs,
            None => true,
        }
    }

    /// Record a successful write for `uid`. Monotonic per user: a stale
    /// timestamp never overwrites a newer one.
    pub async fn touch(&self, uid: i64, now: i64) {
        match &self.inner {
            CooldownInner::Memory { last_write } => {
                let mut map = last_write.write().await;
                let entry = map.entry(uid).or_insert(0);
                if now > *entry {
                    *entry = now;
                }
            }
            CooldownInner::Redis { conn } => {
                let mut conn = conn.clone();
                let key = cooldown_key(uid);
                let result: Result<(), redis::RedisError> = async {
                    let current: Option<i64> =
                        redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
                    if current.map_or(true, |c| now > c) {
                        redis::cmd("SET")
                            .arg(&key)
                            .arg(now)
                            .arg("EX")
                            .arg(self.window_secs.max(1))
                            .query_async::<()>(&mut conn)
                            .await?;
                    }
                    Ok(())
                }
                .await;

                if let Err(e) = result {
                    tracing::error!("Redis cooldown touch failed: {}", e);
                }
            }
        }
    }

    async fn get_redis(
        &self,
        mut conn: redis::aio::MultiplexedConnection,
        uid: i64,
    ) -> Option<i64> {
        let result: Result<Option<i64>, redis::RedisError> = redis::cmd("GET")
            .arg(cooldown_key(uid))
            .query_async(&mut conn)
            .await;

        match result {
            Ok(last) => last,
            Err(e) => {
                // Fail open: allow writes if Redis is unavailable
                tracing::error!("Redis cooldown check failed: {}. Allowing write.", e);
                None
            }
        }
    }

    /// Drop expired entries (only needed for the in-memory backend).
    pub async fn cleanup(&self, now: i64) {
        if let CooldownInner::Memory { last_write } = &self.inner {
            let cutoff = now - self.window_secs;
            let mut map = last_write.write().await;
            map.retain(|_, last| *last > cutoff);
        }
        // Redis entries expire on their own
    }

    /// Check if using Redis backend
    pub fn is_redis(&self) -> bool {
        matches!(self.inner, CooldownInner::Redis { .. })
    }
}

fn cooldown_key(uid: i64) -> String {
    format!("cooldown:{}", -uid)
}

/// Start background cleanup task (only needed for the memory backend)
pub fn start_cleanup_task(limiter: CooldownLimiter) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.cleanup(crate::models::epoch_now()).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_write_allowed() {
        let limiter = CooldownLimiter::new_memory(60);
        assert!(limiter.check(1, 1000).await);
    }

    #[tokio::test]
    async fn test_second_write_within_window_denied() {
        let limiter = CooldownLimiter::new_memory(60);
        limiter.touch(1, 1000).await;
        assert!(!limiter.check(1, 1059).await);
        assert!(limiter.check(1, 1060).await);
    }

    #[tokio::test]
    async fn test_cooldown_is_per_user() {
        let limiter = CooldownLimiter::new_memory(60);
        limiter.touch(1, 1000).await;
        assert!(limiter.check(2, 1001).await);
    }

    #[tokio::test]
    async fn test_touch_is_monotonic() {
        let limiter = CooldownLimiter::new_memory(60);
        limiter.touch(1, 2000).await;
        limiter.touch(1, 1000).await;
        // The later timestamp survives the out-of-order touch
        assert!(!limiter.check(1, 2059).await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired_entries() {
        let limiter = CooldownLimiter::new_memory(60);
        limiter.touch(1, 1000).await;
        limiter.cleanup(2000).await;
        assert!(limiter.check(1, 1001).await);
    }

    #[test]
    fn test_cooldown_key_uses_negative_uid() {
        assert_eq!(cooldown_key(42), "cooldown:-42");
    }
}
