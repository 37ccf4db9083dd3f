//! Sliding-window rate limiting for the AI endpoints.
//!
//! The decision itself is a pure function over a key's recorded timestamps;
//! the clock and the timestamp store are injected so tests never sleep and
//! deployments can share a window across instances via Redis.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Pure sliding-window decision: prunes timestamps older than the window,
/// rejects if `max_requests` remain, otherwise records `now_ms` and allows.
pub fn try_acquire(
    timestamps: &mut Vec<u64>,
    now_ms: u64,
    window: Duration,
    max_requests: usize,
) -> bool {
    let cutoff = now_ms.saturating_sub(window.as_millis() as u64);
    timestamps.retain(|&t| t >= cutoff);

    if timestamps.len() >= max_requests {
        return false;
    }

    timestamps.push(now_ms);
    true
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn try_acquire(
        &self,
        key: &str,
        now_ms: u64,
        window: Duration,
        max_requests: usize,
    ) -> Result<bool>;
}

/// Process-local store: a mutex-guarded map of key → timestamps.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn try_acquire(
        &self,
        key: &str,
        now_ms: u64,
        window: Duration,
        max_requests: usize,
    ) -> Result<bool> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("rate-limit store mutex poisoned"))?;
        let timestamps = entries.entry(key.to_string()).or_default();
        Ok(try_acquire(timestamps, now_ms, window, max_requests))
    }
}

/// Shared store: one sorted set per key, scored by timestamp, so multiple
/// API instances enforce a single window.
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn try_acquire(
        &self,
        key: &str,
        now_ms: u64,
        window: Duration,
        max_requests: usize,
    ) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let bucket = format!("ratelimit:{key}");
        let cutoff = now_ms.saturating_sub(window.as_millis() as u64);

        let () = conn
            .zrembyscore(&bucket, "-inf", (cutoff as i64) - 1)
            .await?;
        let count: usize = conn.zcard(&bucket).await?;
        if count >= max_requests {
            return Ok(false);
        }

        let () = conn.zadd(&bucket, now_ms as i64, now_ms as i64).await?;
        let () = conn.expire(&bucket, window.as_secs().max(1) as i64).await?;
        Ok(true)
    }
}

/// Rate limiter consulted by handlers before each LLM call.
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    clock: Arc<dyn Clock>,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            window,
            max_requests,
            clock: Arc::new(SystemClock),
            store,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns whether a request under `key` is allowed right now.
    /// An allowed request is recorded against the window.
    pub async fn check(&self, key: &str) -> Result<bool> {
        self.store
            .try_acquire(key, self.clock.now_ms(), self.window, self.max_requests)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        now_ms: Mutex<u64>,
    }

    impl ManualClock {
        fn new(start_ms: u64) -> Self {
            Self {
                now_ms: Mutex::new(start_ms),
            }
        }

        fn advance(&self, delta_ms: u64) {
            *self.now_ms.lock().unwrap() += delta_ms;
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            *self.now_ms.lock().unwrap()
        }
    }

    #[test]
    fn test_try_acquire_allows_up_to_max() {
        let mut timestamps = Vec::new();
        let window = Duration::from_millis(60_000);
        assert!(try_acquire(&mut timestamps, 1_000, window, 2));
        assert!(try_acquire(&mut timestamps, 2_000, window, 2));
        assert!(!try_acquire(&mut timestamps, 3_000, window, 2));
    }

    #[test]
    fn test_try_acquire_prunes_expired_timestamps() {
        let mut timestamps = vec![0, 100];
        let window = Duration::from_millis(60_000);
        // At t=61_000 both earlier requests have left the window.
        assert!(try_acquire(&mut timestamps, 61_000, window, 2));
        assert_eq!(timestamps, vec![61_000]);
    }

    #[test]
    fn test_denied_request_is_not_recorded() {
        let mut timestamps = Vec::new();
        let window = Duration::from_millis(60_000);
        assert!(try_acquire(&mut timestamps, 1_000, window, 1));
        assert!(!try_acquire(&mut timestamps, 2_000, window, 1));
        assert_eq!(timestamps, vec![1_000]);
    }

    #[tokio::test]
    async fn test_limiter_with_memory_store_and_manual_clock() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let limiter = RateLimiter::new(
            Duration::from_millis(60_000),
            2,
            Arc::new(MemoryStore::new()),
        )
        .with_clock(clock.clone());

        assert!(limiter.check("resume_enhance").await.unwrap());
        assert!(limiter.check("resume_enhance").await.unwrap());
        assert!(!limiter.check("resume_enhance").await.unwrap());

        // A different key has its own window.
        assert!(limiter.check("interview_questions").await.unwrap());

        // Once the window passes, the key is allowed again.
        clock.advance(60_001);
        assert!(limiter.check("resume_enhance").await.unwrap());
    }
}
