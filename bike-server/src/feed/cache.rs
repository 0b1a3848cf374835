//! In-memory cache of raw upstream payloads.
//!
//! Entries expire a fixed TTL after they were stored. Besides the fresh
//! entries the cache remembers the last payload stored under each key, so a
//! failed refetch can still be served from stale data.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;
use tokio::sync::RwLock;

use super::error::FeedError;

/// One stored payload.
#[derive(Debug, Clone)]
pub struct CachedPayload {
    pub key: String,
    pub bytes: Bytes,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CachedPayload {
    fn new(key: &str, bytes: Bytes, ttl: Duration) -> Self {
        Self {
            key: key.to_string(),
            bytes,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// Absolute expiry: creation time plus TTL.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Longest TTL accepted for either cache, one year.
pub const MAX_TTL_MINUTES: u64 = 365 * 24 * 60;

/// `minutes` as a duration, clamped to [`MAX_TTL_MINUTES`].
pub fn ttl_from_minutes(minutes: u64) -> Duration {
    let secs = minutes
        .min(MAX_TTL_MINUTES)
        .checked_mul(60)
        .unwrap_or(MAX_TTL_MINUTES * 60);
    Duration::from_secs(secs)
}

/// Configuration for the payload cache.
#[derive(Debug, Clone)]
pub struct PayloadCacheConfig {
    /// How long a fetched payload stays fresh.
    pub ttl: Duration,

    /// Maximum number of fresh keys.
    pub max_capacity: u64,
}

impl PayloadCacheConfig {
    /// TTL given in minutes, as configured at startup.
    ///
    /// Values above [`MAX_TTL_MINUTES`] are clamped to it.
    pub fn from_minutes(minutes: u64) -> Self {
        Self {
            ttl: ttl_from_minutes(minutes),
            ..Self::default()
        }
    }
}

impl Default for PayloadCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_capacity: 64,
        }
    }
}

/// TTL cache of upstream payloads keyed by string.
pub struct PayloadCache {
    fresh: MokaCache<String, Arc<CachedPayload>>,
    last_known: RwLock<HashMap<String, Arc<CachedPayload>>>,
    ttl: Duration,
}

impl PayloadCache {
    pub fn new(config: &PayloadCacheConfig) -> Self {
        let fresh = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            fresh,
            last_known: RwLock::new(HashMap::new()),
            ttl: config.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh payload for `key`, or `None` if missing or expired.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let payload = self.fresh.get(key).await?;
        if payload.is_expired_at(Utc::now()) {
            self.fresh.invalidate(key).await;
            return None;
        }
        Some(payload.bytes.clone())
    }

    /// Store `bytes` under `key`, replacing any previous entry.
    pub async fn set(&self, key: &str, bytes: Bytes) {
        let payload = Arc::new(CachedPayload::new(key, bytes, self.ttl));
        self.remember(&payload).await;
        self.fresh.insert(key.to_string(), payload).await;
    }

    /// Fresh payload for `key`, running `fetch` on a miss.
    ///
    /// Concurrent misses on the same key wait for a single `fetch`; they all
    /// see its result. A failed fetch stores nothing.
    pub async fn get_or_fetch<F>(&self, key: &str, fetch: F) -> Result<Bytes, Arc<FeedError>>
    where
        F: Future<Output = Result<Bytes, FeedError>>,
    {
        if let Some(bytes) = self.get(key).await {
            return Ok(bytes);
        }

        let payload = self
            .fresh
            .try_get_with(key.to_string(), async {
                let bytes = fetch.await?;
                let payload = Arc::new(CachedPayload::new(key, bytes, self.ttl));
                self.remember(&payload).await;
                Ok::<_, FeedError>(payload)
            })
            .await?;

        Ok(payload.bytes.clone())
    }

    /// The most recent payload ever stored under `key`, fresh or not.
    pub async fn last_known(&self, key: &str) -> Option<Arc<CachedPayload>> {
        self.last_known.read().await.get(key).cloned()
    }

    /// Drop every entry, stale copies included.
    pub async fn clear(&self) {
        self.fresh.invalidate_all();
        self.last_known.write().await.clear();
    }

    async fn remember(&self, payload: &Arc<CachedPayload>) {
        self.last_known
            .write()
            .await
            .insert(payload.key.clone(), payload.clone());
    }
}
