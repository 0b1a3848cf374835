//! Whole-response cache for the HTTP routes.
//!
//! Responses are keyed by a signature of method, path and sorted query
//! string. The store is bounded: once it holds more than `capacity` entries
//! the least recently used one is dropped. Independently of that, every entry
//! expires a fixed TTL after it was stored; expiry is checked on lookup and
//! expired entries are removed lazily.
//!
//! A request carrying the refresh marker (`?opn` by default) skips the lookup
//! and overwrites whatever was cached under its signature.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;

use crate::feed::ttl_from_minutes;

/// Header reporting whether a response came from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// Maximum number of cached responses.
    pub capacity: usize,

    /// How long a stored response is served.
    pub ttl: Duration,

    /// Query parameter that forces a refresh.
    pub refresh_key: String,

    /// Emit a log line when a request is answered from the cache.
    /// Hits skip the logging middleware, so without this they are silent.
    pub log_hits: bool,
}

impl ResponseCacheConfig {
    /// Set the TTL in minutes, clamped to [`crate::feed::MAX_TTL_MINUTES`].
    pub fn with_ttl_minutes(mut self, minutes: u64) -> Self {
        self.ttl = ttl_from_minutes(minutes);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000_000,
            ttl: Duration::from_secs(30 * 60),
            refresh_key: "opn".to_string(),
            log_hits: false,
        }
    }
}

/// A response as it was first produced by the handler chain.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    /// Rebuild a response, marking it as a cache hit.
    pub fn to_response(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
            .headers_mut()
            .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("HIT"));
        response
    }
}

struct Entry {
    response: Arc<CachedResponse>,
    expires_at: Instant,
    rank: u64,
}

/// Single-threaded LRU bookkeeping.
///
/// `order` maps a monotonically increasing rank to its key; the smallest
/// rank is the least recently used entry.
struct LruCore {
    entries: HashMap<String, Entry>,
    order: BTreeMap<u64, String>,
    next_rank: u64,
    capacity: usize,
}

impl LruCore {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_rank: 0,
            capacity,
        }
    }

    fn bump(&mut self) -> u64 {
        let rank = self.next_rank;
        self.next_rank += 1;
        rank
    }

    fn get(&mut self, key: &str, now: Instant) -> Option<Arc<CachedResponse>> {
        let expired = now >= self.entries.get(key)?.expires_at;
        if expired {
            self.remove(key);
            return None;
        }

        let rank = self.bump();
        let entry = self.entries.get_mut(key)?;
        self.order.remove(&entry.rank);
        entry.rank = rank;
        self.order.insert(rank, key.to_string());
        Some(entry.response.clone())
    }

    /// Insert or replace, returning the keys evicted to stay within capacity.
    fn insert(&mut self, key: String, response: Arc<CachedResponse>, expires_at: Instant) -> Vec<String> {
        self.remove(&key);

        let rank = self.bump();
        self.order.insert(rank, key.clone());
        self.entries.insert(
            key,
            Entry {
                response,
                expires_at,
                rank,
            },
        );

        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let Some((_, lru)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&lru);
            evicted.push(lru);
        }
        evicted
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.remove(&entry.rank);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Bounded LRU cache of full responses with TTL expiry.
///
/// All operations take an internal lock; callers never synchronise.
pub struct ResponseCache {
    core: Mutex<LruCore>,
    config: ResponseCacheConfig,
}

impl ResponseCache {
    pub fn new(config: ResponseCacheConfig) -> Self {
        Self {
            core: Mutex::new(LruCore::new(config.capacity)),
            config,
        }
    }

    pub fn config(&self) -> &ResponseCacheConfig {
        &self.config
    }

    fn core(&self) -> MutexGuard<'_, LruCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the request's query asks for a refresh.
    pub fn should_bypass(&self, query: Option<&str>) -> bool {
        query_pairs(query).any(|pair| pair_name(pair) == self.config.refresh_key)
    }

    /// Deterministic key for a request.
    ///
    /// Query parameters are sorted so that their order does not matter, and
    /// the refresh marker is dropped so a refresh overwrites the entry normal
    /// requests read.
    pub fn signature(&self, method: &Method, uri: &Uri) -> String {
        let mut pairs: Vec<&str> = query_pairs(uri.query())
            .filter(|pair| pair_name(pair) != self.config.refresh_key)
            .collect();
        pairs.sort_unstable();

        let mut signature = format!("{} {}", method, uri.path());
        if !pairs.is_empty() {
            signature.push('?');
            signature.push_str(&pairs.join("&"));
        }
        signature
    }

    /// Fresh cached response for `signature`, refreshing its recency.
    pub fn lookup(&self, signature: &str) -> Option<Arc<CachedResponse>> {
        self.lookup_at(signature, Instant::now())
    }

    fn lookup_at(&self, signature: &str, now: Instant) -> Option<Arc<CachedResponse>> {
        self.core().get(signature, now)
    }

    /// Store `response`, replacing any existing entry for `signature`.
    pub fn store(&self, signature: String, response: CachedResponse) {
        self.store_at(signature, response, Instant::now());
    }

    fn store_at(&self, signature: String, response: CachedResponse, now: Instant) {
        let evicted = self
            .core()
            .insert(signature, Arc::new(response), now + self.config.ttl);
        for key in evicted {
            tracing::debug!(key = %key, "evicted least recently used response");
        }
    }

    pub fn remove(&self, signature: &str) -> bool {
        self.core().remove(signature)
    }

    pub fn len(&self) -> usize {
        self.core().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Drop every cached response.
    pub fn clear(&self) {
        self.core().clear();
    }
}

fn query_pairs(query: Option<&str>) -> impl Iterator<Item = &str> {
    query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
}

fn pair_name(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(name, _)| name)
}
