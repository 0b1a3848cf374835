//! Station snapshots served through the payload cache.

use std::sync::Arc;

use axum::body::Bytes;
use tracing::{debug, warn};

use super::cache::PayloadCache;
use super::client::FeedSource;
use crate::domain::{FeedSnapshot, Station};

/// Cache key the upstream station document is stored under.
pub const FEED_CACHE_KEY: &str = "citibike-json";

/// Upstream feed with caching and graceful degradation.
///
/// Never fails: when the upstream is unreachable the last known payload is
/// used, and when there is none (or it does not decode) the snapshot is
/// empty.
pub struct StationFeed {
    source: Arc<dyn FeedSource>,
    cache: PayloadCache,
}

impl StationFeed {
    pub fn new(source: Arc<dyn FeedSource>, cache: PayloadCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &PayloadCache {
        &self.cache
    }

    /// Current stations, decoded into a fresh snapshot.
    pub async fn snapshot(&self) -> FeedSnapshot {
        let Some(bytes) = self.payload().await else {
            return FeedSnapshot::default();
        };

        match FeedSnapshot::from_slice(&bytes) {
            Ok(snapshot) => {
                debug!(stations = snapshot.stations.len(), "decoded station feed");
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "station feed did not decode, serving no stations");
                FeedSnapshot::default()
            }
        }
    }

    pub async fn stations(&self) -> Vec<Station> {
        self.snapshot().await.stations
    }

    async fn payload(&self) -> Option<Bytes> {
        let fetched = self
            .cache
            .get_or_fetch(FEED_CACHE_KEY, self.source.fetch())
            .await;

        match fetched {
            Ok(bytes) => Some(bytes),
            Err(e) => match self.cache.last_known(FEED_CACHE_KEY).await {
                Some(stale) => {
                    warn!(
                        error = %e,
                        cached_at = %stale.created_at,
                        "station feed fetch failed, serving last known payload"
                    );
                    Some(stale.bytes.clone())
                }
                None => {
                    warn!(error = %e, "station feed fetch failed and nothing is cached");
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::feed::{MockFeed, PayloadCacheConfig};

    const ONE_STATION: &str = r#"{"executionTime": "now", "stationBeanList": [
        {"id": 1, "stationName": "First", "availableDocks": 3, "totalDocks": 5, "statusKey": 1}
    ]}"#;

    const TWO_STATIONS: &str = r#"{"executionTime": "later", "stationBeanList": [
        {"id": 1, "stationName": "First", "availableDocks": 3, "totalDocks": 5, "statusKey": 1},
        {"id": 2, "stationName": "Second", "availableDocks": 0, "totalDocks": 5, "statusKey": 3}
    ]}"#;

    fn feed(mock: &MockFeed, ttl: Duration) -> StationFeed {
        let cache = PayloadCache::new(&PayloadCacheConfig {
            ttl,
            max_capacity: 4,
        });
        StationFeed::new(Arc::new(mock.clone()), cache)
    }

    #[tokio::test]
    async fn fetches_once_within_ttl() {
        let mock = MockFeed::from_bytes(ONE_STATION);
        let feed = feed(&mock, Duration::from_secs(60));

        assert_eq!(feed.stations().await.len(), 1);
        mock.set_payload(TWO_STATIONS).await;
        assert_eq!(feed.stations().await.len(), 1);
        assert_eq!(mock.fetch_count(), 1);
    }

    #[tokio::test]
    async fn refetches_after_ttl() {
        let mock = MockFeed::from_bytes(ONE_STATION);
        let feed = feed(&mock, Duration::from_millis(50));

        assert_eq!(feed.stations().await.len(), 1);
        mock.set_payload(TWO_STATIONS).await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        let snapshot = feed.snapshot().await;
        assert_eq!(snapshot.execution_time, "later");
        assert_eq!(snapshot.stations.len(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_with_empty_cache_is_empty() {
        let mock = MockFeed::failing("offline");
        let feed = feed(&mock, Duration::from_secs(60));

        assert!(feed.stations().await.is_empty());
    }

    #[tokio::test]
    async fn failed_refetch_serves_last_known_payload() {
        let mock = MockFeed::from_bytes(TWO_STATIONS);
        let feed = feed(&mock, Duration::from_millis(50));

        assert_eq!(feed.stations().await.len(), 2);
        mock.set_failing("offline").await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(feed.stations().await.len(), 2);
        assert_eq!(mock.fetch_count(), 2);
    }

    #[tokio::test]
    async fn undecodable_payload_is_empty() {
        let mock = MockFeed::from_bytes("<html>maintenance</html>");
        let feed = feed(&mock, Duration::from_secs(60));

        assert!(feed.stations().await.is_empty());
    }
}
