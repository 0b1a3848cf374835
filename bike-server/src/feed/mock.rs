//! Fixture-backed feed for development and tests.
//!
//! Serves a payload held in memory (usually loaded from a JSON file) as if it
//! came from the live upstream. The payload can be swapped or made to fail at
//! runtime, and every fetch is counted.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use super::client::FeedSource;
use super::error::FeedError;

/// In-memory stand-in for the upstream feed.
#[derive(Clone, Default)]
pub struct MockFeed {
    inner: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    /// `Err` holds the message the next fetches fail with.
    payload: RwLock<Option<Result<Bytes, String>>>,
    delay: RwLock<Option<Duration>>,
    fetches: AtomicUsize,
}

impl MockFeed {
    /// Serve `payload` on every fetch.
    pub fn from_bytes(payload: impl Into<Bytes>) -> Self {
        Self {
            inner: Arc::new(MockState {
                payload: RwLock::new(Some(Ok(payload.into()))),
                ..MockState::default()
            }),
        }
    }

    /// Load the payload from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| FeedError::Mock {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// A feed whose every fetch fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MockState {
                payload: RwLock::new(Some(Err(message.into()))),
                ..MockState::default()
            }),
        }
    }

    /// Replace the served payload.
    pub async fn set_payload(&self, payload: impl Into<Bytes>) {
        *self.inner.payload.write().await = Some(Ok(payload.into()));
    }

    /// Make subsequent fetches fail with `message`.
    pub async fn set_failing(&self, message: impl Into<String>) {
        *self.inner.payload.write().await = Some(Err(message.into()));
    }

    /// Hold every fetch for `delay` before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.inner.delay.write().await = Some(delay);
    }

    /// Number of fetches served so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    async fn fetch_payload(&self) -> Result<Bytes, FeedError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.inner.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.inner.payload.read().await.clone() {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(message)) => Err(FeedError::Mock { message }),
            None => Err(FeedError::Mock {
                message: "no payload configured".to_string(),
            }),
        }
    }
}

impl FeedSource for MockFeed {
    fn fetch(&self) -> BoxFuture<'_, Result<Bytes, FeedError>> {
        self.fetch_payload().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_configured_payload() {
        let feed = MockFeed::from_bytes(&b"{}"[..]);

        assert_eq!(feed.fetch().await.unwrap(), Bytes::from_static(b"{}"));
        assert_eq!(feed.fetch_count(), 1);
    }

    #[tokio::test]
    async fn can_be_switched_to_failing() {
        let feed = MockFeed::from_bytes(&b"{}"[..]);
        feed.set_failing("offline").await;

        let err = feed.fetch().await.unwrap_err();
        assert_eq!(err.to_string(), "mock feed error: offline");
    }

    #[tokio::test]
    async fn default_has_no_payload() {
        let feed = MockFeed::default();
        assert!(feed.fetch().await.is_err());
    }

    #[test]
    fn loads_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(&path, br#"{"stationBeanList": []}"#).unwrap();

        assert!(MockFeed::from_file(&path).is_ok());
        assert!(MockFeed::from_file(dir.path().join("missing.json")).is_err());
    }

    #[tokio::test]
    async fn bundled_fixture_decodes() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/mock_feed.json");
        let bytes = MockFeed::from_file(path).unwrap().fetch().await.unwrap();

        let snapshot = crate::domain::FeedSnapshot::from_slice(&bytes).unwrap();
        assert_eq!(snapshot.stations.len(), 5);
        assert_eq!(snapshot.stations[0].id, 72);
    }
}
