//! Upstream station feed: fetching, caching and decoding.
//!
//! The raw feed document is fetched by a [`FeedSource`] (HTTP in production,
//! [`MockFeed`] for development and tests), kept in a [`PayloadCache`] for a
//! configured TTL, and decoded into a fresh [`FeedSnapshot`] per request by
//! [`StationFeed`].
//!
//! [`FeedSnapshot`]: crate::domain::FeedSnapshot

mod cache;
mod client;
mod error;
mod mock;
mod stations;

pub use cache::{CachedPayload, MAX_TTL_MINUTES, PayloadCache, PayloadCacheConfig, ttl_from_minutes};
pub use client::{DEFAULT_FEED_URL, FeedClient, FeedClientConfig, FeedSource};
pub use error::FeedError;
pub use mock::MockFeed;
pub use stations::{FEED_CACHE_KEY, StationFeed};
