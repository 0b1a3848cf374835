//! Domain types for the bike-share station feed.
//!
//! Stations are decoded straight from the upstream payload and never mutated;
//! `StationView` is the projection the list endpoints return.

mod station;

#[cfg(test)]
pub(crate) use station::fixtures;
pub use station::{FeedSnapshot, Station, StationStatus, StationView};
