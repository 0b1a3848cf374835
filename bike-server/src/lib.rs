//! Bike-share station API server.
//!
//! A read-only JSON API over an upstream station feed: listings, status
//! filters, substring search and dock availability, served through a
//! payload cache and a whole-response cache.

pub mod cache;
pub mod config;
pub mod dock;
pub mod domain;
pub mod feed;
pub mod query;
pub mod web;
