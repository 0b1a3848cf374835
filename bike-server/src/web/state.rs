//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::config::AppInfo;
use crate::feed::StationFeed;

use super::table::RouteTable;

/// Shared application state.
///
/// Everything in here is built once at startup and shared by all requests.
#[derive(Clone)]
pub struct AppState {
    /// Name and version reported in response headers
    pub app: Arc<AppInfo>,

    /// Cached upstream station feed
    pub feed: Arc<StationFeed>,

    /// Whole-response cache wrapped around table routes
    pub response_cache: Arc<ResponseCache>,

    /// Active route table
    pub routes: Arc<RouteTable>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        app: AppInfo,
        feed: StationFeed,
        response_cache: ResponseCache,
        routes: RouteTable,
    ) -> Self {
        Self {
            app: Arc::new(app),
            feed: Arc::new(feed),
            response_cache: Arc::new(response_cache),
            routes: Arc::new(routes),
        }
    }
}
