//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::query::Page;

/// Paging parameters of the station list endpoints.
///
/// Kept as raw strings: malformed values are ignored rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// 1-based page number
    pub page: Option<String>,

    /// Page size override
    #[serde(rename = "perPage")]
    pub per_page: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::from_params(self.page.as_deref(), self.per_page.as_deref())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
