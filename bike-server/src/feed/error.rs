//! Upstream feed error types.

/// Errors that can occur while fetching the station feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream error {status}: {message}")]
    Api { status: u16, message: String },

    /// Fixture-backed source could not produce a payload
    #[error("mock feed error: {message}")]
    Mock { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FeedError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "upstream error 503: Service Unavailable");

        let err = FeedError::Mock {
            message: "offline".into(),
        };
        assert_eq!(err.to_string(), "mock feed error: offline");
    }
}
