//! Process configuration, read from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::ResponseCacheConfig;
use crate::feed::{DEFAULT_FEED_URL, MAX_TTL_MINUTES, PayloadCacheConfig};

/// Used for the read/write timeouts and the cache TTL when the environment
/// does not provide valid values.
const DEFAULT_TIMING: u64 = 30;

/// Errors in the startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Name and version reported in every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

impl AppInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Value of the `X-App-Name` header.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}

impl Default for AppInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.address, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                var: "SRV_ADDRESS",
                value: self.address.clone(),
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 3000,
            read_timeout: Duration::from_secs(DEFAULT_TIMING),
            write_timeout: Duration::from_secs(DEFAULT_TIMING),
        }
    }
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppInfo,
    pub server: ServerConfig,

    /// Upstream station feed URL
    pub feed_url: String,

    /// Serve the feed from this JSON file instead of the network
    pub feed_mock_file: Option<PathBuf>,

    /// Route table file; the built-in table is used when unset and
    /// `routes.json` does not exist
    pub routes_file: Option<PathBuf>,

    pub payload_cache: PayloadCacheConfig,
    pub response_cache: ResponseCacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppInfo::default(),
            server: ServerConfig::default(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            feed_mock_file: None,
            routes_file: None,
            payload_cache: PayloadCacheConfig::from_minutes(DEFAULT_TIMING),
            response_cache: ResponseCacheConfig::default().with_ttl_minutes(DEFAULT_TIMING),
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(name) = non_empty("APP_NAME") {
            config.app.name = name;
        }
        if let Some(version) = non_empty("APP_VERSION") {
            config.app.version = version;
        }

        if let Some(address) = non_empty("SRV_ADDRESS") {
            config.server.address = address;
        }
        if let Some(port) = non_empty("SRV_PORT") {
            config.server.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "SRV_PORT",
                value: port,
            })?;
        }

        // The three timings fall back together: one bad value resets all of them.
        let timing = |var: &str| lookup(var).and_then(|v| v.trim().parse::<u64>().ok());
        let (read_secs, write_secs, cache_mins) = match (
            timing("SRV_READ_TIMEOUT"),
            timing("SRV_WRITE_TIMEOUT"),
            timing("SRV_MEMCACHE_TIME_MINUTES"),
        ) {
            (Some(read), Some(write), Some(cache)) => (read, write, cache),
            _ => (DEFAULT_TIMING, DEFAULT_TIMING, DEFAULT_TIMING),
        };
        if cache_mins > MAX_TTL_MINUTES {
            return Err(ConfigError::Invalid {
                var: "SRV_MEMCACHE_TIME_MINUTES",
                value: cache_mins.to_string(),
            });
        }
        config.server.read_timeout = Duration::from_secs(read_secs);
        config.server.write_timeout = Duration::from_secs(write_secs);
        config.payload_cache = PayloadCacheConfig::from_minutes(cache_mins);
        config.response_cache = config.response_cache.with_ttl_minutes(cache_mins);

        if let Some(url) = non_empty("FEED_URL") {
            config.feed_url = url;
        }
        config.feed_mock_file = non_empty("FEED_MOCK_FILE").map(PathBuf::from);
        config.routes_file = non_empty("ROUTES_FILE").map(PathBuf::from);

        if let Some(capacity) = non_empty("CACHE_CAPACITY") {
            config.response_cache.capacity =
                capacity.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "CACHE_CAPACITY",
                    value: capacity,
                })?;
        }
        if let Some(key) = non_empty("CACHE_REFRESH_KEY") {
            config.response_cache.refresh_key = key;
        }
        if let Some(flag) = non_empty("CACHE_LOG_HITS") {
            config.response_cache.log_hits = parse_flag(&flag).ok_or(ConfigError::Invalid {
                var: "CACHE_LOG_HITS",
                value: flag,
            })?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.read_timeout, Duration::from_secs(30));
        assert_eq!(config.server.write_timeout, Duration::from_secs(30));
        assert_eq!(config.payload_cache.ttl, Duration::from_secs(30 * 60));
        assert_eq!(config.response_cache.ttl, Duration::from_secs(30 * 60));
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert!(config.feed_mock_file.is_none());
    }

    #[test]
    fn reads_values() {
        let config = config_from(&[
            ("APP_NAME", "bikes"),
            ("APP_VERSION", "1.2.3"),
            ("SRV_ADDRESS", "0.0.0.0"),
            ("SRV_PORT", "8080"),
            ("SRV_READ_TIMEOUT", "5"),
            ("SRV_WRITE_TIMEOUT", "10"),
            ("SRV_MEMCACHE_TIME_MINUTES", "2"),
            ("CACHE_CAPACITY", "100"),
            ("CACHE_LOG_HITS", "true"),
            ("FEED_MOCK_FILE", "data/feed.json"),
        ])
        .unwrap();

        assert_eq!(config.app.display_name(), "bikes 1.2.3");
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "0.0.0.0:8080".parse().unwrap()
        );
        assert_eq!(config.server.read_timeout, Duration::from_secs(5));
        assert_eq!(config.server.write_timeout, Duration::from_secs(10));
        assert_eq!(config.payload_cache.ttl, Duration::from_secs(120));
        assert_eq!(config.response_cache.ttl, Duration::from_secs(120));
        assert_eq!(config.response_cache.capacity, 100);
        assert!(config.response_cache.log_hits);
        assert_eq!(config.feed_mock_file, Some(PathBuf::from("data/feed.json")));
    }

    #[test]
    fn one_bad_timing_resets_all_timings() {
        let config = config_from(&[
            ("SRV_READ_TIMEOUT", "5"),
            ("SRV_WRITE_TIMEOUT", "soon"),
            ("SRV_MEMCACHE_TIME_MINUTES", "2"),
        ])
        .unwrap();

        assert_eq!(config.server.read_timeout, Duration::from_secs(30));
        assert_eq!(config.payload_cache.ttl, Duration::from_secs(30 * 60));
    }

    #[test]
    fn oversized_cache_ttl_is_an_error() {
        let err = config_from(&[
            ("SRV_READ_TIMEOUT", "5"),
            ("SRV_WRITE_TIMEOUT", "5"),
            ("SRV_MEMCACHE_TIME_MINUTES", "18446744073709551615"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("SRV_MEMCACHE_TIME_MINUTES"));

        let max = MAX_TTL_MINUTES.to_string();
        let ok = config_from(&[
            ("SRV_READ_TIMEOUT", "5"),
            ("SRV_WRITE_TIMEOUT", "5"),
            ("SRV_MEMCACHE_TIME_MINUTES", max.as_str()),
        ])
        .unwrap();
        assert_eq!(ok.payload_cache.ttl, Duration::from_secs(MAX_TTL_MINUTES * 60));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = config_from(&[("SRV_PORT", "http")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for SRV_PORT: \"http\"");
    }

    #[test]
    fn invalid_flag_is_an_error() {
        assert!(config_from(&[("CACHE_LOG_HITS", "maybe")]).is_err());
    }
}
