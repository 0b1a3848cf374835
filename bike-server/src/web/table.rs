//! Declarative route table.
//!
//! The table is loaded once at startup (from `routes.json` or the built-in
//! default) and never changes afterwards. Handler and middleware names are
//! resolved into closed enums while decoding, so an unknown name becomes a
//! typed variant up front instead of a lookup failure per request.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use axum::http::Method;
use axum::routing::MethodFilter;
use serde::{Deserialize, Serialize};

/// Paths served outside the table.
pub const RESERVED_PATHS: [&str; 3] = ["/", "/status", "/teapot"];

/// Errors loading or validating the route table.
#[derive(Debug, thiserror::Error)]
pub enum RouteTableError {
    #[error("failed to read route table {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse route table {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("route {name}: unsupported method {method}")]
    Method { name: String, method: String },

    #[error("route {name}: uri must start with '/', got {uri}")]
    Uri { name: String, uri: String },

    #[error("route {name}: {method} {uri} is already registered")]
    Duplicate {
        name: String,
        method: String,
        uri: String,
    },
}

/// Business handlers a route can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HandlerId {
    GetStations,
    GetStationsInService,
    GetStationsNotInService,
    GetStationsMatchingString,
    GetIsBikeDockable,
    GetRoutes,
    /// Any name that is not one of the above.
    NotFound,
}

impl HandlerId {
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerId::GetStations => "GetStations",
            HandlerId::GetStationsInService => "GetStationsInService",
            HandlerId::GetStationsNotInService => "GetStationsNotInService",
            HandlerId::GetStationsMatchingString => "GetStationsMatchingString",
            HandlerId::GetIsBikeDockable => "GetIsBikeDockable",
            HandlerId::GetRoutes => "GetRoutes",
            HandlerId::NotFound => "NotFound",
        }
    }
}

impl From<&str> for HandlerId {
    fn from(name: &str) -> Self {
        match name {
            "GetStations" => HandlerId::GetStations,
            "GetStationsInService" => HandlerId::GetStationsInService,
            "GetStationsNotInService" => HandlerId::GetStationsNotInService,
            "GetStationsMatchingString" => HandlerId::GetStationsMatchingString,
            "GetIsBikeDockable" => HandlerId::GetIsBikeDockable,
            "GetRoutes" => HandlerId::GetRoutes,
            _ => HandlerId::NotFound,
        }
    }
}

impl From<String> for HandlerId {
    fn from(name: String) -> Self {
        HandlerId::from(name.as_str())
    }
}

impl From<HandlerId> for String {
    fn from(id: HandlerId) -> Self {
        id.as_str().to_string()
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named middlewares a route can request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MiddlewareId {
    /// Authorization hook for admin-only routes.
    AdminOnly,
    /// A name with no registered middleware; skipped when the router is built.
    Unregistered(String),
}

impl From<String> for MiddlewareId {
    fn from(name: String) -> Self {
        match name.as_str() {
            "adminOnly" => MiddlewareId::AdminOnly,
            _ => MiddlewareId::Unregistered(name),
        }
    }
}

impl From<MiddlewareId> for String {
    fn from(id: MiddlewareId) -> Self {
        match id {
            MiddlewareId::AdminOnly => "adminOnly".to_string(),
            MiddlewareId::Unregistered(name) => name,
        }
    }
}

/// One endpoint: name, method, URI pattern, handler and middleware chain.
///
/// URI patterns mark path parameters with braces, e.g.
/// `/dockable/{stationId}/{bikesToReturn}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub name: String,
    pub method: String,
    pub uri: String,
    pub handler: HandlerId,
    #[serde(default)]
    pub middlewares: Vec<MiddlewareId>,
}

impl RouteDescriptor {
    pub fn new(name: &str, method: Method, uri: &str, handler: HandlerId) -> Self {
        Self {
            name: name.to_string(),
            method: method.to_string(),
            uri: uri.to_string(),
            handler,
            middlewares: Vec::new(),
        }
    }

    pub fn with_middleware(mut self, middleware: MiddlewareId) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn method_filter(&self) -> Result<MethodFilter, RouteTableError> {
        let invalid = || RouteTableError::Method {
            name: self.name.clone(),
            method: self.method.clone(),
        };
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| invalid())?;
        MethodFilter::try_from(method).map_err(|_| invalid())
    }

    /// The URI in the router's syntax: `{param}` becomes `:param`.
    pub fn router_path(&self) -> String {
        self.uri
            .split('/')
            .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(param) => format!(":{param}"),
                None => segment.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// The full, immutable set of table routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// Load and validate a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RouteTableError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RouteTableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table: RouteTable =
            serde_json::from_str(&contents).map_err(|source| RouteTableError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        table.validate()?;
        Ok(table)
    }

    /// Check methods, URIs and uniqueness of every route.
    pub fn validate(&self) -> Result<(), RouteTableError> {
        let mut seen = HashSet::new();

        for route in &self.routes {
            route.method_filter()?;

            if !route.uri.starts_with('/') {
                return Err(RouteTableError::Uri {
                    name: route.name.clone(),
                    uri: route.uri.clone(),
                });
            }

            let method = route.method.to_ascii_uppercase();
            let duplicate = RESERVED_PATHS.contains(&route.uri.as_str())
                || !seen.insert((method.clone(), route.router_path()));
            if duplicate {
                return Err(RouteTableError::Duplicate {
                    name: route.name.clone(),
                    method,
                    uri: route.uri.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    /// The station API as shipped in `routes.json`.
    fn default() -> Self {
        Self {
            routes: vec![
                RouteDescriptor::new("Routes", Method::GET, "/routes", HandlerId::GetRoutes),
                RouteDescriptor::new("Stations", Method::GET, "/stations", HandlerId::GetStations),
                RouteDescriptor::new(
                    "StationsInService",
                    Method::GET,
                    "/stations/in-service",
                    HandlerId::GetStationsInService,
                ),
                RouteDescriptor::new(
                    "StationsNotInService",
                    Method::GET,
                    "/stations/not-in-service",
                    HandlerId::GetStationsNotInService,
                ),
                RouteDescriptor::new(
                    "StationsMatchingString",
                    Method::GET,
                    "/stations/{search}",
                    HandlerId::GetStationsMatchingString,
                ),
                RouteDescriptor::new(
                    "IsBikeDockable",
                    Method::GET,
                    "/dockable/{stationId}/{bikesToReturn}",
                    HandlerId::GetIsBikeDockable,
                ),
            ],
        }
    }
}
