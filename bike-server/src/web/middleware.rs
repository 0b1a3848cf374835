//! Per-route middlewares.
//!
//! Each one is an `axum::middleware::from_fn` function; the router decides
//! which routes get which and in what order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{CACHE_STATUS_HEADER, CachedResponse, ResponseCache};
use crate::config::AppInfo;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const APP_NAME_HEADER: &str = "x-app-name";
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

const ALLOW_METHODS: &str = "POST, GET, OPTIONS, PUT, DELETE";
const ALLOW_HEADERS: &str =
    "Accept, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization";

/// Disambiguates request ids minted within the same nanosecond.
static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// JSON content type, CORS, request id, app name and session echo.
///
/// `OPTIONS` requests are answered here with an empty 200 and never reach
/// the handler.
pub async fn basic_headers(State(app): State<Arc<AppInfo>>, req: Request, next: Next) -> Response {
    let echo = RequestEcho::from_headers(req.headers());

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    echo.apply(headers);
    match HeaderValue::try_from(app.display_name()) {
        Ok(name) => {
            headers.insert(HeaderName::from_static(APP_NAME_HEADER), name);
        }
        Err(_) => warn!(name = %app.display_name(), "app name is not a valid header value"),
    }

    response
}

/// Response headers derived from one particular request.
///
/// They are stripped before a response is cached and re-applied for every
/// request that is served from the cache.
struct RequestEcho {
    origin: Option<HeaderValue>,
    session: Option<HeaderValue>,
}

impl RequestEcho {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            origin: headers.get(header::ORIGIN).cloned(),
            session: headers.get(SESSION_TOKEN_HEADER).cloned(),
        }
    }

    fn apply(&self, headers: &mut HeaderMap) {
        if let Some(origin) = &self.origin {
            apply_cors(headers, origin.clone());
        }
        if let Some(session) = &self.session {
            headers.insert(HeaderName::from_static(SESSION_TOKEN_HEADER), session.clone());
        }
        if let Ok(id) = HeaderValue::try_from(request_id()) {
            headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), id);
        }
    }

    fn strip(headers: &mut HeaderMap) {
        headers.remove(header::ACCESS_CONTROL_ALLOW_METHODS);
        headers.remove(header::ACCESS_CONTROL_ALLOW_ORIGIN);
        headers.remove(header::ACCESS_CONTROL_ALLOW_HEADERS);
        headers.remove(SESSION_TOKEN_HEADER);
        headers.remove(REQUEST_ID_HEADER);
    }
}

fn apply_cors(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

/// Base-36 timestamp plus a sequence number, e.g. `1h8kq2v3x9c-2a`.
fn request_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default().unsigned_abs();
    let sequence = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", base36(nanos), base36(sequence))
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// One log event per request that reaches the handler.
pub async fn log_request(State(route): State<Arc<str>>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();
    debug!(route = %route, method = %method, uri = %uri, "started request");

    let response = next.run(req).await;

    info!(
        route = %route,
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "handled request"
    );
    response
}

/// Authorization hook for admin routes. Currently lets every request through.
pub async fn admin_only(req: Request, next: Next) -> Response {
    debug!(uri = %req.uri(), "admin-only route");
    next.run(req).await
}

/// State of the response cache middleware for one route.
#[derive(Clone)]
pub struct CacheContext {
    pub cache: Arc<ResponseCache>,
    pub route: Arc<str>,
}

/// Serve `GET` requests from the response cache, storing successful misses.
///
/// A refresh request drops the existing entry before running the chain, so
/// a refresh that fails leaves nothing stale behind.
pub async fn response_cache(State(ctx): State<CacheContext>, req: Request, next: Next) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let cache = &ctx.cache;
    let bypass = cache.should_bypass(req.uri().query());
    let signature = cache.signature(req.method(), req.uri());
    let echo = RequestEcho::from_headers(req.headers());

    if bypass {
        cache.remove(&signature);
    } else if let Some(hit) = cache.lookup(&signature) {
        if cache.config().log_hits {
            info!(route = %ctx.route, signature = %signature, "served from cache");
        }
        let mut response = hit.to_response();
        echo.apply(response.headers_mut());
        return response;
    }

    let (mut parts, body) = next.run(req).await.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(e) => {
            warn!(route = %ctx.route, error = %e, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if parts.status.as_u16() < 400 {
        let mut headers = parts.headers.clone();
        RequestEcho::strip(&mut headers);
        cache.store(
            signature,
            CachedResponse {
                status: parts.status,
                headers,
                body: body.clone(),
            },
        );
    }

    parts
        .headers
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(body))
}
