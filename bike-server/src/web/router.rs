//! Router assembly.
//!
//! Table routes are composed, outermost first, as: response cache, named
//! middlewares in table order, basic headers, request logging, handler.
//! Fixed routes and the not-found fallback get headers and logging only.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{MethodFilter, MethodRouter, any, get, on},
};
use tracing::{info, warn};

use super::middleware::{CacheContext, admin_only, basic_headers, log_request, response_cache};
use super::routes::*;
use super::state::AppState;
use super::table::{HandlerId, MiddlewareId, RouteDescriptor, RouteTableError};

/// Build the application router from the state's route table.
pub fn create_router(state: AppState) -> Result<Router, RouteTableError> {
    state.routes.validate()?;

    let not_found_route = wrap_plain(any(not_found), "NotFound", &state);

    let mut router = Router::new()
        .route("/", wrap_plain(get(home), "Home", &state))
        .route("/status", wrap_plain(get(status), "Status", &state))
        .route("/teapot", wrap_plain(get(teapot), "Teapot", &state));

    // Descriptors sharing a path are merged into one method router.
    let mut by_path: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();
    for descriptor in &state.routes.routes {
        let route = compose(descriptor, &state)?;
        let path = descriptor.router_path();

        info!(
            name = %descriptor.name,
            method = %descriptor.method,
            uri = %descriptor.uri,
            handler = %descriptor.handler,
            "registering route"
        );

        let merged = match by_path.remove(&path) {
            Some(existing) => existing.merge(route),
            None => route,
        };
        by_path.insert(path, merged);
    }

    for (path, route) in by_path {
        router = router.route(&path, route.fallback(not_found_route.clone()));
    }

    Ok(router.fallback(not_found_route).with_state(state))
}

/// Headers and logging around a fixed route.
fn wrap_plain(route: MethodRouter<AppState>, name: &str, state: &AppState) -> MethodRouter<AppState> {
    route
        .layer(from_fn_with_state(Arc::<str>::from(name), log_request))
        .layer(from_fn_with_state(state.app.clone(), basic_headers))
}

/// The full middleware chain for one table route.
fn compose(
    descriptor: &RouteDescriptor,
    state: &AppState,
) -> Result<MethodRouter<AppState>, RouteTableError> {
    let name: Arc<str> = Arc::from(descriptor.name.as_str());
    let filter = descriptor.method_filter()?;

    // Layers added last run first, so the chain is built inside out.
    let mut route = handler_for(descriptor.handler, filter)
        .layer(from_fn_with_state(name.clone(), log_request))
        .layer(from_fn_with_state(state.app.clone(), basic_headers));

    for middleware in descriptor.middlewares.iter().rev() {
        match middleware {
            MiddlewareId::AdminOnly => route = route.layer(from_fn(admin_only)),
            MiddlewareId::Unregistered(unknown) => warn!(
                route = %descriptor.name,
                middleware = %unknown,
                "skipping unregistered middleware"
            ),
        }
    }

    Ok(route.layer(from_fn_with_state(
        CacheContext {
            cache: state.response_cache.clone(),
            route: name,
        },
        response_cache,
    )))
}

fn handler_for(handler: HandlerId, filter: MethodFilter) -> MethodRouter<AppState> {
    match handler {
        HandlerId::GetStations => on(filter, get_stations),
        HandlerId::GetStationsInService => on(filter, get_stations_in_service),
        HandlerId::GetStationsNotInService => on(filter, get_stations_not_in_service),
        HandlerId::GetStationsMatchingString => on(filter, get_stations_matching),
        HandlerId::GetIsBikeDockable => on(filter, get_is_bike_dockable),
        HandlerId::GetRoutes => on(filter, get_routes),
        HandlerId::NotFound => on(filter, not_found),
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
