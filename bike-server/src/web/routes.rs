//! HTTP route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::dock::{self, DockParamError};
use crate::domain::{StationStatus, StationView};
use crate::query;

use super::dto::{ErrorResponse, PageQuery};
use super::state::AppState;
use super::table::RouteTable;

pub const NOT_FOUND_BODY: &str = "404 Not Found";
pub const OK_BODY: &str = "200 OK";
pub const TEAPOT_BODY: &str = "Are you a teapot?";

/// Landing page.
pub async fn home() -> Json<&'static str> {
    Json(OK_BODY)
}

/// Health check endpoint.
pub async fn status() -> Json<&'static str> {
    Json(OK_BODY)
}

pub async fn teapot() -> Response {
    (
        StatusCode::IM_A_TEAPOT,
        [(HeaderName::from_static("x-teapot"), HeaderValue::from_static("Chai"))],
        Json(TEAPOT_BODY),
    )
        .into_response()
}

/// Unmatched paths, unsupported methods and unknown table handlers.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(NOT_FOUND_BODY)).into_response()
}

/// The active route table.
pub async fn get_routes(State(state): State<AppState>) -> Json<RouteTable> {
    Json(RouteTable::clone(&state.routes))
}

/// Every station, paginated.
pub async fn get_stations(
    State(state): State<AppState>,
    Query(req): Query<PageQuery>,
) -> Json<Vec<StationView>> {
    let stations = state.feed.stations().await;
    Json(query::paginate(query::all_stations(&stations), req.page()))
}

pub async fn get_stations_in_service(
    State(state): State<AppState>,
    Query(req): Query<PageQuery>,
) -> Json<Vec<StationView>> {
    stations_with_status(&state, StationStatus::InService, &req).await
}

pub async fn get_stations_not_in_service(
    State(state): State<AppState>,
    Query(req): Query<PageQuery>,
) -> Json<Vec<StationView>> {
    stations_with_status(&state, StationStatus::NotInService, &req).await
}

async fn stations_with_status(
    state: &AppState,
    status: StationStatus,
    req: &PageQuery,
) -> Json<Vec<StationView>> {
    let stations = state.feed.stations().await;
    Json(query::paginate(
        query::filter_by_status(&stations, status),
        req.page(),
    ))
}

/// Stations whose name or address contains the path segment.
pub async fn get_stations_matching(
    State(state): State<AppState>,
    Path(search): Path<String>,
    Query(req): Query<PageQuery>,
) -> Json<Vec<StationView>> {
    let stations = state.feed.stations().await;
    Json(query::paginate(
        query::filter_by_substring(&stations, &search),
        req.page(),
    ))
}

/// Whether a station can take back a number of bikes.
pub async fn get_is_bike_dockable(
    State(state): State<AppState>,
    Path((station_id, bikes_to_return)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (station_id, bikes_to_return) = dock::parse_params(&station_id, &bikes_to_return)?;

    let stations = state.feed.stations().await;
    let decision = dock::evaluate(&stations, station_id, bikes_to_return);

    Ok((decision.status, Json(decision)).into_response())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
}

impl From<DockParamError> for AppError {
    fn from(e: DockParamError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
        };

        warn!(status = status.as_u16(), error = %message, "request rejected");

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
