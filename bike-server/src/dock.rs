//! Can a station take back a number of bikes?

use axum::http::StatusCode;
use serde::Serialize;

use crate::domain::Station;

pub const NO_DOCKS_MESSAGE: &str = "No docks available";
pub const OUT_OF_SERVICE_MESSAGE: &str = "Docks are available, but station is out of service";
pub const DOCKABLE_MESSAGE: &str = "Docks available";

/// Verdict for a dock request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockDecision {
    pub dockable: bool,
    pub message: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl DockDecision {
    fn refused(message: impl Into<String>) -> Self {
        Self {
            dockable: false,
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    fn accepted() -> Self {
        Self {
            dockable: true,
            message: DOCKABLE_MESSAGE.to_string(),
            status: StatusCode::OK,
        }
    }
}

/// Which path parameter failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DockParamError {
    #[error("Missing or invalid station id")]
    StationId,

    #[error("Missing or invalid num bikes to return")]
    BikesToReturn,
}

/// Parse the `{stationId}` and `{bikesToReturn}` path segments.
///
/// The station id is checked first, so a request with both segments invalid
/// reports the station id.
pub fn parse_params(station_id: &str, bikes_to_return: &str) -> Result<(i64, i64), DockParamError> {
    let station_id = station_id
        .parse::<i64>()
        .map_err(|_| DockParamError::StationId)?;
    let bikes_to_return = bikes_to_return
        .parse::<i64>()
        .map_err(|_| DockParamError::BikesToReturn)?;
    Ok((station_id, bikes_to_return))
}

/// Decide whether `bikes_to_return` bikes can be docked at `station_id`.
///
/// Checks run in a fixed order and the first failing one wins: station
/// exists with free docks, enough docks for the request, station not flagged
/// out of service.
pub fn evaluate(stations: &[Station], station_id: i64, bikes_to_return: i64) -> DockDecision {
    let Some(station) = stations.iter().find(|s| s.id == station_id) else {
        return DockDecision::refused(NO_DOCKS_MESSAGE);
    };

    if station.available_docks <= 0 {
        return DockDecision::refused(NO_DOCKS_MESSAGE);
    }

    if bikes_to_return > station.available_docks {
        return DockDecision::refused(format!(
            "Docks are available for {} docks, you are requesting return of {} bikes",
            station.available_docks, bikes_to_return
        ));
    }

    if station.is_out_of_service() {
        return DockDecision::refused(OUT_OF_SERVICE_MESSAGE);
    }

    DockDecision::accepted()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StationStatus;
    use crate::domain::fixtures::station;

    fn stations() -> Vec<Station> {
        vec![
            station(1, "Empty", 0, StationStatus::InService),
            station(2, "Five", 5, StationStatus::InService),
            station(3, "Closed", 8, StationStatus::NotInService),
        ]
    }

    #[test]
    fn unknown_station_is_not_dockable() {
        let decision = evaluate(&stations(), 100_000_000_000, 1);

        assert!(!decision.dockable);
        assert_eq!(decision.message, NO_DOCKS_MESSAGE);
        assert_eq!(decision.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn zero_docks_is_never_dockable() {
        for bikes in [0, 1, 5, -1] {
            let decision = evaluate(&stations(), 1, bikes);
            assert!(!decision.dockable, "bikes = {bikes}");
            assert_eq!(decision.message, NO_DOCKS_MESSAGE);
        }
    }

    #[test]
    fn too_many_bikes_cites_both_counts() {
        let decision = evaluate(&stations(), 2, 6);

        assert!(!decision.dockable);
        assert_eq!(decision.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            decision.message,
            "Docks are available for 5 docks, you are requesting return of 6 bikes"
        );
    }

    #[test]
    fn capacity_check_runs_before_service_check() {
        let decision = evaluate(&stations(), 3, 9);
        assert!(decision.message.contains("8 docks"));
    }

    #[test]
    fn out_of_service_station_is_refused() {
        let decision = evaluate(&stations(), 3, 2);

        assert!(!decision.dockable);
        assert_eq!(decision.message, OUT_OF_SERVICE_MESSAGE);
        assert_eq!(decision.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_status_key_is_not_treated_as_out_of_service() {
        let stations = vec![station(9, "Pending", 5, StationStatus::Other(2))];
        let decision = evaluate(&stations, 9, 1);

        assert!(decision.dockable);
        assert_eq!(decision.message, DOCKABLE_MESSAGE);
        assert_eq!(decision.status, StatusCode::OK);
    }

    #[test]
    fn exact_fit_is_dockable() {
        let decision = evaluate(&stations(), 2, 5);

        assert!(decision.dockable);
        assert_eq!(decision.message, DOCKABLE_MESSAGE);
        assert_eq!(decision.status, StatusCode::OK);
    }

    #[test]
    fn first_matching_id_wins() {
        let mut list = stations();
        list.push(station(2, "Duplicate", 50, StationStatus::InService));

        let decision = evaluate(&list, 2, 20);
        assert!(!decision.dockable);
    }

    #[test]
    fn serializes_without_status() {
        let json = serde_json::to_value(evaluate(&stations(), 2, 1)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "dockable": true, "message": "Docks available" })
        );
    }

    #[test]
    fn parse_params_names_the_bad_field() {
        assert_eq!(parse_params("72", "3"), Ok((72, 3)));
        assert_eq!(parse_params("abc", "3"), Err(DockParamError::StationId));
        assert_eq!(parse_params("72", "x"), Err(DockParamError::BikesToReturn));
        assert_eq!(parse_params("", ""), Err(DockParamError::StationId));
        assert_eq!(
            DockParamError::BikesToReturn.to_string(),
            "Missing or invalid num bikes to return"
        );
    }
}
