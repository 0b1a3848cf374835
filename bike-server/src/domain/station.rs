//! Station records as published by the upstream feed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Format of `lastCommunicationTime`, e.g. `2019-05-01 10:23:15 AM`.
const LAST_COMMUNICATION_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

/// Service status of a station, decoded from the numeric `statusKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum StationStatus {
    /// `statusKey == 1`
    InService,
    /// `statusKey == 3`
    NotInService,
    /// Any other key the feed may send.
    Other(i64),
}

impl StationStatus {
    pub const IN_SERVICE_KEY: i64 = 1;
    pub const NOT_IN_SERVICE_KEY: i64 = 3;

    pub fn key(self) -> i64 {
        match self {
            StationStatus::InService => Self::IN_SERVICE_KEY,
            StationStatus::NotInService => Self::NOT_IN_SERVICE_KEY,
            StationStatus::Other(key) => key,
        }
    }
}

impl From<i64> for StationStatus {
    fn from(key: i64) -> Self {
        match key {
            Self::IN_SERVICE_KEY => StationStatus::InService,
            Self::NOT_IN_SERVICE_KEY => StationStatus::NotInService,
            other => StationStatus::Other(other),
        }
    }
}

impl From<StationStatus> for i64 {
    fn from(status: StationStatus) -> Self {
        status.key()
    }
}

impl Default for StationStatus {
    fn default() -> Self {
        StationStatus::Other(0)
    }
}

/// A single station in a feed snapshot.
///
/// Stations are never updated in place: every successful fetch decodes a
/// brand new list which replaces the previous one as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: i64,

    #[serde(rename = "stationName")]
    pub name: String,

    #[serde(rename = "availableDocks", default)]
    pub available_docks: i64,

    #[serde(rename = "totalDocks", default)]
    pub total_docks: i64,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,

    /// Human readable status, e.g. "In Service".
    #[serde(rename = "statusValue", default)]
    pub status_value: String,

    #[serde(rename = "statusKey", default)]
    pub status: StationStatus,

    #[serde(rename = "availableBikes", default)]
    pub available_bikes: i64,

    #[serde(rename = "stAddress1", default)]
    pub address1: String,

    #[serde(rename = "stAddress2", default)]
    pub address2: String,

    #[serde(default)]
    pub city: String,

    #[serde(rename = "postalCode", default)]
    pub postal_code: String,

    #[serde(rename = "testStation", default)]
    pub test_station: bool,

    #[serde(rename = "lastCommunicationTime", default)]
    pub last_communication_time: String,

    #[serde(rename = "landMark", default)]
    pub landmark: String,
}

impl Station {
    /// Explicitly flagged out of service. Unknown status keys are not.
    pub fn is_out_of_service(&self) -> bool {
        self.status == StationStatus::NotInService
    }

    /// Full postal address: both address lines, city and postal code.
    pub fn address(&self) -> String {
        format!(
            "{} {} {} {}",
            self.address1, self.address2, self.city, self.postal_code
        )
        .trim()
        .to_string()
    }

    /// Text that station searches are matched against, lowercased.
    pub fn search_key(&self) -> String {
        format!("{} {} {}", self.name, self.address1, self.address2)
            .trim()
            .to_lowercase()
    }

    /// Parsed `lastCommunicationTime`, if the feed sent a readable value.
    pub fn last_communication(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.last_communication_time, LAST_COMMUNICATION_FORMAT)
            .ok()
    }
}

/// Compact projection of a station returned by the list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationView {
    #[serde(rename = "stationName")]
    pub name: String,

    pub address: String,

    #[serde(rename = "availableDocks")]
    pub available_docks: i64,

    #[serde(rename = "totalDocks")]
    pub total_docks: i64,
}

impl From<&Station> for StationView {
    fn from(station: &Station) -> Self {
        Self {
            name: station.name.clone(),
            address: station.address(),
            available_docks: station.available_docks,
            total_docks: station.total_docks,
        }
    }
}

/// Decoded upstream payload.
///
/// A fresh value is built for every decode; nothing survives from the
/// previous fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedSnapshot {
    #[serde(rename = "executionTime", default)]
    pub execution_time: String,

    #[serde(rename = "stationBeanList", default)]
    pub stations: Vec<Station>,
}

impl FeedSnapshot {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
