//! Shared types flowing through the arrival pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A transit agency with its own stop and route identifier scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Agency {
    /// New York City subway (NYCT GTFS-RT feeds).
    Mta,
    /// Port Authority Trans-Hudson.
    Path,
}

impl Agency {
    pub fn code(self) -> &'static str {
        match self {
            Agency::Mta => "MTA",
            Agency::Path => "PATH",
        }
    }
}

impl fmt::Display for Agency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Agency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MTA" => Ok(Agency::Mta),
            "PATH" => Ok(Agency::Path),
            other => Err(anyhow::anyhow!("unknown agency type '{other}'")),
        }
    }
}

impl TryFrom<String> for Agency {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Agency> for String {
    fn from(agency: Agency) -> Self {
        agency.code().to_string()
    }
}

/// Canonical station identity within one agency's namespace.
///
/// This is the batching key: a batch performs at most one feed fetch per
/// distinct key. Displays as `AGENCY:STATION_ID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StationKey {
    pub agency: Agency,
    pub station_id: String,
}

impl StationKey {
    pub fn new(agency: Agency, station_id: impl Into<String>) -> Self {
        Self {
            agency,
            station_id: station_id.into().trim().to_string(),
        }
    }

    /// Parses a canonical id of the form `AGENCY:STATION_ID`.
    ///
    /// Returns `None` when either side is empty or the agency is unknown.
    pub fn parse(value: &str) -> Option<Self> {
        let (agency, station) = value.trim().split_once(':')?;
        let agency = agency.parse::<Agency>().ok()?;
        let station = station.trim();
        if station.is_empty() {
            return None;
        }
        Some(Self::new(agency, station))
    }
}

impl fmt::Display for StationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.agency, self.station_id)
    }
}

/// One predicted vehicle arrival at a station, normalized across agencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arrival {
    pub route_token: String,
    pub destination: String,
    pub arrival_time: DateTime<Utc>,
}

/// A caller's loosely formatted station + line request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StationRequest {
    #[serde(default, alias = "type")]
    pub agency: Option<Agency>,
    pub station: String,
    #[serde(alias = "line")]
    pub route: String,
}

impl StationRequest {
    pub fn new(agency: Option<Agency>, station: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            agency,
            station: station.into(),
            route: route.into(),
        }
    }
}

/// Resolved status for one request. `minutes_until_arrival == None` means no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub display_label: String,
    pub route_token: String,
    pub minutes_until_arrival: Option<i64>,
    pub destination: Option<String>,
    pub station_key: Option<StationKey>,
    pub arrival_time: Option<DateTime<Utc>>,
}

impl StatusRow {
    pub fn no_data(display_label: String, route_token: String, station_key: Option<StationKey>) -> Self {
        Self {
            display_label,
            route_token,
            minutes_until_arrival: None,
            destination: None,
            station_key,
            arrival_time: None,
        }
    }
}
