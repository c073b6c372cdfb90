//! Per-agency feed adapters.
//!
//! Each agency publishes standard GTFS-RT trip updates but spells its routes
//! and stops differently. An [`AgencyAdapter`] supplies the normalization and
//! shares one decode routine that turns a feed into sorted [`Arrival`]s.

pub mod mta;
pub mod path;

pub use mta::MtaAdapter;
pub use path::PathAdapter;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

use crate::gtfs_rt::FeedMessage;
use crate::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
use crate::model::{Agency, Arrival};
use crate::parser::parse_feed;

const UNKNOWN_DESTINATION: &str = "Unknown";

/// Decodes one agency's feed into arrivals at a single station.
pub trait AgencyAdapter: Send + Sync {
    fn agency(&self) -> Agency;

    /// Maps a route token (user-typed or from the feed) to its comparison form.
    fn normalize_route(&self, route: &str) -> String;

    /// Maps a stop identifier or stop alias to the feed's stop id.
    fn normalize_stop(&self, stop: &str) -> String;

    /// Decodes raw feed bytes into arrivals at `station_id`, sorted by time.
    ///
    /// An empty `allowed_routes` accepts every route.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid `FeedMessage`.
    fn decode(&self, raw: &[u8], station_id: &str, allowed_routes: &[String]) -> Result<Vec<Arrival>> {
        let feed = parse_feed(raw)?;
        Ok(self.arrivals_from_feed(&feed, station_id, allowed_routes))
    }

    /// Same as [`AgencyAdapter::decode`] for an already parsed feed.
    fn arrivals_from_feed(&self, feed: &FeedMessage, station_id: &str, allowed_routes: &[String]) -> Vec<Arrival> {
        let allowed: HashSet<String> = allowed_routes
            .iter()
            .map(|route| self.normalize_route(route))
            .filter(|route| !route.is_empty())
            .collect();
        let target_stop = self.normalize_stop(station_id);

        let mut arrivals: Vec<Arrival> = feed
            .entity
            .iter()
            .filter_map(|entity| entity.trip_update.as_ref())
            .filter_map(|update| {
                let route = self.normalize_route(update.trip.route_id());
                if !allowed.is_empty() && !allowed.contains(&route) {
                    return None;
                }

                let stop = update
                    .stop_time_update
                    .iter()
                    .find(|stu| self.normalize_stop(stu.stop_id()) == target_stop)?;
                let arrival_time = event_time(stop)?;

                let destination = update
                    .trip_properties
                    .as_ref()
                    .and_then(|p| p.trip_headsign.as_deref())
                    .or_else(|| {
                        stop.stop_time_properties
                            .as_ref()
                            .and_then(|p| p.stop_headsign.as_deref())
                    })
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .or_else(|| (!route.is_empty()).then(|| route.clone()))
                    .unwrap_or_else(|| UNKNOWN_DESTINATION.to_string());

                Some(Arrival {
                    route_token: route,
                    destination,
                    arrival_time,
                })
            })
            .collect();

        arrivals.sort_by_key(|arrival| arrival.arrival_time);

        debug!(
            agency = %self.agency(),
            station_id = %target_stop,
            entities = feed.entity.len(),
            arrivals = arrivals.len(),
            "Feed decoded"
        );
        arrivals
    }
}

/// Arrival time if reported, else departure time.
fn event_time(stop: &StopTimeUpdate) -> Option<DateTime<Utc>> {
    let seconds = |event: &Option<StopTimeEvent>| event.as_ref().and_then(|e| e.time);
    let timestamp = seconds(&stop.arrival).or_else(|| seconds(&stop.departure))?;
    DateTime::from_timestamp(timestamp, 0)
}

/// The adapter for `agency`.
pub fn adapter_for(agency: Agency) -> &'static dyn AgencyAdapter {
    match agency {
        Agency::Mta => &MtaAdapter,
        Agency::Path => &PathAdapter,
    }
}

/// Removes separators so `HOB 33`, `hob-33` and `HOB_33` compare equal.
pub(crate) fn compact(token: &str) -> String {
    token
        .chars()
        .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use prost::Message;

    #[test]
    fn test_output_is_sorted_for_any_entity_order() {
        let feed = feed(vec![
            entity("t3", "F", None, vec![stop("F23N", Some(1_700_000_900), None)]),
            entity("t1", "F", None, vec![stop("F23N", Some(1_700_000_100), None)]),
            entity("t2", "M", None, vec![stop("F23N", Some(1_700_000_500), None)]),
        ]);

        let arrivals = MtaAdapter
            .decode(&feed.encode_to_vec(), "F23N", &[])
            .unwrap();
        let times: Vec<i64> = arrivals.iter().map(|a| a.arrival_time.timestamp()).collect();
        assert_eq!(times, vec![1_700_000_100, 1_700_000_500, 1_700_000_900]);
    }

    #[test]
    fn test_departure_used_when_arrival_missing_and_entity_without_times_skipped() {
        let feed = feed(vec![
            entity("dep", "F", None, vec![stop("F23N", None, Some(1_700_000_300))]),
            entity("none", "F", None, vec![stop("F23N", None, None)]),
        ]);
        let arrivals = MtaAdapter.arrivals_from_feed(&feed, "F23N", &[]);
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].arrival_time.timestamp(), 1_700_000_300);
    }

    #[test]
    fn test_destination_falls_back_to_route_then_unknown() {
        let feed = feed(vec![
            entity("a", "F", Some("Coney Island"), vec![stop("F23N", Some(10), None)]),
            entity("b", "F", None, vec![stop("F23N", Some(20), None)]),
            entity("c", "", None, vec![stop("F23N", Some(30), None)]),
        ]);
        let arrivals = MtaAdapter.arrivals_from_feed(&feed, "F23N", &[]);
        let destinations: Vec<&str> = arrivals.iter().map(|a| a.destination.as_str()).collect();
        assert_eq!(destinations, vec!["Coney Island", "F", "Unknown"]);
    }

    #[test]
    fn test_stop_headsign_used_when_trip_has_none() {
        let mut stu = stop("F23N", Some(10), None);
        stu.stop_time_properties = Some(crate::gtfs_rt::trip_update::stop_time_update::StopTimeProperties {
            stop_headsign: Some("Jamaica".to_string()),
            ..Default::default()
        });
        let feed = feed(vec![entity("a", "F", None, vec![stu])]);
        let arrivals = MtaAdapter.arrivals_from_feed(&feed, "F23N", &[]);
        assert_eq!(arrivals[0].destination, "Jamaica");
    }

    #[test]
    fn test_invalid_bytes_are_an_error() {
        assert!(MtaAdapter.decode(&[0xFF, 0xFE, 0x00, 0x01], "F23N", &[]).is_err());
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact(" hob-33 "), "HOB33");
        assert_eq!(compact("World Trade_Center"), "WORLDTRADECENTER");
    }

    #[test]
    fn test_adapter_for() {
        assert_eq!(adapter_for(Agency::Mta).agency(), Agency::Mta);
        assert_eq!(adapter_for(Agency::Path).agency(), Agency::Path);
    }
}
