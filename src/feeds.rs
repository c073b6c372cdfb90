//! Route → GTFS-RT feed selection.
//!
//! MTA publishes one feed per group of subway lines, so a feed row's route is
//! a group identifier (e.g. `ACE`) standing for a fixed set of lines. PATH rows
//! name individual routes.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::model::Agency;

/// MTA feed groups and the lines each one carries.
static MTA_ROUTE_GROUPS: &[(&str, &[&str])] = &[
    ("ACE", &["A", "C", "E", "SR"]),
    ("BDFM", &["B", "D", "F", "M", "SF"]),
    ("G", &["G"]),
    ("JZ", &["J", "Z"]),
    ("NQRW", &["N", "Q", "R", "W"]),
    ("L", &["L"]),
    ("1234567S", &["1", "2", "3", "4", "5", "6", "7", "S", "7X"]),
    ("SIR", &["SI", "SIR"]),
];

/// Lines carried by an MTA feed group, if `group` is a known group id.
pub fn mta_group_members(group: &str) -> Option<&'static [&'static str]> {
    MTA_ROUTE_GROUPS
        .iter()
        .find(|(id, _)| *id == group)
        .map(|(_, members)| *members)
}

fn matches_mta_group(route: &str, group: &str) -> bool {
    route == group || mta_group_members(group).is_some_and(|members| members.contains(&route))
}

/// One row of the static feed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
    pub agency: Agency,
    /// Route (PATH) or route-group identifier (MTA), uppercase.
    pub route: String,
    pub feed_url: String,
}

impl FeedRow {
    pub fn new(agency: Agency, route: &str, feed_url: &str) -> Self {
        Self {
            agency,
            route: route.trim().to_uppercase(),
            feed_url: feed_url.trim().to_string(),
        }
    }

    fn serves(&self, route: &str) -> bool {
        match self.agency {
            Agency::Mta => matches_mta_group(route, &self.route),
            Agency::Path => route == self.route,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvFeedRow {
    #[serde(default)]
    feed_type: String,
    #[serde(default)]
    route: String,
    #[serde(default)]
    feed_url: String,
}

/// Static feed table, in source order.
#[derive(Debug, Clone, Default)]
pub struct FeedTable {
    rows: Vec<FeedRow>,
}

impl FeedTable {
    pub fn new(rows: Vec<FeedRow>) -> Self {
        Self { rows }
    }

    /// Loads a `feed_type,route,feed_url` CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open feed table {}", path.display()))?;
        Self::from_csv_reader(file).with_context(|| format!("invalid feed table {}", path.display()))
    }

    /// Reads feed rows from CSV. Rows with an unknown agency or missing
    /// route/URL are skipped.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.deserialize::<CsvFeedRow>() {
            let record = record?;
            let Ok(agency) = record.feed_type.parse::<Agency>() else {
                warn!(feed_type = %record.feed_type, "Skipping feed row with unknown agency");
                continue;
            };
            if record.route.is_empty() || record.feed_url.is_empty() {
                warn!(%agency, route = %record.route, "Skipping incomplete feed row");
                continue;
            }
            rows.push(FeedRow::new(agency, &record.route, &record.feed_url));
        }

        debug!(rows = rows.len(), "Feed table loaded");
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[FeedRow] {
        &self.rows
    }

    /// Returns the first feed serving any of `routes`, or `None` when nothing
    /// matches (a soft outcome, not an error).
    pub fn select_feed<S: AsRef<str>>(&self, agency: Agency, routes: &[S]) -> Option<&str> {
        let routes = normalized(routes);
        if routes.is_empty() {
            return None;
        }

        self.rows
            .iter()
            .filter(|row| row.agency == agency)
            .find(|row| routes.iter().any(|route| row.serves(route)))
            .map(|row| row.feed_url.as_str())
    }

    /// Distinct feeds needed to serve each route on its own, in first-seen order.
    pub fn feeds_for_routes<S: AsRef<str>>(&self, agency: Agency, routes: &[S]) -> Vec<&str> {
        let mut seen = HashSet::new();
        normalized(routes)
            .iter()
            .filter_map(|route| self.select_feed(agency, std::slice::from_ref(route)))
            .filter(|url| seen.insert(*url))
            .collect()
    }
}

fn normalized<S: AsRef<str>>(routes: &[S]) -> Vec<String> {
    routes
        .iter()
        .map(|r| r.as_ref().trim().to_uppercase())
        .filter(|r| !r.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACE_FEED: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-ace";
    const MAIN_FEED: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs";
    const NQRW_FEED: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-nqrw";
    const PATH_FEED: &str = "https://path.transitdata.nyc/gtfsrt";

    fn table() -> FeedTable {
        let csv = format!(
            "feed_type,route,feed_url\n\
             MTA,ACE,{ACE_FEED}\n\
             MTA,NQRW,{NQRW_FEED}\n\
             MTA,1234567S,{MAIN_FEED}\n\
             PATH,JSQ-33,{PATH_FEED}\n\
             PATH,NWK-WTC,{PATH_FEED}\n\
             LIRR,BABYLON,https://example.invalid/lirr\n\
             PATH,,{PATH_FEED}\n"
        );
        FeedTable::from_csv_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_loader_skips_unknown_agency_and_incomplete_rows() {
        assert_eq!(table().rows().len(), 5);
    }

    #[test]
    fn test_grouped_routes_share_one_feed() {
        let table = table();
        assert_eq!(table.select_feed(Agency::Mta, &["A"]), Some(ACE_FEED));
        assert_eq!(table.select_feed(Agency::Mta, &["C"]), Some(ACE_FEED));
        assert_eq!(table.select_feed(Agency::Mta, &["E"]), Some(ACE_FEED));
        assert_eq!(table.select_feed(Agency::Mta, &["SR"]), Some(ACE_FEED));
        assert_eq!(table.select_feed(Agency::Mta, &["ace"]), Some(ACE_FEED));
    }

    #[test]
    fn test_main_and_nqrw_feeds() {
        let table = table();
        assert_eq!(table.select_feed(Agency::Mta, &["1", "7"]), Some(MAIN_FEED));
        assert_eq!(table.select_feed(Agency::Mta, &[" q "]), Some(NQRW_FEED));
    }

    #[test]
    fn test_path_matches_route_directly() {
        let table = table();
        assert_eq!(table.select_feed(Agency::Path, &["JSQ-33"]), Some(PATH_FEED));
        assert_eq!(table.select_feed(Agency::Path, &["nwk-wtc"]), Some(PATH_FEED));
        // no grouping for PATH
        assert_eq!(table.select_feed(Agency::Path, &["JSQ"]), None);
        // MTA routes never select a PATH feed
        assert_eq!(table.select_feed(Agency::Path, &["A"]), None);
    }

    #[test]
    fn test_empty_or_unmatched_routes_select_nothing() {
        let table = table();
        let empty: [&str; 0] = [];
        assert_eq!(table.select_feed(Agency::Mta, &empty), None);
        assert_eq!(table.select_feed(Agency::Path, &empty), None);
        assert_eq!(table.select_feed(Agency::Mta, &["", "  "]), None);
        assert_eq!(table.select_feed(Agency::Mta, &["X"]), None);
    }

    #[test]
    fn test_first_matching_row_wins() {
        let table = table();
        assert_eq!(table.select_feed(Agency::Mta, &["X", "Q", "A"]), Some(ACE_FEED));
    }

    #[test]
    fn test_feeds_for_routes_deduplicates() {
        let table = table();
        let feeds = table.feeds_for_routes(Agency::Mta, &["1", "2", "A", "C", "X"]);
        assert_eq!(feeds, vec![MAIN_FEED, ACE_FEED]);
    }

    #[test]
    fn test_group_members() {
        assert_eq!(mta_group_members("JZ"), Some(&["J", "Z"][..]));
        assert_eq!(mta_group_members("A"), None);
    }
}
