//! PATH adapter and the PATH naming tables.
//!
//! The PATH feed uses numeric GTFS route and stop ids, while people type
//! route names like `JSQ-33` or `hob33` and stations like `grove`. Both the
//! adapter and the status compiler normalize through the tables here, so
//! requested tokens and decoded arrivals always compare in the same form.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::{AgencyAdapter, compact};
use crate::model::Agency;

/// Wire-format route names with their GTFS route ids.
static PATH_ROUTES: &[(&str, &str)] = &[
    ("HOB-33", "859"),
    ("HOB-WTC", "860"),
    ("JSQ-33", "861"),
    ("NWK-WTC", "862"),
    ("JSQ-HOB", "1024"),
];

/// Compact station spellings → GTFS stop id.
static PATH_STOPS: &[(&str, &[&str])] = &[
    ("26722", &["14", "14TH", "14THST", "14THSTREET"]),
    ("26723", &["23", "23RD", "23RDST", "23RDSTREET"]),
    ("26724", &["33", "33RD", "33RDST", "33RDSTREET"]),
    ("26725", &["9", "9TH", "9THST", "9THSTREET"]),
    ("26726", &["CHR", "CHRISTOPHER", "CHRISTOPHERST", "CHRISTOPHERSTREET"]),
    ("26727", &["EXP", "EXCHANGE", "EXCHANGEPLACE", "EXCHANGEPL"]),
    ("26728", &["GRV", "GROVE", "GROVEST", "GROVESTREET"]),
    ("26729", &["HAR", "HARRISON"]),
    ("26730", &["HOB", "HOBOKEN", "HOBOKENSTATION", "HOBOKENTERMINAL"]),
    ("26731", &["JSQ", "JOURNALSQ", "JOURNALSQUARE"]),
    ("26732", &["NEW", "NEWPORT", "PAVONIA", "PAVONIANEWPORT"]),
    ("26733", &["NWK", "NEWARK", "NEWARKPENN"]),
    ("26734", &["WTC", "WORLDTRADECENTER", "WORLDTRADECENTRE"]),
];

static ROUTE_LOOKUP: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    PATH_ROUTES
        .iter()
        .flat_map(|(wire, gtfs_id)| [(compact(wire), *wire), (gtfs_id.to_string(), *wire)])
        .collect()
});

static STOP_LOOKUP: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    PATH_STOPS
        .iter()
        .flat_map(|(stop_id, names)| names.iter().map(move |name| (*name, *stop_id)))
        .collect()
});

/// Maps a PATH route token to its wire form (`jsq33`, `861` → `JSQ-33`).
/// Unknown tokens come back trimmed and upper-cased.
pub fn normalize_route(route: &str) -> String {
    match ROUTE_LOOKUP.get(&compact(route)) {
        Some(wire) => (*wire).to_string(),
        None => route.trim().to_uppercase(),
    }
}

/// Maps a PATH station spelling to its GTFS stop id (`Grove St` → `26728`).
/// Unknown values come back trimmed and upper-cased.
pub fn normalize_stop(stop: &str) -> String {
    match STOP_LOOKUP.get(compact(stop).as_str()) {
        Some(stop_id) => (*stop_id).to_string(),
        None => stop.trim().to_uppercase(),
    }
}

/// True for tokens that name a PATH route rather than a subway line.
pub fn is_path_route(token: &str) -> bool {
    ROUTE_LOOKUP.contains_key(&compact(token)) || token.contains('-')
}

pub struct PathAdapter;

impl AgencyAdapter for PathAdapter {
    fn agency(&self) -> Agency {
        Agency::Path
    }

    fn normalize_route(&self, route: &str) -> String {
        normalize_route(route)
    }

    fn normalize_stop(&self, stop: &str) -> String {
        normalize_stop(stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agency::test_support::*;

    #[test]
    fn test_route_normalization() {
        assert_eq!(normalize_route("HOB33"), "HOB-33");
        assert_eq!(normalize_route("hob 33"), "HOB-33");
        assert_eq!(normalize_route("JSQ-33"), "JSQ-33");
        assert_eq!(normalize_route("861"), "JSQ-33");
        assert_eq!(normalize_route("1024"), "JSQ-HOB");
        assert_eq!(normalize_route(" xyz "), "XYZ");
    }

    #[test]
    fn test_stop_normalization() {
        assert_eq!(normalize_stop("GROVE"), "26728");
        assert_eq!(normalize_stop("Grove St"), "26728");
        assert_eq!(normalize_stop("World Trade Center"), "26734");
        assert_eq!(normalize_stop("26728"), "26728");
    }

    #[test]
    fn test_is_path_route() {
        assert!(is_path_route("JSQ-33"));
        assert!(is_path_route("nwkwtc"));
        assert!(is_path_route("A-B"));
        assert!(!is_path_route("1"));
        assert!(!is_path_route("F"));
    }

    #[test]
    fn test_feed_ids_and_requested_tokens_compare_symmetrically() {
        // the feed reports numeric route ids; the caller asks with typed names
        let feed = feed(vec![
            entity("t1", "861", Some("33rd Street"), vec![stop("26728", Some(200), None)]),
            entity("t2", "859", Some("33rd Street"), vec![stop("26728", Some(100), None)]),
            entity("t3", "862", Some("World Trade Center"), vec![stop("26728", Some(50), None)]),
        ]);

        let allowed = vec!["JSQ33".to_string(), "hob-33".to_string()];
        let arrivals = PathAdapter.arrivals_from_feed(&feed, "GROVE", &allowed);

        let routes: Vec<&str> = arrivals.iter().map(|a| a.route_token.as_str()).collect();
        assert_eq!(routes, vec!["HOB-33", "JSQ-33"]);
        assert_eq!(arrivals[1].destination, "33rd Street");
    }
}
