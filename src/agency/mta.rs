//! NYC subway adapter.
//!
//! NYCT stop ids already carry the platform direction (`F23N`, `137S`) and
//! route ids are the line letters, so normalization is only trimming and
//! upper-casing.

use super::AgencyAdapter;
use crate::model::Agency;

pub struct MtaAdapter;

impl AgencyAdapter for MtaAdapter {
    fn agency(&self) -> Agency {
        Agency::Mta
    }

    fn normalize_route(&self, route: &str) -> String {
        route.trim().to_uppercase()
    }

    fn normalize_stop(&self, stop: &str) -> String {
        stop.trim().to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agency::test_support::*;

    #[test]
    fn test_filters_routes_and_stops() {
        let feed = feed(vec![
            entity("f", "F", None, vec![stop("F22N", Some(5), None), stop("F23N", Some(10), None)]),
            entity("m", "M", None, vec![stop("F23N", Some(20), None)]),
            entity("g", "G", None, vec![stop("F23N", Some(30), None)]),
            entity("other-stop", "F", None, vec![stop("F24N", Some(40), None)]),
        ]);

        let allowed = vec!["f".to_string(), " M ".to_string()];
        let arrivals = MtaAdapter.arrivals_from_feed(&feed, "f23n", &allowed);

        let routes: Vec<&str> = arrivals.iter().map(|a| a.route_token.as_str()).collect();
        assert_eq!(routes, vec!["F", "M"]);
        assert_eq!(arrivals[0].arrival_time.timestamp(), 10);
    }
}
