//! Station/line requests → one status row per request.
//!
//! Requests are resolved to canonical stations, grouped so every station is
//! fetched once, and then each request picks its own route out of its
//! station's arrivals.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use crate::agency::path;
use crate::alias::AliasTable;
use crate::clock::{Clock, SystemClock, minutes_until};
use crate::error::ResolveError;
use crate::model::{Agency, Arrival, StationKey, StationRequest, StatusRow};
use crate::realtime::{ArrivalOutcome, ArrivalQuery, RealtimeService};
use crate::requests::RequestLine;

/// Guesses the agency a route token belongs to: PATH route names, else MTA.
pub fn infer_agency(route: &str) -> Agency {
    if path::is_path_route(route) {
        Agency::Path
    } else {
        Agency::Mta
    }
}

/// Token used to match a request against decoded arrivals for `agency`.
pub fn match_token(agency: Agency, route: &str) -> String {
    match agency {
        Agency::Path => path::normalize_route(route),
        Agency::Mta => route.trim().to_uppercase(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedRequest {
    key: StationKey,
    route_token: String,
    label: String,
}

pub struct StatusCompiler {
    aliases: Arc<AliasTable>,
    realtime: RealtimeService,
    clock: Arc<dyn Clock>,
}

impl StatusCompiler {
    pub fn new(aliases: Arc<AliasTable>, realtime: RealtimeService) -> Self {
        Self {
            aliases,
            realtime,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn realtime(&self) -> &RealtimeService {
        &self.realtime
    }

    /// Compiles requests read from a request file. An unresolvable station is
    /// reported with the line it came from.
    pub async fn compile_request_lines(&self, lines: &[RequestLine]) -> anyhow::Result<Vec<StatusRow>> {
        for line in lines {
            if let Err(err) = self.resolve(&line.request) {
                anyhow::bail!("line {}: {err}", line.line_no);
            }
        }

        let requests: Vec<StationRequest> = lines.iter().map(|line| line.request.clone()).collect();
        Ok(self.compile(&requests).await?)
    }

    fn resolve(&self, request: &StationRequest) -> Result<ResolvedRequest, ResolveError> {
        let route = request.route.trim().to_uppercase();
        let preferred = request
            .agency
            .or_else(|| (!route.is_empty()).then(|| infer_agency(&route)));

        let key = self.aliases.resolve(&request.station, preferred)?;
        let route_token = if route.is_empty() {
            route
        } else {
            match_token(key.agency, &route)
        };
        let label = self.aliases.to_human_label(
            Some(key.agency),
            Some(&key.station_id),
            Some(request.station.trim()),
        );

        Ok(ResolvedRequest {
            key,
            route_token,
            label,
        })
    }

    /// Compiles one status row per request, in request order.
    ///
    /// # Errors
    ///
    /// Fails if any request's station cannot be resolved. Feed problems never
    /// fail the call; the affected rows simply carry no data.
    #[tracing::instrument(skip_all, fields(requests = requests.len()))]
    pub async fn compile(&self, requests: &[StationRequest]) -> Result<Vec<StatusRow>, ResolveError> {
        let resolved = requests
            .iter()
            .map(|request| self.resolve(request))
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: Vec<(StationKey, BTreeSet<String>)> = Vec::new();
        let mut group_index: HashMap<StationKey, usize> = HashMap::new();
        for entry in resolved.iter().filter(|e| !e.route_token.is_empty()) {
            let idx = *group_index.entry(entry.key.clone()).or_insert_with(|| {
                groups.push((entry.key.clone(), BTreeSet::new()));
                groups.len() - 1
            });
            groups[idx].1.insert(entry.route_token.clone());
        }

        let queries: Vec<ArrivalQuery> = groups
            .into_iter()
            .map(|(key, routes)| ArrivalQuery::new(key.agency, &key.station_id, routes))
            .collect();
        debug!(stations = queries.len(), "Grouped requests by station");

        let outcomes = if queries.is_empty() {
            HashMap::new()
        } else {
            self.realtime.get_arrivals(&queries).await
        };

        let now = self.clock.now();
        let rows: Vec<StatusRow> = resolved
            .into_iter()
            .map(|entry| {
                let arrival = outcomes
                    .get(&entry.key.to_string())
                    .and_then(ArrivalOutcome::arrivals)
                    .and_then(|arrivals| find_matching_arrival(arrivals, &entry.route_token));

                match arrival {
                    Some(arrival) => StatusRow {
                        display_label: entry.label,
                        route_token: entry.route_token,
                        minutes_until_arrival: Some(minutes_until(arrival.arrival_time, now)),
                        destination: Some(arrival.destination.clone()),
                        station_key: Some(entry.key),
                        arrival_time: Some(arrival.arrival_time),
                    },
                    None => StatusRow::no_data(entry.label, entry.route_token, Some(entry.key)),
                }
            })
            .collect();

        info!(
            rows = rows.len(),
            with_data = rows.iter().filter(|r| r.minutes_until_arrival.is_some()).count(),
            "Status compiled"
        );
        Ok(rows)
    }
}

/// First arrival on `route_token`, in list order (not necessarily the soonest).
fn find_matching_arrival<'a>(arrivals: &'a [Arrival], route_token: &str) -> Option<&'a Arrival> {
    if route_token.is_empty() {
        return None;
    }
    arrivals
        .iter()
        .find(|arrival| arrival.route_token.eq_ignore_ascii_case(route_token))
}
