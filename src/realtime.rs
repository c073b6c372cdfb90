//! Batched realtime arrival queries.
//!
//! [`RealtimeService::get_arrivals`] takes station queries, collapses them to
//! one fetch per distinct [`StationKey`], and reports each station's outcome
//! independently: one failing feed never affects another station's result.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, warn};

use crate::agency::adapter_for;
use crate::feeds::FeedTable;
use crate::fetch::FeedSource;
use crate::model::{Agency, Arrival, StationKey};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CONCURRENCY: usize = 8;

const UNKNOWN_PART: &str = "UNKNOWN";

/// One station to query, with the routes of interest there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalQuery {
    pub agency: Option<Agency>,
    pub station_id: String,
    pub routes: Vec<String>,
}

impl ArrivalQuery {
    pub fn new<S: Into<String>>(agency: Agency, station_id: &str, routes: impl IntoIterator<Item = S>) -> Self {
        Self {
            agency: Some(agency),
            station_id: station_id.to_string(),
            routes: routes.into_iter().map(Into::into).collect(),
        }
    }

    /// `AGENCY:STATION_ID` key of this query in [`RealtimeService::get_arrivals`] results.
    pub fn result_key(&self) -> String {
        let agency = self.agency.map_or(UNKNOWN_PART, Agency::code);
        let station = self.station_id.trim();
        let station = if station.is_empty() { UNKNOWN_PART } else { station };
        format!("{agency}:{station}")
    }
}

/// Result for one station in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ArrivalOutcome {
    /// Decoded arrivals, ascending by time. May be empty.
    Arrivals(Vec<Arrival>),
    /// The query was incomplete or no feed serves its routes.
    NoFeed,
    /// Fetching or decoding the station's feed failed.
    Error(String),
}

impl ArrivalOutcome {
    pub fn arrivals(&self) -> Option<&[Arrival]> {
        match self {
            ArrivalOutcome::Arrivals(arrivals) => Some(arrivals),
            _ => None,
        }
    }

    /// `NO_FEED` / `ERROR:<message>` for non-success outcomes.
    pub fn tag(&self) -> Option<String> {
        match self {
            ArrivalOutcome::Arrivals(_) => None,
            ArrivalOutcome::NoFeed => Some("NO_FEED".to_string()),
            ArrivalOutcome::Error(message) => Some(format!("ERROR:{message}")),
        }
    }
}

/// Selects feeds, fetches them and decodes arrivals for batches of stations.
#[derive(Clone)]
pub struct RealtimeService {
    feeds: Arc<FeedTable>,
    source: Arc<dyn FeedSource>,
    fetch_timeout: Duration,
    concurrency: usize,
}

impl RealtimeService {
    pub fn new(feeds: Arc<FeedTable>, source: Arc<dyn FeedSource>) -> Self {
        Self {
            feeds,
            source,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Returns one outcome per station, keyed `AGENCY:STATION_ID`. Never fails.
    ///
    /// Queries sharing a station are merged (routes unioned) and fetched once.
    #[tracing::instrument(skip_all, fields(queries = queries.len()))]
    pub async fn get_arrivals(&self, queries: &[ArrivalQuery]) -> HashMap<String, ArrivalOutcome> {
        let mut results = HashMap::new();
        let mut incomplete = Vec::new();

        let mut groups: Vec<(StationKey, BTreeSet<String>)> = Vec::new();
        let mut group_index: HashMap<StationKey, usize> = HashMap::new();

        for query in queries {
            let routes: Vec<String> = query
                .routes
                .iter()
                .map(|r| r.trim().to_uppercase())
                .filter(|r| !r.is_empty())
                .collect();
            let station = query.station_id.trim();

            let agency = match query.agency {
                Some(agency) if !station.is_empty() && !routes.is_empty() => agency,
                _ => {
                    incomplete.push(query.result_key());
                    continue;
                }
            };

            let key = StationKey::new(agency, station);
            let idx = *group_index.entry(key.clone()).or_insert_with(|| {
                groups.push((key, BTreeSet::new()));
                groups.len() - 1
            });
            groups[idx].1.extend(routes);
        }

        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::new();

        for (key, routes) in groups {
            let routes: Vec<String> = routes.into_iter().collect();
            let Some(feed_url) = self.feeds.select_feed(key.agency, routes.as_slice()) else {
                debug!(key = %key, ?routes, "No feed serves requested routes");
                results.insert(key.to_string(), ArrivalOutcome::NoFeed);
                continue;
            };

            let span = tracing::info_span!("station_arrivals", key = %key, feed_url = %feed_url);
            let job = StationJob {
                key: key.clone(),
                routes,
                feed_url: feed_url.to_string(),
                source: self.source.clone(),
                limiter: limiter.clone(),
                fetch_timeout: self.fetch_timeout,
            };
            tasks.push((key, tokio::spawn(job.run().instrument(span))));
        }

        for (key, task) in tasks {
            let outcome = match task.await {
                Ok(Ok(arrivals)) => ArrivalOutcome::Arrivals(arrivals),
                Ok(Err(e)) => {
                    let message = format!("{e:#}");
                    warn!(key = %key, error = %message, "Realtime query failed");
                    ArrivalOutcome::Error(message)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Realtime task aborted");
                    ArrivalOutcome::Error(e.to_string())
                }
            };
            results.insert(key.to_string(), outcome);
        }

        for key in incomplete {
            results.entry(key).or_insert(ArrivalOutcome::NoFeed);
        }

        info!(stations = results.len(), "Realtime batch complete");
        results
    }
}

/// Fetch + decode work for one station, owned by a single task.
struct StationJob {
    key: StationKey,
    routes: Vec<String>,
    feed_url: String,
    source: Arc<dyn FeedSource>,
    limiter: Arc<Semaphore>,
    fetch_timeout: Duration,
}

impl StationJob {
    async fn run(self) -> Result<Vec<Arrival>> {
        let _permit = self.limiter.acquire().await?;

        let started = std::time::Instant::now();
        let raw = tokio::time::timeout(self.fetch_timeout, self.source.fetch(&self.feed_url))
            .await
            .map_err(|_| anyhow!("feed fetch timed out after {:?}", self.fetch_timeout))?
            .context("feed fetch failed")?;
        debug!(bytes = raw.len(), elapsed_ms = started.elapsed().as_millis() as u64, "Feed fetched");

        adapter_for(self.key.agency)
            .decode(&raw, &self.key.station_id, &self.routes)
            .context("feed decode failed")
    }
}
