//! Runtime settings and static table loading.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info};

use crate::alias::AliasTable;
use crate::feeds::FeedTable;
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, FeedSource, HttpFeedSource};
use crate::realtime::{DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT, RealtimeService};

pub const ALIASES_PATH_VAR: &str = "TRANSIT_ALIASES_PATH";
pub const FEEDS_PATH_VAR: &str = "TRANSIT_FEEDS_PATH";
pub const FETCH_TIMEOUT_VAR: &str = "TRANSIT_FETCH_TIMEOUT_SECS";
pub const FETCH_CONCURRENCY_VAR: &str = "TRANSIT_FETCH_CONCURRENCY";
pub const MTA_API_KEY_VAR: &str = "MTA_API_KEY";

/// Host of the MTA realtime endpoints; the API key is only sent here.
pub const MTA_API_HOST: &str = "api-endpoint.mta.info";

const BUILTIN_ALIASES: &str = include_str!("../config/aliases.json");
const BUILTIN_FEEDS: &str = include_str!("../config/feeds.csv");

#[derive(Debug, Clone)]
pub struct Settings {
    pub aliases_path: Option<PathBuf>,
    pub feeds_path: Option<PathBuf>,
    pub fetch_timeout: Duration,
    pub concurrency: usize,
    pub mta_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            aliases_path: None,
            feeds_path: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            mta_api_key: None,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment. Call `dotenvy::dotenv()` first
    /// to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`. Unset or blank variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut settings = Self {
            aliases_path: get(ALIASES_PATH_VAR).map(PathBuf::from),
            feeds_path: get(FEEDS_PATH_VAR).map(PathBuf::from),
            mta_api_key: get(MTA_API_KEY_VAR),
            ..Self::default()
        };

        if let Some(raw) = get(FETCH_TIMEOUT_VAR) {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("{FETCH_TIMEOUT_VAR} must be a whole number of seconds, got {raw:?}"))?;
            settings.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = get(FETCH_CONCURRENCY_VAR) {
            let concurrency: usize = raw
                .parse()
                .with_context(|| format!("{FETCH_CONCURRENCY_VAR} must be a positive integer, got {raw:?}"))?;
            settings.concurrency = concurrency.max(1);
        }

        Ok(settings)
    }

    /// Alias and feed tables: the configured files, or the built-in copies.
    pub fn load_tables(&self) -> Result<StaticTables> {
        if self.aliases_path.is_none() && self.feeds_path.is_none() {
            return builtin_tables().cloned();
        }

        let aliases = match &self.aliases_path {
            Some(path) => Arc::new(AliasTable::load(path)?),
            None => builtin_tables()?.aliases.clone(),
        };
        let feeds = match &self.feeds_path {
            Some(path) => Arc::new(FeedTable::load(path)?),
            None => builtin_tables()?.feeds.clone(),
        };

        info!(
            aliases = aliases.len(),
            feeds = feeds.rows().len(),
            "Static tables loaded"
        );
        Ok(StaticTables { aliases, feeds })
    }

    /// HTTP feed source, with the MTA key attached for the MTA host when configured.
    pub fn feed_source(&self) -> Result<Arc<dyn FeedSource>> {
        let client = BasicClient::with_timeout(self.fetch_timeout)?;
        let source: Arc<dyn FeedSource> = match &self.mta_api_key {
            Some(key) => {
                debug!(host = MTA_API_HOST, "Using MTA API key");
                let client = ApiKey::x_api_key(client, key)
                    .context("invalid MTA API key")?
                    .for_host(MTA_API_HOST);
                Arc::new(HttpFeedSource::new(client))
            }
            None => Arc::new(HttpFeedSource::new(client)),
        };
        Ok(source)
    }

    /// Realtime service over `feeds` using this configuration's source and limits.
    pub fn realtime_service(&self, feeds: Arc<FeedTable>) -> Result<RealtimeService> {
        Ok(RealtimeService::new(feeds, self.feed_source()?)
            .with_fetch_timeout(self.fetch_timeout)
            .with_concurrency(self.concurrency))
    }
}

/// The read-only lookup tables shared by the pipeline.
#[derive(Debug, Clone)]
pub struct StaticTables {
    pub aliases: Arc<AliasTable>,
    pub feeds: Arc<FeedTable>,
}

impl StaticTables {
    /// Parses the tables compiled into the binary.
    pub fn builtin() -> Result<Self> {
        let aliases = AliasTable::from_json_str(BUILTIN_ALIASES).context("invalid built-in alias table")?;
        let feeds = FeedTable::from_csv_reader(BUILTIN_FEEDS.as_bytes()).context("invalid built-in feed table")?;
        Ok(Self {
            aliases: Arc::new(aliases),
            feeds: Arc::new(feeds),
        })
    }
}

static BUILTIN_TABLES: OnceLock<StaticTables> = OnceLock::new();

/// Built-in tables, parsed on first use and cached for the process.
///
/// Racing first callers may each parse a copy; only one is kept.
pub fn builtin_tables() -> Result<&'static StaticTables> {
    if let Some(tables) = BUILTIN_TABLES.get() {
        return Ok(tables);
    }
    let tables = StaticTables::builtin()?;
    Ok(BUILTIN_TABLES.get_or_init(|| tables))
}
