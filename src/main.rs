//! CLI entry point for the transit status tool.
//!
//! Provides subcommands for compiling a station status file, compiling JSON
//! request batches, and inspecting per-station arrivals and feed selection.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_status::{
    compiler::{StatusCompiler, infer_agency, match_token},
    config::Settings,
    model::{Agency, StationRequest},
    output::{render_status_lines, write_status_file},
    realtime::{ArrivalOutcome, ArrivalQuery},
    requests::load_request_file,
};

#[derive(Parser)]
#[command(name = "transit_status")]
#[command(about = "Resolve station aliases to realtime arrival status lines", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Overrides {
    /// Alias table JSON (defaults to the built-in table)
    #[arg(long, global = true, value_name = "FILE")]
    aliases: Option<PathBuf>,

    /// Feed table CSV (defaults to the built-in table)
    #[arg(long, global = true, value_name = "FILE")]
    feeds: Option<PathBuf>,

    /// Per-feed fetch timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a request file into a status file
    Status {
        /// Request file with one `alias, line` per line
        #[arg(short, long)]
        input: PathBuf,

        /// Status file to write
        #[arg(short, long, default_value = "status.txt")]
        output: PathBuf,

        /// Omit the `# generated at` header
        #[arg(long, default_value_t = false)]
        no_timestamp: bool,
    },
    /// Compile a JSON array of station requests
    Compile {
        /// JSON file, e.g. `[{"station": "grove", "line": "JSQ-33"}]`
        #[arg(short, long)]
        requests: PathBuf,

        /// Print rows as JSON instead of status lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the decoded arrivals for one station
    Arrivals {
        /// Station alias or `AGENCY:ID`
        #[arg(short, long)]
        station: String,

        /// Lines to include (repeatable)
        #[arg(short, long = "line", required = true)]
        lines: Vec<String>,

        /// Agency preference (MTA or PATH); inferred from the first line otherwise
        #[arg(short, long)]
        agency: Option<String>,
    },
    /// Show which feeds serve the given routes
    Feeds {
        /// Agency (MTA or PATH)
        #[arg(short, long)]
        agency: String,

        /// Routes to look up (repeatable)
        #[arg(short, long = "route", required = true)]
        routes: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_status.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_status.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info")?);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug")?);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = apply_overrides(Settings::from_env()?, &cli.overrides);

    match cli.command {
        Commands::Status {
            input,
            output,
            no_timestamp,
        } => {
            let requests = load_request_file(&input)?;
            info!(input = %input.display(), requests = requests.len(), "Requests loaded");

            let compiler = build_compiler(&settings)?;
            let rows = compiler.compile_request_lines(&requests).await?;

            let generated_at = Utc::now();
            for line in render_status_lines(&rows, !no_timestamp, Some(generated_at)) {
                println!("{line}");
            }
            write_status_file(&output, &rows, !no_timestamp, Some(generated_at))?;
        }
        Commands::Compile { requests, json } => {
            let content = std::fs::read_to_string(&requests)
                .with_context(|| format!("failed to read {}", requests.display()))?;
            let requests: Vec<StationRequest> = serde_json::from_str(&content)
                .with_context(|| format!("invalid request JSON in {}", requests.display()))?;

            let compiler = build_compiler(&settings)?;
            let rows = compiler.compile(&requests).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for line in render_status_lines(&rows, false, None) {
                    println!("{line}");
                }
            }
        }
        Commands::Arrivals {
            station,
            lines,
            agency,
        } => {
            let preferred = match agency {
                Some(raw) => Some(raw.parse::<Agency>()?),
                None => lines.first().map(|line| infer_agency(line)),
            };

            let compiler = build_compiler(&settings)?;
            let key = compiler.aliases().resolve(&station, preferred)?;
            let routes: Vec<String> = lines
                .iter()
                .map(|line| match_token(key.agency, line))
                .collect();
            debug!(station = %key, ?routes, "Querying station");

            let query = ArrivalQuery::new(key.agency, &key.station_id, routes);
            let outcomes = compiler.realtime().get_arrivals(std::slice::from_ref(&query)).await;

            match outcomes.get(&query.result_key()) {
                Some(ArrivalOutcome::Arrivals(arrivals)) if arrivals.is_empty() => {
                    println!("{key}: no upcoming arrivals");
                }
                Some(ArrivalOutcome::Arrivals(arrivals)) => {
                    for arrival in arrivals {
                        println!(
                            "{key} {} {} to {}",
                            arrival.route_token,
                            arrival.arrival_time.to_rfc3339(),
                            arrival.destination
                        );
                    }
                }
                Some(outcome) => {
                    let tag = outcome.tag().unwrap_or_default();
                    warn!(station = %key, %tag, "No arrivals available");
                    println!("{key}: {tag}");
                }
                None => println!("{key}: NO_FEED"),
            }
        }
        Commands::Feeds { agency, routes } => {
            let agency: Agency = agency.parse()?;
            let tables = settings.load_tables()?;

            match tables.feeds.select_feed(agency, routes.as_slice()) {
                Some(url) => println!("selected: {url}"),
                None => println!("selected: none"),
            }
            for url in tables.feeds.feeds_for_routes(agency, routes.as_slice()) {
                println!("feed: {url}");
            }
        }
    }

    Ok(())
}

/// `EnvFilter` from `var`, always allowing `default_level`.
fn env_filter(var: &str, default_level: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::from_env(var).add_directive(default_level.parse()?))
}

fn apply_overrides(mut settings: Settings, overrides: &Overrides) -> Settings {
    if let Some(path) = &overrides.aliases {
        settings.aliases_path = Some(path.clone());
    }
    if let Some(path) = &overrides.feeds {
        settings.feeds_path = Some(path.clone());
    }
    if let Some(secs) = overrides.timeout_secs {
        settings.fetch_timeout = Duration::from_secs(secs);
    }
    settings
}

fn build_compiler(settings: &Settings) -> Result<StatusCompiler> {
    let tables = settings.load_tables()?;
    let realtime = settings.realtime_service(Arc::clone(&tables.feeds))?;
    Ok(StatusCompiler::new(tables.aliases, realtime))
}
