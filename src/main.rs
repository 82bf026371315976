//! CLI entry point for the transit tracker.
//!
//! Provides subcommands for reducing a GTFS feed to the tracked routes,
//! printing per-route map data, polling live vehicle positions, and saving
//! the route selection.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use bytes::Bytes;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_tracker::{
    config::{FeedSource, TrackerConfig},
    fetch::{HttpClient, feed_client, fetch_bytes, is_http_url},
    gtfs::load_tables,
    live::{VehiclePosition, correlate, time_ago},
    output::{append_vehicles, print_json},
    parser::parse_feed,
    reduce::{read_snapshot, reduce, write_snapshot},
    route_view::build_route_views,
    schedule::Schedule,
    selection::{clear_selection, load_selection, save_selection},
};

#[derive(Parser)]
#[command(name = "transit_tracker")]
#[command(about = "Route maps and live vehicle positions from GTFS and GTFS-RT", long_about = None)]
struct Cli {
    /// JSON config with available routes and fallback colors
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Where the route selection is saved
    #[arg(long, global = true, default_value = "data/selected-routes.json")]
    selection: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce an unpacked GTFS directory to the available routes
    Reduce {
        /// Directory containing routes.txt, trips.txt, stops.txt, ...
        #[arg(short, long)]
        gtfs_dir: PathBuf,

        /// Snapshot to write (gzip-compressed if it ends in .gz)
        #[arg(short, long, default_value = "data/gtfs-processed.json")]
        output: PathBuf,

        /// Route short names to keep (defaults to the configured available routes)
        #[arg(short, long, num_args = 1..)]
        routes: Vec<String>,
    },
    /// Print path, stops and color for the selected routes
    Routes {
        #[arg(short, long, default_value = "data/gtfs-processed.json")]
        snapshot: PathBuf,

        /// Route short names (defaults to the saved selection)
        #[arg(short, long, num_args = 1..)]
        routes: Vec<String>,

        /// Only print the decluttered stop list
        #[arg(long, default_value_t = false)]
        major_only: bool,
    },
    /// Poll live vehicle positions for the selected routes
    Vehicles {
        #[arg(short, long, default_value = "data/gtfs-processed.json")]
        snapshot: PathBuf,

        /// Feed file or URL (defaults to $VEHICLE_POSITIONS_URL)
        #[arg(long, value_name = "FILE_OR_URL")]
        source: Option<String>,

        /// Route short names (defaults to the saved selection)
        #[arg(short, long, num_args = 1..)]
        routes: Vec<String>,

        /// CSV file to append vehicle rows to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds between polls
        #[arg(short, long, default_value_t = 30)]
        interval: u64,

        /// Number of polls (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        samples: usize,
    },
    /// Save the route selection used when --routes is omitted
    Select {
        #[arg(required_unless_present = "clear")]
        routes: Vec<String>,

        /// Forget the saved selection
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_tracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_tracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = TrackerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Reduce {
            gtfs_dir,
            output,
            routes,
        } => {
            let routes = if routes.is_empty() {
                config.available_routes.clone()
            } else {
                routes
            };
            let schedule = Schedule::new(load_tables(&gtfs_dir)?);
            let reduced = reduce(&schedule, &routes);
            write_snapshot(&output, &reduced)?;
        }
        Commands::Routes {
            snapshot,
            routes,
            major_only,
        } => {
            let routes = selected_routes(routes, &cli.selection, &config);
            let schedule = Schedule::new(read_snapshot(&snapshot)?);
            let mut views = build_route_views(&schedule, &routes, &config.palette());
            if major_only {
                for view in &mut views {
                    view.stops = std::mem::take(&mut view.major_stops);
                }
            }
            print_json(&views)?;
        }
        Commands::Vehicles {
            snapshot,
            source,
            routes,
            output,
            interval,
            samples,
        } => {
            let routes = selected_routes(routes, &cli.selection, &config);
            let schedule = Schedule::new(read_snapshot(&snapshot)?);
            poll_vehicles(
                &schedule,
                &routes,
                source,
                output.as_deref(),
                interval,
                samples,
            )
            .await?;
        }
        Commands::Select { routes, clear } => {
            if clear {
                clear_selection(&cli.selection)?;
                info!("Route selection cleared");
            } else {
                let unknown: Vec<_> = routes
                    .iter()
                    .filter(|r| !config.available_routes.contains(*r))
                    .collect();
                if !unknown.is_empty() {
                    warn!(?unknown, "Selected routes are not in the available set");
                }
                save_selection(&cli.selection, &routes)?;
                info!(?routes, "Route selection saved");
            }
        }
    }

    Ok(())
}

/// Explicit `--routes`, else the saved selection, else the configured defaults.
fn selected_routes(routes: Vec<String>, selection: &Path, config: &TrackerConfig) -> Vec<String> {
    if routes.is_empty() {
        load_selection(selection, &config.default_selected_routes)
    } else {
        routes
    }
}

/// Loads feed data from a local file, or fetches it with `client` when the
/// source is a URL.
#[tracing::instrument(skip(client))]
async fn fetcher(source: &str, client: Option<&dyn HttpClient>) -> Result<Bytes> {
    match client {
        Some(client) => fetch_bytes(client, source).await,
        None => Ok(std::fs::read(source)?.into()),
    }
}

/// Polls the feed, correlating each poll with the schedule independently.
///
/// A failed poll is logged and the previous snapshot stays current until the
/// next successful one.
#[tracing::instrument(skip(schedule, source, output))]
async fn poll_vehicles(
    schedule: &Schedule,
    routes: &[String],
    source: Option<String>,
    output: Option<&Path>,
    interval: u64,
    samples: usize,
) -> Result<()> {
    let env_source = FeedSource::from_env();
    let (url, api_key) = match (source, env_source) {
        (Some(source), env) => (source, env.ok().and_then(|e| e.api_key)),
        (None, Ok(env)) => (env.url, env.api_key),
        (None, Err(e)) => return Err(e),
    };

    let client = if is_http_url(&url) {
        Some(feed_client(FeedSource::API_KEY_PARAM, api_key.as_deref())?)
    } else {
        None
    };

    let route_ids = schedule.route_ids(routes);
    if route_ids.is_empty() {
        warn!("None of the selected routes are in the snapshot");
    }

    let mut current: Vec<VehiclePosition> = Vec::new();
    let mut sample_count = 0;

    loop {
        if samples > 0 && sample_count >= samples {
            break;
        }
        sample_count += 1;

        let poll = async {
            let bytes = fetcher(&url, client.as_deref()).await?;
            let feed = parse_feed(&bytes)?;
            anyhow::Ok(correlate(&feed, schedule, &route_ids))
        };

        match poll.await {
            Ok(vehicles) => {
                info!(sample = sample_count, vehicles = vehicles.len(), "Feed polled");
                current = vehicles;
                log_vehicles(schedule, &current);
                if let Some(path) = output {
                    if let Err(e) = append_vehicles(path, &current) {
                        error!(error = %e, "Failed to write vehicle rows");
                    }
                }
            }
            Err(e) => {
                error!(
                    error = %e,
                    kept = current.len(),
                    "Feed poll failed, keeping previous snapshot"
                );
            }
        }

        if samples == 0 || sample_count < samples {
            tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
        }
    }

    Ok(())
}

fn log_vehicles(schedule: &Schedule, vehicles: &[VehiclePosition]) {
    let now = Utc::now();
    for v in vehicles {
        let route = v
            .route_id
            .as_deref()
            .and_then(|id| schedule.route(id))
            .map(|r| r.route_short_name.as_str())
            .unwrap_or("?");
        info!(
            route,
            vehicle = v.vehicle_id.as_deref().unwrap_or("-"),
            to = v.headsign.as_deref().unwrap_or("-"),
            status = %v
                .current_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            lat = v.latitude,
            lon = v.longitude,
            updated = %v.timestamp.map(|t| time_ago(t, now)).unwrap_or_default(),
            "Vehicle"
        );
    }
}
