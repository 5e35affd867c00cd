//! CLI entry point for the railtime OTP tracker.
//!
//! Provides subcommands for collecting live position samples from a SIRI
//! VehicleMonitoring feed and for processing collected samples into
//! arrival events and OTP reports.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use railtime::aggregate::build_report;
use railtime::config::{DetectorConfig, agency_timezone};
use railtime::error::EngineError;
use railtime::fetch::{BasicClient, UrlParamKey, fetch_bytes};
use railtime::gtfs::Schedule;
use railtime::output::{write_arrivals_csv, write_no_data_json, write_report_json};
use railtime::samples::{append_samples, load_samples, sample_file_path};
use railtime::siri::parse_vehicle_monitoring;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_FEED_URL: &str = "https://api.511.org/transit/VehicleMonitoring";

#[derive(Parser)]
#[command(name = "railtime")]
#[command(about = "Track commuter-rail on-time performance from vehicle positions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the live position feed and append samples to the local store
    Collect {
        /// Feed base URL (the API key is appended from the API_KEY env var)
        #[arg(long, default_value = DEFAULT_FEED_URL)]
        url: String,

        /// Agency code to request (e.g. "CT" for Caltrain)
        #[arg(short, long, default_value = "CT")]
        agency: String,

        /// Directory of date-partitioned sample CSVs
        #[arg(short, long, default_value = "samples")]
        output_dir: String,

        /// Poll the feed every X seconds
        #[arg(short = 'r', long, default_value_t = 60)]
        sample_rate: u64,

        /// Number of polls to perform (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        num_samples: usize,
    },
    /// Detect arrivals, compute delays, and write the OTP report
    Process {
        /// Directory of date-partitioned sample CSVs
        #[arg(short, long, default_value = "samples")]
        samples_dir: String,

        /// Directory containing GTFS stops.txt and stop_times.txt
        #[arg(short, long, default_value = "gtfs_data")]
        gtfs_dir: String,

        /// Directory for arrivals.csv and summary.json
        #[arg(short, long, default_value = "static/data")]
        output_dir: String,

        /// Maximum plausible closest-approach distance in meters
        #[arg(long)]
        max_radius_m: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/railtime.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("railtime.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Collect {
            url,
            agency,
            output_dir,
            sample_rate,
            num_samples,
        } => {
            collect(&url, &agency, &output_dir, sample_rate, num_samples).await?;
        }
        Commands::Process {
            samples_dir,
            gtfs_dir,
            output_dir,
            max_radius_m,
        } => {
            process(&samples_dir, &gtfs_dir, &output_dir, max_radius_m)?;
        }
    }

    Ok(())
}

/// Polls the feed at a fixed interval, appending each round's samples to
/// the date-partitioned store.
#[tracing::instrument(skip(url), fields(agency, output_dir, sample_rate, num_samples))]
async fn collect(
    url: &str,
    agency: &str,
    output_dir: &str,
    sample_rate: u64,
    num_samples: usize,
) -> Result<()> {
    let api_key = std::env::var("API_KEY").context("API_KEY must be set")?;
    let client = UrlParamKey::api_key(BasicClient::new(), api_key);
    let tz = agency_timezone();

    let mut feed_url = reqwest::Url::parse(url)?;
    feed_url.query_pairs_mut().append_pair("agency", agency);
    let feed_url = feed_url.to_string();

    if num_samples == 0 {
        info!(sample_rate, "Sampling infinitely. Press Ctrl+C to stop.");
    } else {
        info!(num_samples, sample_rate, "Starting sample collection");
    }

    std::fs::create_dir_all(output_dir)?;

    // The store's uniqueness key; a vehicle that has not moved between
    // polls reports the same RecordedAtTime and must not be stored twice.
    let mut seen: BTreeSet<(String, String, chrono::NaiveDateTime)> = BTreeSet::new();
    let mut round = 0;

    loop {
        if num_samples > 0 && round >= num_samples {
            break;
        }
        round += 1;

        info!(
            round,
            total = if num_samples == 0 {
                None
            } else {
                Some(num_samples)
            },
            "Polling feed"
        );

        match fetch_bytes(&client, &feed_url).await {
            Ok(bytes) => match parse_vehicle_monitoring(&bytes, tz) {
                Ok(samples) => {
                    let fresh: Vec<_> = samples
                        .into_iter()
                        .filter(|s| {
                            seen.insert((s.trip_id.clone(), s.stop_id.clone(), s.observed_at))
                        })
                        .collect();

                    let today = Utc::now().with_timezone(&tz).date_naive();
                    let path = sample_file_path(output_dir, today);
                    if let Err(e) = append_samples(&path, &fresh) {
                        error!(error = %e, "Failed to append samples");
                    } else {
                        info!(appended = fresh.len(), "Samples stored");
                    }
                }
                Err(e) => error!(error = %e, "Feed parse failed"),
            },
            Err(e) => error!(error = %e, "Feed fetch failed"),
        }

        if num_samples == 0 || round < num_samples {
            tokio::time::sleep(tokio::time::Duration::from_secs(sample_rate)).await;
        }
    }

    info!(output_dir, "Collection finished");
    Ok(())
}

/// Runs the batch pipeline over the sample store and writes the outputs
/// the presentation layer consumes.
#[tracing::instrument(fields(samples_dir, gtfs_dir, output_dir))]
fn process(
    samples_dir: &str,
    gtfs_dir: &str,
    output_dir: &str,
    max_radius_m: Option<f64>,
) -> Result<()> {
    let schedule = Schedule::from_gtfs_dir(gtfs_dir)?;
    let samples = load_samples(samples_dir)?;
    info!(samples = samples.len(), "Samples loaded");

    let mut config = DetectorConfig::default();
    if let Some(radius) = max_radius_m {
        config.max_radius_m = radius;
    }

    let outcome = railtime::pipeline::run(&samples, &schedule, &config)?;

    let out = Path::new(output_dir);
    write_arrivals_csv(&out.join("arrivals.csv"), &outcome.events)?;

    match build_report(&outcome.events) {
        Ok(report) => {
            write_report_json(&out.join("summary.json"), &report)?;
            info!(
                on_time_fraction = report.summary.on_time_fraction,
                total = report.summary.total_count,
                "OTP report complete"
            );
        }
        Err(EngineError::EmptyDataset) => {
            warn!("No qualifying arrival events; writing no-data report");
            write_no_data_json(&out.join("summary.json"))?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
