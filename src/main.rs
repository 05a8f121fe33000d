//! CLI entry point for the sensor reconciliation tool.
//!
//! Provides subcommands for grouping readings into devices, resolving one
//! location per client, and coalescing dashboard summary metrics.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sensor_reconcile::{
    config::MetricConfig,
    fetch::load_source,
    output::{LocationRecord, append_record, print_json, print_pretty},
    parser::{parse_clients, parse_document, parse_readings},
    reconcile::{
        ClientInfo, SensorReading, group_readings, resolve_clients, summarize, window_tail,
    },
    stats::ReadingStats,
};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "sensor_reconcile")]
#[command(about = "Reconcile sensor readings into devices and client locations", long_about = None)]
struct Cli {
    /// API key sent as a bearer token when sources are URLs
    #[arg(long, env = "SENSOR_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group readings into per-device aggregates
    Group {
        /// Path to file or URL with readings
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Only consider the last N readings (0 = all)
        #[arg(short, long, default_value_t = 0)]
        window: usize,
    },
    /// Resolve the best location for every client
    Resolve {
        /// Path to file or URL with readings
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Path to file or URL with client registry records
        #[arg(short, long)]
        clients: Option<String>,

        /// Only consider the last N readings (0 = all)
        #[arg(short, long, default_value_t = 0)]
        window: usize,

        /// CSV file to append resolved locations to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Coalesce dashboard summary metrics from aggregate-statistics sources
    Summary {
        /// Named statistics source, in NAME=FILE_OR_URL form (repeatable)
        #[arg(short, long = "source", value_name = "NAME=FILE_OR_URL")]
        sources: Vec<String>,

        /// Readings to compute the `local` fallback source from
        #[arg(short, long)]
        readings: Option<String>,

        /// JSON file overriding the built-in metric candidate table
        #[arg(short, long)]
        metrics_config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/sensor_reconcile.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("sensor_reconcile.log"));

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
    let api_key = cli.api_key.as_deref();

    match cli.command {
        Commands::Group { source, window } => {
            let readings = load_readings(&source, api_key).await?;
            let readings = windowed(&readings, window);

            let groups = group_readings(readings);
            let stats = ReadingStats::from_groups(&groups);

            print_json(&groups)?;
            print_pretty(&stats);
            info!(
                readings = stats.total_readings,
                devices = stats.active_devices,
                clients = stats.active_clients,
                located_pct = stats.located_pct(),
                malformed_timestamps = stats.malformed_timestamps,
                "Grouping summary"
            );
        }
        Commands::Resolve {
            source,
            clients,
            window,
            output,
        } => {
            resolve(&source, clients.as_deref(), window, output.as_deref(), api_key).await?;
        }
        Commands::Summary {
            sources,
            readings,
            metrics_config,
        } => {
            summary(&sources, readings.as_deref(), metrics_config.as_deref(), api_key).await?;
        }
    }

    Ok(())
}

async fn load_readings(source: &str, api_key: Option<&str>) -> Result<Vec<SensorReading>> {
    let bytes = load_source(source, api_key).await?;
    let readings = parse_readings(&bytes).with_context(|| format!("Invalid readings in '{source}'"))?;
    info!(source, count = readings.len(), "Readings loaded");
    Ok(readings)
}

fn windowed(readings: &[SensorReading], window: usize) -> &[SensorReading] {
    if window == 0 {
        readings
    } else {
        window_tail(readings, window)
    }
}

/// Groups readings, resolves every client, and optionally appends the
/// results to a CSV file.
#[tracing::instrument(skip(api_key))]
async fn resolve(
    source: &str,
    clients: Option<&str>,
    window: usize,
    output: Option<&str>,
    api_key: Option<&str>,
) -> Result<()> {
    let readings = load_readings(source, api_key).await?;
    let registry: Vec<ClientInfo> = match clients {
        Some(path) => {
            let bytes = load_source(path, api_key).await?;
            parse_clients(&bytes).with_context(|| format!("Invalid client records in '{path}'"))?
        }
        None => Vec::new(),
    };

    let groups = group_readings(windowed(&readings, window));
    let resolved = resolve_clients(&registry, &groups);

    for (client_id, location) in &resolved {
        if location.has_coordinates() {
            info!(
                client_id = %client_id,
                source = %location.source,
                latitude = location.latitude,
                longitude = location.longitude,
                device_id = location.device_id.as_deref(),
                "Client located"
            );
        } else {
            warn!(client_id = %client_id, "No location for client");
        }

        if let Some(path) = output {
            append_record(path, &LocationRecord::new(client_id, location))?;
        }
    }

    print_json(&resolved)?;
    info!(clients = resolved.len(), "Resolution complete");
    Ok(())
}

/// Loads every named source, adds the `local` fallback when readings are
/// given, and logs the coalesced metrics.
#[tracing::instrument(skip(api_key))]
async fn summary(
    sources: &[String],
    readings: Option<&str>,
    metrics_config: Option<&str>,
    api_key: Option<&str>,
) -> Result<()> {
    let config = match metrics_config {
        Some(path) => MetricConfig::load(path)?,
        None => MetricConfig::default(),
    };

    let mut documents = BTreeMap::new();
    for entry in sources {
        let Some((name, location)) = entry.split_once('=') else {
            bail!("source '{entry}' must be in NAME=FILE_OR_URL form");
        };
        let bytes = load_source(location, api_key).await?;
        let document =
            parse_document(&bytes).with_context(|| format!("Invalid JSON in source '{name}'"))?;
        documents.insert(name.to_string(), document);
    }

    if let Some(path) = readings {
        let readings = load_readings(path, api_key).await?;
        let groups = group_readings(&readings);
        documents.insert("local".to_string(), ReadingStats::from_groups(&groups).to_source());
    }

    let summary = summarize(&documents, &config);
    for (metric, value) in &summary.metrics {
        info!(
            metric = %metric,
            value = %summary.display_or(metric, "-"),
            source = value.source.as_deref(),
            "Metric"
        );
    }
    print_json(&summary)?;

    Ok(())
}
