//! CLI entry point for the ACS rollup tool.
//!
//! Provides subcommands for fetching tract-level survey estimates per
//! state, rolling them up to counties, cutting either level down to a
//! metro area with derived metrics, and running all of it in one go.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use acs_rollup::config::{
    DEFAULT_GEO_ID_PREFIX, DEFAULT_PREFIX, DEFAULT_YEAR, Granularity, MetroArea, RunConfig,
};
use acs_rollup::fetch::{BasicClient, UrlParam};
use acs_rollup::infra::census::CensusClient;
use acs_rollup::output::print_json;
use acs_rollup::services::data_source::DataSource;
use acs_rollup::transform::pipeline::{
    fetch_states, load_level, metro_cut, rollup_counties, run, stitch_states,
};
use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "acs_rollup")]
#[command(about = "Roll ACS tract estimates up to counties and metro areas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Directory all files are read from and written to
    #[arg(short = 'd', long, default_value = "data")]
    output_dir: PathBuf,

    /// Prefix for every exported file name
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Gzip compress exported CSV files
    #[arg(long, default_value_t = false)]
    gzip: bool,
}

#[derive(Args)]
struct FetchArgs {
    /// State FIPS codes to fetch (comma separated)
    #[arg(short, long, value_delimiter = ',', default_values = ["17", "29"])]
    states: Vec<String>,

    /// ACS 5-year survey vintage
    #[arg(short, long, default_value_t = DEFAULT_YEAR)]
    year: u16,

    /// Keep the per-state files after stitching them together
    #[arg(long, default_value_t = false)]
    keep_state_files: bool,
}

#[derive(Args)]
struct MetroArgs {
    /// Built-in metro area (stl-core or stl-msa)
    #[arg(short, long, default_value = "stl-core")]
    metro: String,

    /// JSON metro area definition; overrides --metro
    #[arg(long)]
    metro_file: Option<String>,

    /// GeoJSON tract boundaries to join onto the tract-level export
    #[arg(long)]
    geometry: Option<PathBuf>,

    /// Prefix added to each boundary GEOID to match ACS_GEO_ID
    #[arg(long, default_value = DEFAULT_GEO_ID_PREFIX)]
    geo_id_prefix: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Tracts,
    Counties,
    Both,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch tract estimates for each state and stitch them into one file
    Fetch {
        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Roll the tract-level file up to counties
    Rollup {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Cut tract and/or county files down to a metro area and derive metrics
    Metro {
        /// Which level(s) to process
        #[arg(short, long, value_enum, default_value_t = Level::Both)]
        level: Level,

        #[command(flatten)]
        metro: MetroArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Fetch, roll up and cut to the metro area in one go
    Run {
        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        metro: MetroArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/acs_rollup.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("acs_rollup.log"));

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
        Commands::Fetch { fetch, output } => {
            let config = build_config(&output, Some(&fetch), None)?;
            with_census_source(&config, false).await?;
        }
        Commands::Rollup { output } => {
            let config = build_config(&output, None, None)?;
            let tracts = load_level(&config, Granularity::Tracts)?;
            let counties = rollup_counties(&tracts, &config)?;
            print_json(&counties)?;
        }
        Commands::Metro {
            level,
            metro,
            output,
        } => {
            let config = build_config(&output, None, Some(&metro))?;
            let levels: &[Granularity] = match level {
                Level::Tracts => &[Granularity::Tracts],
                Level::Counties => &[Granularity::Counties],
                Level::Both => &[Granularity::Tracts, Granularity::Counties],
            };
            for &level in levels {
                let table = load_level(&config, level)?;
                metro_cut(&table, level, &config)?;
            }
        }
        Commands::Run {
            fetch,
            metro,
            output,
        } => {
            let config = build_config(&output, Some(&fetch), Some(&metro))?;
            with_census_source(&config, true).await?;
        }
    }

    Ok(())
}

/// Folds the CLI arguments and environment into one [`RunConfig`].
fn build_config(
    output: &OutputArgs,
    fetch: Option<&FetchArgs>,
    metro: Option<&MetroArgs>,
) -> Result<RunConfig> {
    let mut config = RunConfig {
        output_dir: output.output_dir.clone(),
        prefix: output.prefix.clone(),
        gzip: output.gzip,
        api_key: std::env::var("CENSUS_API_KEY").ok().filter(|k| !k.is_empty()),
        ..Default::default()
    };

    if let Some(fetch) = fetch {
        config = config.with_states(&fetch.states)?;
        config.year = fetch.year;
        config.keep_state_files = fetch.keep_state_files;
    }

    if let Some(metro) = metro {
        config.metro = match &metro.metro_file {
            Some(path) => MetroArea::load(path)?,
            None => MetroArea::builtin(&metro.metro)?,
        };
        config.geometry = metro.geometry.clone();
        config.geo_id_prefix = metro.geo_id_prefix.clone();
    }

    info!(
        dir = %config.output_dir.display(),
        year = config.year,
        states = ?config.states,
        metro = %config.metro.slug,
        "Run configuration"
    );
    Ok(config)
}

/// Builds the census client (keyed when `CENSUS_API_KEY` is set) and runs
/// either the fetch stage or the whole pipeline against it.
async fn with_census_source(config: &RunConfig, full: bool) -> Result<()> {
    let http = BasicClient::new()?;
    match config.api_key.clone() {
        Some(key) => {
            let source = CensusClient::new(UrlParam::census_key(http, key), config.year);
            drive(&source, config, full).await
        }
        None => {
            warn!("CENSUS_API_KEY not set, requests will be rate limited");
            let source = CensusClient::new(http, config.year);
            drive(&source, config, full).await
        }
    }
}

async fn drive<S: DataSource + Sync>(source: &S, config: &RunConfig, full: bool) -> Result<()> {
    if full {
        return run(source, config).await;
    }

    let files = fetch_states(source, config).await?;
    if files.is_empty() {
        warn!("No state returned data; nothing to stitch");
        return Ok(());
    }
    let tracts = stitch_states(config, &files)?;
    print_json(&tracts)?;
    Ok(())
}
