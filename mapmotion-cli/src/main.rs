//! mapmotion CLI - headless tools for the mapmotion engine
//!
//! - `metrics` prints the segment table of a path
//! - `track` replays a path animation at a fixed frame rate
//! - `probe` issues one WMS GetFeatureInfo request
//! - `config` inspects the configuration file

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mapmotion::logging::init_logging;
use tracing::debug;

use commands::common::load_config;
use commands::config::ConfigCommands;
use commands::metrics::MetricsArgs;
use commands::probe::ProbeArgs;
use commands::track::TrackArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "mapmotion", version, about = "Headless replay and probing tools for mapmotion")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print segment lengths and cumulative distances of a path
    Metrics {
        /// JSON file with an array of positions or a GeoJSON LineString
        path: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Replay a marker animation and print its trajectory
    Track {
        /// JSON file with an array of positions or a GeoJSON LineString
        path: PathBuf,

        /// Animation duration in milliseconds (default from config)
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Frames per second of the replay
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=1000))]
        fps: u32,

        /// Number of laps to replay; more than one loops the animation
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        laps: u64,

        /// Draw the trailing path
        #[arg(long)]
        trail: bool,

        /// Rotate the marker to the segment heading
        #[arg(long)]
        rotate: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Query a WMS layer for the features at a point
    Probe {
        /// WMS endpoint URL
        url: String,

        /// Layer name(s) for LAYERS and QUERY_LAYERS
        #[arg(long)]
        layers: String,

        /// X coordinate in the view projection
        #[arg(long, allow_hyphen_values = true)]
        x: f64,

        /// Y coordinate in the view projection
        #[arg(long, allow_hyphen_values = true)]
        y: f64,

        /// Map units per pixel
        #[arg(long, default_value_t = 1.0)]
        resolution: f64,

        /// View projection code
        #[arg(long, default_value = "EPSG:3857")]
        projection: String,

        /// GeoServer CQL filter
        #[arg(long)]
        cql_filter: Option<String>,

        /// Maximum number of features returned (default from config)
        #[arg(long)]
        feature_count: Option<u32>,

        /// Print the request URL before querying
        #[arg(long)]
        print_url: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    let _guard = init_logging(&logging)?;
    debug!(config = ?cli.config, "Starting mapmotion CLI");

    match cli.command {
        Commands::Metrics { path, json } => commands::metrics::run(MetricsArgs { path, json }),
        Commands::Track {
            path,
            duration_ms,
            fps,
            laps,
            trail,
            rotate,
            json,
        } => commands::track::run(
            TrackArgs {
                path,
                duration_ms,
                fps,
                laps,
                trail,
                rotate,
                json,
            },
            &config,
        ),
        Commands::Probe {
            url,
            layers,
            x,
            y,
            resolution,
            projection,
            cql_filter,
            feature_count,
            print_url,
        } => commands::probe::run(
            ProbeArgs {
                url,
                layers,
                x,
                y,
                resolution,
                projection,
                cql_filter,
                feature_count,
                print_url,
            },
            &config,
        ),
        Commands::Config { command } => {
            commands::config::run(command, &config, cli.config.as_deref())
        }
    }
}
