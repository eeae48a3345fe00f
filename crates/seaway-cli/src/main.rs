use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use seaway_cli::commands::build::{handle_build, BuildArgs};
use seaway_cli::commands::diagnose::{handle_diagnose, DiagnoseArgs};
use seaway_cli::commands::ports::handle_ports;
use seaway_cli::commands::route::{handle_route, AlgorithmArg, RouteCommandArgs};
use seaway_cli::commands::GraphSource;
use seaway_cli::logging::{init_logging, LoggingConfig};
use seaway_cli::output::OutputFormat;
use seaway_lib::DEFAULT_SNAP_RADIUS_KM;

#[derive(Parser, Debug)]
#[command(author, version, about = "Maritime navigation graph and sea route tools")]
struct Cli {
    /// GeoJSON land dataset the navigation graph is built from.
    #[arg(long, global = true, env = "SEAWAY_DATASET")]
    dataset: Option<PathBuf>,

    /// Graph cache file (defaults to the platform cache directory).
    #[arg(long, global = true, env = "SEAWAY_CACHE")]
    cache: Option<PathBuf>,

    /// JSON build configuration.
    #[arg(long, global = true, env = "SEAWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the navigation graph (or load it from cache) and report its size.
    Build {
        /// Rebuild even if a valid cache exists.
        #[arg(long)]
        force: bool,
    },
    /// Plan a sea route between two coordinates or ports.
    Route {
        /// Start as `lat,lon` or a port name.
        #[arg(long = "from", allow_hyphen_values = true)]
        from: String,
        /// Destination as `lat,lon` or a port name.
        #[arg(long = "to", allow_hyphen_values = true)]
        to: String,
        #[arg(long, value_enum, default_value_t = AlgorithmArg::AStar)]
        algorithm: AlgorithmArg,
        /// Avoid intermediate nodes closer than this to the coast (km, 0 disables).
        #[arg(long, default_value_t = 0.0)]
        coastal_threshold: f64,
        /// Maximum distance to snap an endpoint onto the graph (km).
        #[arg(long, default_value_t = DEFAULT_SNAP_RADIUS_KM)]
        snap_radius: f64,
        /// Give up after expanding this many nodes.
        #[arg(long)]
        max_expansions: Option<usize>,
        /// Port directory (JSON object of name to [lat, lon]).
        #[arg(long, env = "SEAWAY_PORTS")]
        ports: Option<PathBuf>,
    },
    /// Report isolated nodes and connectivity, optionally exporting them.
    Diagnose {
        #[arg(long, default_value_t = 4)]
        rows: usize,
        #[arg(long, default_value_t = 4)]
        cols: usize,
        /// Append isolated node coordinates (`lat,lon` lines) to this file.
        #[arg(long)]
        export: Option<PathBuf>,
        /// Resume checkpoint for the export.
        #[arg(long, requires = "export")]
        checkpoint: Option<PathBuf>,
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },
    /// List ports or look one up by name.
    Ports {
        #[arg(long, env = "SEAWAY_PORTS")]
        ports: PathBuf,
        /// Resolve a single port name.
        #[arg(long)]
        lookup: Option<String>,
    },
}

fn main() -> Result<()> {
    init_logging(&LoggingConfig::from_env());
    let cli = Cli::parse();

    let source = || {
        GraphSource::resolve(
            cli.dataset.as_deref(),
            cli.cache.as_deref(),
            cli.config.as_deref(),
        )
    };

    match cli.command {
        Command::Build { force } => handle_build(&source()?, &BuildArgs { force }, cli.format),
        Command::Route {
            from,
            to,
            algorithm,
            coastal_threshold,
            snap_radius,
            max_expansions,
            ports,
        } => {
            let args = RouteCommandArgs {
                from,
                to,
                algorithm,
                coastal_threshold_km: coastal_threshold,
                snap_radius_km: snap_radius,
                max_expansions,
                ports,
            };
            handle_route(&source()?.load_graph()?, &args, cli.format)
        }
        Command::Diagnose {
            rows,
            cols,
            export,
            checkpoint,
            batch_size,
        } => {
            let args = DiagnoseArgs {
                rows,
                cols,
                export,
                checkpoint,
                batch_size,
            };
            handle_diagnose(&source()?.load_graph()?, &args, cli.format)
        }
        Command::Ports { ports, lookup } => handle_ports(&ports, lookup.as_deref(), cli.format),
    }
}
