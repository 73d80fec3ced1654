use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use localroute_cli::output::OutputFormat;
use localroute_lib::RouteAlgorithm;

mod commands;

#[derive(Parser, Debug)]
#[command(author, version, about = "Offline geocoding and road route planning")]
struct Cli {
    /// Gazetteer CSV file.
    #[arg(
        long,
        global = true,
        env = "LOCALROUTE_GAZETTEER_PATH",
        default_value = "gazetteer.csv"
    )]
    gazetteer: PathBuf,

    /// Road network SQLite database.
    #[arg(
        long,
        global = true,
        env = "LOCALROUTE_NETWORK_PATH",
        default_value = "network.db"
    )]
    network: PathBuf,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a route through two or more addresses, in order.
    Route {
        /// Address to visit; repeat for each waypoint.
        #[arg(long = "address", required = true, num_args = 1)]
        addresses: Vec<String>,
        /// Routing algorithm (dijkstra or a-star).
        #[arg(long)]
        algorithm: Option<RouteAlgorithm>,
        /// Reject addresses farther than this from the nearest road node.
        #[arg(long)]
        max_snap_meters: Option<f64>,
    },
    /// Show ranked gazetteer matches for a query.
    Geocode {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Plan current location -> pickup -> dropoff with a duty schedule.
    Trip {
        #[arg(long)]
        current: String,
        #[arg(long)]
        pickup: String,
        #[arg(long)]
        dropoff: String,
        /// Hours already used in the current duty cycle.
        #[arg(long, default_value_t = 0.0)]
        cycle_hours: f64,
    },
    /// Build the spatial index and store it beside the network database.
    Index {
        /// Rebuild even if an index file already exists.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let paths = commands::DataPaths {
        gazetteer: cli.gazetteer,
        network: cli.network,
    };

    match cli.command {
        Command::Route {
            addresses,
            algorithm,
            max_snap_meters,
        } => commands::route::handle_route(
            &paths,
            &commands::route::RouteArgs {
                addresses,
                algorithm,
                max_snap_meters,
            },
            cli.format,
        ),
        Command::Geocode { query, limit } => {
            commands::geocode::handle_geocode(&paths, &query, limit, cli.format)
        }
        Command::Trip {
            current,
            pickup,
            dropoff,
            cycle_hours,
        } => commands::trip::handle_trip(
            &paths,
            &commands::trip::TripArgs {
                current,
                pickup,
                dropoff,
                cycle_hours,
            },
            cli.format,
        ),
        Command::Index { force } => commands::index::handle_index(&paths, force),
    }
}

/// Logs go to stderr so command output stays machine-readable.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
