use clap::Parser;
use log::info;
use server::config::{ServerConfig, DEFAULT_GRID_SIZE};
use server::network::Server;
use shared::GridMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main-method of the application.
/// Parses command-line arguments, loads the walk map, then runs the server until it stops.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "6666")]
        port: u16,
        /// Tick rate (updates per second)
        #[clap(short, long, default_value = "60")]
        tick_rate: u32,
        /// Walk file: one 0/1 value per cell, 0 meaning walkable
        #[clap(short, long)]
        map: Option<PathBuf>,
        /// Map width in pixels, used with --map
        #[clap(long, default_value = "1280")]
        map_width: u32,
        /// Map height in pixels, used with --map
        #[clap(long, default_value = "960")]
        map_height: u32,
        /// Disconnect clients silent for this many seconds (0 disables)
        #[clap(long, default_value = "0")]
        idle_timeout: u64,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args = Args::parse();

    let grid = match &args.map {
        Some(path) => {
            let (width, height) = GridMap::cells_for_pixels(args.map_width, args.map_height);
            info!("Loading {}x{} walk map from {}", width, height, path.display());
            GridMap::load(path, width, height)?
        }
        None => {
            info!(
                "No walk map given, using an open {}x{} grid",
                DEFAULT_GRID_SIZE.0, DEFAULT_GRID_SIZE.1
            );
            GridMap::open(DEFAULT_GRID_SIZE.0, DEFAULT_GRID_SIZE.1)
        }
    };

    let mut config = ServerConfig::new(format!("{}:{}", args.host, args.port));
    config.tick_rate = args.tick_rate;
    config.idle_timeout = (args.idle_timeout > 0).then(|| Duration::from_secs(args.idle_timeout));
    config.grid = grid;

    let server = Server::bind(config).await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
