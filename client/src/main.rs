use clap::Parser;
use client::network::Client;
use log::info;
use shared::{GridMap, DEFAULT_GRID_SIZE};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:6666")]
    server: String,

    /// Account to log in with
    #[arg(short = 'u', long, default_value = "admin01")]
    username: String,

    /// Password for the account
    #[arg(short = 'p', long, default_value = "123456")]
    password: String,

    /// Walk file the server runs with, so mirrored players route around walls
    #[arg(short = 'm', long)]
    map: Option<PathBuf>,

    /// Map width in pixels, used with --map
    #[arg(long, default_value = "1280")]
    map_width: u32,

    /// Map height in pixels, used with --map
    #[arg(long, default_value = "960")]
    map_height: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Commands: /move <x> <y>, /quit, an empty line shows positions, anything else is chat");

    let grid = match &args.map {
        Some(path) => {
            let (width, height) = GridMap::cells_for_pixels(args.map_width, args.map_height);
            info!("Loading {}x{} walk map from {}", width, height, path.display());
            GridMap::load(path, width, height)?
        }
        None => GridMap::open(DEFAULT_GRID_SIZE.0, DEFAULT_GRID_SIZE.1),
    };

    let mut client = Client::new(&args.server, &args.username, &args.password, grid).await?;

    client.run().await?;

    Ok(())
}
