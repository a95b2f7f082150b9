//! emberkv Server Binary
//!
//! Starts the TCP server for emberkv.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use emberkv::network::Server;
use emberkv::{Config, Engine};

/// emberkv server
#[derive(Parser, Debug)]
#[command(name = "emberkv-server")]
#[command(about = "Embeddable log-structured key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./emberkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:4690")]
    listen: String,

    /// Writes between compaction triggers
    #[arg(short = 't', long, default_value = "5")]
    compaction_threshold: usize,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Export a plain-text snapshot after each compaction
    #[arg(long)]
    snapshot: bool,

    /// Skip fsync after every append (faster, less durable)
    #[arg(long)]
    no_sync: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("emberkv server v{}", emberkv::VERSION);
    tracing::info!("data directory: {}", args.data_dir);
    tracing::info!("listen address: {}", args.listen);

    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .compaction_threshold(args.compaction_threshold)
        .max_connections(args.max_connections)
        .sync_on_append(!args.no_sync);
    if args.snapshot {
        builder = builder.snapshot_filename("snapshot.csv");
    }
    let config = builder.build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("engine initialized ({} live keys)", engine.key_count());

    let server = match Server::bind(config, engine) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("failed to bind listener: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("server stopped");
}
