//! ChainLog Server Binary
//!
//! Opens the chain and serves it over TCP.

use std::path::PathBuf;
use std::time::Duration;

use chainlog::network::Server;
use chainlog::{Chain, Config, IndexKind};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// ChainLog Server
#[derive(Parser, Debug)]
#[command(name = "chainlog-server")]
#[command(about = "Append-only, hash-chained transaction log")]
#[command(version)]
struct Args {
    /// Block log file
    #[arg(short, long, default_value = "./chainlog_data/chain.log")]
    data_file: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Pending transactions that trigger a flush
    #[arg(short, long, default_value = "100")]
    block_size: usize,

    /// Flush timer period in milliseconds
    #[arg(short, long, default_value = "1000")]
    flush_period_ms: u64,

    /// Index variant: exact or bloom
    #[arg(short, long, default_value = "exact")]
    index: IndexKind,

    /// Disable the index; searches scan the whole log
    #[arg(long)]
    no_index: bool,

    /// Truncate a torn final record on startup instead of failing
    #[arg(long)]
    repair: bool,

    /// Default search timeout in milliseconds
    #[arg(long, default_value = "1000")]
    search_timeout_ms: u64,

    /// How long shutdown waits for the final flush, in milliseconds
    #[arg(long, default_value = "1000")]
    shutdown_grace_ms: u64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chainlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("ChainLog Server v{}", chainlog::VERSION);
    tracing::info!("Data file: {}", args.data_file.display());
    tracing::info!("Listen address: {}", args.listen);

    let config = match Config::builder()
        .data_file(&args.data_file)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .block_size(args.block_size)
        .flush_period(Duration::from_millis(args.flush_period_ms))
        .index_enabled(!args.no_index)
        .index_kind(args.index)
        .repair_torn_tail(args.repair)
        .search_timeout(Duration::from_millis(args.search_timeout_ms))
        .shutdown_grace(Duration::from_millis(args.shutdown_grace_ms))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let chain = match Chain::open(config.clone()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to open chain: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Chain opened successfully");

    let server = match Server::bind(&config, chain.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.listen_addr, e);
            let _ = chain.shutdown(config.shutdown_grace);
            std::process::exit(1);
        }
    };

    let stop = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        stop.shutdown();
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let served = server.run();

    if let Err(e) = chain.shutdown(config.shutdown_grace) {
        tracing::error!("Chain shutdown failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = served {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
