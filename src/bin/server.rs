//! RelayKV Server Binary
//!
//! Starts the TCP server for RelayKV.

use std::sync::Arc;

use clap::Parser;
use relaykv::network::Server;
use relaykv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// RelayKV Server
#[derive(Parser, Debug)]
#[command(name = "relaykv-server")]
#[command(about = "RESP-compatible key-value server with pub/sub")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Largest bulk string / array a client may send, in bytes
    #[arg(long, default_value = "536870912")]
    max_bulk_len: usize,

    /// Deepest array nesting a request may use
    #[arg(long, default_value = "32")]
    max_depth: usize,

    /// Drop a client whose socket stays unwritable this long (0 = never)
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,

    /// Leave Nagle's algorithm enabled on client sockets
    #[arg(long)]
    no_nodelay: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,relaykv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("RelayKV Server v{}", relaykv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_bulk_len(args.max_bulk_len)
        .max_depth(args.max_depth)
        .write_timeout_ms(args.write_timeout_ms)
        .tcp_nodelay(!args.no_nodelay)
        .build();

    let engine = Arc::new(Engine::new(config));

    let server = match Server::bind(engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
