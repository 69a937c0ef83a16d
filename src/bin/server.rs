//! linekv Server Binary
//!
//! Starts the TCP server for linekv.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use linekv::{Config, Server, Storage, WireFormat};
use tracing_subscriber::{fmt, EnvFilter};

/// linekv Server
#[derive(Parser, Debug)]
#[command(name = "linekv-server")]
#[command(about = "Networked key-value store with text and binary protocols")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    listen: String,

    /// Wire protocol spoken by clients
    #[arg(short, long, value_enum, default_value_t = Wire::Text)]
    wire: Wire,

    /// Login required from clients (enables authentication)
    #[arg(long, requires = "password")]
    login: Option<String>,

    /// Password required from clients
    #[arg(long, requires = "login")]
    password: Option<String>,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Capacity of the dispatcher queue
    #[arg(short, long, default_value = "1024")]
    queue_capacity: usize,

    /// Largest accepted request frame in bytes
    #[arg(long, default_value = "16777216")]
    max_frame_size: usize,

    /// Deadline for the authentication handshake (milliseconds)
    #[arg(long, default_value = "5000")]
    auth_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Wire {
    Text,
    Binary,
}

impl From<Wire> for WireFormat {
    fn from(wire: Wire) -> Self {
        match wire {
            Wire::Text => WireFormat::Text,
            Wire::Binary => WireFormat::Binary,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,linekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("linekv Server v{}", linekv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .wire_format(args.wire.into())
        .max_connections(args.max_connections)
        .queue_capacity(args.queue_capacity)
        .max_frame_size(args.max_frame_size)
        .auth_timeout_ms(args.auth_timeout_ms);
    if let (Some(login), Some(password)) = (args.login, args.password) {
        builder = builder.credentials(login, password);
    }
    let config = builder.build();

    // Set up Ctrl+C handler
    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded::<()>(1);
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        let _ = shutdown_tx.try_send(());
    }) {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::process::exit(1);
    }

    // Start server
    let server = Server::new(config, Arc::new(Storage::new()));
    if let Err(e) = server.run_until(&shutdown_rx) {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
