//! ProbeKV - A Small In-Memory Data-Store Server
//!
//! This is the main entry point for the ProbeKV server.
//! It sets up logging, the storage engine and the TCP listener, and spawns
//! one task per incoming connection.

use clap::Parser;
use probekv::commands::CommandHandler;
use probekv::connection::{handle_connection, ConnectionStats};
use probekv::protocol::ReplyFormat;
use probekv::storage::{StorageEngine, DEFAULT_CAPACITY};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn parse_capacity(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("capacity must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Server configuration
#[derive(Parser, Debug)]
#[command(name = "probekv", version, about = "In-memory hash table, set, queue and stack server")]
struct Config {
    /// Interface to listen on
    #[arg(short = 'H', long, default_value = probekv::DEFAULT_HOST)]
    host: String,

    /// TCP port
    #[arg(short, long, default_value_t = probekv::DEFAULT_PORT)]
    port: u16,

    /// Slot count of the hash table and of the hash set
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY, value_parser = parse_capacity)]
    capacity: usize,

    /// Response encoding sent to clients
    #[arg(long, value_enum, default_value_t = ReplyFormat::Tagged)]
    reply_format: ReplyFormat,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Config {
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(version = probekv::VERSION, "ProbeKV starting");

    let capacity = config.capacity;
    let storage = Arc::new(StorageEngine::with_capacity(capacity));
    info!(capacity, "Storage engine initialized");

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(
        address = %config.bind_address(),
        reply_format = ?config.reply_format,
        "Listening"
    );

    // Ctrl+C stops accepting; in-flight sessions are dropped with the runtime
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), Arc::clone(&stats), config.reply_format) => {}
        _ = shutdown => {}
    }

    let summary = storage.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        table_keys = summary.table_len,
        set_elements = summary.set_len,
        queued = summary.queue_len,
        stacked = summary.stack_len,
        "Server shutdown complete"
    );
    Ok(())
}

/// Accepts clients forever, one session task each.
///
/// A failed `accept` is logged and skipped.
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    reply_format: ReplyFormat,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                continue;
            }
        };

        let dispatcher = CommandHandler::new(Arc::clone(&storage));
        tokio::spawn(handle_connection(
            stream,
            peer,
            dispatcher,
            reply_format,
            Arc::clone(&stats),
        ));
    }
}
