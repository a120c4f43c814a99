//! # ProbeKV - A Small In-Memory Data-Store Server
//!
//! ProbeKV keeps four data structures in memory and serves them to remote
//! clients over a line-oriented TCP protocol: a key → value hash table, a
//! hash set, a FIFO queue and a LIFO stack. Nothing is persisted.
//!
//! ## Architecture
//!
//! ```text
//!  socket ─> connection::ConnectionHandler   (one task per client)
//!                 │  request lines
//!                 ▼
//!            commands::CommandHandler        (tokenize, dispatch)
//!                 │
//!                 ▼
//!            storage::StorageEngine
//!              ├─ Mutex<HashTable>
//!              ├─ Mutex<HashSet>
//!              ├─ Mutex<Queue>
//!              └─ Mutex<Stack>
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use probekv::commands::CommandHandler;
//! use probekv::connection::{handle_connection, ConnectionStats};
//! use probekv::protocol::ReplyFormat;
//! use probekv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind(("127.0.0.1", probekv::DEFAULT_PORT)).await.unwrap();
//!
//!     while let Ok((stream, peer)) = listener.accept().await {
//!         let dispatcher = CommandHandler::new(Arc::clone(&storage));
//!         tokio::spawn(handle_connection(stream, peer, dispatcher, ReplyFormat::Tagged, Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Commands
//!
//! - `HSET key value`, `HGET key`, `HDEL key`
//! - `QPUSH value`, `QPOP`
//! - `SPUSH value`, `SPOP`
//! - `SADD key`, `SISMEMBER key`, `SREM key`
//!
//! ## Modules
//!
//! - [`protocol`]: Line framing, escaping, and response encoding
//! - [`storage`]: The four data structures and the engine that owns them
//! - [`commands`]: Tokenizing and dispatching commands
//! - [`connection`]: Per-client sessions and server counters
//!
//! ## Notes
//!
//! ### Fixed-Capacity Open Addressing
//!
//! The hash table and hash set use a byte-sum hash with linear probing and
//! never resize. Deletes leave tombstones so later entries in a probe chain
//! stay reachable.
//!
//! ### One Lock per Structure
//!
//! Each structure sits behind its own mutex. A command touches exactly one
//! structure, so every command is atomic and no deadlock is possible.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{FrameParser, ParseError, ReplyFormat, Response};
pub use storage::{StorageEngine, StorageError};

/// The default port ProbeKV listens on
pub const DEFAULT_PORT: u16 = 6379;

/// The default host ProbeKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of ProbeKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
