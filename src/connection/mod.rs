//! Client sessions
//!
//! The listener in `main.rs` spawns one task per accepted socket and hands
//! it to [`handle_connection`]. Sessions share nothing except the storage
//! engine behind the dispatcher and the [`ConnectionStats`] counters, so a
//! stalled or misbehaving client never holds up another one.
//!
//! ```ignore
//! use probekv::connection::{handle_connection, ConnectionStats};
//! use probekv::commands::CommandHandler;
//! use probekv::protocol::ReplyFormat;
//! use probekv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(StorageEngine::new());
//! let stats = Arc::new(ConnectionStats::new());
//!
//! let (stream, peer) = listener.accept().await?;
//! let dispatcher = CommandHandler::new(Arc::clone(&storage));
//! tokio::spawn(handle_connection(stream, peer, dispatcher, ReplyFormat::Tagged, stats));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
