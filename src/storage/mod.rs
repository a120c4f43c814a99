//! Storage Module
//!
//! This module provides the four in-memory structures served by ProbeKV
//! and the [`StorageEngine`] that owns them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │                                                             │
//! │   table.rs                          list.rs                 │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────┐ ┌────────┐   │
//! │  │  HashTable   │ │   HashSet    │ │ Queue  │ │ Stack  │   │
//! │  │ (ProbeTable) │ │ (ProbeTable) │ │ (FIFO) │ │ (LIFO) │   │
//! │  └──────────────┘ └──────────────┘ └────────┘ └────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Fixed capacity**: the table and set never resize
//! - **Linear probing** with tombstones on delete
//! - **One lock per structure**: every command is atomic
//!
//! ## Example
//!
//! ```
//! use probekv::storage::{StorageEngine, StorageError};
//!
//! let engine = StorageEngine::with_capacity(64);
//!
//! engine.sadd("visited").unwrap();
//! assert!(engine.sismember("visited"));
//! assert_eq!(engine.sadd("visited"), Err(StorageError::ElementExists));
//!
//! engine.spush("x");
//! assert_eq!(engine.spop().as_deref(), Some("x"));
//! assert_eq!(engine.spop(), None);
//! ```

pub mod engine;
pub mod list;
pub mod table;

// Re-export commonly used types
pub use engine::{StorageEngine, StorageStats};
pub use list::{Queue, Stack};
pub use table::{hash, Entry, HashSet, HashTable, ProbeTable, StorageError, DEFAULT_CAPACITY};
