//! Shared Storage Engine
//!
//! The [`StorageEngine`] owns exactly one instance of each data structure
//! and is the only way connections reach them. It is built once at server
//! start and shared across connection tasks behind an `Arc`.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌───────────┐   │
//! │  │ HashTable │ │  HashSet  │ │   Queue   │ │   Stack   │   │
//! │  │   Mutex   │ │   Mutex   │ │   Mutex   │ │   Mutex   │   │
//! │  └───────────┘ └───────────┘ └───────────┘ └───────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each structure has its own exclusive lock covering the whole structure,
//! so every single-command mutation is atomic. A command touches one
//! structure only, which rules out lock-ordering deadlocks. Locks are held
//! for the duration of one operation and never across an `.await`.

use crate::storage::list::{Queue, Stack};
use crate::storage::table::{HashSet, HashTable, StorageError, DEFAULT_CAPACITY};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// The storage context shared by all connections.
///
/// # Example
///
/// ```
/// use probekv::storage::StorageEngine;
///
/// let engine = StorageEngine::new();
///
/// engine.hset("abc", "123").unwrap();
/// assert_eq!(engine.hget("abc").unwrap(), "123");
///
/// engine.qpush("first");
/// engine.qpush("second");
/// assert_eq!(engine.qpop().as_deref(), Some("first"));
/// ```
pub struct StorageEngine {
    table: Mutex<HashTable>,
    set: Mutex<HashSet>,
    queue: Mutex<Queue>,
    stack: Mutex<Stack>,

    /// Statistics: successful mutations across all structures
    write_count: AtomicU64,

    /// Statistics: read-only lookups
    read_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("StorageEngine")
            .field("table_len", &stats.table_len)
            .field("set_len", &stats.set_len)
            .field("queue_len", &stats.queue_len)
            .field("stack_len", &stats.stack_len)
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an engine whose table and set have the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an engine whose table and set each have `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: Mutex::new(HashTable::new(capacity)),
            set: Mutex::new(HashSet::new(capacity)),
            queue: Mutex::new(Queue::new()),
            stack: Mutex::new(Stack::new()),
            write_count: AtomicU64::new(0),
            read_count: AtomicU64::new(0),
        }
    }

    fn record<T>(&self, result: Result<T, StorageError>) -> Result<T, StorageError> {
        if result.is_ok() {
            self.write_count.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    // ========================================================================
    // Hash table
    // ========================================================================

    /// Inserts a new key into the hash table.
    pub fn hset(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let result = self.table.lock().insert(key, value);
        self.record(result)
    }

    /// Looks up a key in the hash table.
    pub fn hget(&self, key: &str) -> Result<String, StorageError> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.table.lock().get(key)
    }

    /// Deletes a key from the hash table, returning its value.
    pub fn hdel(&self, key: &str) -> Result<String, StorageError> {
        let result = self.table.lock().delete(key);
        self.record(result)
    }

    // ========================================================================
    // Hash set
    // ========================================================================

    pub fn sadd(&self, key: &str) -> Result<(), StorageError> {
        let result = self.set.lock().insert(key);
        self.record(result)
    }

    pub fn sismember(&self, key: &str) -> bool {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.set.lock().contains(key)
    }

    pub fn srem(&self, key: &str) -> Result<(), StorageError> {
        let result = self.set.lock().delete(key);
        self.record(result)
    }

    // ========================================================================
    // Queue and stack
    // ========================================================================

    pub fn qpush(&self, value: impl Into<String>) {
        self.queue.lock().push(value);
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Pops the oldest queued value. `None` means the queue was empty.
    pub fn qpop(&self) -> Option<String> {
        let value = self.queue.lock().pop();
        if value.is_some() {
            self.write_count.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn spush(&self, value: impl Into<String>) {
        self.stack.lock().push(value);
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Pops the newest stacked value. `None` means the stack was empty.
    pub fn spop(&self) -> Option<String> {
        let value = self.stack.lock().pop();
        if value.is_some() {
            self.write_count.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    pub fn stack_is_empty(&self) -> bool {
        self.stack.lock().is_empty()
    }

    /// Returns a point-in-time snapshot of sizes and counters.
    ///
    /// Each structure is locked separately, so the sizes are not mutually
    /// consistent under concurrent writes.
    pub fn stats(&self) -> StorageStats {
        let (table_len, capacity) = {
            let table = self.table.lock();
            (table.len(), table.capacity())
        };

        StorageStats {
            capacity,
            table_len,
            set_len: self.set.lock().len(),
            queue_len: self.queue.lock().len(),
            stack_len: self.stack.lock().len(),
            writes: self.write_count.load(Ordering::Relaxed),
            reads: self.read_count.load(Ordering::Relaxed),
        }
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Slot count of the hash table and the hash set
    pub capacity: usize,
    /// Live keys in the hash table
    pub table_len: usize,
    /// Live elements in the hash set
    pub set_len: usize,
    /// Values waiting in the queue
    pub queue_len: usize,
    /// Values on the stack
    pub stack_len: usize,
    /// Successful mutations
    pub writes: u64,
    /// Lookups (HGET, SISMEMBER)
    pub reads: u64,
}
