//! Fixed-Capacity Open-Addressed Tables
//!
//! This module implements the two keyed structures of ProbeKV: the
//! [`HashTable`] (key → value) and the [`HashSet`] (key presence only).
//! Both share one probing core, [`ProbeTable`], and never resize.
//!
//! ## Probing
//!
//! ```text
//!   home = (Σ bytes(key)) mod C
//!
//!   slot:   0     1     2     3     4     5    ...   C-1
//!         ┌─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┐
//!         │     │ ab  │  ✝  │ ba  │     │     │     │     │
//!         └─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┘
//!                  ▲ home("ba")  ──probe──▶ found at 3
//! ```
//!
//! A lookup walks forward from the home slot (wrapping at `C`) and stops at
//! the first empty slot or after a full cycle. Deleting leaves a tombstone
//! (`✝`) so entries placed further along the same chain stay reachable.
//! Inserts reuse the first tombstone they pass.

use thiserror::Error;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 512;

/// Errors produced by the keyed structures.
///
/// The messages match the reasons the server has always reported to its
/// text clients.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The key has zero length
    #[error("KEY==0")]
    EmptyKey,

    /// The hash table already holds this key
    #[error("an element with such a key exists")]
    DuplicateKey,

    /// The hash set already holds this element
    #[error("an element with such a key exists")]
    ElementExists,

    /// Every slot of the hash table is occupied
    #[error("HashMap full")]
    TableFull,

    /// Every slot of the hash set is occupied
    #[error("Set full")]
    SetFull,

    /// The hash table has no such key
    #[error("not found")]
    NotFound,

    /// The hash set has no such element
    #[error("element not found")]
    ElementNotFound,
}

/// Computes the home slot of `key` in a table of `capacity` slots.
///
/// The hash is the sum of the key's bytes modulo the capacity.
pub fn hash(key: &str, capacity: usize) -> Result<usize, StorageError> {
    if key.is_empty() {
        return Err(StorageError::EmptyKey);
    }
    let sum = key
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_add(b as usize));
    Ok(sum % capacity)
}

/// A key/value pair stored in a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    pub key: String,
    pub value: V,
}

#[derive(Debug, Clone)]
enum Slot<V> {
    Empty,
    Tombstone,
    Occupied(Entry<V>),
}

/// Where a probe for a key ended.
enum Probe {
    /// The key lives in this slot
    Found(usize),
    /// The key is absent; this is the first slot an insert may use
    Vacant(usize),
    /// The key is absent and no slot is free
    Full,
}

/// The open-addressing core shared by [`HashTable`] and [`HashSet`].
///
/// Errors are reported with the hash-table variants; [`HashSet`] maps them
/// to its own.
#[derive(Debug, Clone)]
pub struct ProbeTable<V> {
    slots: Vec<Slot<V>>,
    len: usize,
}

impl<V> ProbeTable<V> {
    /// Creates a table with `capacity` slots. A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Empty);
        Self { slots, len: 0 }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn probe(&self, key: &str) -> Result<Probe, StorageError> {
        let capacity = self.capacity();
        let home = hash(key, capacity)?;
        let mut first_free = None;

        for step in 0..capacity {
            let idx = (home + step) % capacity;
            match &self.slots[idx] {
                Slot::Empty => return Ok(Probe::Vacant(first_free.unwrap_or(idx))),
                Slot::Tombstone => {
                    if first_free.is_none() {
                        first_free = Some(idx);
                    }
                }
                Slot::Occupied(entry) if entry.key == key => return Ok(Probe::Found(idx)),
                Slot::Occupied(_) => {}
            }
        }

        Ok(first_free.map_or(Probe::Full, Probe::Vacant))
    }

    /// Inserts a new entry. Existing keys are never overwritten.
    pub fn insert(&mut self, key: &str, value: V) -> Result<(), StorageError> {
        match self.probe(key)? {
            Probe::Found(_) => Err(StorageError::DuplicateKey),
            Probe::Full => Err(StorageError::TableFull),
            Probe::Vacant(idx) => {
                self.slots[idx] = Slot::Occupied(Entry {
                    key: key.to_string(),
                    value,
                });
                self.len += 1;
                Ok(())
            }
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<&V, StorageError> {
        match self.probe(key)? {
            Probe::Found(idx) => match &self.slots[idx] {
                Slot::Occupied(entry) => Ok(&entry.value),
                _ => Err(StorageError::NotFound),
            },
            Probe::Vacant(_) | Probe::Full => Err(StorageError::NotFound),
        }
    }

    /// Removes `key` and returns its entry.
    pub fn remove(&mut self, key: &str) -> Result<Entry<V>, StorageError> {
        let idx = match self.probe(key)? {
            Probe::Found(idx) => idx,
            Probe::Vacant(_) | Probe::Full => return Err(StorageError::NotFound),
        };

        let capacity = self.capacity();
        // A slot followed by an empty one ends every chain through it.
        let replacement = if matches!(self.slots[(idx + 1) % capacity], Slot::Empty) {
            Slot::Empty
        } else {
            Slot::Tombstone
        };

        self.len -= 1;
        match std::mem::replace(&mut self.slots[idx], replacement) {
            Slot::Occupied(entry) => Ok(entry),
            _ => Err(StorageError::NotFound),
        }
    }

    /// Returns the slot index holding `key`, if any.
    pub fn slot_of(&self, key: &str) -> Option<usize> {
        match self.probe(key) {
            Ok(Probe::Found(idx)) => Some(idx),
            _ => None,
        }
    }
}

/// Fixed-capacity key → value store.
#[derive(Debug, Clone)]
pub struct HashTable {
    inner: ProbeTable<String>,
}

impl Default for HashTable {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HashTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ProbeTable::with_capacity(capacity),
        }
    }

    /// Inserts `key` → `value`.
    ///
    /// Fails with [`StorageError::DuplicateKey`] if the key is already
    /// present and [`StorageError::TableFull`] if no slot is free.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        self.inner.insert(key, value.into())
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<String, StorageError> {
        self.inner.get(key).cloned()
    }

    /// Deletes `key`, returning the value it held.
    pub fn delete(&mut self, key: &str) -> Result<String, StorageError> {
        self.inner.remove(key).map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

/// Fixed-capacity key-presence store.
#[derive(Debug, Clone)]
pub struct HashSet {
    inner: ProbeTable<()>,
}

impl Default for HashSet {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HashSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ProbeTable::with_capacity(capacity),
        }
    }

    /// Adds `key` to the set.
    pub fn insert(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner.insert(key, ()).map_err(|e| match e {
            StorageError::DuplicateKey => StorageError::ElementExists,
            StorageError::TableFull => StorageError::SetFull,
            other => other,
        })
    }

    /// Reports whether `key` is in the set. An empty key is never a member.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.get(key).is_ok()
    }

    /// Removes `key` from the set.
    pub fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).map(|_| ()).map_err(|e| match e {
            StorageError::NotFound => StorageError::ElementNotFound,
            other => other,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}
