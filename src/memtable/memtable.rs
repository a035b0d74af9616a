use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_skiplist::SkipMap;

/// Per-entry bookkeeping charged on top of key and value bytes.
const ENTRY_OVERHEAD: usize = 16;

/// Result of a memtable point lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Vec<u8>),
    /// A tombstone shadows any older value in table files.
    Deleted,
    NotFound,
}

/// In-memory write buffer of one column family
///
/// Writes to the engine are serialized, so the latest insert for a key is
/// always the newest version and simply replaces the previous entry. A
/// deletion is kept as a tombstone until the memtable is flushed.
pub struct MemTable {
    table: SkipMap<Vec<u8>, Option<Vec<u8>>>,
    approximate_memory: AtomicUsize,
}

impl MemTable {
    pub fn new() -> Self {
        MemTable {
            table: SkipMap::new(),
            approximate_memory: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, key: &[u8], value: &[u8]) {
        self.approximate_memory
            .fetch_add(key.len() + value.len() + ENTRY_OVERHEAD, Ordering::Relaxed);
        self.table.insert(key.to_vec(), Some(value.to_vec()));
    }

    pub fn delete(&self, key: &[u8]) {
        self.approximate_memory
            .fetch_add(key.len() + ENTRY_OVERHEAD, Ordering::Relaxed);
        self.table.insert(key.to_vec(), None);
    }

    pub fn get(&self, key: &[u8]) -> Lookup {
        match self.table.get(key) {
            Some(entry) => match entry.value() {
                Some(value) => Lookup::Found(value.clone()),
                None => Lookup::Deleted,
            },
            None => Lookup::NotFound,
        }
    }

    /// Bytes charged against `write_buffer_size`, including overwritten
    /// versions that are no longer reachable.
    pub fn approximate_memory_usage(&self) -> usize {
        self.approximate_memory.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Entries in key order, tombstones as `None`.
    pub fn entries(&self) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
        self.table
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
