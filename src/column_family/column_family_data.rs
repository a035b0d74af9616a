use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::RwLock;

use crate::{
    column_family::{ColumnFamilyHandle, ColumnFamilyOptions},
    db::table::TableFile,
    memtable::{Lookup, MemTable},
};

/// Runtime state of an open column family
///
/// ```text
/// put/delete → MemTable ──flush──→ level-0 TableFile
///                                       │
///                               compaction merges every table
///                                       ↓
///                              TableFile at the last level
/// ```
///
/// Flushes and compactions are serialized by the engine, so the table list
/// only changes under its write lock here.
pub(crate) struct ColumnFamilyData {
    handle: ColumnFamilyHandle,
    options: ColumnFamilyOptions,
    mem: RwLock<Arc<MemTable>>,
    /// Sorted for lookups: lower level first, newer table first within a level.
    tables: RwLock<Vec<Arc<TableFile>>>,
    dropped: AtomicBool,
}

impl ColumnFamilyData {
    pub fn new(id: u32, name: String, options: ColumnFamilyOptions) -> Self {
        ColumnFamilyData {
            handle: ColumnFamilyHandle::new(id, name),
            options,
            mem: RwLock::new(Arc::new(MemTable::new())),
            tables: RwLock::new(Vec::new()),
            dropped: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u32 {
        self.handle.id()
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn handle(&self) -> &ColumnFamilyHandle {
        &self.handle
    }

    pub fn options(&self) -> &ColumnFamilyOptions {
        &self.options
    }

    pub fn mem(&self) -> Arc<MemTable> {
        Arc::clone(&self.mem.read())
    }

    /// Install an empty memtable and return the one it replaces.
    pub fn switch_memtable(&self) -> Arc<MemTable> {
        std::mem::replace(&mut *self.mem.write(), Arc::new(MemTable::new()))
    }

    pub fn should_flush(&self) -> bool {
        self.mem.read().approximate_memory_usage() >= self.options.write_buffer_size
    }

    pub fn get(&self, key: &[u8]) -> Lookup {
        self.mem.read().get(key)
    }

    /// Tables in lookup order.
    pub fn tables(&self) -> Vec<Arc<TableFile>> {
        self.tables.read().clone()
    }

    pub fn add_table(&self, table: Arc<TableFile>) {
        let mut tables = self.tables.write();
        tables.push(table);
        tables.sort_by(|a, b| a.level.cmp(&b.level).then(b.number.cmp(&a.number)));
    }

    pub fn remove_tables(&self, numbers: &[u64]) {
        self.tables.write().retain(|t| !numbers.contains(&t.number));
    }

    pub fn num_level0_tables(&self) -> usize {
        self.tables.read().iter().filter(|t| t.level == 0).count()
    }

    pub fn needs_compaction(&self) -> bool {
        !self.options.disable_auto_compactions
            && self.num_level0_tables() >= self.options.level0_file_num_compaction_trigger
    }

    pub fn mark_dropped(&self) {
        self.dropped.store(true, Ordering::SeqCst);
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}
