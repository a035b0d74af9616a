use std::{collections::BTreeMap, fs, path::Path};

use crate::{
    util::{Result, Status},
    wal::{Reader, WalRecord, Writer},
};

/// Settings a table is written with
#[derive(Debug, Clone, Copy, Default)]
pub struct TableWriteOptions {
    pub use_fsync: bool,
    pub bytes_per_sync: u64,
}

/// An immutable sorted run of one column family
///
/// Stored as log records in key order, one per entry, tombstones included.
/// The whole file is loaded when the table is opened.
#[derive(Debug)]
pub struct TableFile {
    pub number: u64,
    pub level: usize,
    pub size: u64,
    entries: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl TableFile {
    #[cfg(test)]
    pub(crate) fn from_entries(
        number: u64,
        level: usize,
        entries: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    ) -> Self {
        TableFile {
            number,
            level,
            size: 0,
            entries,
        }
    }

    /// Write `entries` to `path` and sync it.
    pub fn write(
        path: &Path,
        number: u64,
        level: usize,
        cf_id: u32,
        entries: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
        options: TableWriteOptions,
    ) -> Result<TableFile> {
        let mut writer = Writer::create(path)?
            .with_fsync(options.use_fsync)
            .with_bytes_per_sync(options.bytes_per_sync);

        for (key, value) in &entries {
            let record = match value {
                Some(value) => WalRecord::put(cf_id, 0, key, value),
                None => WalRecord::delete(cf_id, 0, key),
            };
            writer.add_record(&record.encode())?;
        }
        writer.sync()?;

        Ok(TableFile {
            number,
            level,
            size: writer.offset(),
            entries,
        })
    }

    pub fn open(path: &Path, number: u64, level: usize) -> Result<TableFile> {
        let size = fs::metadata(path)?.len();
        let mut reader = Reader::open(path)?;

        let mut entries = BTreeMap::new();
        for record in reader.read_all().map_err(|e| {
            Status::corruption(format!("table {}: {e}", path.display()))
        })? {
            let record = WalRecord::decode(&record)?;
            entries.insert(record.key, record.value);
        }

        Ok(TableFile {
            number,
            level,
            size,
            entries,
        })
    }

    /// `Some(None)` when the table holds a tombstone for `key`.
    pub fn get(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.entries.get(key).map(|value| value.as_deref())
    }

    pub fn entries(&self) -> &BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn overlaps(&self, begin: Option<&[u8]>, end: Option<&[u8]>) -> bool {
        let (Some((smallest, _)), Some((largest, _))) =
            (self.entries.first_key_value(), self.entries.last_key_value())
        else {
            return false;
        };
        let after_begin = begin.is_none_or(|b| largest.as_slice() >= b);
        let before_end = end.is_none_or(|e| smallest.as_slice() <= e);
        after_begin && before_end
    }
}
