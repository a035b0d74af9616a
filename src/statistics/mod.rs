use std::{
    fmt::Write as _,
    sync::atomic::{AtomicU64, Ordering},
};

/// Counters kept while statistics are enabled
///
/// One instance is shared by the `DBOptions` that enabled it and every
/// engine opened with those options, so either side can take a report while
/// the engine runs. All counters are relaxed atomics; a report is a loose
/// snapshot, not a consistent cut.
#[derive(Debug, Default)]
pub struct Statistics {
    pub num_keys_written: AtomicU64,
    pub num_keys_read: AtomicU64,
    pub num_keys_deleted: AtomicU64,
    pub bytes_written: AtomicU64,
    pub bytes_read: AtomicU64,

    pub memtable_hits: AtomicU64,
    pub memtable_misses: AtomicU64,
    pub num_memtable_flushes: AtomicU64,
    pub bytes_flushed: AtomicU64,

    pub wal_writes: AtomicU64,
    pub wal_syncs: AtomicU64,
    pub wal_bytes_written: AtomicU64,
    pub wal_files_archived: AtomicU64,
    pub wal_files_deleted: AtomicU64,
    pub wal_files_recycled: AtomicU64,
    pub wal_records_recovered: AtomicU64,
    pub wal_records_dropped: AtomicU64,

    pub table_reads: AtomicU64,
    pub table_hits: AtomicU64,

    pub num_compactions: AtomicU64,
    pub compaction_bytes_read: AtomicU64,
    pub compaction_bytes_written: AtomicU64,
    pub num_files_compacted: AtomicU64,

    pub manifest_rollovers: AtomicU64,
    pub info_log_rolls: AtomicU64,
    pub obsolete_files_deleted: AtomicU64,

    pub num_write_errors: AtomicU64,
}

enum Row<'a> {
    Count(&'static str, &'a AtomicU64),
    Bytes(&'static str, &'a AtomicU64),
    Percent(&'static str, f64),
}

#[inline]
fn bump(counter: &AtomicU64, n: u64) {
    counter.fetch_add(n, Ordering::Relaxed);
}

#[inline]
fn get(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    pub fn record_write(&self, bytes: u64) {
        bump(&self.num_keys_written, 1);
        bump(&self.bytes_written, bytes);
    }

    pub fn record_read(&self, bytes: u64) {
        bump(&self.num_keys_read, 1);
        bump(&self.bytes_read, bytes);
    }

    pub fn record_delete(&self) {
        bump(&self.num_keys_deleted, 1);
    }

    pub fn record_memtable_hit(&self) {
        bump(&self.memtable_hits, 1);
    }

    pub fn record_memtable_miss(&self) {
        bump(&self.memtable_misses, 1);
    }

    pub fn record_memtable_flush(&self, bytes: u64) {
        bump(&self.num_memtable_flushes, 1);
        bump(&self.bytes_flushed, bytes);
    }

    pub fn record_wal_write(&self, bytes: u64) {
        bump(&self.wal_writes, 1);
        bump(&self.wal_bytes_written, bytes);
    }

    pub fn record_wal_sync(&self) {
        bump(&self.wal_syncs, 1);
    }

    pub fn record_wal_archived(&self) {
        bump(&self.wal_files_archived, 1);
    }

    pub fn record_wal_deleted(&self, files: u64) {
        bump(&self.wal_files_deleted, files);
    }

    pub fn record_wal_recycled(&self) {
        bump(&self.wal_files_recycled, 1);
    }

    /// Outcome of replaying the logs at open.
    pub fn record_wal_recovery(&self, recovered: u64, dropped: u64) {
        bump(&self.wal_records_recovered, recovered);
        bump(&self.wal_records_dropped, dropped);
    }

    /// A lookup that reached the table files; `hit` when one of them had the key.
    pub fn record_table_read(&self, hit: bool) {
        bump(&self.table_reads, 1);
        bump(&self.table_hits, u64::from(hit));
    }

    pub fn record_compaction(&self, bytes_read: u64, bytes_written: u64, num_files: u64) {
        bump(&self.num_compactions, 1);
        bump(&self.compaction_bytes_read, bytes_read);
        bump(&self.compaction_bytes_written, bytes_written);
        bump(&self.num_files_compacted, num_files);
    }

    pub fn record_manifest_rollover(&self) {
        bump(&self.manifest_rollovers, 1);
    }

    pub fn record_info_log_roll(&self) {
        bump(&self.info_log_rolls, 1);
    }

    pub fn record_obsolete_files_deleted(&self, files: u64) {
        bump(&self.obsolete_files_deleted, files);
    }

    pub fn record_write_error(&self) {
        bump(&self.num_write_errors, 1);
    }

    pub fn num_keys_written(&self) -> u64 {
        get(&self.num_keys_written)
    }

    pub fn num_keys_read(&self) -> u64 {
        get(&self.num_keys_read)
    }

    pub fn num_memtable_flushes(&self) -> u64 {
        get(&self.num_memtable_flushes)
    }

    pub fn num_compactions(&self) -> u64 {
        get(&self.num_compactions)
    }

    pub fn wal_syncs(&self) -> u64 {
        get(&self.wal_syncs)
    }

    pub fn memtable_hit_rate(&self) -> f64 {
        let hits = get(&self.memtable_hits);
        match hits + get(&self.memtable_misses) {
            0 => 0.0,
            total => hits as f64 / total as f64,
        }
    }

    fn sections(&self) -> [(&'static str, Vec<Row<'_>>); 7] {
        use Row::*;

        [
            ("Operations", vec![
                Count("Keys written", &self.num_keys_written),
                Count("Keys read", &self.num_keys_read),
                Count("Keys deleted", &self.num_keys_deleted),
                Bytes("Bytes written", &self.bytes_written),
                Bytes("Bytes read", &self.bytes_read),
            ]),
            ("MemTable", vec![
                Count("Hits", &self.memtable_hits),
                Count("Misses", &self.memtable_misses),
                Percent("Hit rate", self.memtable_hit_rate() * 100.0),
                Count("Flushes", &self.num_memtable_flushes),
                Bytes("Bytes flushed", &self.bytes_flushed),
            ]),
            ("WAL", vec![
                Count("Writes", &self.wal_writes),
                Count("Syncs", &self.wal_syncs),
                Bytes("Bytes written", &self.wal_bytes_written),
                Count("Archived", &self.wal_files_archived),
                Count("Deleted", &self.wal_files_deleted),
                Count("Recycled", &self.wal_files_recycled),
                Count("Recovered", &self.wal_records_recovered),
                Count("Dropped", &self.wal_records_dropped),
            ]),
            ("Tables", vec![
                Count("Reads", &self.table_reads),
                Count("Hits", &self.table_hits),
            ]),
            ("Compaction", vec![
                Count("Runs", &self.num_compactions),
                Bytes("Bytes read", &self.compaction_bytes_read),
                Bytes("Bytes written", &self.compaction_bytes_written),
                Count("Files", &self.num_files_compacted),
            ]),
            ("Housekeeping", vec![
                Count("Manifest rolls", &self.manifest_rollovers),
                Count("Log rolls", &self.info_log_rolls),
                Count("Obsolete files", &self.obsolete_files_deleted),
            ]),
            ("Errors", vec![Count("Write errors", &self.num_write_errors)]),
        ]
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for (_, rows) in self.sections() {
            for row in rows {
                if let Row::Count(_, counter) | Row::Bytes(_, counter) = row {
                    counter.store(0, Ordering::Relaxed);
                }
            }
        }
    }

    /// Human-readable report, one `- Label: value` line per counter.
    pub fn report(&self) -> String {
        let mut out = String::from("Database Statistics:\n");
        for (title, rows) in self.sections() {
            let _ = write!(out, "\n{title}:\n");
            for row in rows {
                let _ = match row {
                    Row::Count(label, c) => writeln!(out, "- {:<15}{}", format!("{label}:"), get(c)),
                    Row::Bytes(label, c) => {
                        let n = get(c);
                        let mb = n as f64 / (1024.0 * 1024.0);
                        writeln!(out, "- {:<15}{n} ({mb:.2} MB)", format!("{label}:"))
                    },
                    Row::Percent(label, v) => writeln!(out, "- {:<15}{v:.2}%", format!("{label}:")),
                };
            }
        }
        out
    }
}
