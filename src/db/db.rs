use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Instant, SystemTime},
};

use parking_lot::{Condvar, Mutex, RwLock};

use crate::{
    column_family::{
        ColumnFamilyData, ColumnFamilyDescriptor, ColumnFamilyHandle, ColumnFamilyOptions,
        ColumnFamilySet, DEFAULT_COLUMN_FAMILY_NAME, plan_open,
    },
    db::{
        filename::{self, FileType},
        info_log::InfoLog,
        manifest::{Manifest, ManifestEdit, ManifestOptions, ManifestState},
        table::{TableFile, TableWriteOptions},
    },
    env::{Env, Priority},
    memtable::Lookup,
    options::{
        ArchivedWal, DBOptions, ImmutableDBOptions, WalRecoveryMode, db_options::persist_options,
    },
    statistics::Statistics,
    util::{Result, Status},
    wal::{Reader, WalRecord, Writer},
};

struct WalState {
    writer: Writer,
    number: u64,
    /// Obsolete logs kept for reuse, oldest first.
    recycle: VecDeque<u64>,
}

struct Housekeeping {
    last_stats_dump: Instant,
    last_obsolete_scan: Instant,
    last_archive_sweep: Instant,
}

/// What replaying the write-ahead logs produced
#[derive(Debug, Default)]
struct Replay {
    recovered: u64,
    dropped: u64,
    max_sequence: u64,
}

/// Lock order: flush_lock, write_lock, wal, manifest.
struct DBInner {
    options: ImmutableDBOptions,
    info_log: InfoLog,
    column_families: ColumnFamilySet,
    wal: Mutex<WalState>,
    manifest: Mutex<Manifest>,
    /// Options persisted as `OPTIONS-<n>`, follows column family changes.
    current_options: Mutex<DBOptions>,

    next_file_number: AtomicU64,
    last_sequence: AtomicU64,
    max_total_wal_size: AtomicU64,

    /// First write failure under paranoid checks; the engine is read-only
    /// while it is set.
    bg_error: RwLock<Option<Status>>,

    write_lock: Mutex<()>,
    /// Serializes flushes, compactions and column family changes.
    flush_lock: Mutex<()>,

    bg_pending: Mutex<usize>,
    bg_done: Condvar,
    housekeeping: Mutex<Housekeeping>,
    shutting_down: AtomicBool,
}

/// An open database
///
/// ```text
/// put ──→ WAL ──→ MemTable ──flush──→ level-0 table ──compaction──→ last level
///                                 │
///                          MANIFEST edit, WAL rotated,
///                          old log recycled / archived / deleted
/// ```
///
/// The behavior of every stage is taken from the [`DBOptions`] the database
/// was opened with, resolved into an [`ImmutableDBOptions`].
pub struct DB {
    inner: Arc<DBInner>,
}

impl DB {
    /// Open the database at `path` with the default column family and every
    /// family registered through [`DBOptions::add_column_family`].
    pub fn open(options: &DBOptions, path: impl AsRef<Path>) -> Result<DB> {
        let requested = options
            .column_family_overrides()
            .iter()
            .map(|(name, cf)| ColumnFamilyDescriptor::new(name.clone(), cf.clone()))
            .collect();
        Self::open_with(options, path.as_ref(), requested)
    }

    /// Open the database with exactly the given column families
    ///
    /// The default family is added with the base options when it is not
    /// listed. On an existing database every family it holds must be listed.
    pub fn open_cf(
        options: &DBOptions,
        path: impl AsRef<Path>,
        descriptors: Vec<ColumnFamilyDescriptor>,
    ) -> Result<DB> {
        Self::open_with(options, path.as_ref(), descriptors)
    }

    /// Names of the column families stored in the database at `path`.
    pub fn list_column_families(path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        if !filename::current_file_name(path).exists() {
            return Err(Status::not_found(format!(
                "{}: no database",
                path.display()
            )));
        }
        let (_, state) = Manifest::recover(path)?;
        Ok(state.families.into_values().collect())
    }

    /// Remove every file of the database at `path`
    ///
    /// Also removes the info logs this database wrote to `db_log_dir`, and a
    /// WAL directory distinct from `path`.
    ///
    /// The WAL directory goes with everything in it, including other files
    /// or a database directory nested inside it. Do not point `wal_dir` at a
    /// shared directory.
    pub fn destroy(options: &DBOptions, path: impl AsRef<Path>) -> Result<()> {
        let db_path = path.as_ref();

        if !options.db_log_dir().is_empty() {
            let log_dir = Path::new(options.db_log_dir());
            let (dir, base) = filename::info_log_file_name(db_path, Some(log_dir));
            let active = dir.join(&base);
            if active.exists() {
                fs::remove_file(&active)?;
            }
            for stamp in filename::list_old_info_logs(&dir, &base)? {
                fs::remove_file(filename::old_info_log_file_name(&dir, &base, stamp))?;
            }
        }

        if !options.wal_dir().is_empty() {
            let wal_dir = Path::new(options.wal_dir());
            if wal_dir != db_path && wal_dir.exists() {
                fs::remove_dir_all(wal_dir)?;
            }
        }

        if db_path.exists() {
            fs::remove_dir_all(db_path)?;
        }
        log::info!("destroyed database {}", db_path.display());
        Ok(())
    }

    fn open_with(
        options: &DBOptions,
        db_path: &Path,
        requested: Vec<ColumnFamilyDescriptor>,
    ) -> Result<DB> {
        let resolved = ImmutableDBOptions::resolve(db_path, options)?;

        let exists = filename::current_file_name(db_path).exists();
        if exists && resolved.error_if_exists {
            return Err(Status::invalid_argument(format!(
                "{}: exists (error_if_exists is true)",
                db_path.display()
            )));
        }
        if !exists && !resolved.create_if_missing {
            return Err(Status::invalid_argument(format!(
                "{}: does not exist (create_if_missing is false)",
                db_path.display()
            )));
        }

        resolved.apply_background_threads();

        fs::create_dir_all(db_path)?;
        fs::create_dir_all(&resolved.wal_dir)?;
        if resolved.wal_archive.archives() {
            fs::create_dir_all(filename::archive_dir(&resolved.wal_dir))?;
        }

        let info_log = InfoLog::open(
            db_path,
            resolved.db_log_dir.as_deref(),
            resolved.info_log_level,
            resolved.log_roll,
            resolved.statistics.clone(),
        )?;
        info_log.header(&format!(
            "{} database {}",
            if exists { "Opening" } else { "Creating" },
            db_path.display()
        ));
        for line in resolved.dump() {
            info_log.header(&line);
        }

        let (old_manifest, mut state) = if exists {
            let (number, state) = Manifest::recover(db_path)?;
            (Some(number), state)
        } else {
            (None, ManifestState::default())
        };

        // column families
        let planned = plan_open(
            &state.families,
            requested,
            resolved.cf_options(DEFAULT_COLUMN_FAMILY_NAME),
            !exists,
            resolved.create_missing_column_families,
        )?;

        let column_families = ColumnFamilySet::new(state.next_cf_id);
        for family in planned {
            let mut cf_options = family.options;
            cf_options.sanitize(&family.name)?;

            let id = match family.id {
                Some(id) => id,
                None => {
                    let id = column_families.allocate_id();
                    state.apply(&ManifestEdit::NewColumnFamily {
                        id,
                        name: family.name.clone(),
                    });
                    info_log.info(&format!("Created column family [{}] (ID {id})", family.name));
                    id
                },
            };
            column_families.insert(Arc::new(ColumnFamilyData::new(id, family.name, cf_options)));
        }

        // table files
        let mut missing = Vec::new();
        for (cf_id, tables) in &state.tables {
            let Some(cf) = column_families.get_by_id(*cf_id) else {
                continue;
            };
            for (number, table) in tables {
                let path = filename::table_file_name(db_path, *number);
                if !path.exists() {
                    if resolved.paranoid_checks {
                        return Err(Status::corruption(format!(
                            "table file {} is missing",
                            path.display()
                        )));
                    }
                    info_log.warn(&format!(
                        "[{}] table file {} is missing, skipped",
                        cf.name(),
                        path.display()
                    ));
                    missing.push((*cf_id, *number));
                    continue;
                }
                cf.add_table(Arc::new(TableFile::open(&path, *number, table.level)?));
            }
        }
        for (cf_id, number) in missing {
            state.apply(&ManifestEdit::DeleteTable { cf_id, number });
        }

        // write-ahead logs
        let existing_logs = filename::list_log_files(&resolved.wal_dir)?;
        let mut max_seen = state.next_file_number;
        for file in filename::list_files(db_path)? {
            if let FileType::Log(n)
            | FileType::Table(n)
            | FileType::Manifest(n)
            | FileType::Options(n)
            | FileType::Temp(n) = file
            {
                max_seen = max_seen.max(n + 1);
            }
        }
        if let Some(last) = existing_logs.last() {
            max_seen = max_seen.max(last + 1);
        }
        let next_file_number = AtomicU64::new(max_seen);

        let live_logs: Vec<u64> = existing_logs
            .iter()
            .copied()
            .filter(|n| *n >= state.log_number)
            .collect();
        let replay = replay_logs(&resolved, &live_logs, &column_families, &info_log)?;
        if let Some(stats) = &resolved.statistics {
            stats.record_wal_recovery(replay.recovered, replay.dropped);
        }
        let last_sequence = state.last_sequence.max(replay.max_sequence);

        resolved.env.check_writable()?;
        let log_number = next_file_number.fetch_add(1, Ordering::SeqCst);
        let writer = Writer::create(filename::log_file_name(&resolved.wal_dir, log_number))?
            .with_fsync(resolved.use_fsync);

        // recovered writes go to level 0 so the old logs can be released
        for cf in column_families.all() {
            let mem = cf.switch_memtable();
            if mem.is_empty() {
                continue;
            }
            let number = next_file_number.fetch_add(1, Ordering::SeqCst);
            let table = write_table(&resolved, number, 0, cf.id(), mem.entries())?;
            state.apply(&ManifestEdit::AddTable {
                cf_id: cf.id(),
                number,
                level: 0,
                size: table.size,
            });
            info_log.info(&format!(
                "[{}] recovered {} entries into table #{number}",
                cf.name(),
                table.len()
            ));
            cf.add_table(Arc::new(table));
        }

        let manifest_number = next_file_number.fetch_add(1, Ordering::SeqCst);
        state.apply(&ManifestEdit::LogNumber(log_number));
        state.apply(&ManifestEdit::LastSequence(last_sequence));
        state.apply(&ManifestEdit::NextFileNumber(
            next_file_number.load(Ordering::SeqCst),
        ));
        let manifest = Manifest::create(db_path, manifest_number, state, ManifestOptions {
            max_file_size: resolved.max_manifest_file_size,
            use_fsync: resolved.use_fsync,
        })?;
        if let Some(old) = old_manifest {
            let old_path = filename::manifest_file_name(db_path, old);
            if let Err(e) = fs::remove_file(&old_path) {
                info_log.warn(&format!("failed to remove {}: {e}", old_path.display()));
            }
        }

        // options as actually opened
        let mut current_options = resolved.source.clone();
        let opened: BTreeSet<String> = column_families
            .all()
            .iter()
            .map(|cf| cf.name().to_string())
            .collect();
        current_options
            .column_family_overrides_mut()
            .retain(|name, _| opened.contains(name));
        for cf in column_families.all() {
            current_options.add_column_family(cf.name(), cf.options().clone());
        }

        let now = Instant::now();
        let inner = Arc::new(DBInner {
            info_log,
            column_families,
            wal: Mutex::new(WalState {
                writer,
                number: log_number,
                recycle: VecDeque::new(),
            }),
            manifest: Mutex::new(manifest),
            current_options: Mutex::new(current_options),
            next_file_number,
            last_sequence: AtomicU64::new(last_sequence),
            max_total_wal_size: AtomicU64::new(0),
            bg_error: RwLock::new(None),
            write_lock: Mutex::new(()),
            flush_lock: Mutex::new(()),
            bg_pending: Mutex::new(0),
            bg_done: Condvar::new(),
            housekeeping: Mutex::new(Housekeeping {
                last_stats_dump: now,
                last_obsolete_scan: now,
                last_archive_sweep: now,
            }),
            shutting_down: AtomicBool::new(false),
            options: resolved,
        });

        // logs at open are never recycled
        for number in existing_logs {
            inner.retire_log(None, number)?;
        }
        inner.refresh_max_total_wal_size();
        inner.persist_current_options()?;

        inner.info_log.info(&format!(
            "Opened with {} column families, last sequence {last_sequence}, log #{log_number}, \
             recovered {} records ({} dropped)",
            inner.column_families.all().len(),
            replay.recovered,
            replay.dropped
        ));
        inner.maybe_schedule_compaction();

        Ok(DB { inner })
    }

    pub fn path(&self) -> &Path {
        &self.inner.options.db_path
    }

    /// The validated configuration this database runs with.
    pub fn options(&self) -> &ImmutableDBOptions {
        &self.inner.options
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.inner.options.env
    }

    /// Shared counters, `None` unless statistics were enabled before open.
    pub fn statistics(&self) -> Option<Arc<Statistics>> {
        self.inner.options.statistics.clone()
    }

    pub fn info_log_path(&self) -> PathBuf {
        self.inner.info_log.path()
    }

    pub fn default_cf_handle(&self) -> ColumnFamilyHandle {
        ColumnFamilyHandle::new(0, DEFAULT_COLUMN_FAMILY_NAME.to_string())
    }

    pub fn cf_handle(&self, name: &str) -> Option<ColumnFamilyHandle> {
        self.inner
            .column_families
            .get_by_name(name)
            .map(|cf| cf.handle().clone())
    }

    /// Names of the open column families, in ID order.
    pub fn column_family_names(&self) -> Vec<String> {
        self.inner
            .column_families
            .all()
            .iter()
            .map(|cf| cf.name().to_string())
            .collect()
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.write(&self.default_cf_handle(), key, Some(value))
    }

    pub fn put_cf(&self, cf: &ColumnFamilyHandle, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.write(cf, key, Some(value))
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner.write(&self.default_cf_handle(), key, None)
    }

    pub fn delete_cf(&self, cf: &ColumnFamilyHandle, key: &[u8]) -> Result<()> {
        self.inner.write(cf, key, None)
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(&self.default_cf_handle(), key)
    }

    pub fn get_cf(&self, cf: &ColumnFamilyHandle, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(cf, key)
    }

    /// Write every non-empty memtable to a level-0 table and start a new
    /// write-ahead log.
    pub fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    /// Flush, then merge the tables of `cf` into one at the last level
    ///
    /// Tables are merged as a whole, so a range overlapping any table
    /// compacts the entire column family. `None` leaves a side unbounded.
    pub fn compact_range_cf(
        &self,
        cf: &ColumnFamilyHandle,
        begin: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<()> {
        let cf = self.inner.live_cf(cf)?;
        self.inner.flush()?;
        if cf.tables().iter().any(|t| t.overlaps(begin, end)) {
            self.inner.compact(&cf)?;
        }
        Ok(())
    }

    /// Block until scheduled background compactions have finished.
    pub fn wait_for_compact(&self) {
        self.inner.wait_for_background_work();
    }

    /// Persist the write-ahead log written so far.
    pub fn sync_wal(&self) -> Result<()> {
        self.inner.sync_wal()
    }

    /// Delete archived logs the archive policy no longer keeps. Returns the
    /// number of files removed.
    pub fn sweep_wal_archive(&self) -> Result<usize> {
        self.inner.sweep_wal_archive()
    }

    pub fn create_column_family(
        &self,
        name: &str,
        options: ColumnFamilyOptions,
    ) -> Result<ColumnFamilyHandle> {
        self.inner.create_column_family(name, options)
    }

    pub fn drop_column_family(&self, cf: &ColumnFamilyHandle) -> Result<()> {
        self.inner.drop_column_family(cf)
    }

    /// Number of table files of `cf` at `level`.
    pub fn num_files_at_level(&self, cf: &ColumnFamilyHandle, level: usize) -> Result<usize> {
        let cf = self.inner.live_cf(cf)?;
        Ok(cf.tables().iter().filter(|t| t.level == level).count())
    }

    /// `true` once a write failure moved the database into read-only mode.
    pub fn is_read_only(&self) -> bool {
        self.inner.bg_error.read().is_some()
    }
}

impl Drop for DB {
    fn drop(&mut self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        self.inner.wait_for_background_work();

        if let Err(e) = self.inner.wal.lock().writer.sync() {
            self.inner
                .info_log
                .warn(&format!("failed to sync WAL on close: {e}"));
        }
        self.inner.info_log.info("Closed");
    }
}

impl DBInner {
    fn env(&self) -> &Env {
        &self.options.env
    }

    fn record(&self, f: impl FnOnce(&Statistics)) {
        if let Some(stats) = &self.options.statistics {
            f(stats);
        }
    }

    fn check_bg_error(&self) -> Result<()> {
        match self.bg_error.read().as_ref() {
            Some(cause) => Err(Status::degraded(cause)),
            None => Ok(()),
        }
    }

    /// Report a failed write; under paranoid checks it also makes the engine
    /// read-only.
    fn record_bg_error(&self, context: &str, error: Status) -> Status {
        self.record(|s| s.record_write_error());
        if self.options.paranoid_checks {
            let mut bg_error = self.bg_error.write();
            if bg_error.is_none() {
                self.info_log.error(&format!(
                    "{context} failed: {error}; database is read-only from now on"
                ));
                *bg_error = Some(error.clone());
            }
        } else {
            self.info_log.error(&format!("{context} failed: {error}"));
        }
        error
    }

    fn live_cf(&self, handle: &ColumnFamilyHandle) -> Result<Arc<ColumnFamilyData>> {
        self.column_families
            .get(handle)
            .filter(|cf| !cf.is_dropped())
            .ok_or_else(|| {
                Status::invalid_argument(format!("Column family not found: {}", handle.name()))
            })
    }

    fn refresh_max_total_wal_size(&self) {
        let families = self.column_families.all();
        let limit = self
            .options
            .effective_max_total_wal_size(families.iter().map(|cf| cf.options()));
        self.max_total_wal_size.store(limit, Ordering::SeqCst);
    }

    fn persist_current_options(&self) -> Result<()> {
        self.env().check_writable()?;
        let number = self.next_file_number.fetch_add(1, Ordering::SeqCst);
        persist_options(&self.options.db_path, number, &self.current_options.lock())
    }

    fn write(
        self: &Arc<Self>,
        handle: &ColumnFamilyHandle,
        key: &[u8],
        value: Option<&[u8]>,
    ) -> Result<()> {
        self.check_bg_error()?;
        let cf = self.live_cf(handle)?;

        let needs_flush = {
            let _write = self.write_lock.lock();
            self.check_bg_error()?;

            let sequence = self.last_sequence.load(Ordering::SeqCst) + 1;
            let record = match value {
                Some(value) => WalRecord::put(cf.id(), sequence, key, value),
                None => WalRecord::delete(cf.id(), sequence, key),
            }
            .encode();

            let wal_size = {
                let mut wal = self.wal.lock();
                let appended = self
                    .env()
                    .check_writable()
                    .and_then(|_| wal.writer.add_record(&record));
                if let Err(e) = appended {
                    return Err(self.record_bg_error("WAL write", e));
                }
                wal.writer.offset()
            };

            let mem = cf.mem();
            match value {
                Some(value) => mem.put(key, value),
                None => mem.delete(key),
            }
            self.last_sequence.store(sequence, Ordering::SeqCst);

            self.record(|s| {
                s.record_wal_write(record.len() as u64);
                match value {
                    Some(value) => s.record_write((key.len() + value.len()) as u64),
                    None => s.record_delete(),
                }
            });

            cf.should_flush() || wal_size > self.max_total_wal_size.load(Ordering::SeqCst)
        };

        if needs_flush {
            self.flush()?;
        }
        Ok(())
    }

    fn get(&self, handle: &ColumnFamilyHandle, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.live_cf(handle)?;

        match cf.get(key) {
            Lookup::Found(value) => {
                self.record(|s| {
                    s.record_memtable_hit();
                    s.record_read(value.len() as u64);
                });
                return Ok(Some(value));
            },
            Lookup::Deleted => {
                self.record(|s| s.record_memtable_hit());
                return Ok(None);
            },
            Lookup::NotFound => self.record(|s| s.record_memtable_miss()),
        }

        for table in cf.tables() {
            match table.get(key) {
                Some(Some(value)) => {
                    self.record(|s| {
                        s.record_table_read(true);
                        s.record_read(value.len() as u64);
                    });
                    return Ok(Some(value.to_vec()));
                },
                Some(None) => {
                    self.record(|s| s.record_table_read(true));
                    return Ok(None);
                },
                None => self.record(|s| s.record_table_read(false)),
            }
        }
        Ok(None)
    }

    fn flush(self: &Arc<Self>) -> Result<()> {
        let _flush = self.flush_lock.lock();
        let flushed = {
            let _write = self.write_lock.lock();
            self.check_bg_error()?;
            self.flush_memtables()?
        };

        if flushed {
            self.maybe_schedule_compaction();
        }
        self.maybe_housekeeping();
        Ok(())
    }

    /// Caller holds `flush_lock` and `write_lock`.
    fn flush_memtables(&self) -> Result<bool> {
        let mut wal = self.wal.lock();

        let families: Vec<Arc<ColumnFamilyData>> = self
            .column_families
            .all()
            .into_iter()
            .filter(|cf| !cf.mem().is_empty())
            .collect();
        if families.is_empty() && wal.writer.offset() == 0 {
            return Ok(false);
        }

        let (new_number, new_writer) = self
            .new_log_writer(&mut wal)
            .map_err(|e| self.record_bg_error("log rotation", e))?;

        let mut tables = Vec::with_capacity(families.len());
        if let Err(e) = self.write_flush_tables(&families, new_number, &mut tables) {
            for (_, table) in &tables {
                let _ = fs::remove_file(filename::table_file_name(
                    &self.options.db_path,
                    table.number,
                ));
            }
            let _ = fs::remove_file(filename::log_file_name(&self.options.wal_dir, new_number));
            return Err(self.record_bg_error("flush", e));
        }

        for (cf, table) in tables {
            self.record(|s| s.record_memtable_flush(table.size));
            self.info_log.info(&format!(
                "[{}] flushed {} entries to table #{} ({} bytes)",
                cf.name(),
                table.len(),
                table.number,
                table.size
            ));
            cf.add_table(Arc::new(table));
            cf.switch_memtable();
        }

        let old_number = std::mem::replace(&mut wal.number, new_number);
        wal.writer = new_writer;
        let WalState { recycle, .. } = &mut *wal;
        if let Err(e) = self.retire_log(Some(recycle), old_number) {
            self.info_log
                .warn(&format!("failed to retire log #{old_number}: {e}"));
        }
        Ok(true)
    }

    fn write_flush_tables(
        &self,
        families: &[Arc<ColumnFamilyData>],
        new_log_number: u64,
        tables: &mut Vec<(Arc<ColumnFamilyData>, TableFile)>,
    ) -> Result<()> {
        for cf in families {
            let number = self.next_file_number.fetch_add(1, Ordering::SeqCst);
            let table = write_table(&self.options, number, 0, cf.id(), cf.mem().entries())?;
            tables.push((Arc::clone(cf), table));
        }

        let mut edits: Vec<ManifestEdit> = tables
            .iter()
            .map(|(cf, table)| ManifestEdit::AddTable {
                cf_id: cf.id(),
                number: table.number,
                level: 0,
                size: table.size,
            })
            .collect();
        edits.push(ManifestEdit::LogNumber(new_log_number));
        edits.push(ManifestEdit::LastSequence(
            self.last_sequence.load(Ordering::SeqCst),
        ));
        self.log_and_apply(edits)
    }

    fn log_and_apply(&self, edits: Vec<ManifestEdit>) -> Result<()> {
        self.env().check_writable()?;
        let rolled = self
            .manifest
            .lock()
            .log_and_apply(edits, &self.next_file_number)?;
        if rolled {
            self.record(|s| s.record_manifest_rollover());
            self.info_log.info(&format!(
                "MANIFEST rolled over to #{}",
                self.manifest.lock().number()
            ));
        }
        Ok(())
    }

    /// Start a new log, reusing a recycled file when one is available.
    fn new_log_writer(&self, wal: &mut WalState) -> Result<(u64, Writer)> {
        self.env().check_writable()?;
        let number = self.next_file_number.fetch_add(1, Ordering::SeqCst);
        let path = filename::log_file_name(&self.options.wal_dir, number);

        if let Some(old) = wal.recycle.pop_front() {
            fs::rename(filename::log_file_name(&self.options.wal_dir, old), &path)?;
            self.record(|s| s.record_wal_recycled());
            self.info_log
                .debug(&format!("reusing log #{old} as #{number}"));
        }

        let writer = Writer::create(&path)?.with_fsync(self.options.use_fsync);
        Ok((number, writer))
    }

    /// Hand an obsolete log to the recycle pool, the archive or the bin.
    fn retire_log(&self, recycle: Option<&mut VecDeque<u64>>, number: u64) -> Result<()> {
        if let Some(pool) = recycle
            && pool.len() < self.options.recycle_log_file_num
        {
            pool.push_back(number);
            return Ok(());
        }

        let path = filename::log_file_name(&self.options.wal_dir, number);
        if self.options.wal_archive.archives() {
            fs::rename(
                &path,
                filename::archived_log_file_name(&self.options.wal_dir, number),
            )?;
            self.record(|s| s.record_wal_archived());
            self.info_log.debug(&format!("archived log #{number}"));
        } else {
            fs::remove_file(&path)?;
            self.record(|s| s.record_wal_deleted(1));
            self.info_log.debug(&format!("deleted log #{number}"));
        }
        Ok(())
    }

    fn sync_wal(&self) -> Result<()> {
        if !self.options.supports_wal_sync {
            return Err(Status::not_supported(
                "sync_wal is not supported with allow_mmap_writes",
            ));
        }
        self.check_bg_error()?;

        let mut wal = self.wal.lock();
        let synced = self
            .env()
            .check_writable()
            .and_then(|_| wal.writer.sync());
        if let Err(e) = synced {
            return Err(self.record_bg_error("WAL sync", e));
        }
        self.record(|s| s.record_wal_sync());
        Ok(())
    }

    fn maybe_schedule_compaction(self: &Arc<Self>) {
        for cf in self.column_families.all() {
            if self.shutting_down.load(Ordering::SeqCst) {
                return;
            }
            if !cf.needs_compaction() {
                continue;
            }

            *self.bg_pending.lock() += 1;
            let inner = Arc::clone(self);
            let cf_id = cf.id();
            let scheduled = self.env().schedule(Priority::Low, move || {
                if !inner.shutting_down.load(Ordering::SeqCst)
                    && let Some(cf) = inner.column_families.get_by_id(cf_id)
                    && cf.needs_compaction()
                    && let Err(e) = inner.compact(&cf)
                {
                    inner.info_log.error(&format!(
                        "[{}] background compaction failed: {e}",
                        cf.name()
                    ));
                }
                inner.finish_background_work();
            });

            if let Err(e) = scheduled {
                self.info_log
                    .error(&format!("failed to schedule compaction: {e}"));
                self.finish_background_work();
            }
        }
    }

    fn finish_background_work(&self) {
        let mut pending = self.bg_pending.lock();
        *pending -= 1;
        if *pending == 0 {
            self.bg_done.notify_all();
        }
    }

    fn wait_for_background_work(&self) {
        let mut pending = self.bg_pending.lock();
        while *pending > 0 {
            self.bg_done.wait(&mut pending);
        }
    }

    /// Merge every table of `cf` into one at the last level.
    fn compact(&self, cf: &Arc<ColumnFamilyData>) -> Result<()> {
        let _flush = self.flush_lock.lock();
        self.check_bg_error()?;
        if cf.is_dropped() {
            return Ok(());
        }

        let inputs = cf.tables();
        let output_level = cf.options().num_levels.saturating_sub(1);
        let already_compacted = inputs.len() == 1
            && inputs[0].level == output_level
            && inputs[0].entries().values().all(Option::is_some);
        if inputs.is_empty() || already_compacted {
            return Ok(());
        }

        // oldest first, so newer versions overwrite older ones
        let mut merged = BTreeMap::new();
        let mut bytes_read = 0;
        for table in inputs.iter().rev() {
            bytes_read += table.size;
            for (key, value) in table.entries() {
                merged.insert(key.clone(), value.clone());
            }
        }
        // nothing older is left for a tombstone to shadow
        merged.retain(|_, value| value.is_some());

        let output = if merged.is_empty() {
            None
        } else {
            let number = self.next_file_number.fetch_add(1, Ordering::SeqCst);
            let table = write_table(
                &self.options,
                number,
                output_level,
                cf.id(),
                merged.into_iter(),
            )
            .map_err(|e| self.record_bg_error("compaction", e))?;
            Some(table)
        };

        let input_numbers: Vec<u64> = inputs.iter().map(|t| t.number).collect();
        let mut edits: Vec<ManifestEdit> = input_numbers
            .iter()
            .map(|number| ManifestEdit::DeleteTable {
                cf_id: cf.id(),
                number: *number,
            })
            .collect();
        if let Some(table) = &output {
            edits.push(ManifestEdit::AddTable {
                cf_id: cf.id(),
                number: table.number,
                level: output_level,
                size: table.size,
            });
        }
        if let Err(e) = self.log_and_apply(edits) {
            if let Some(table) = &output {
                let _ = fs::remove_file(filename::table_file_name(
                    &self.options.db_path,
                    table.number,
                ));
            }
            return Err(self.record_bg_error("compaction", e));
        }

        let bytes_written = output.as_ref().map_or(0, |t| t.size);
        let output_number = output.as_ref().map(|t| t.number);
        if let Some(table) = output {
            cf.add_table(Arc::new(table));
        }
        cf.remove_tables(&input_numbers);

        let deleted = self.delete_table_files(&input_numbers);
        self.record(|s| {
            s.record_compaction(bytes_read, bytes_written, input_numbers.len() as u64);
            s.record_obsolete_files_deleted(deleted);
        });
        self.info_log.info(&format!(
            "[{}] compacted {} tables ({bytes_read} bytes) into {} at level {output_level}",
            cf.name(),
            input_numbers.len(),
            output_number.map_or_else(|| "nothing".to_string(), |n| format!("#{n}")),
        ));
        Ok(())
    }

    fn delete_table_files(&self, numbers: &[u64]) -> u64 {
        let mut deleted = 0;
        for number in numbers {
            let path = filename::table_file_name(&self.options.db_path, *number);
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) => self
                    .info_log
                    .warn(&format!("failed to delete {}: {e}", path.display())),
            }
        }
        deleted
    }

    fn create_column_family(
        &self,
        name: &str,
        mut options: ColumnFamilyOptions,
    ) -> Result<ColumnFamilyHandle> {
        let _flush = self.flush_lock.lock();
        self.check_bg_error()?;

        if self.column_families.get_by_name(name).is_some() {
            return Err(Status::invalid_argument(format!(
                "Column family already exists: {name}"
            )));
        }
        options.sanitize(name)?;

        let id = self.column_families.allocate_id();
        self.log_and_apply(vec![ManifestEdit::NewColumnFamily {
            id,
            name: name.to_string(),
        }])
        .map_err(|e| self.record_bg_error("create column family", e))?;

        let cf = Arc::new(ColumnFamilyData::new(id, name.to_string(), options.clone()));
        self.column_families.insert(Arc::clone(&cf));
        self.refresh_max_total_wal_size();

        self.current_options
            .lock()
            .add_column_family(name, options);
        self.persist_current_options()
            .map_err(|e| self.record_bg_error("OPTIONS write", e))?;

        self.info_log
            .info(&format!("Created column family [{name}] (ID {id})"));
        Ok(cf.handle().clone())
    }

    fn drop_column_family(&self, handle: &ColumnFamilyHandle) -> Result<()> {
        if handle.id() == 0 {
            return Err(Status::invalid_argument(
                "Cannot drop default column family",
            ));
        }

        let _flush = self.flush_lock.lock();
        self.check_bg_error()?;
        let cf = self.live_cf(handle)?;

        self.log_and_apply(vec![ManifestEdit::DropColumnFamily { id: cf.id() }])
            .map_err(|e| self.record_bg_error("drop column family", e))?;
        cf.mark_dropped();
        self.column_families.remove(cf.id());
        self.refresh_max_total_wal_size();

        let numbers: Vec<u64> = cf.tables().iter().map(|t| t.number).collect();
        let deleted = self.delete_table_files(&numbers);
        self.record(|s| s.record_obsolete_files_deleted(deleted));

        self.current_options
            .lock()
            .column_family_overrides_mut()
            .remove(cf.name());
        self.persist_current_options()
            .map_err(|e| self.record_bg_error("OPTIONS write", e))?;

        self.info_log
            .info(&format!("Dropped column family [{}]", cf.name()));
        Ok(())
    }

    /// Caller holds `flush_lock`.
    fn maybe_housekeeping(&self) {
        let now = Instant::now();
        let mut housekeeping = self.housekeeping.lock();

        if let (Some(period), Some(stats)) =
            (self.options.stats_dump_period, &self.options.statistics)
            && now.duration_since(housekeeping.last_stats_dump) >= period
        {
            housekeeping.last_stats_dump = now;
            self.info_log
                .info(&format!("------- DUMPING STATS -------\n{}", stats.report()));
        }

        if now.duration_since(housekeeping.last_obsolete_scan)
            >= self.options.delete_obsolete_files_period
        {
            housekeeping.last_obsolete_scan = now;
            if let Err(e) = self.delete_obsolete_files() {
                self.info_log
                    .warn(&format!("obsolete file scan failed: {e}"));
            }
        }

        if let Some(interval) = self.options.wal_archive.sweep_interval()
            && now.duration_since(housekeeping.last_archive_sweep) >= interval
        {
            housekeeping.last_archive_sweep = now;
            if let Err(e) = self.sweep_wal_archive() {
                self.info_log
                    .warn(&format!("WAL archive sweep failed: {e}"));
            }
        }
    }

    /// Remove files nothing refers to any more. Caller holds `flush_lock`.
    fn delete_obsolete_files(&self) -> Result<()> {
        let (live_tables, manifest_number): (BTreeSet<u64>, u64) = {
            let manifest = self.manifest.lock();
            (manifest.state().live_tables().collect(), manifest.number())
        };

        let mut deleted = 0;
        for file in filename::list_files(&self.options.db_path)? {
            let path = match file {
                FileType::Table(n) if !live_tables.contains(&n) => {
                    filename::table_file_name(&self.options.db_path, n)
                },
                FileType::Manifest(n) if n != manifest_number => {
                    filename::manifest_file_name(&self.options.db_path, n)
                },
                FileType::Temp(n) => filename::temp_file_name(&self.options.db_path, n),
                _ => continue,
            };
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) => self
                    .info_log
                    .warn(&format!("failed to delete {}: {e}", path.display())),
            }
        }

        let mut wal = self.wal.lock();
        let current = wal.number;
        let recycled: Vec<u64> = wal.recycle.iter().copied().collect();
        for number in filename::list_log_files(&self.options.wal_dir)? {
            if number < current && !recycled.contains(&number) {
                let WalState { recycle, .. } = &mut *wal;
                self.retire_log(Some(recycle), number)?;
            }
        }
        drop(wal);

        self.record(|s| s.record_obsolete_files_deleted(deleted));
        if deleted > 0 {
            self.info_log
                .info(&format!("deleted {deleted} obsolete files"));
        }
        Ok(())
    }

    fn sweep_wal_archive(&self) -> Result<usize> {
        let wal_dir = &self.options.wal_dir;
        let mut files = Vec::new();
        for number in filename::list_log_files(&filename::archive_dir(wal_dir))? {
            let meta = fs::metadata(filename::archived_log_file_name(wal_dir, number))?;
            files.push(ArchivedWal {
                number,
                size: meta.len(),
                modified: meta.modified()?,
            });
        }

        let expired = self
            .options
            .wal_archive
            .select_expired(&files, SystemTime::now());
        for number in &expired {
            fs::remove_file(filename::archived_log_file_name(wal_dir, *number))?;
        }

        if !expired.is_empty() {
            self.record(|s| s.record_wal_deleted(expired.len() as u64));
            self.info_log.info(&format!(
                "WAL archive sweep deleted {} of {} logs",
                expired.len(),
                files.len()
            ));
        }
        Ok(expired.len())
    }
}

fn write_table(
    options: &ImmutableDBOptions,
    number: u64,
    level: usize,
    cf_id: u32,
    entries: impl IntoIterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
) -> Result<TableFile> {
    options.env.check_writable()?;
    TableFile::write(
        &filename::table_file_name(&options.db_path, number),
        number,
        level,
        cf_id,
        entries.into_iter().collect(),
        TableWriteOptions {
            use_fsync: options.use_fsync,
            bytes_per_sync: options.bytes_per_sync,
        },
    )
}

/// Replay `logs` into the memtables following the configured recovery mode.
fn replay_logs(
    options: &ImmutableDBOptions,
    logs: &[u64],
    column_families: &ColumnFamilySet,
    info_log: &InfoLog,
) -> Result<Replay> {
    let mode = options.wal_recovery_mode;
    let mut replay = Replay::default();

    'logs: for &number in logs {
        let mut reader = Reader::open(filename::log_file_name(&options.wal_dir, number))?;
        loop {
            let damage = match reader.read_record() {
                Ok(None) => break,
                Ok(Some(data)) => match WalRecord::decode(&data) {
                    Ok(record) => {
                        replay.max_sequence = replay.max_sequence.max(record.sequence);
                        replay.recovered += 1;
                        // records of dropped families are discarded
                        if let Some(cf) = column_families.get_by_id(record.cf_id) {
                            let mem = cf.mem();
                            match &record.value {
                                Some(value) => mem.put(&record.key, value),
                                None => mem.delete(&record.key),
                            }
                        }
                        continue;
                    },
                    Err(e) => e,
                },
                Err(e) => e,
            };

            let truncated = damage.is_incomplete();
            match mode {
                WalRecoveryMode::AbsoluteConsistency => {
                    return Err(Status::corruption(format!("log #{number}: {damage}")));
                },
                WalRecoveryMode::TolerateCorruptedTailRecords if !truncated => {
                    return Err(Status::corruption(format!("log #{number}: {damage}")));
                },
                WalRecoveryMode::TolerateCorruptedTailRecords => {
                    replay.dropped += 1;
                    info_log.warn(&format!("log #{number}: ignoring truncated tail: {damage}"));
                    break;
                },
                WalRecoveryMode::PointInTimeRecovery => {
                    replay.dropped += 1;
                    info_log.warn(&format!(
                        "log #{number}: {damage}; replay stops here, later records are discarded"
                    ));
                    break 'logs;
                },
                WalRecoveryMode::SkipAnyCorruptedRecords => {
                    replay.dropped += 1;
                    info_log.warn(&format!("log #{number}: skipping damaged record: {damage}"));
                },
            }
        }
    }

    Ok(replay)
}
