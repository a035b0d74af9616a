use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    column_family::{ColumnFamilyOptions, DEFAULT_COLUMN_FAMILY_NAME},
    db::filename,
    env::{Env, Priority},
    options::{AccessHint, InfoLogLevel, LogRollPolicy, WalArchivePolicy, WalRecoveryMode},
    statistics::Statistics,
    util::{Result, Status},
};

/// Database-wide options
///
/// A `DBOptions` value is built by the caller through chained setters and
/// handed to `DB::open`, which validates it and copies what it needs. The
/// value can be dropped or reused afterwards; only the statistics enabled
/// through it and the pool sizes of its [`Env`] stay connected to the open
/// engine.
///
/// Column family tuning composes rather than inherits: the options embed a
/// base [`ColumnFamilyOptions`] plus named overrides. A family without an
/// override is opened with the base.
///
/// Numeric setters accept any value; range problems are reported when the
/// database is opened. Setters taking a raw integer for a closed enum reject
/// unknown values immediately.
///
/// # Example
///
/// ```
/// use rucksdb_options::{DBOptions, WalRecoveryMode};
///
/// let mut options = DBOptions::default();
/// options
///     .set_create_if_missing(true)
///     .increase_parallelism(4)
///     .set_wal_recovery_mode(WalRecoveryMode::AbsoluteConsistency)
///     .set_keep_log_file_num(10);
///
/// assert!(options.create_if_missing());
/// assert_eq!(options.max_background_compactions(), 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DBOptions {
    // creation policy
    create_if_missing: bool,
    create_missing_column_families: bool,
    error_if_exists: bool,

    // consistency
    paranoid_checks: bool,

    // files and threads
    max_open_files: i32,
    max_file_opening_threads: i32,
    base_background_compactions: i32,
    max_background_compactions: i32,
    max_background_flushes: i32,
    allow_concurrent_memtable_write: bool,
    enable_write_thread_adaptive_yield: bool,
    use_adaptive_mutex: bool,
    // pool sizes handed to the env at open
    low_pool_threads: Option<usize>,
    high_pool_threads: Option<usize>,

    // info LOG
    db_log_dir: String,
    info_log_level: InfoLogLevel,
    max_log_file_size: u64,
    log_file_time_to_roll: u64,
    keep_log_file_num: u64,
    stats_dump_period_sec: u32,

    // WAL
    wal_dir: String,
    wal_ttl_seconds: u64,
    wal_size_limit_mb: u64,
    recycle_log_file_num: u64,
    max_total_wal_size: u64,
    wal_recovery_mode: WalRecoveryMode,

    // MANIFEST
    max_manifest_file_size: u64,
    manifest_preallocation_size: u64,

    // I/O strategy
    allow_mmap_reads: bool,
    allow_mmap_writes: bool,
    use_direct_reads: bool,
    use_direct_io_for_flush_and_compaction: bool,
    is_fd_close_on_exec: bool,
    advise_random_on_open: bool,
    access_hint_on_compaction_start: AccessHint,

    // durability cadence
    use_fsync: bool,
    bytes_per_sync: u64,
    delete_obsolete_files_period_micros: u64,

    db_write_buffer_size: u64,
    table_cache_numshardbits: i32,
    skip_stats_update_on_db_open: bool,

    // column families
    cf: ColumnFamilyOptions,
    column_families: BTreeMap<String, ColumnFamilyOptions>,

    #[serde(skip)]
    statistics: Option<Arc<Statistics>>,
    #[serde(skip, default = "Env::default_env")]
    env: Arc<Env>,
}

impl Default for DBOptions {
    fn default() -> Self {
        DBOptions {
            create_if_missing: false,
            create_missing_column_families: false,
            error_if_exists: false,
            paranoid_checks: true,
            max_open_files: -1,
            max_file_opening_threads: 16,
            base_background_compactions: 1,
            max_background_compactions: 1,
            max_background_flushes: 1,
            allow_concurrent_memtable_write: true,
            enable_write_thread_adaptive_yield: true,
            use_adaptive_mutex: false,
            low_pool_threads: None,
            high_pool_threads: None,
            db_log_dir: String::new(),
            info_log_level: InfoLogLevel::Info,
            max_log_file_size: 0,
            log_file_time_to_roll: 0,
            keep_log_file_num: 1000,
            stats_dump_period_sec: 600,
            wal_dir: String::new(),
            wal_ttl_seconds: 0,
            wal_size_limit_mb: 0,
            recycle_log_file_num: 0,
            max_total_wal_size: 0,
            wal_recovery_mode: WalRecoveryMode::PointInTimeRecovery,
            max_manifest_file_size: u64::MAX,
            manifest_preallocation_size: 4 * 1024 * 1024,
            allow_mmap_reads: false,
            allow_mmap_writes: false,
            use_direct_reads: false,
            use_direct_io_for_flush_and_compaction: false,
            is_fd_close_on_exec: true,
            advise_random_on_open: true,
            access_hint_on_compaction_start: AccessHint::Normal,
            use_fsync: false,
            bytes_per_sync: 0,
            delete_obsolete_files_period_micros: 6 * 60 * 60 * 1_000_000,
            db_write_buffer_size: 0,
            table_cache_numshardbits: 6,
            skip_stats_update_on_db_open: false,
            cf: ColumnFamilyOptions::default(),
            column_families: BTreeMap::new(),
            statistics: None,
            env: Env::default_env(),
        }
    }
}

impl DBOptions {
    /// Request a LOW pool of `total_threads` for compactions and one HIGH
    /// thread for flushes.
    ///
    /// The pool sizes are applied to the [`Env`] when a database is opened
    /// with these options; after that `Env::set_background_threads` adjusts
    /// them live. A good value is the number of cores.
    pub fn increase_parallelism(&mut self, total_threads: i32) -> &mut Self {
        let total = total_threads.max(1);
        self.low_pool_threads = Some(total as usize);
        self.high_pool_threads = Some(1);
        self.max_background_compactions = (total - 1).max(1);
        self.max_background_flushes = 1;
        self
    }

    /// Create the database directory and files when they are missing.
    ///
    /// Also decides how named column families are treated when the database
    /// is brand new: they are all created with it.
    /// Default: false
    pub fn set_create_if_missing(&mut self, value: bool) -> &mut Self {
        self.create_if_missing = value;
        self
    }

    /// Default: false
    pub fn set_create_missing_column_families(&mut self, value: bool) -> &mut Self {
        self.create_missing_column_families = value;
        self
    }

    /// Default: false
    pub fn set_error_if_exists(&mut self, value: bool) -> &mut Self {
        self.error_if_exists = value;
        self
    }

    /// When set, a failed write moves the engine into read-only mode and all
    /// later writes fail until it is reopened. Open also refuses a database
    /// whose table files are missing.
    /// Default: true
    pub fn set_paranoid_checks(&mut self, value: bool) -> &mut Self {
        self.paranoid_checks = value;
        self
    }

    /// Use `env` for background work. Default: [`Env::default_env`]
    pub fn set_env(&mut self, env: Arc<Env>) -> &mut Self {
        self.env = env;
        self
    }

    /// -1 keeps every file open. Default: -1
    pub fn set_max_open_files(&mut self, value: i32) -> &mut Self {
        self.max_open_files = value;
        self
    }

    /// Default: 16
    pub fn set_max_file_opening_threads(&mut self, value: i32) -> &mut Self {
        self.max_file_opening_threads = value;
        self
    }

    /// Once live WAL files exceed this size, memtables are flushed so the
    /// oldest logs can be released. 0 means 4 times the sum over column
    /// families of `write_buffer_size * max_write_buffer_number`.
    /// Default: 0
    pub fn set_max_total_wal_size(&mut self, value: u64) -> &mut Self {
        self.max_total_wal_size = value;
        self
    }

    /// Default: `PointInTimeRecovery`
    pub fn set_wal_recovery_mode(&mut self, mode: WalRecoveryMode) -> &mut Self {
        self.wal_recovery_mode = mode;
        self
    }

    /// Raw-integer form of [`DBOptions::set_wal_recovery_mode`], writing the
    /// same field. Unknown values are rejected and leave it unchanged.
    #[deprecated(note = "use set_wal_recovery_mode with WalRecoveryMode")]
    pub fn set_wal_recovery_mode_raw(&mut self, mode: i32) -> Result<&mut Self> {
        self.wal_recovery_mode = WalRecoveryMode::try_from(mode)?;
        Ok(self)
    }

    /// Start collecting statistics; they become readable through
    /// [`DBOptions::get_statistics_string`] and `DB::statistics`.
    ///
    /// Calling it again keeps the counters already collected.
    pub fn enable_statistics(&mut self) -> &mut Self {
        if self.statistics.is_none() {
            self.statistics = Some(Arc::new(Statistics::new()));
        }
        self
    }

    /// Skip loading table metadata for statistics at open.
    /// Default: false
    pub fn set_skip_stats_update_on_db_open(&mut self, value: bool) -> &mut Self {
        self.skip_stats_update_on_db_open = value;
        self
    }

    /// Human readable statistics report, `None` when statistics were never
    /// enabled on these options.
    pub fn get_statistics_string(&self) -> Option<String> {
        self.statistics.as_ref().map(|stats| stats.report())
    }

    /// Maximum concurrent compactions on the LOW pool.
    /// Default: 1
    pub fn set_max_background_compactions(&mut self, value: i32) -> &mut Self {
        self.max_background_compactions = value;
        self
    }

    /// Compactions scheduled before growing toward the maximum; must not
    /// exceed `max_background_compactions`.
    /// Default: 1
    pub fn set_base_background_compactions(&mut self, value: i32) -> &mut Self {
        self.base_background_compactions = value;
        self
    }

    /// Maximum concurrent flushes. A positive value moves flushes to the
    /// HIGH pool so long compactions cannot block them.
    /// Default: 1
    pub fn set_max_background_flushes(&mut self, value: i32) -> &mut Self {
        self.max_background_flushes = value;
        self
    }

    /// Roll the info LOG at this size, 0 writes a single file.
    /// Default: 0
    pub fn set_max_log_file_size(&mut self, value: u64) -> &mut Self {
        self.max_log_file_size = value;
        self
    }

    /// Roll the info LOG after this many seconds, 0 disables.
    /// Default: 0
    pub fn set_log_file_time_to_roll(&mut self, value: u64) -> &mut Self {
        self.log_file_time_to_roll = value;
        self
    }

    /// Rolled info LOG files kept. Default: 1000
    pub fn set_keep_log_file_num(&mut self, value: u64) -> &mut Self {
        self.keep_log_file_num = value;
        self
    }

    /// Default: `Info`
    pub fn set_info_log_level(&mut self, level: InfoLogLevel) -> &mut Self {
        self.info_log_level = level;
        self
    }

    /// Obsolete WAL files kept for reuse instead of being deleted.
    /// Default: 0
    pub fn set_recycle_log_file_num(&mut self, value: u64) -> &mut Self {
        self.recycle_log_file_num = value;
        self
    }

    /// The MANIFEST is rolled over past this size and the old one deleted.
    /// Default: u64::MAX (never)
    pub fn set_max_manifest_file_size(&mut self, value: u64) -> &mut Self {
        self.max_manifest_file_size = value;
        self
    }

    /// Default: 6
    pub fn set_table_cache_numshardbits(&mut self, value: i32) -> &mut Self {
        self.table_cache_numshardbits = value;
        self
    }

    /// Retained for source compatibility, has no effect.
    #[deprecated(note = "the table cache no longer scans on removal")]
    pub fn set_table_cache_remove_scan_count_limit(&mut self, _value: i32) -> &mut Self {
        self
    }

    /// fsync instead of fdatasync on every sync. Prefer it on file systems
    /// that can lose files after a reboot.
    /// Default: false
    pub fn set_use_fsync(&mut self, value: bool) -> &mut Self {
        self.use_fsync = value;
        self
    }

    /// Info LOG directory; empty means the database directory.
    pub fn set_db_log_dir(&mut self, value: impl Into<String>) -> &mut Self {
        self.db_log_dir = value.into();
        self
    }

    /// WAL directory; empty means the database directory.
    ///
    /// A distinct WAL directory is removed entirely, with whatever else it
    /// holds, by `DB::destroy`. Give each database its own directory and
    /// never a parent of the database path.
    pub fn set_wal_dir(&mut self, value: impl Into<String>) -> &mut Self {
        self.wal_dir = value.into();
        self
    }

    /// See [`WalArchivePolicy`]. Default: 0
    pub fn set_wal_ttl_seconds(&mut self, value: u64) -> &mut Self {
        self.wal_ttl_seconds = value;
        self
    }

    /// See [`WalArchivePolicy`]. Default: 0
    pub fn set_wal_size_limit_mb(&mut self, value: u64) -> &mut Self {
        self.wal_size_limit_mb = value;
        self
    }

    /// Default: 4MB
    pub fn set_manifest_preallocation_size(&mut self, value: u64) -> &mut Self {
        self.manifest_preallocation_size = value;
        self
    }

    /// Default: false
    pub fn set_allow_mmap_reads(&mut self, value: bool) -> &mut Self {
        self.allow_mmap_reads = value;
        self
    }

    /// Memory-mapped writes; `DB::sync_wal` is only available without them.
    /// Default: false
    pub fn set_allow_mmap_writes(&mut self, value: bool) -> &mut Self {
        self.allow_mmap_writes = value;
        self
    }

    /// Default: false
    pub fn set_use_direct_reads(&mut self, value: bool) -> &mut Self {
        self.use_direct_reads = value;
        self
    }

    /// Direct I/O for flush and compaction; also forces new table readers
    /// for compaction inputs.
    /// Default: false
    pub fn set_use_direct_io_for_flush_and_compaction(&mut self, value: bool) -> &mut Self {
        self.use_direct_io_for_flush_and_compaction = value;
        self
    }

    /// Default: true
    pub fn set_is_fd_close_on_exec(&mut self, value: bool) -> &mut Self {
        self.is_fd_close_on_exec = value;
        self
    }

    /// Dump statistics to the info LOG every `value` seconds, 0 disables.
    /// Default: 600
    pub fn set_stats_dump_period_sec(&mut self, value: u32) -> &mut Self {
        self.stats_dump_period_sec = value;
        self
    }

    /// Default: true
    pub fn set_advise_random_on_open(&mut self, value: bool) -> &mut Self {
        self.advise_random_on_open = value;
        self
    }

    /// Memtable budget across all column families, 0 disables.
    /// Default: 0
    pub fn set_db_write_buffer_size(&mut self, size: u64) -> &mut Self {
        self.db_write_buffer_size = size;
        self
    }

    /// Default: `Normal`
    pub fn set_access_hint_on_compaction_start(&mut self, hint: AccessHint) -> &mut Self {
        self.access_hint_on_compaction_start = hint;
        self
    }

    /// Raw-integer form of
    /// [`DBOptions::set_access_hint_on_compaction_start`]. Unknown values are
    /// rejected and leave the field unchanged.
    pub fn set_access_hint_on_compaction_start_raw(&mut self, value: i32) -> Result<&mut Self> {
        self.access_hint_on_compaction_start = AccessHint::try_from(value)?;
        Ok(self)
    }

    /// Default: false
    pub fn set_use_adaptive_mutex(&mut self, value: bool) -> &mut Self {
        self.use_adaptive_mutex = value;
        self
    }

    /// Sync table files incrementally every `value` bytes, 0 disables.
    /// Default: 0
    pub fn set_bytes_per_sync(&mut self, value: u64) -> &mut Self {
        self.bytes_per_sync = value;
        self
    }

    /// Default: true
    pub fn set_allow_concurrent_memtable_write(&mut self, value: bool) -> &mut Self {
        self.allow_concurrent_memtable_write = value;
        self
    }

    /// Default: true
    pub fn set_enable_write_thread_adaptive_yield(&mut self, value: bool) -> &mut Self {
        self.enable_write_thread_adaptive_yield = value;
        self
    }

    /// How often unreferenced files are looked for. Files made obsolete by
    /// a compaction are deleted right away regardless.
    /// Default: 6 hours
    pub fn set_delete_obsolete_files_period_micros(&mut self, value: u64) -> &mut Self {
        self.delete_obsolete_files_period_micros = value;
        self
    }

    /// Tune for a single bulk ingestion pass
    ///
    /// All data lands in level 0 and automatic compaction is disabled; run
    /// `DB::compact_range_cf` once loading is done, reads are slow until then.
    /// Overrides any earlier value of the knobs it touches, including those
    /// of named column families added so far.
    pub fn prepare_for_bulk_load(&mut self) -> &mut Self {
        self.cf.apply_bulk_load();
        for options in self.column_families.values_mut() {
            options.apply_bulk_load();
        }
        // more parallel flushes make up for the missing compactions
        self.max_background_flushes = 4;
        self
    }

    // Column family composition

    pub fn cf_options(&self) -> &ColumnFamilyOptions {
        &self.cf
    }

    pub fn cf_options_mut(&mut self) -> &mut ColumnFamilyOptions {
        &mut self.cf
    }

    /// Register a named column family with its own options. The name
    /// `default` replaces the base options.
    pub fn add_column_family(
        &mut self,
        name: impl Into<String>,
        options: ColumnFamilyOptions,
    ) -> &mut Self {
        let name = name.into();
        if name == DEFAULT_COLUMN_FAMILY_NAME {
            self.cf = options;
        } else {
            self.column_families.insert(name, options);
        }
        self
    }

    /// Options a column family is opened with: its override, else the base.
    pub fn column_family_options(&self, name: &str) -> &ColumnFamilyOptions {
        self.column_families.get(name).unwrap_or(&self.cf)
    }

    /// Names of the registered non-default column families.
    pub fn column_family_names(&self) -> impl Iterator<Item = &str> {
        self.column_families.keys().map(String::as_str)
    }

    pub fn set_write_buffer_size(&mut self, size: usize) -> &mut Self {
        self.cf.set_write_buffer_size(size);
        self
    }

    pub fn set_max_write_buffer_number(&mut self, n: usize) -> &mut Self {
        self.cf.set_max_write_buffer_number(n);
        self
    }

    pub fn set_disable_auto_compactions(&mut self, value: bool) -> &mut Self {
        self.cf.set_disable_auto_compactions(value);
        self
    }

    pub fn set_level0_file_num_compaction_trigger(&mut self, n: usize) -> &mut Self {
        self.cf.set_level0_file_num_compaction_trigger(n);
        self
    }

    pub fn set_num_levels(&mut self, n: usize) -> &mut Self {
        self.cf.set_num_levels(n);
        self
    }

    // Getters

    pub fn create_if_missing(&self) -> bool {
        self.create_if_missing
    }

    pub fn create_missing_column_families(&self) -> bool {
        self.create_missing_column_families
    }

    pub fn error_if_exists(&self) -> bool {
        self.error_if_exists
    }

    pub fn paranoid_checks(&self) -> bool {
        self.paranoid_checks
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn statistics(&self) -> Option<&Arc<Statistics>> {
        self.statistics.as_ref()
    }

    pub fn max_open_files(&self) -> i32 {
        self.max_open_files
    }

    pub fn max_file_opening_threads(&self) -> i32 {
        self.max_file_opening_threads
    }

    pub fn base_background_compactions(&self) -> i32 {
        self.base_background_compactions
    }

    pub fn max_background_compactions(&self) -> i32 {
        self.max_background_compactions
    }

    pub fn max_background_flushes(&self) -> i32 {
        self.max_background_flushes
    }

    /// Pool size requested for `priority`, if any; `None` leaves the env as is.
    pub fn background_threads(&self, priority: Priority) -> Option<usize> {
        match priority {
            Priority::Low => self.low_pool_threads,
            Priority::High => self.high_pool_threads,
        }
    }

    pub fn allow_concurrent_memtable_write(&self) -> bool {
        self.allow_concurrent_memtable_write
    }

    pub fn enable_write_thread_adaptive_yield(&self) -> bool {
        self.enable_write_thread_adaptive_yield
    }

    pub fn use_adaptive_mutex(&self) -> bool {
        self.use_adaptive_mutex
    }

    pub fn db_log_dir(&self) -> &str {
        &self.db_log_dir
    }

    pub fn info_log_level(&self) -> InfoLogLevel {
        self.info_log_level
    }

    pub fn max_log_file_size(&self) -> u64 {
        self.max_log_file_size
    }

    pub fn log_file_time_to_roll(&self) -> u64 {
        self.log_file_time_to_roll
    }

    pub fn keep_log_file_num(&self) -> u64 {
        self.keep_log_file_num
    }

    pub fn stats_dump_period_sec(&self) -> u32 {
        self.stats_dump_period_sec
    }

    pub fn wal_dir(&self) -> &str {
        &self.wal_dir
    }

    pub fn wal_ttl_seconds(&self) -> u64 {
        self.wal_ttl_seconds
    }

    pub fn wal_size_limit_mb(&self) -> u64 {
        self.wal_size_limit_mb
    }

    pub fn recycle_log_file_num(&self) -> u64 {
        self.recycle_log_file_num
    }

    pub fn max_total_wal_size(&self) -> u64 {
        self.max_total_wal_size
    }

    pub fn wal_recovery_mode(&self) -> WalRecoveryMode {
        self.wal_recovery_mode
    }

    pub fn max_manifest_file_size(&self) -> u64 {
        self.max_manifest_file_size
    }

    pub fn manifest_preallocation_size(&self) -> u64 {
        self.manifest_preallocation_size
    }

    pub fn allow_mmap_reads(&self) -> bool {
        self.allow_mmap_reads
    }

    pub fn allow_mmap_writes(&self) -> bool {
        self.allow_mmap_writes
    }

    pub fn use_direct_reads(&self) -> bool {
        self.use_direct_reads
    }

    pub fn use_direct_io_for_flush_and_compaction(&self) -> bool {
        self.use_direct_io_for_flush_and_compaction
    }

    pub fn is_fd_close_on_exec(&self) -> bool {
        self.is_fd_close_on_exec
    }

    pub fn advise_random_on_open(&self) -> bool {
        self.advise_random_on_open
    }

    pub fn access_hint_on_compaction_start(&self) -> AccessHint {
        self.access_hint_on_compaction_start
    }

    pub fn use_fsync(&self) -> bool {
        self.use_fsync
    }

    pub fn bytes_per_sync(&self) -> u64 {
        self.bytes_per_sync
    }

    pub fn delete_obsolete_files_period_micros(&self) -> u64 {
        self.delete_obsolete_files_period_micros
    }

    pub fn db_write_buffer_size(&self) -> u64 {
        self.db_write_buffer_size
    }

    pub fn table_cache_numshardbits(&self) -> i32 {
        self.table_cache_numshardbits
    }

    pub fn skip_stats_update_on_db_open(&self) -> bool {
        self.skip_stats_update_on_db_open
    }

    // Derived settings, not independently settable

    /// Compaction inputs get dedicated table readers whenever flush and
    /// compaction use direct I/O.
    pub fn new_table_reader_for_compaction_inputs(&self) -> bool {
        self.use_direct_io_for_flush_and_compaction
    }

    pub fn supports_wal_sync(&self) -> bool {
        !self.allow_mmap_writes
    }

    pub fn flush_priority(&self) -> Priority {
        if self.max_background_flushes > 0 {
            Priority::High
        } else {
            Priority::Low
        }
    }

    pub fn wal_archive_policy(&self) -> WalArchivePolicy {
        WalArchivePolicy::from_limits(self.wal_ttl_seconds, self.wal_size_limit_mb)
    }

    pub fn log_roll_policy(&self) -> LogRollPolicy {
        LogRollPolicy {
            max_log_file_size: self.max_log_file_size,
            log_file_time_to_roll: self.log_file_time_to_roll,
            keep_log_file_num: self.keep_log_file_num,
        }
    }

    pub(crate) fn column_family_overrides(&self) -> &BTreeMap<String, ColumnFamilyOptions> {
        &self.column_families
    }

    pub(crate) fn column_family_overrides_mut(
        &mut self,
    ) -> &mut BTreeMap<String, ColumnFamilyOptions> {
        &mut self.column_families
    }
}

/// Read back the options the database at `db_path` was last opened with.
///
/// Runtime objects are not persisted: the result has statistics disabled
/// and uses the default [`Env`].
pub fn load_latest_options(db_path: impl AsRef<Path>) -> Result<DBOptions> {
    let db_path = db_path.as_ref();
    let latest = filename::list_options_files(db_path)?
        .into_iter()
        .max()
        .ok_or_else(|| {
            Status::not_found(format!("no OPTIONS file in {}", db_path.display()))
        })?;

    let data = fs::read(filename::options_file_name(db_path, latest))?;
    let options: DBOptions = serde_json::from_slice(&data)?;
    Ok(options)
}

/// Write `OPTIONS-<number>` and remove the older ones.
pub(crate) fn persist_options(db_path: &Path, number: u64, options: &DBOptions) -> Result<()> {
    let data = serde_json::to_vec_pretty(options)?;
    let path = filename::options_file_name(db_path, number);
    let tmp = filename::temp_file_name(db_path, number);
    fs::write(&tmp, data)?;
    fs::rename(&tmp, &path)?;

    for old in filename::list_options_files(db_path)? {
        if old < number {
            let old_path = filename::options_file_name(db_path, old);
            if let Err(e) = fs::remove_file(&old_path) {
                log::warn!("failed to remove {}: {e}", old_path.display());
            }
        }
    }
    Ok(())
}
