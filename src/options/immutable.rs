use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    column_family::{ColumnFamilyOptions, DEFAULT_COLUMN_FAMILY_NAME},
    env::{Env, Priority},
    options::{DBOptions, InfoLogLevel, LogRollPolicy, WalArchivePolicy, WalRecoveryMode},
    statistics::Statistics,
    util::{Result, Status},
};

const MIN_OPEN_FILES: i32 = 20;
const MAX_OPEN_FILES: i32 = 0x400000;

/// The configuration an open engine runs with
///
/// Built once by [`ImmutableDBOptions::resolve`] from the caller's
/// [`DBOptions`]: conflicting settings are rejected, repairable ones are
/// sanitized and logged, and paths are made concrete. Nothing here changes
/// for the lifetime of the engine; statistics and the [`Env`] pools are
/// shared objects and stay live.
#[derive(Debug, Clone)]
pub struct ImmutableDBOptions {
    pub db_path: PathBuf,
    pub wal_dir: PathBuf,
    pub db_log_dir: Option<PathBuf>,

    pub create_if_missing: bool,
    pub create_missing_column_families: bool,
    pub error_if_exists: bool,
    pub paranoid_checks: bool,

    pub max_open_files: i32,
    pub max_background_compactions: i32,
    pub max_background_flushes: i32,
    pub flush_priority: Priority,
    pub low_pool_threads: Option<usize>,
    pub high_pool_threads: Option<usize>,

    pub info_log_level: InfoLogLevel,
    pub log_roll: LogRollPolicy,
    pub stats_dump_period: Option<Duration>,

    pub wal_archive: WalArchivePolicy,
    pub recycle_log_file_num: usize,
    pub max_total_wal_size: u64,
    pub wal_recovery_mode: WalRecoveryMode,
    pub supports_wal_sync: bool,

    pub max_manifest_file_size: u64,
    pub use_fsync: bool,
    pub bytes_per_sync: u64,
    pub delete_obsolete_files_period: Duration,

    pub statistics: Option<Arc<Statistics>>,
    pub env: Arc<Env>,

    /// Sanitized copy of the caller's options, persisted and dumped at open.
    pub source: DBOptions,
}

impl ImmutableDBOptions {
    /// Validate `options` for a database at `db_path`.
    pub fn resolve(db_path: &Path, options: &DBOptions) -> Result<ImmutableDBOptions> {
        if options.create_if_missing() && options.error_if_exists() {
            return Err(Status::invalid_argument(
                "create_if_missing and error_if_exists are mutually exclusive",
            ));
        }
        if options.base_background_compactions() > options.max_background_compactions() {
            return Err(Status::invalid_argument(format!(
                "base_background_compactions ({}) exceeds max_background_compactions ({})",
                options.base_background_compactions(),
                options.max_background_compactions()
            )));
        }
        if options.keep_log_file_num() == 0 {
            return Err(Status::invalid_argument(
                "keep_log_file_num must be greater than 0",
            ));
        }
        if options.allow_mmap_reads() && options.use_direct_reads() {
            return Err(Status::not_supported(
                "allow_mmap_reads cannot be combined with use_direct_reads",
            ));
        }
        if options.allow_mmap_writes() && options.use_direct_io_for_flush_and_compaction() {
            return Err(Status::not_supported(
                "allow_mmap_writes cannot be combined with use_direct_io_for_flush_and_compaction",
            ));
        }

        let mut source = options.clone();

        source.cf_options_mut().sanitize(DEFAULT_COLUMN_FAMILY_NAME)?;
        for (name, cf) in source.column_family_overrides_mut() {
            cf.sanitize(name)?;
        }

        let wal_archive = source.wal_archive_policy();
        if wal_archive.archives() && source.recycle_log_file_num() > 0 {
            log::warn!(
                "recycle_log_file_num {} ignored while WAL archiving is enabled",
                source.recycle_log_file_num()
            );
            source.set_recycle_log_file_num(0);
        }

        let max_open_files = source.max_open_files();
        if max_open_files != -1 {
            let clamped = max_open_files.clamp(MIN_OPEN_FILES, MAX_OPEN_FILES);
            if clamped != max_open_files {
                log::warn!("max_open_files {max_open_files} clamped to {clamped}");
                source.set_max_open_files(clamped);
            }
        }

        let wal_dir = if source.wal_dir().is_empty() {
            db_path.to_path_buf()
        } else {
            PathBuf::from(source.wal_dir())
        };
        let db_log_dir = if source.db_log_dir().is_empty() {
            None
        } else {
            Some(PathBuf::from(source.db_log_dir()))
        };

        let stats_dump_period = match source.stats_dump_period_sec() {
            0 => None,
            secs => Some(Duration::from_secs(secs as u64)),
        };

        Ok(ImmutableDBOptions {
            db_path: db_path.to_path_buf(),
            wal_dir,
            db_log_dir,
            create_if_missing: source.create_if_missing(),
            create_missing_column_families: source.create_missing_column_families(),
            error_if_exists: source.error_if_exists(),
            paranoid_checks: source.paranoid_checks(),
            max_open_files: source.max_open_files(),
            max_background_compactions: source.max_background_compactions(),
            max_background_flushes: source.max_background_flushes(),
            flush_priority: source.flush_priority(),
            low_pool_threads: source.background_threads(Priority::Low),
            high_pool_threads: source.background_threads(Priority::High),
            info_log_level: source.info_log_level(),
            log_roll: source.log_roll_policy(),
            stats_dump_period,
            wal_archive,
            recycle_log_file_num: source.recycle_log_file_num() as usize,
            max_total_wal_size: source.max_total_wal_size(),
            wal_recovery_mode: source.wal_recovery_mode(),
            supports_wal_sync: source.supports_wal_sync(),
            max_manifest_file_size: source.max_manifest_file_size(),
            use_fsync: source.use_fsync(),
            bytes_per_sync: source.bytes_per_sync(),
            delete_obsolete_files_period: Duration::from_micros(
                source.delete_obsolete_files_period_micros(),
            ),
            statistics: source.statistics().cloned(),
            env: Arc::clone(source.env()),
            source,
        })
    }

    /// Size the env pools as requested through `increase_parallelism`.
    pub fn apply_background_threads(&self) {
        let requested = [
            (Priority::Low, self.low_pool_threads),
            (Priority::High, self.high_pool_threads),
        ];
        for (priority, threads) in requested {
            if let Some(threads) = threads {
                self.env.set_background_threads(threads, priority);
            }
        }
    }

    pub fn wal_dir_is_distinct(&self) -> bool {
        self.wal_dir != self.db_path
    }

    /// Options for column family `name`: its registered override or the base.
    pub fn cf_options(&self, name: &str) -> &ColumnFamilyOptions {
        self.source.column_family_options(name)
    }

    pub fn registered_column_families(&self) -> &BTreeMap<String, ColumnFamilyOptions> {
        self.source.column_family_overrides()
    }

    /// Limit on live WAL bytes; 0 resolves against the open families.
    pub fn effective_max_total_wal_size<'a>(
        &self,
        families: impl Iterator<Item = &'a ColumnFamilyOptions>,
    ) -> u64 {
        if self.max_total_wal_size > 0 {
            return self.max_total_wal_size;
        }
        let buffers: u64 = families
            .map(|cf| (cf.write_buffer_size as u64).saturating_mul(cf.max_write_buffer_number as u64))
            .fold(0, u64::saturating_add);
        buffers.saturating_mul(4)
    }

    /// `Options.<name>: <value>` lines for the info LOG.
    pub fn dump(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let value = match serde_json::to_value(&self.source) {
            Ok(value) => value,
            Err(e) => return vec![format!("Options: failed to serialize: {e}")],
        };
        let serde_json::Value::Object(fields) = value else {
            return lines;
        };

        for (name, value) in fields {
            match (name.as_str(), value) {
                ("cf", cf) => dump_cf(&mut lines, DEFAULT_COLUMN_FAMILY_NAME, &cf),
                ("column_families", serde_json::Value::Object(families)) => {
                    for (cf_name, cf) in families {
                        dump_cf(&mut lines, &cf_name, &cf);
                    }
                },
                (_, value) => lines.push(format!("Options.{name}: {}", plain(&value))),
            }
        }
        lines.push(format!(
            "Options.wal_dir (resolved): {}",
            self.wal_dir.display()
        ));
        lines.push(format!(
            "Options.statistics: {}",
            if self.statistics.is_some() { "enabled" } else { "disabled" }
        ));
        lines
    }
}

fn dump_cf(lines: &mut Vec<String>, cf_name: &str, cf: &serde_json::Value) {
    if let serde_json::Value::Object(fields) = cf {
        for (name, value) in fields {
            lines.push(format!("Options.cf[{cf_name}].{name}: {}", plain(value)));
        }
    }
}

fn plain(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}
