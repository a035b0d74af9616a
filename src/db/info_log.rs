use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;

use crate::{
    db::filename,
    options::{InfoLogLevel, LogRollPolicy},
    statistics::Statistics,
    util::Result,
};

struct ActiveLog {
    file: File,
    size: u64,
    opened_at: Instant,
}

/// The engine's own human-readable log file
///
/// Lines are also forwarded to the `log` facade. The file is rolled when
/// it grows past the size or age limit, and only the newest
/// `keep_log_file_num` rolled files are kept.
pub struct InfoLog {
    dir: PathBuf,
    base: String,
    level: InfoLogLevel,
    policy: LogRollPolicy,
    statistics: Option<Arc<Statistics>>,
    active: Mutex<ActiveLog>,
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}

impl InfoLog {
    /// Start a fresh info LOG, rolling the one a previous open left behind.
    pub fn open(
        db_path: &Path,
        db_log_dir: Option<&Path>,
        level: InfoLogLevel,
        policy: LogRollPolicy,
        statistics: Option<Arc<Statistics>>,
    ) -> Result<InfoLog> {
        let (dir, base) = filename::info_log_file_name(db_path, db_log_dir);
        fs::create_dir_all(&dir)?;

        let path = dir.join(&base);
        if path.exists() {
            rename_to_old(&dir, &base)?;
        }

        let log = InfoLog {
            active: Mutex::new(ActiveLog {
                file: create(&path)?,
                size: 0,
                opened_at: Instant::now(),
            }),
            dir,
            base,
            level,
            policy,
            statistics,
        };
        log.purge_old()?;
        Ok(log)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.base)
    }

    pub fn header(&self, msg: &str) {
        self.write(InfoLogLevel::Header, msg);
    }

    pub fn debug(&self, msg: &str) {
        self.write(InfoLogLevel::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        self.write(InfoLogLevel::Info, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.write(InfoLogLevel::Warn, msg);
    }

    pub fn error(&self, msg: &str) {
        self.write(InfoLogLevel::Error, msg);
    }

    fn write(&self, level: InfoLogLevel, msg: &str) {
        log::log!(level.to_log_level(), "{msg}");

        if level != InfoLogLevel::Header && level < self.level {
            return;
        }

        let micros = now_micros();
        let line = format!(
            "{}.{:06} {:>6} {msg}\n",
            micros / 1_000_000,
            micros % 1_000_000,
            level.as_str()
        );

        let mut active = self.active.lock();
        if let Err(e) = active.file.write_all(line.as_bytes()) {
            log::error!("failed to write info LOG {}: {e}", self.path().display());
            return;
        }
        active.size += line.len() as u64;

        if self
            .policy
            .should_roll(active.size, active.opened_at.elapsed())
        {
            if let Err(e) = self.roll(&mut active) {
                log::error!("failed to roll info LOG {}: {e}", self.path().display());
            }
        }
    }

    fn roll(&self, active: &mut ActiveLog) -> Result<()> {
        rename_to_old(&self.dir, &self.base)?;
        *active = ActiveLog {
            file: create(&self.path())?,
            size: 0,
            opened_at: Instant::now(),
        };
        if let Some(stats) = &self.statistics {
            stats.record_info_log_roll();
        }
        self.purge_old()
    }

    fn purge_old(&self) -> Result<()> {
        let rolled = filename::list_old_info_logs(&self.dir, &self.base)?;
        for stamp in self.policy.select_purge(rolled) {
            let path = filename::old_info_log_file_name(&self.dir, &self.base, stamp);
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("failed to remove {}: {e}", path.display());
            }
        }
        Ok(())
    }
}

fn create(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?)
}

fn rename_to_old(dir: &Path, base: &str) -> Result<()> {
    let mut stamp = now_micros();
    // two rolls within one microsecond must not collide
    while filename::old_info_log_file_name(dir, base, stamp).exists() {
        stamp += 1;
    }
    fs::rename(
        dir.join(base),
        filename::old_info_log_file_name(dir, base, stamp),
    )?;
    Ok(())
}

impl std::fmt::Debug for InfoLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoLog")
            .field("path", &self.path())
            .field("level", &self.level)
            .finish()
    }
}
