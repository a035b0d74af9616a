//! Names of the files a database consists of
//!
//! ```text
//! <db>/CURRENT               name of the live MANIFEST
//! <db>/MANIFEST-000005       column families, tables, log number
//! <db>/OPTIONS-000007        options of the last open, JSON
//! <db>/000009.sst            table file
//! <db>/000012.dbtmp          temporary, renamed into place
//! <db>/LOG, LOG.old.<micros> info log, unless db_log_dir is set
//! <wal_dir>/000011.log       write-ahead log
//! <wal_dir>/archive/000008.log
//! ```

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::util::{Result, Status};

pub const CURRENT: &str = "CURRENT";
pub const ARCHIVE_DIR: &str = "archive";
const INFO_LOG: &str = "LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Log(u64),
    Table(u64),
    Manifest(u64),
    Current,
    Options(u64),
    Temp(u64),
}

pub fn log_file_name(wal_dir: &Path, number: u64) -> PathBuf {
    wal_dir.join(format!("{number:06}.log"))
}

pub fn archive_dir(wal_dir: &Path) -> PathBuf {
    wal_dir.join(ARCHIVE_DIR)
}

pub fn archived_log_file_name(wal_dir: &Path, number: u64) -> PathBuf {
    archive_dir(wal_dir).join(format!("{number:06}.log"))
}

pub fn table_file_name(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(format!("{number:06}.sst"))
}

pub fn manifest_file_name(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(format!("MANIFEST-{number:06}"))
}

pub fn current_file_name(db_path: &Path) -> PathBuf {
    db_path.join(CURRENT)
}

pub fn options_file_name(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(format!("OPTIONS-{number:06}"))
}

pub fn temp_file_name(db_path: &Path, number: u64) -> PathBuf {
    db_path.join(format!("{number:06}.dbtmp"))
}

pub fn parse_file_name(name: &str) -> Option<FileType> {
    if name == CURRENT {
        return Some(FileType::Current);
    }
    if let Some(number) = name.strip_prefix("MANIFEST-") {
        return number.parse().ok().map(FileType::Manifest);
    }
    if let Some(number) = name.strip_prefix("OPTIONS-") {
        return number.parse().ok().map(FileType::Options);
    }

    let (number, suffix) = name.split_once('.')?;
    let number: u64 = number.parse().ok()?;
    match suffix {
        "log" => Some(FileType::Log(number)),
        "sst" => Some(FileType::Table(number)),
        "dbtmp" => Some(FileType::Temp(number)),
        _ => None,
    }
}

/// Parsed names of the entries in `dir`, empty when it does not exist.
pub fn list_files(dir: &Path) -> Result<Vec<FileType>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(Status::io_error(format!(
                "Failed to list {}: {e}",
                dir.display()
            )));
        },
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if let Some(file_type) = entry.file_name().to_str().and_then(parse_file_name) {
            files.push(file_type);
        }
    }
    Ok(files)
}

pub fn list_options_files(db_path: &Path) -> Result<Vec<u64>> {
    let mut numbers: Vec<u64> = list_files(db_path)?
        .into_iter()
        .filter_map(|f| match f {
            FileType::Options(n) => Some(n),
            _ => None,
        })
        .collect();
    numbers.sort_unstable();
    Ok(numbers)
}

pub fn list_log_files(dir: &Path) -> Result<Vec<u64>> {
    let mut numbers: Vec<u64> = list_files(dir)?
        .into_iter()
        .filter_map(|f| match f {
            FileType::Log(n) => Some(n),
            _ => None,
        })
        .collect();
    numbers.sort_unstable();
    Ok(numbers)
}

/// Point CURRENT at `MANIFEST-<manifest_number>` atomically.
pub fn set_current_file(db_path: &Path, manifest_number: u64) -> Result<()> {
    let tmp = temp_file_name(db_path, manifest_number);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(format!("MANIFEST-{manifest_number:06}\n").as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, current_file_name(db_path))?;
    Ok(())
}

/// Number of the MANIFEST that CURRENT names.
pub fn read_current_file(db_path: &Path) -> Result<u64> {
    let content = fs::read_to_string(current_file_name(db_path))?;
    match parse_file_name(content.trim_end_matches('\n')) {
        Some(FileType::Manifest(number)) => Ok(number),
        _ => Err(Status::corruption(format!(
            "CURRENT file does not name a MANIFEST: {content:?}"
        ))),
    }
}

/// Directory and base name of the active info LOG
///
/// Inside the database directory the file is plainly `LOG`. A shared
/// `db_log_dir` may serve several databases, so the name is prefixed with
/// the flattened absolute database path there.
pub fn info_log_file_name(db_path: &Path, db_log_dir: Option<&Path>) -> (PathBuf, String) {
    match db_log_dir {
        None => (db_path.to_path_buf(), INFO_LOG.to_string()),
        Some(dir) => {
            let absolute = std::path::absolute(db_path).unwrap_or_else(|_| db_path.to_path_buf());
            let flattened: String = absolute
                .to_string_lossy()
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            (dir.to_path_buf(), format!("{flattened}_{INFO_LOG}"))
        },
    }
}

pub fn old_info_log_file_name(dir: &Path, base: &str, micros: u64) -> PathBuf {
    dir.join(format!("{base}.old.{micros}"))
}

/// Timestamps of the rolled info logs named after `base` in `dir`.
pub fn list_old_info_logs(dir: &Path, base: &str) -> Result<Vec<u64>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let prefix = format!("{base}.old.");
    let mut stamps = Vec::new();
    for entry in entries {
        let entry = entry?;
        if let Some(stamp) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.strip_prefix(prefix.as_str()))
            .and_then(|stamp| stamp.parse().ok())
        {
            stamps.push(stamp);
        }
    }
    stamps.sort_unstable();
    Ok(stamps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_names() {
        assert_eq!(parse_file_name("000012.log"), Some(FileType::Log(12)));
        assert_eq!(parse_file_name("000003.sst"), Some(FileType::Table(3)));
        assert_eq!(parse_file_name("MANIFEST-000005"), Some(FileType::Manifest(5)));
        assert_eq!(parse_file_name("OPTIONS-000007"), Some(FileType::Options(7)));
        assert_eq!(parse_file_name("000001.dbtmp"), Some(FileType::Temp(1)));
        assert_eq!(parse_file_name("CURRENT"), Some(FileType::Current));
        assert_eq!(parse_file_name("LOG"), None);
        assert_eq!(parse_file_name("LOG.old.1234"), None);
        assert_eq!(parse_file_name("abc.log"), None);
    }

    #[test]
    fn test_names_parse_back() {
        let dir = Path::new("/db");
        let name = table_file_name(dir, 42);
        assert_eq!(
            parse_file_name(name.file_name().unwrap().to_str().unwrap()),
            Some(FileType::Table(42))
        );
        assert_eq!(archived_log_file_name(dir, 3), Path::new("/db/archive/000003.log"));
    }

    #[test]
    fn test_current_file() {
        let dir = tempfile::TempDir::new().unwrap();
        set_current_file(dir.path(), 9).unwrap();
        assert_eq!(read_current_file(dir.path()).unwrap(), 9);

        fs::write(current_file_name(dir.path()), "garbage").unwrap();
        assert!(read_current_file(dir.path()).unwrap_err().is_corruption());
    }

    #[test]
    fn test_info_log_names() {
        let (dir, base) = info_log_file_name(Path::new("/data/db"), None);
        assert_eq!(dir, Path::new("/data/db"));
        assert_eq!(base, "LOG");

        let (dir, base) = info_log_file_name(Path::new("/data/my db"), Some(Path::new("/logs")));
        assert_eq!(dir, Path::new("/logs"));
        assert_eq!(base, "_data_my_db_LOG");
    }

    #[test]
    fn test_list_old_info_logs() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["LOG", "LOG.old.30", "LOG.old.10", "LOG.old.x", "OTHER_LOG.old.5"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        assert_eq!(list_old_info_logs(dir.path(), "LOG").unwrap(), vec![10, 30]);
    }
}
