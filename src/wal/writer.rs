use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use crate::{
    util::{Result, Status},
    wal::log_format::{HEADER_SIZE, calculate_checksum, encode_header},
};

/// Appends checksummed records to a log file
pub struct Writer {
    file: File,
    /// Current position in the file
    offset: u64,
    use_fsync: bool,
    /// Sync every this many bytes, 0 disables.
    bytes_per_sync: u64,
    unsynced: u64,
}

impl Writer {
    /// Create `path`, truncating whatever it held before.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path.as_ref())
            .map_err(|e| {
                Status::io_error(format!(
                    "Failed to create log file {}: {e}",
                    path.as_ref().display()
                ))
            })?;

        Ok(Writer {
            file,
            offset: 0,
            use_fsync: false,
            bytes_per_sync: 0,
            unsynced: 0,
        })
    }

    /// fsync instead of fdatasync in [`Writer::sync`].
    pub fn with_fsync(mut self, use_fsync: bool) -> Self {
        self.use_fsync = use_fsync;
        self
    }

    pub fn with_bytes_per_sync(mut self, bytes_per_sync: u64) -> Self {
        self.bytes_per_sync = bytes_per_sync;
        self
    }

    pub fn add_record(&mut self, data: &[u8]) -> Result<()> {
        let length = u32::try_from(data.len())
            .map_err(|_| Status::invalid_argument("Record too large"))?;
        let header = encode_header(calculate_checksum(length, data), length);

        self.file
            .write_all(&header)
            .map_err(|e| Status::io_error(format!("Write header failed: {e}")))?;
        self.file
            .write_all(data)
            .map_err(|e| Status::io_error(format!("Write data failed: {e}")))?;

        let written = (HEADER_SIZE + data.len()) as u64;
        self.offset += written;
        self.unsynced += written;

        if self.bytes_per_sync > 0 && self.unsynced >= self.bytes_per_sync {
            self.file
                .sync_data()
                .map_err(|e| Status::io_error(format!("Range sync failed: {e}")))?;
            self.unsynced = 0;
        }
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        let synced = if self.use_fsync {
            self.file.sync_all()
        } else {
            self.file.sync_data()
        };
        synced.map_err(|e| Status::io_error(format!("Sync failed: {e}")))?;
        self.unsynced = 0;
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_write_records() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut writer = Writer::create(temp_file.path()).unwrap();

        writer.add_record(b"record1").unwrap();
        writer.add_record(b"record22").unwrap();

        assert_eq!(writer.offset(), (2 * HEADER_SIZE + 7 + 8) as u64);
        assert_eq!(
            std::fs::metadata(temp_file.path()).unwrap().len(),
            writer.offset()
        );
    }

    #[test]
    fn test_create_truncates() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), b"stale bytes from a recycled log").unwrap();

        let mut writer = Writer::create(temp_file.path()).unwrap();
        writer.add_record(b"x").unwrap();
        writer.sync().unwrap();

        assert_eq!(
            std::fs::metadata(temp_file.path()).unwrap().len(),
            (HEADER_SIZE + 1) as u64
        );
    }

    #[test]
    fn test_incremental_sync() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut writer = Writer::create(temp_file.path())
            .unwrap()
            .with_fsync(true)
            .with_bytes_per_sync(16);

        writer.add_record(&[7u8; 32]).unwrap();
        assert_eq!(writer.unsynced, 0);
        writer.add_record(b"a").unwrap();
        assert_eq!(writer.unsynced, (HEADER_SIZE + 1) as u64);
    }
}
