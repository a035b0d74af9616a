use std::{fs, path::Path};

use crate::{
    util::{Result, Status},
    wal::log_format::{HEADER_SIZE, calculate_checksum, decode_header},
};

/// Reads records back from a log file
///
/// A damaged record is reported as `Corruption` and skipped, so the caller
/// may keep reading. A record cut off by the end of the file is reported
/// once as `Incomplete`; after that the reader is exhausted.
pub struct Reader {
    data: Vec<u8>,
    offset: usize,
}

impl Reader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref()).map_err(|e| {
            Status::io_error(format!(
                "Failed to read log file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(Reader { data, offset: 0 })
    }

    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let remaining = self.data.len() - self.offset;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < HEADER_SIZE {
            self.offset = self.data.len();
            return Err(Status::incomplete("Truncated record header at end of log"));
        }

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&self.data[self.offset..self.offset + HEADER_SIZE]);
        let (checksum, length) = decode_header(&header);

        let start = self.offset + HEADER_SIZE;
        let end = start.saturating_add(length as usize);
        if end > self.data.len() {
            self.offset = self.data.len();
            return Err(Status::incomplete(format!(
                "Truncated record at offset {}: {} of {length} bytes",
                start - HEADER_SIZE,
                self.data.len() - start
            )));
        }

        let record_offset = self.offset;
        self.offset = end;
        let data = &self.data[start..end];

        let expected = calculate_checksum(length, data);
        if checksum != expected {
            return Err(Status::corruption(format!(
                "Checksum mismatch at offset {record_offset}: expected {expected}, got {checksum}"
            )));
        }

        Ok(Some(data.to_vec()))
    }

    /// Read every record, failing on the first damaged one.
    pub fn read_all(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }
}
