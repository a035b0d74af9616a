use serde::{Deserialize, Serialize};

use crate::util::{Result, Status};

/// Compaction style recorded for a column family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompactionStyle {
    #[default]
    Level,
    Universal,
    Fifo,
    None,
}

/// Block compression recorded for a column family's table files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    #[default]
    Snappy,
    Lz4,
    Zstd,
}

/// Options for a specific Column Family
///
/// Each column family can have different configuration for:
/// - MemTable sizing (write buffer size and count)
/// - Level-0 triggers and compaction style
/// - Compression, comparator and merge operator names
///
/// `DBOptions` embeds one of these as the base every named column family
/// starts from.
///
/// # Example
///
/// ```
/// use rucksdb_options::ColumnFamilyOptions;
///
/// let mut options = ColumnFamilyOptions::default();
/// options
///     .set_write_buffer_size(8 * 1024 * 1024)
///     .set_level0_file_num_compaction_trigger(8);
/// assert_eq!(options.write_buffer_size, 8 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnFamilyOptions {
    /// Size of write buffer (MemTable) in bytes before flushing to disk
    /// Default: 64MB
    pub write_buffer_size: usize,

    /// Maximum number of memtables, active plus immutable
    /// Default: 2
    pub max_write_buffer_number: usize,

    /// Default: 1
    pub min_write_buffer_number_to_merge: usize,

    pub compaction_style: CompactionStyle,

    /// Default: false
    pub disable_auto_compactions: bool,

    /// Default: 7
    pub num_levels: usize,

    /// Number of level-0 files that triggers a compaction
    /// Default: 4
    pub level0_file_num_compaction_trigger: usize,

    /// Default: 20
    pub level0_slowdown_writes_trigger: usize,

    /// Default: 36
    pub level0_stop_writes_trigger: usize,

    /// Default: 64MB
    pub target_file_size_base: u64,

    /// Default: 256MB
    pub max_bytes_for_level_base: u64,

    /// Upper bound on the input size of one compaction
    /// Default: 25 * target_file_size_base
    pub max_compaction_bytes: u64,

    /// 0 disables the slowdown
    /// Default: 64GB
    pub soft_pending_compaction_bytes_limit: u64,

    /// 0 disables the stop
    /// Default: 256GB
    pub hard_pending_compaction_bytes_limit: u64,

    /// Compression type for table files
    /// Default: Snappy
    pub compression_type: CompressionType,

    pub comparator_name: String,

    pub merge_operator_name: Option<String>,
}

impl Default for ColumnFamilyOptions {
    fn default() -> Self {
        ColumnFamilyOptions {
            write_buffer_size: 64 * 1024 * 1024,
            max_write_buffer_number: 2,
            min_write_buffer_number_to_merge: 1,
            compaction_style: CompactionStyle::Level,
            disable_auto_compactions: false,
            num_levels: 7,
            level0_file_num_compaction_trigger: 4,
            level0_slowdown_writes_trigger: 20,
            level0_stop_writes_trigger: 36,
            target_file_size_base: 64 * 1024 * 1024,
            max_bytes_for_level_base: 256 * 1024 * 1024,
            max_compaction_bytes: 25 * 64 * 1024 * 1024,
            soft_pending_compaction_bytes_limit: 64 * 1024 * 1024 * 1024,
            hard_pending_compaction_bytes_limit: 256 * 1024 * 1024 * 1024,
            compression_type: CompressionType::Snappy,
            comparator_name: "leveldb.BytewiseComparator".to_string(),
            merge_operator_name: None,
        }
    }
}

impl ColumnFamilyOptions {
    pub fn set_write_buffer_size(&mut self, size: usize) -> &mut Self {
        self.write_buffer_size = size;
        self
    }

    pub fn set_max_write_buffer_number(&mut self, n: usize) -> &mut Self {
        self.max_write_buffer_number = n;
        self
    }

    pub fn set_min_write_buffer_number_to_merge(&mut self, n: usize) -> &mut Self {
        self.min_write_buffer_number_to_merge = n;
        self
    }

    pub fn set_compaction_style(&mut self, style: CompactionStyle) -> &mut Self {
        self.compaction_style = style;
        self
    }

    pub fn set_disable_auto_compactions(&mut self, value: bool) -> &mut Self {
        self.disable_auto_compactions = value;
        self
    }

    pub fn set_num_levels(&mut self, n: usize) -> &mut Self {
        self.num_levels = n;
        self
    }

    pub fn set_level0_file_num_compaction_trigger(&mut self, n: usize) -> &mut Self {
        self.level0_file_num_compaction_trigger = n;
        self
    }

    pub fn set_level0_slowdown_writes_trigger(&mut self, n: usize) -> &mut Self {
        self.level0_slowdown_writes_trigger = n;
        self
    }

    pub fn set_level0_stop_writes_trigger(&mut self, n: usize) -> &mut Self {
        self.level0_stop_writes_trigger = n;
        self
    }

    pub fn set_target_file_size_base(&mut self, size: u64) -> &mut Self {
        self.target_file_size_base = size;
        self
    }

    pub fn set_max_bytes_for_level_base(&mut self, size: u64) -> &mut Self {
        self.max_bytes_for_level_base = size;
        self
    }

    pub fn set_max_compaction_bytes(&mut self, size: u64) -> &mut Self {
        self.max_compaction_bytes = size;
        self
    }

    pub fn set_compression_type(&mut self, compression: CompressionType) -> &mut Self {
        self.compression_type = compression;
        self
    }

    pub fn set_comparator_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.comparator_name = name.into();
        self
    }

    pub fn set_merge_operator_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.merge_operator_name = Some(name.into());
        self
    }

    /// The bulk-load bundle restricted to column family knobs.
    pub(crate) fn apply_bulk_load(&mut self) {
        // never slow down or stop ingest
        self.level0_file_num_compaction_trigger = 1 << 30;
        self.level0_slowdown_writes_trigger = 1 << 30;
        self.level0_stop_writes_trigger = 1 << 30;
        self.soft_pending_compaction_bytes_limit = 0;
        self.hard_pending_compaction_bytes_limit = 0;

        // everything stays in level 0 until a manual compaction
        self.disable_auto_compactions = true;
        self.max_compaction_bytes = 1 << 60;
        self.num_levels = 2;

        self.max_write_buffer_number = 6;
        self.min_write_buffer_number_to_merge = 1;
        self.target_file_size_base = 256 * 1024 * 1024;
    }

    /// Reject values the engine cannot run with and repair the ones it can.
    pub(crate) fn sanitize(&mut self, cf_name: &str) -> Result<()> {
        if self.write_buffer_size == 0 {
            return Err(Status::invalid_argument(format!(
                "column family '{cf_name}': write_buffer_size must be greater than 0"
            )));
        }
        if self.num_levels == 0 {
            return Err(Status::invalid_argument(format!(
                "column family '{cf_name}': num_levels must be at least 1"
            )));
        }

        if self.max_write_buffer_number < 2 {
            log::warn!(
                "column family '{cf_name}': max_write_buffer_number {} raised to 2",
                self.max_write_buffer_number
            );
            self.max_write_buffer_number = 2;
        }
        if self.level0_slowdown_writes_trigger < self.level0_file_num_compaction_trigger {
            log::warn!(
                "column family '{cf_name}': level0_slowdown_writes_trigger raised to {}",
                self.level0_file_num_compaction_trigger
            );
            self.level0_slowdown_writes_trigger = self.level0_file_num_compaction_trigger;
        }
        if self.level0_stop_writes_trigger < self.level0_slowdown_writes_trigger {
            log::warn!(
                "column family '{cf_name}': level0_stop_writes_trigger raised to {}",
                self.level0_slowdown_writes_trigger
            );
            self.level0_stop_writes_trigger = self.level0_slowdown_writes_trigger;
        }

        Ok(())
    }
}
