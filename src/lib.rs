//! Configuration and lifecycle of a RucksDB database
//!
//! [`DBOptions`] collects every database-wide setting together with the
//! base and per-family [`ColumnFamilyOptions`]. [`DB::open`] validates it
//! into an [`ImmutableDBOptions`] and runs the engine by it: creation
//! policy, write-ahead log recovery and retention, info LOG rolling,
//! background work and statistics.

pub mod column_family;
pub mod db;
pub mod env;
pub mod memtable;
pub mod options;
pub mod statistics;
pub mod util;
pub mod wal;

pub use column_family::{
    ColumnFamilyDescriptor, ColumnFamilyHandle, ColumnFamilyOptions, CompactionStyle,
    CompressionType, DEFAULT_COLUMN_FAMILY_NAME,
};
pub use db::DB;
pub use env::{Env, Priority};
pub use options::{
    AccessHint, DBOptions, ImmutableDBOptions, InfoLogLevel, LogRollPolicy, WalArchivePolicy,
    WalRecoveryMode, load_latest_options,
};
pub use statistics::Statistics;
pub use util::{Code, Result, Status};
