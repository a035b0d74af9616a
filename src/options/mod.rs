//! Database configuration
//!
//! [`DBOptions`] is the mutable builder a caller fills in; opening a database
//! turns it into an [`ImmutableDBOptions`] snapshot after validation. The
//! policy types describe how WAL archives and the info LOG are maintained
//! and are derived from the builder, never set directly.

pub mod access_hint;
pub mod db_options;
pub mod immutable;
pub mod info_log_level;
pub mod log_roll;
pub mod recovery;
pub mod wal_archive;

pub use access_hint::AccessHint;
pub use db_options::{DBOptions, load_latest_options};
pub use immutable::ImmutableDBOptions;
pub use info_log_level::InfoLogLevel;
pub use log_roll::LogRollPolicy;
pub use recovery::WalRecoveryMode;
pub use wal_archive::{ArchivedWal, WalArchivePolicy};
