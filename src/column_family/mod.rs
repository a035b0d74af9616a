//! Column families
//!
//! Column families are independent keyspaces inside one database. Each one
//! has its own memtable, table files and [`ColumnFamilyOptions`]; they share
//! the write-ahead log and the MANIFEST.
//!
//! ```text
//! DB
//!  ├─→ ColumnFamily("default")   always present, ID 0
//!  │    ├─→ MemTable
//!  │    └─→ TableFiles
//!  └─→ ColumnFamily("users")
//!       └─→ ...
//! ```
mod column_family_data;
mod column_family_set;
pub mod column_family_descriptor;
pub mod column_family_handle;
pub mod column_family_options;

pub(crate) use column_family_data::ColumnFamilyData;
pub use column_family_descriptor::ColumnFamilyDescriptor;
pub use column_family_handle::ColumnFamilyHandle;
pub use column_family_options::{ColumnFamilyOptions, CompactionStyle, CompressionType};
pub(crate) use column_family_set::{ColumnFamilySet, plan_open};

pub const DEFAULT_COLUMN_FAMILY_NAME: &str = "default";
