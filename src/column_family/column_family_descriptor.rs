use crate::column_family::{ColumnFamilyOptions, DEFAULT_COLUMN_FAMILY_NAME};

/// A column family name paired with the options it should be opened with
///
/// # Example
///
/// ```
/// use rucksdb_options::{ColumnFamilyDescriptor, ColumnFamilyOptions};
///
/// let mut posts = ColumnFamilyOptions::default();
/// posts.set_write_buffer_size(8 * 1024 * 1024);
///
/// let descriptors = vec![
///     ColumnFamilyDescriptor::new("users", ColumnFamilyOptions::default()),
///     ColumnFamilyDescriptor::new("posts", posts),
/// ];
/// assert!(!descriptors[0].is_default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFamilyDescriptor {
    pub name: String,
    pub options: ColumnFamilyOptions,
}

impl ColumnFamilyDescriptor {
    pub fn new<S: Into<String>>(name: S, options: ColumnFamilyOptions) -> Self {
        ColumnFamilyDescriptor {
            name: name.into(),
            options,
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_COLUMN_FAMILY_NAME
    }
}
