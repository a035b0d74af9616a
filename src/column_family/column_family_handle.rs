/// Handle to an open Column Family
///
/// Returned by `DB::cf_handle` and `DB::create_column_family`, passed to the
/// `*_cf` operations. A handle outlives nothing: once the family is dropped
/// the handle no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnFamilyHandle {
    pub(crate) id: u32,
    pub(crate) name: String,
}

impl ColumnFamilyHandle {
    pub(crate) fn new(id: u32, name: String) -> Self {
        ColumnFamilyHandle { id, name }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
