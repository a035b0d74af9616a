use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use parking_lot::RwLock;

use crate::{
    column_family::{
        ColumnFamilyData, ColumnFamilyDescriptor, ColumnFamilyHandle, ColumnFamilyOptions,
        DEFAULT_COLUMN_FAMILY_NAME,
    },
    util::{Result, Status},
};

/// All open column families of a DB instance
///
/// The default family (ID 0) always exists and cannot be dropped.
pub(crate) struct ColumnFamilySet {
    column_families: RwLock<BTreeMap<u32, Arc<ColumnFamilyData>>>,
    next_id: RwLock<u32>,
}

impl ColumnFamilySet {
    pub fn new(next_id: u32) -> Self {
        ColumnFamilySet {
            column_families: RwLock::new(BTreeMap::new()),
            next_id: RwLock::new(next_id.max(1)),
        }
    }

    pub fn insert(&self, cf: Arc<ColumnFamilyData>) {
        let mut next_id = self.next_id.write();
        *next_id = (*next_id).max(cf.id() + 1);
        self.column_families.write().insert(cf.id(), cf);
    }

    pub fn allocate_id(&self) -> u32 {
        let mut next_id = self.next_id.write();
        let id = *next_id;
        *next_id += 1;
        id
    }

    pub fn get(&self, handle: &ColumnFamilyHandle) -> Option<Arc<ColumnFamilyData>> {
        self.get_by_id(handle.id())
    }

    pub fn get_by_id(&self, id: u32) -> Option<Arc<ColumnFamilyData>> {
        self.column_families.read().get(&id).map(Arc::clone)
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<ColumnFamilyData>> {
        self.column_families
            .read()
            .values()
            .find(|cf| cf.name() == name)
            .map(Arc::clone)
    }

    pub fn remove(&self, id: u32) -> Option<Arc<ColumnFamilyData>> {
        self.column_families.write().remove(&id)
    }

    pub fn all(&self) -> Vec<Arc<ColumnFamilyData>> {
        self.column_families.read().values().map(Arc::clone).collect()
    }
}

/// A column family the engine will open
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedFamily {
    /// `None` when the family has to be created.
    pub id: Option<u32>,
    pub name: String,
    pub options: ColumnFamilyOptions,
}

/// Decide which column families an open ends up with
///
/// `on_disk` maps the IDs recorded by an existing database to their names,
/// and is empty for a brand-new one. `default_options` is used when the
/// default family is not among `requested`.
pub(crate) fn plan_open(
    on_disk: &BTreeMap<u32, String>,
    requested: Vec<ColumnFamilyDescriptor>,
    default_options: &ColumnFamilyOptions,
    is_new: bool,
    create_missing_column_families: bool,
) -> Result<Vec<PlannedFamily>> {
    let mut seen = BTreeSet::new();
    for descriptor in &requested {
        if !seen.insert(descriptor.name.as_str()) {
            return Err(Status::invalid_argument(format!(
                "Column family '{}' requested twice",
                descriptor.name
            )));
        }
    }

    let mut requested = requested;
    if !requested.iter().any(ColumnFamilyDescriptor::is_default) {
        requested.insert(
            0,
            ColumnFamilyDescriptor::new(DEFAULT_COLUMN_FAMILY_NAME, default_options.clone()),
        );
    }

    let ids_by_name: BTreeMap<&str, u32> =
        on_disk.iter().map(|(id, name)| (name.as_str(), *id)).collect();

    if !is_new {
        let not_opened: Vec<&str> = ids_by_name
            .keys()
            .filter(|name| !requested.iter().any(|d| d.name == **name))
            .copied()
            .collect();
        if !not_opened.is_empty() {
            return Err(Status::invalid_argument(format!(
                "Column families not opened: {}",
                not_opened.join(", ")
            )));
        }
    }

    let mut planned = Vec::with_capacity(requested.len());
    for descriptor in requested {
        let id = if descriptor.is_default() {
            Some(0)
        } else {
            ids_by_name.get(descriptor.name.as_str()).copied()
        };

        if id.is_none() && !is_new && !create_missing_column_families {
            return Err(Status::invalid_argument(format!(
                "Column family not found: {}",
                descriptor.name
            )));
        }

        planned.push(PlannedFamily {
            id,
            name: descriptor.name,
            options: descriptor.options,
        });
    }

    Ok(planned)
}
