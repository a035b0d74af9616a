//! The MANIFEST: durable record of column families, table files and logs
//!
//! Each record is one JSON-encoded batch of [`ManifestEdit`]s, written with
//! the log framing of [`crate::wal`], so a batch is applied entirely or not
//! at all. A new MANIFEST always starts with a snapshot of the full state.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};

use crate::{
    column_family::DEFAULT_COLUMN_FAMILY_NAME,
    db::filename,
    util::{Result, Status},
    wal::{Reader, Writer, log_format::HEADER_SIZE},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestEdit {
    NewColumnFamily { id: u32, name: String },
    DropColumnFamily { id: u32 },
    AddTable { cf_id: u32, number: u64, level: usize, size: u64 },
    DeleteTable { cf_id: u32, number: u64 },
    /// Logs older than this hold nothing that is not in a table.
    LogNumber(u64),
    NextFileNumber(u64),
    LastSequence(u64),
    /// IDs of dropped column families are never handed out again.
    NextColumnFamilyId(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    pub level: usize,
    pub size: u64,
}

/// State rebuilt by replaying a MANIFEST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestState {
    pub families: BTreeMap<u32, String>,
    pub tables: BTreeMap<u32, BTreeMap<u64, TableRef>>,
    pub log_number: u64,
    pub next_file_number: u64,
    pub last_sequence: u64,
    pub next_cf_id: u32,
}

impl Default for ManifestState {
    fn default() -> Self {
        let mut families = BTreeMap::new();
        families.insert(0, DEFAULT_COLUMN_FAMILY_NAME.to_string());
        ManifestState {
            families,
            tables: BTreeMap::new(),
            log_number: 0,
            next_file_number: 1,
            last_sequence: 0,
            next_cf_id: 1,
        }
    }
}

impl ManifestState {
    pub fn apply(&mut self, edit: &ManifestEdit) {
        match edit {
            ManifestEdit::NewColumnFamily { id, name } => {
                self.families.insert(*id, name.clone());
                self.next_cf_id = self.next_cf_id.max(id + 1);
            },
            ManifestEdit::DropColumnFamily { id } => {
                self.families.remove(id);
                self.tables.remove(id);
            },
            ManifestEdit::AddTable {
                cf_id,
                number,
                level,
                size,
            } => {
                self.tables.entry(*cf_id).or_default().insert(*number, TableRef {
                    level: *level,
                    size: *size,
                });
            },
            ManifestEdit::DeleteTable { cf_id, number } => {
                if let Some(tables) = self.tables.get_mut(cf_id) {
                    tables.remove(number);
                }
            },
            ManifestEdit::LogNumber(n) => self.log_number = self.log_number.max(*n),
            ManifestEdit::NextFileNumber(n) => {
                self.next_file_number = self.next_file_number.max(*n)
            },
            ManifestEdit::LastSequence(n) => self.last_sequence = self.last_sequence.max(*n),
            ManifestEdit::NextColumnFamilyId(id) => self.next_cf_id = self.next_cf_id.max(*id),
        }
    }

    /// Edits that rebuild this state from scratch.
    pub fn snapshot(&self) -> Vec<ManifestEdit> {
        let mut edits = Vec::new();
        for (id, name) in &self.families {
            edits.push(ManifestEdit::NewColumnFamily {
                id: *id,
                name: name.clone(),
            });
        }
        for (cf_id, tables) in &self.tables {
            for (number, table) in tables {
                edits.push(ManifestEdit::AddTable {
                    cf_id: *cf_id,
                    number: *number,
                    level: table.level,
                    size: table.size,
                });
            }
        }
        edits.push(ManifestEdit::LogNumber(self.log_number));
        edits.push(ManifestEdit::NextFileNumber(self.next_file_number));
        edits.push(ManifestEdit::LastSequence(self.last_sequence));
        edits.push(ManifestEdit::NextColumnFamilyId(self.next_cf_id));
        edits
    }

    /// Every table number referenced by any column family.
    pub fn live_tables(&self) -> impl Iterator<Item = u64> + '_ {
        self.tables.values().flat_map(|tables| tables.keys().copied())
    }
}

/// Settings the MANIFEST writer follows
#[derive(Debug, Clone, Copy)]
pub struct ManifestOptions {
    pub max_file_size: u64,
    pub use_fsync: bool,
}

pub struct Manifest {
    db_path: PathBuf,
    number: u64,
    writer: Writer,
    state: ManifestState,
    options: ManifestOptions,
}

impl Manifest {
    /// Replay the MANIFEST that CURRENT names.
    pub fn recover(db_path: &Path) -> Result<(u64, ManifestState)> {
        let number = filename::read_current_file(db_path)?;
        let path = filename::manifest_file_name(db_path, number);
        let mut reader = Reader::open(&path)?;

        let mut state = ManifestState {
            families: BTreeMap::new(),
            ..ManifestState::default()
        };
        loop {
            let record = match reader.read_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                // a batch cut short by a crash was never acknowledged
                Err(e) if e.is_incomplete() => {
                    log::warn!("ignoring truncated tail of {}: {e}", path.display());
                    break;
                },
                Err(e) => return Err(e),
            };
            let edits: Vec<ManifestEdit> = serde_json::from_slice(&record).map_err(|e| {
                Status::corruption(format!("undecodable MANIFEST record: {e}"))
            })?;
            for edit in &edits {
                state.apply(edit);
            }
        }

        if !state.families.contains_key(&0) {
            return Err(Status::corruption("MANIFEST has no default column family"));
        }
        Ok((number, state))
    }

    /// Write a new MANIFEST holding `state`, then point CURRENT at it.
    pub fn create(
        db_path: &Path,
        number: u64,
        state: ManifestState,
        options: ManifestOptions,
    ) -> Result<Manifest> {
        let path = filename::manifest_file_name(db_path, number);
        let mut writer = Writer::create(&path)?.with_fsync(options.use_fsync);
        writer.add_record(&serde_json::to_vec(&state.snapshot())?)?;
        writer.sync()?;
        filename::set_current_file(db_path, number)?;

        Ok(Manifest {
            db_path: db_path.to_path_buf(),
            number,
            writer,
            state,
            options,
        })
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn state(&self) -> &ManifestState {
        &self.state
    }

    /// Durably append `edits` as one batch
    ///
    /// The current file-number counter is recorded with every batch. When
    /// the batch would push the file past `max_file_size`, a new MANIFEST
    /// with the full state replaces the current one instead and the old file
    /// is deleted. Returns whether that rollover happened.
    pub fn log_and_apply(
        &mut self,
        mut edits: Vec<ManifestEdit>,
        next_file_number: &AtomicU64,
    ) -> Result<bool> {
        edits.push(ManifestEdit::NextFileNumber(
            next_file_number.load(Ordering::SeqCst),
        ));
        let record = serde_json::to_vec(&edits)?;

        let mut state = self.state.clone();
        for edit in &edits {
            state.apply(edit);
        }

        let projected = self.writer.offset() + (record.len() + HEADER_SIZE) as u64;
        if projected > self.options.max_file_size {
            self.roll_over(state, next_file_number)?;
            return Ok(true);
        }

        self.writer.add_record(&record)?;
        self.writer.sync()?;
        self.state = state;
        Ok(false)
    }

    fn roll_over(&mut self, mut state: ManifestState, next_file_number: &AtomicU64) -> Result<()> {
        let new_number = next_file_number.fetch_add(1, Ordering::SeqCst);
        state.next_file_number = state.next_file_number.max(new_number + 1);

        let old_number = self.number;
        let next = Manifest::create(&self.db_path, new_number, state, self.options)?;
        *self = next;

        let old_path = filename::manifest_file_name(&self.db_path, old_number);
        if let Err(e) = fs::remove_file(&old_path) {
            log::warn!("failed to remove {}: {e}", old_path.display());
        }
        log::info!("MANIFEST rolled over from {old_number} to {new_number}");
        Ok(())
    }
}
