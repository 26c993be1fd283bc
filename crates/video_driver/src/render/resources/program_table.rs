//! Shader program table
//!
//! Programs are created on behalf of shader material renderers and owned by
//! the driver, which deletes whatever is left when it is torn down. Renderers
//! only hold [`ProgramHandle`]s.

use crate::foundation::collections::{ProgramKey, SlotMap};
use crate::render::backend::{BackendProgramId, ProgramStage};

/// Opaque reference to a compiled program
pub type ProgramHandle = ProgramKey;

/// Kind of program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Assembly program for one stage
    Assembly(ProgramStage),
    /// Linked high-level program
    HighLevel,
}

/// A program owned by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramEntry {
    /// Backend object
    pub backend_id: BackendProgramId,
    /// Program kind
    pub kind: ProgramKind,
}

/// All programs of one driver
#[derive(Debug, Default)]
pub struct ProgramTable {
    entries: SlotMap<ProgramKey, ProgramEntry>,
}

impl ProgramTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a program
    pub fn insert(&mut self, entry: ProgramEntry) -> ProgramHandle {
        self.entries.insert(entry)
    }

    /// Look up a program
    pub fn get(&self, handle: ProgramHandle) -> Option<&ProgramEntry> {
        self.entries.get(handle)
    }

    /// Remove a program, returning its entry if it was alive
    pub fn remove(&mut self, handle: ProgramHandle) -> Option<ProgramEntry> {
        self.entries.remove(handle)
    }

    /// Number of live programs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no program is alive
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry
    pub fn drain(&mut self) -> Vec<ProgramEntry> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }
}
