//! Content store: a node-local cache of encoded Data keyed by name.

use std::collections::BTreeMap;

use crate::ndn::{EncodedData, Name};

use super::types::SimTime;

/// A cached Data packet
#[derive(Debug, Clone, PartialEq)]
pub struct CsEntry {
    pub data: EncodedData,
    pub unsolicited: bool,
    pub inserted_at: SimTime,
}

/// Cache of named Data packets
pub trait ContentStore: std::fmt::Debug {
    /// Insert or replace the entry for `data.name`. Returns true if the name was new.
    fn insert(&mut self, data: EncodedData, unsolicited: bool, now: SimTime) -> bool;

    /// Names of every stored entry, in name order
    fn names(&self) -> Box<dyn Iterator<Item = &Name> + '_>;

    /// Entry whose name equals `name` exactly
    fn find_exact(&self, name: &Name) -> Option<&CsEntry>;

    /// First entry (in name order) whose name has `prefix` as a prefix
    fn find_prefix(&self, prefix: &Name) -> Option<&CsEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory content store without eviction
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    entries: BTreeMap<Name, CsEntry>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemoryContentStore {
    fn insert(&mut self, data: EncodedData, unsolicited: bool, now: SimTime) -> bool {
        let name = data.name.clone();
        let entry = CsEntry { data, unsolicited, inserted_at: now };
        self.entries.insert(name, entry).is_none()
    }

    fn names(&self) -> Box<dyn Iterator<Item = &Name> + '_> {
        Box::new(self.entries.keys())
    }

    fn find_exact(&self, name: &Name) -> Option<&CsEntry> {
        self.entries.get(name)
    }

    fn find_prefix(&self, prefix: &Name) -> Option<&CsEntry> {
        self.entries
            .range(prefix.clone()..)
            .take_while(|(name, _)| prefix.is_prefix_of(name))
            .map(|(_, entry)| entry)
            .next()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
