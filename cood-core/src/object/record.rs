//! RECORD objects: SI0 is a constant count, SI1..SI_max each have an individually
//! described type/attributes/element count. A subindex may be "empty" (present in
//! the index range but entirely absent from Complete Access, never individually
//! addressable -- see [`SubindexSpec::empty`]) or a "gap" (occupies its declared
//! width in Complete Access, reads as zero, writes discarded, hooks never invoked
//! -- see [`SubindexSpec::gap`]).

use super::hooks::Hooks;
use super::spec::SubindexSpec;
use super::storage::SharedStorage;

pub struct Record {
    /// `subs[i]` describes SI `i+1`. Empty and gap subindices still have an
    /// entry so their position in the SI range is preserved.
    pub(super) subs: Vec<SubindexSpec>,
    pub(super) storage: SharedStorage,
    pub(super) hooks: Hooks,
    pub(super) name: Option<String>,
}

impl Record {
    pub fn new(subs: Vec<SubindexSpec>, storage: SharedStorage) -> Self {
        Self {
            subs,
            storage,
            hooks: Hooks::none(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// SI0 for a RECORD is the constant subindex count.
    pub fn si0_value(&self) -> u8 {
        self.subs.len() as u8
    }
}
