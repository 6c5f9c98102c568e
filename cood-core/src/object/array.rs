//! ARRAY objects: SI0 is a count, SI1..SI_max hold a homogeneous element type.

use super::hooks::Hooks;
use super::spec::SubindexSpec;
use super::storage::SharedStorage;
use cood_common::Attributes;

pub struct Array {
    /// Shared by SI1..SI_max; only `max_n_elements` varies per call site (it never
    /// does -- all elements share one type).
    pub(super) element_spec: SubindexSpec,
    pub(super) si0_attributes: Attributes,
    pub(super) max_n_subindices: u8,
    pub(super) storage: SharedStorage,
    pub(super) hooks: Hooks,
    pub(super) name: Option<String>,
}

impl Array {
    pub fn new(
        element_spec: SubindexSpec,
        si0_attributes: Attributes,
        max_n_subindices: u8,
        storage: SharedStorage,
    ) -> Self {
        Self {
            element_spec,
            si0_attributes,
            max_n_subindices,
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

    pub fn si0_writable(&self) -> bool {
        self.si0_attributes.is_writable()
    }
}
