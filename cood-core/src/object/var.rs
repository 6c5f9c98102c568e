//! VARIABLE objects: a single subindex (SI0) holding one value.

use super::hooks::Hooks;
use super::spec::SubindexSpec;
use super::storage::{share, ConstantStorage, SharedStorage};
use cood_common::Value;

pub struct Variable {
    pub(super) spec: SubindexSpec,
    pub(super) storage: SharedStorage,
    pub(super) hooks: Hooks,
    pub(super) name: Option<String>,
}

impl Variable {
    pub fn new(spec: SubindexSpec, storage: SharedStorage) -> Self {
        let name = spec.name.clone();
        Self {
            spec,
            storage,
            hooks: Hooks::none(),
            name,
        }
    }

    /// A variable whose value never changes: no producer, no data mutex.
    pub fn constant(spec: SubindexSpec, value: Value) -> Self {
        Self::new(spec, share(ConstantStorage(value)))
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }
}
