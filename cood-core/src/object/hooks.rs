//! Before-read/before-write/after-write notification hooks.
//!
//! Stored by value in each object as a small struct of optional closures (not a
//! vtable): most objects register none of them, a few register one. Hooks run with
//! the object's data mutex held and must not call back into the same object's
//! access methods.

use cood_common::AbortCode;
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
pub struct BeforeReadCtx {
    pub si: u8,
    pub complete_access: bool,
    /// Set when the caller only wants `subindex_actual_size_bits` refreshed, not a
    /// full read.
    pub size_query: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct BeforeWriteCtx {
    pub si: u8,
    pub complete_access: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct AfterWriteCtx {
    pub si: u8,
    pub complete_access: bool,
}

pub type BeforeReadHook = Arc<dyn Fn(BeforeReadCtx) -> AbortCode + Send + Sync>;
pub type BeforeWriteHook = Arc<dyn Fn(BeforeWriteCtx) -> AbortCode + Send + Sync>;
/// A panic from this hook is a contract violation (see the error handling design);
/// it is never caught.
pub type AfterWriteHook = Arc<dyn Fn(AfterWriteCtx) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Hooks {
    pub before_read: Option<BeforeReadHook>,
    pub before_write: Option<BeforeWriteHook>,
    pub after_write: Option<AfterWriteHook>,
}

impl Hooks {
    pub fn none() -> Self {
        Self::default()
    }

    pub(crate) fn run_before_read(&self, ctx: BeforeReadCtx) -> AbortCode {
        match &self.before_read {
            Some(hook) => hook(ctx),
            None => AbortCode::Ok,
        }
    }

    pub(crate) fn run_before_write(&self, ctx: BeforeWriteCtx) -> AbortCode {
        match &self.before_write {
            Some(hook) => hook(ctx),
            None => AbortCode::Ok,
        }
    }

    pub(crate) fn run_after_write(&self, ctx: AfterWriteCtx) {
        if let Some(hook) = &self.after_write {
            hook(ctx);
        }
    }
}
