//! Native storage backing a subindex or an array's homogeneous element range.
//!
//! The object model never owns application data directly. A producer builds a type
//! implementing [`ObjectStorage`] and hands the [`Object`](super::Object) a shared,
//! mutex-guarded handle to it; the same `Arc<Mutex<_>>` is the object's "data mutex"
//! from the design -- producer and object both lock it, so there is exactly one
//! place a value can change.

use cood_common::{AbortCode, Value};
use parking_lot::Mutex;
use std::sync::Arc;

/// One producer-supplied element (or the sole element of a VARIABLE).
///
/// `element` is 0 for a VARIABLE's single subindex, and the subindex number
/// (1-based) for ARRAY elements and RECORD fields.
pub trait ObjectStorage: Send {
    fn get(&self, element: usize) -> Value;
    fn set(&mut self, element: usize, value: Value) -> Result<(), AbortCode>;

    /// Number of elements currently populated. Only meaningful (and only ever
    /// called) for ARRAY storage whose SI0 is writable.
    fn element_count(&self) -> usize {
        1
    }

    /// Grow/shrink the active element count. Only called for ARRAY storage whose
    /// SI0 is writable; the default rejects the resize.
    fn set_element_count(&mut self, _count: usize) -> Result<(), AbortCode> {
        Err(AbortCode::UnsupportedAccess)
    }
}

/// Shared, mutex-guarded handle to a producer's native storage. `None` is only valid
/// for storage that is guaranteed never to change (a truly constant value embedded
/// directly in the object, see [`super::var::ConstantStorage`]).
pub type SharedStorage = Arc<Mutex<dyn ObjectStorage>>;

/// Wraps a concrete [`ObjectStorage`] so it can be shared between its producer and
/// the object that reads/writes it.
pub fn share<S: ObjectStorage + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// A single `Value` with no producer-side mutability, used for constant subindices
/// and RECORD "gap" placeholders. Implements [`ObjectStorage`] so it can sit
/// uniformly behind [`SharedStorage`] when a caller wants a lock-protected handle
/// regardless of mutability.
pub struct ConstantStorage(pub Value);

impl ObjectStorage for ConstantStorage {
    fn get(&self, _element: usize) -> Value {
        self.0.clone()
    }

    fn set(&mut self, _element: usize, _value: Value) -> Result<(), AbortCode> {
        Err(AbortCode::AttemptToWriteReadOnlyObject)
    }
}
