//! Component C: the object dictionary container.
//!
//! The C++ source gives every `Object` a raw back-pointer to its owning OD, set
//! and cleared under the OD's write-lock, so the object can find its index and so
//! destruction can detect liveness. Objects here are owned directly by the OD's
//! map instead (see the design notes' arena/slab recommendation) -- there is no
//! back-pointer to maintain, and "still referenced" falls naturally out of the
//! read-lock an [`ObjectHandle`] holds for as long as it's alive.

use crate::object::Object;
use parking_lot::{ArcRwLockReadGuard, RawRwLock, RwLock};
use snafu::Snafu;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Failure from [`ObjectDictionary::register`].
#[derive(Debug, Snafu, PartialEq, Eq, Clone, Copy)]
pub enum RegistrationError {
    #[snafu(display("index {index:#06x} is already registered"))]
    IndexInUse { index: u16 },
}

type Map = BTreeMap<u16, Object>;

/// An indexed, thread-safe container of CANopen objects.
///
/// A single reader-writer lock guards the map. Registration, removal, and
/// `clear` take the write-lock; everything else takes a read-lock, including
/// the extra read-lock an [`ObjectHandle`] carries for its own lifetime so the
/// object it names cannot be removed out from under it.
pub struct ObjectDictionary {
    inner: Arc<RwLock<Map>>,
}

impl Default for ObjectDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectDictionary {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Registers `object` at `index`. Ownership transfers only on success.
    pub fn register(&self, index: u16, object: Object) -> Result<(), RegistrationError> {
        let mut guard = self.inner.write();
        if guard.contains_key(&index) {
            return Err(RegistrationError::IndexInUse { index });
        }
        guard.insert(index, object);
        #[cfg(feature = "log")]
        log::debug!("registered object at index {index:#06x}");
        Ok(())
    }

    /// Removes the object at `index`, if present. No-op otherwise.
    pub fn remove(&self, index: u16) {
        let mut guard = self.inner.write();
        if guard.remove(&index).is_some() {
            #[cfg(feature = "log")]
            log::debug!("removed object at index {index:#06x}");
        }
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// A scoped shared lock over the whole map, for callers (e.g. ObjectEnum)
    /// that want to walk many indices without re-locking per index.
    pub fn lock_for_object_access(&self) -> ObjectDictionaryGuard {
        ObjectDictionaryGuard {
            guard: self.inner.read_arc(),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.read().len()
    }

    pub fn indices(&self) -> Vec<u16> {
        self.inner.read().keys().copied().collect()
    }

    /// The object at the lowest registered index, or an empty handle.
    pub fn first(&self) -> ObjectHandle {
        let guard = self.inner.read_arc();
        match guard.keys().next().copied() {
            Some(index) => ObjectHandle::occupied(guard, index),
            None => ObjectHandle::empty(),
        }
    }

    /// The object at `index`, or an empty handle if not present.
    pub fn get(&self, index: u16) -> ObjectHandle {
        let guard = self.inner.read_arc();
        if guard.contains_key(&index) {
            ObjectHandle::occupied(guard, index)
        } else {
            ObjectHandle::empty()
        }
    }

    /// The object with the smallest index `>= index`, or an empty handle.
    pub fn get_next_nearest(&self, index: u16) -> ObjectHandle {
        let guard = self.inner.read_arc();
        match guard.range(index..).next().map(|(&i, _)| i) {
            Some(i) => ObjectHandle::occupied(guard, i),
            None => ObjectHandle::empty(),
        }
    }

    /// Consumes the dictionary. Panics if any [`ObjectHandle`] or
    /// [`ObjectDictionaryGuard`] derived from it is still alive, matching the
    /// source's "destruction requires a successful try-acquire of the
    /// write-lock; failure is fatal" contract.
    pub fn destroy(self) {
        match self.inner.try_write() {
            Some(mut guard) => guard.clear(),
            None => panic!(
                "ObjectDictionary::destroy: object dictionary destroyed while a handle or access lock was still held"
            ),
        }
    }
}

/// A scoped read-lock over the whole dictionary map.
pub struct ObjectDictionaryGuard {
    guard: ArcRwLockReadGuard<RawRwLock, Map>,
}

impl ObjectDictionaryGuard {
    pub fn get(&self, index: u16) -> Option<&Object> {
        self.guard.get(&index)
    }

    pub fn indices(&self) -> impl Iterator<Item = u16> + '_ {
        self.guard.keys().copied()
    }

    pub fn range(&self, start: u16, end: u16) -> impl Iterator<Item = (u16, &Object)> + '_ {
        self.guard.range(start..=end).map(|(&i, o)| (i, o))
    }
}

/// A handle to a single object in an [`ObjectDictionary`], or the empty handle.
///
/// Holding a non-empty handle keeps the OD's read-lock acquired for as long as
/// the handle lives, which is what guarantees the named object cannot be
/// removed while the handle exists. Rust's ownership model gives the source's
/// "operator= acquires the new lock before releasing the old" guarantee for
/// free: assigning a new `ObjectHandle` into a variable fully constructs the
/// new value (acquiring its lock) before the old value is dropped (releasing
/// its lock).
///
/// A handle can be [`Clone`]d (re-acquiring its own read-lock, hence "one more
/// read-lock" rather than a shared one) and walked forward with
/// [`ObjectHandle::next`], which preserves the lock while there is a next
/// entry and releases it once enumeration runs past the last one.
pub struct ObjectHandle {
    guard: Option<ArcRwLockReadGuard<RawRwLock, Map>>,
    index: Option<u16>,
}

impl ObjectHandle {
    fn occupied(guard: ArcRwLockReadGuard<RawRwLock, Map>, index: u16) -> Self {
        Self {
            guard: Some(guard),
            index: Some(index),
        }
    }

    pub fn empty() -> Self {
        Self {
            guard: None,
            index: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_none()
    }

    pub fn index(&self) -> Option<u16> {
        self.index
    }

    pub fn object(&self) -> Option<&Object> {
        self.guard.as_ref()?.get(&self.index?)
    }

    /// Advances to the object at the next registered index, keeping the same
    /// read-lock for as long as there is a next entry. Once there is no next
    /// object, the returned handle is empty and the lock is released.
    pub fn next(mut self) -> Self {
        let Some(index) = self.index else { return self };
        let guard = self.guard.take().expect("occupied handle always carries a guard");
        let next_index = index
            .checked_add(1)
            .and_then(|start| guard.range(start..).next().map(|(&i, _)| i));
        match next_index {
            Some(i) => Self {
                guard: Some(guard),
                index: Some(i),
            },
            None => Self::empty(),
        }
    }
}

impl Clone for ObjectHandle {
    /// Re-acquires a fresh read-lock on the same dictionary rather than
    /// sharing the original guard, so the clone's lifetime is independent of
    /// the handle it was copied from.
    fn clone(&self) -> Self {
        match (&self.guard, self.index) {
            (Some(guard), Some(index)) => {
                let rwlock = ArcRwLockReadGuard::rwlock(guard).clone();
                Self::occupied(rwlock.read_arc(), index)
            }
            _ => Self::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{share, ConstantStorage, SubindexSpec, Variable};
    use cood_common::{Attributes, DataType, Value};

    fn make_var(value: u32) -> Object {
        Object::Variable(Variable::new(
            SubindexSpec::scalar(DataType::Unsigned32, Attributes::read_write()),
            share(ConstantStorage(Value::Unsigned32(value))),
        ))
    }

    #[test]
    fn register_get_remove() {
        let od = ObjectDictionary::new();
        od.register(0x2000, make_var(1)).unwrap();
        assert_eq!(od.count(), 1);
        let handle = od.get(0x2000);
        assert!(!handle.is_empty());
        assert_eq!(handle.index(), Some(0x2000));
        drop(handle);
        od.remove(0x2000);
        assert_eq!(od.count(), 0);
        assert!(od.get(0x2000).is_empty());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let od = ObjectDictionary::new();
        od.register(0x2000, make_var(1)).unwrap();
        assert_eq!(
            od.register(0x2000, make_var(2)),
            Err(RegistrationError::IndexInUse { index: 0x2000 })
        );
    }

    #[test]
    fn get_next_nearest_finds_successor() {
        let od = ObjectDictionary::new();
        od.register(0x2000, make_var(1)).unwrap();
        od.register(0x3000, make_var(2)).unwrap();
        let handle = od.get_next_nearest(0x2500);
        assert_eq!(handle.index(), Some(0x3000));
        assert!(od.get_next_nearest(0x4000).is_empty());
    }

    #[test]
    fn indices_are_sorted() {
        let od = ObjectDictionary::new();
        od.register(0x3000, make_var(1)).unwrap();
        od.register(0x1000, make_var(2)).unwrap();
        od.register(0x2000, make_var(3)).unwrap();
        assert_eq!(od.indices(), vec![0x1000, 0x2000, 0x3000]);
    }

    #[test]
    #[should_panic(expected = "destroyed while a handle")]
    fn destroy_panics_while_handle_is_live() {
        let od = ObjectDictionary::new();
        od.register(0x2000, make_var(1)).unwrap();
        let _handle = od.get(0x2000);
        od.destroy();
    }

    #[test]
    fn destroy_succeeds_once_handles_are_dropped() {
        let od = ObjectDictionary::new();
        od.register(0x2000, make_var(1)).unwrap();
        {
            let _handle = od.get(0x2000);
        }
        od.destroy();
    }

    #[test]
    fn clone_takes_its_own_read_lock() {
        let od = ObjectDictionary::new();
        od.register(0x2000, make_var(1)).unwrap();
        let handle = od.get(0x2000);
        let cloned = handle.clone();
        assert_eq!(cloned.index(), Some(0x2000));
        drop(handle);
        // The clone's own lock keeps the object alive after the original is dropped.
        assert!(!cloned.is_empty());
        drop(cloned);
        od.destroy();
    }

    #[test]
    fn clone_of_empty_handle_is_empty() {
        assert!(ObjectHandle::empty().clone().is_empty());
    }

    #[test]
    fn next_walks_to_the_following_index_and_preserves_the_lock() {
        let od = ObjectDictionary::new();
        od.register(0x1000, make_var(1)).unwrap();
        od.register(0x2000, make_var(2)).unwrap();
        od.register(0x3000, make_var(3)).unwrap();

        let handle = od.get(0x1000).next();
        assert_eq!(handle.index(), Some(0x2000));
        let handle = handle.next();
        assert_eq!(handle.index(), Some(0x3000));
    }

    #[test]
    fn next_past_the_last_entry_releases_the_lock() {
        let od = ObjectDictionary::new();
        od.register(0x2000, make_var(1)).unwrap();
        let handle = od.get(0x2000).next();
        assert!(handle.is_empty());
        drop(handle);
        od.destroy();
    }
}
