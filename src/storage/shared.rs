//! Shared ownership of a backing store.
//!
//! Every file bucket holds one alias of a [`SharedRef`]. `acquire()` (or
//! `clone()`) adds an alias, dropping one releases it, and the store is
//! dropped, closing its file, when the last alias goes away.
//!
//! The count is a plain `Rc` counter. `SharedRef` is `!Send` and `!Sync`:
//! aliases produced by splitting a bucket must be consumed by the thread that
//! owns the brigade.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::BackingStore;

pub struct SharedRef {
    inner: Rc<RefCell<Box<dyn BackingStore>>>,
}

impl SharedRef {
    pub fn new<S: BackingStore + 'static>(store: S) -> Self {
        Self::from_box(Box::new(store))
    }

    pub fn from_box(store: Box<dyn BackingStore>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(store)),
        }
    }

    /// Adds an alias of the same store.
    pub fn acquire(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Gives up this alias, closing the store if it was the last one.
    pub fn release(self) {
        drop(self);
    }

    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn ptr_eq(&self, other: &SharedRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs `f` with exclusive access to the store.
    ///
    /// # Panics
    ///
    /// Panics if called re-entrantly from inside `f`.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut dyn BackingStore) -> R) -> R {
        let mut store = self.inner.borrow_mut();
        f(&mut **store)
    }
}

impl Clone for SharedRef {
    fn clone(&self) -> Self {
        self.acquire()
    }
}

impl fmt::Debug for SharedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRef")
            .field("refcount", &self.refcount())
            .finish()
    }
}
