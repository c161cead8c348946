//! # Handle Table
//!
//! Resolves opaque `Handle`s back to objects on the side that owns them.
//!
//! Handles are minted per table; a handle from one table means nothing in another.
//! Uses DashMap so transports can insert and resolve from many tasks without a
//! global lock.

use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use showerpack::Handle;

/// Owner-side resource table.
pub struct HandleTable<T: ?Sized> {
    entries: DashMap<u32, Arc<T>>,
    next: AtomicU32,
}

impl<T: ?Sized + Send + Sync> HandleTable<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next: AtomicU32::new(1),
        }
    }

    /// Registers `object` and returns a fresh, non-null handle for it.
    pub fn insert(&self, object: Arc<T>) -> Handle {
        let mut raw = self.next.fetch_add(1, Ordering::Relaxed);
        while raw == 0 || self.entries.contains_key(&raw) {
            // wrapped around
            raw = self.next.fetch_add(1, Ordering::Relaxed);
        }
        self.entries.insert(raw, object);
        Handle::from_raw(raw)
    }

    /// Resolves a handle. `Handle::NULL` and unknown handles resolve to `None`.
    pub fn get(&self, handle: Handle) -> Option<Arc<T>> {
        if handle.is_null() {
            return None;
        }
        self.entries.get(&handle.raw()).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, handle: Handle) -> Option<Arc<T>> {
        self.entries.remove(&handle.raw()).map(|(_, object)| object)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized + Send + Sync> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
