//! Per-function result cache.
//!
//! `bind_cached` functions get one [`FuncCache`] each, created at
//! registration time and keyed by the exact wire bytes of the incoming
//! request (the request fingerprint: name plus all argument values in the
//! adapter's canonical encoding). The registry stores the caches type-erased
//! so that a single server can hold caches for any mix of return types; only
//! the bind site - which knows `R` - ever looks inside one.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Cached results for one bound function, keyed by request bytes.
///
/// Append-only for the lifetime of the server: no expiry, no eviction, no
/// size bound. A racing second writer for the same key simply overwrites
/// with an equal value.
pub struct FuncCache<R> {
    entries: Mutex<HashMap<Vec<u8>, R>>,
}

impl<R: Clone> FuncCache<R> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up the cached result for a request fingerprint.
    pub fn get(&self, key: &[u8]) -> Option<R> {
        self.lock().get(key).cloned()
    }

    /// Stores a result, taking ownership of the fingerprint bytes.
    pub fn insert(&self, key: Vec<u8>, value: R) {
        self.lock().insert(key, value);
    }

    /// Number of distinct requests cached so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Vec<u8>, R>> {
        // A poisoned cache only means another session panicked mid-insert;
        // the map itself is still a full, consistent snapshot.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Type-erased view of a [`FuncCache`], for the registry.
pub(crate) trait CacheSlot: Send + Sync {
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn clear(&self);
}

impl<R: Clone + Send + 'static> CacheSlot for FuncCache<R> {
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn clear(&self) {
        FuncCache::clear(self);
    }
}

/// All caches a server owns, one slot per `bind_cached` name.
#[derive(Default)]
pub(crate) struct CacheRegistry {
    slots: HashMap<String, Arc<dyn CacheSlot>>,
}

impl CacheRegistry {
    /// Creates (or replaces) the cache slot for a name, returning the typed
    /// handle the bound handler will capture.
    pub(crate) fn register<R: Clone + Send + 'static>(&mut self, name: &str) -> Arc<FuncCache<R>> {
        let cache = Arc::new(FuncCache::new());
        self.slots
            .insert(name.to_owned(), Arc::clone(&cache) as Arc<dyn CacheSlot>);
        cache
    }

    /// Recovers the typed handle for a name. Returns `None` when the name
    /// has no cache or was registered with a different return type.
    pub(crate) fn typed<R: Clone + Send + 'static>(&self, name: &str) -> Option<Arc<FuncCache<R>>> {
        let slot = Arc::clone(self.slots.get(name)?);
        slot.as_any().downcast::<FuncCache<R>>().ok()
    }

    pub(crate) fn clear_all(&self) {
        for slot in self.slots.values() {
            slot.clear();
        }
    }
}
