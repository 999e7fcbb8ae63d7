//! Per-name definition locks.
//!
//! The redefinition guard is thread-scoped, so two threads redefining the
//! same name race and the last publish wins. When
//! `LoaderConfig::serialize_redefinitions` is set, the loader takes the lock
//! for the name around the whole `define` call instead.
//!
//! The locks live in the [`CodeCache`](crate::cache::CodeCache) they guard,
//! so every loader publishing into one cache serializes against the others.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::name::CodeName;

#[derive(Debug, Default)]
pub struct DefinitionLocks {
    locks: Mutex<FxHashMap<CodeName, Arc<Mutex<()>>>>,
}

impl DefinitionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock for `name`, creating it on first use.
    ///
    /// Locks nobody holds a handle to any more are pruned on the way.
    pub fn lock_for(&self, name: &CodeName) -> Arc<Mutex<()>> {
        #[expect(clippy::unwrap_used, reason = "Mutex poisoning is unrecoverable")]
        let mut locks = self.locks.lock().unwrap();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(name.clone()).or_default())
    }

    /// Number of locks currently tracked.
    pub fn len(&self) -> usize {
        #[expect(clippy::unwrap_used, reason = "Mutex poisoning is unrecoverable")]
        let locks = self.locks.lock().unwrap();
        locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
