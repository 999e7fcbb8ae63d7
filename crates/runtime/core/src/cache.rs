//! Code cache.
//!
//! Maps code unit names to weakly-held loaded artifacts. The cache is
//! thread-safe and designed for concurrent read access with infrequent writes
//! (definition events).
//!
//! The cache never keeps an artifact alive: entries whose artifact has been
//! dropped by every holder stay in the map as dead weak references until the
//! next `publish`, which sweeps them. There is no background collector.

use std::sync::{Arc, Mutex, RwLock, Weak};

use rustc_hash::FxHashMap;

use crate::artifact::LoadedArtifact;
use crate::locks::DefinitionLocks;
use crate::name::CodeName;

/// Thread-safe name → `Weak<LoadedArtifact>` map.
///
/// Cloning shares the underlying map and its definition locks.
#[derive(Debug, Clone, Default)]
pub struct CodeCache {
    entries: Arc<RwLock<FxHashMap<CodeName, Weak<LoadedArtifact>>>>,
    locks: Arc<DefinitionLocks>,
}

impl CodeCache {
    /// Create a new empty code cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the artifact published under `name`.
    ///
    /// Returns `None` if there is no entry or its artifact has already been
    /// dropped.
    pub fn lookup(&self, name: &CodeName) -> Option<Arc<LoadedArtifact>> {
        #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
        let entries = self.entries.read().unwrap();
        entries.get(name).and_then(Weak::upgrade)
    }

    /// Remove the entry for `name`, live or not.
    ///
    /// Called before a redefinition starts so that a half-dead entry can
    /// never be observed while the new artifact is being loaded. Returns
    /// whether an entry was present.
    pub fn invalidate(&self, name: &CodeName) -> bool {
        #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
        let mut entries = self.entries.write().unwrap();
        entries.remove(name).is_some()
    }

    /// Insert or overwrite the entry for `name`, then sweep dead entries.
    ///
    /// Returns the number of dead entries swept.
    pub fn publish(&self, name: CodeName, artifact: &Arc<LoadedArtifact>) -> usize {
        #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
        let mut entries = self.entries.write().unwrap();

        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        let swept = before.saturating_sub(entries.len());

        entries.insert(name, Arc::downgrade(artifact));
        swept
    }

    /// Whether an entry exists for `name`, even if its artifact is dead.
    pub fn contains(&self, name: &CodeName) -> bool {
        #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
        let entries = self.entries.read().unwrap();
        entries.contains_key(name)
    }

    /// Number of entries in the cache, including not-yet-swept dead ones.
    pub fn len(&self) -> usize {
        #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
        let entries = self.entries.read().unwrap();
        entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock serializing definitions of `name` into this cache.
    pub fn definition_lock(&self, name: &CodeName) -> Arc<Mutex<()>> {
        self.locks.lock_for(name)
    }

    pub fn definition_locks(&self) -> &DefinitionLocks {
        &self.locks
    }

    /// Remove all entries from the cache.
    ///
    /// Used to prevent state leakage between `#[serial]` tests that share
    /// `CODE_CACHE`. Not available in production builds.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn clear(&self) {
        #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
        let mut entries = self.entries.write().unwrap();
        entries.clear();
    }
}
