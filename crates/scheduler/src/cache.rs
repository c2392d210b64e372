use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use simdex_core::types::ArtifactKey;

/// Opaque handle to an index already resident in a device cache.
/// The router only ever checks for its presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHandle {
    ordinal: u32,
}

impl IndexHandle {
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }
}

/// Read-only view of per-device artifact caches.
///
/// Implementations must be safe under concurrent scheduler invocations and
/// must not perform I/O. A device the cache layer never initialised is a
/// miss, not an error; misses are routine and never logged above debug.
pub trait CacheProbe: Send + Sync {
    fn cached_index(&self, ordinal: u32, key: &str) -> Option<IndexHandle>;
}

/// In-memory probe backed by per-device key sets.
///
/// Stands in for the real device cache in tests, and serves embedders that
/// track residency themselves.
#[derive(Default)]
pub struct MemoryCacheProbe {
    devices: RwLock<HashMap<u32, HashSet<ArtifactKey>>>,
}

impl MemoryCacheProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ordinal: u32, key: impl Into<ArtifactKey>) {
        self.devices
            .write()
            .unwrap()
            .entry(ordinal)
            .or_default()
            .insert(key.into());
    }

    pub fn evict(&self, ordinal: u32, key: &str) {
        if let Some(keys) = self.devices.write().unwrap().get_mut(&ordinal) {
            keys.remove(key);
        }
    }
}

impl CacheProbe for MemoryCacheProbe {
    fn cached_index(&self, ordinal: u32, key: &str) -> Option<IndexHandle> {
        let devices = self.devices.read().unwrap();
        devices
            .get(&ordinal)
            .is_some_and(|keys| keys.contains(key))
            .then_some(IndexHandle { ordinal })
    }
}
