use std::{collections::HashMap, sync::Arc};

use crate::cache::descriptor::{Descriptor, FrameKey};

/// Counters describing how the descriptor cache has been used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that started a header decode.
    pub misses: u64,
    /// Lookups that joined a header decode already in flight.
    pub waits: u64,
    /// Header reads performed by decoders.
    pub header_decodes: u64,
    /// Decode attempts that ended in an error.
    pub failures: u64,
}

/// Frame key to descriptor map.
///
/// Not synchronized on its own: the owning [`DecodeCoordinator`](crate::DecodeCoordinator)
/// serializes every access. Capacity is unbounded; entries live until [`clear`](Self::clear) or
/// drop.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: HashMap<FrameKey, Arc<Descriptor>>,
}

impl DescriptorCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached descriptor for `key`, if any.
    pub fn lookup(&self, key: &FrameKey) -> Option<Arc<Descriptor>> {
        self.entries.get(key).map(Arc::clone)
    }

    /// Store `descriptor` under `key` and return the authoritative entry.
    ///
    /// The first insert for a key wins: a later insert is skipped and the existing descriptor is
    /// returned.
    pub fn insert(&mut self, key: FrameKey, descriptor: Arc<Descriptor>) -> Arc<Descriptor> {
        Arc::clone(self.entries.entry(key).or_insert(descriptor))
    }

    /// Return `true` when `key` is cached.
    pub fn contains(&self, key: &FrameKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached descriptor.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached keys, sorted.
    pub fn keys(&self) -> Vec<FrameKey> {
        let mut out: Vec<FrameKey> = self.entries.keys().cloned().collect();
        out.sort();
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/store.rs"]
mod tests;
