use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

/// Default byte budget of a [`PixelCache`]: 256 MiB.
pub const DEFAULT_PIXEL_CACHE_BYTES: usize = 256 * 1024 * 1024;

pub(crate) type Pixels = Arc<Vec<f32>>;

/// Byte-bounded LRU of decoded frame pixels, shared by the decoders of one registry.
///
/// Cached descriptors keep only header metadata; full-frame pixels live here and are evicted
/// least-recently-used first once the budget is exceeded. The most recent frame is always kept,
/// so a single frame larger than the budget is decoded once per use instead of once per row.
/// Resident memory is therefore bounded by `max(max_bytes, largest frame)`.
#[derive(Debug)]
pub struct PixelCache {
    max_bytes: usize,
    next_slot: AtomicU64,
    lru: Mutex<Lru>,
}

#[derive(Debug, Default)]
struct Lru {
    // Front is least recently used.
    entries: VecDeque<(u64, Pixels)>,
    bytes: usize,
}

impl PixelCache {
    /// Cache holding at most `max_bytes` of pixel data (beyond the most recent frame).
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            next_slot: AtomicU64::new(0),
            lru: Mutex::new(Lru::default()),
        }
    }

    /// Configured budget in bytes.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Bytes currently held.
    pub fn bytes(&self) -> usize {
        self.lock().bytes
    }

    /// Number of frames currently held.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Return `true` when no pixels are held.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Drop every held frame.
    pub fn clear(&self) {
        let mut lru = self.lock();
        lru.entries.clear();
        lru.bytes = 0;
    }

    /// Fresh slot id for one decoder instance.
    pub(crate) fn allocate_slot(&self) -> u64 {
        self.next_slot.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn get(&self, slot: u64) -> Option<Pixels> {
        let mut lru = self.lock();
        let pos = lru.entries.iter().position(|(s, _)| *s == slot)?;
        let entry = lru.entries.remove(pos)?;
        let pixels = Arc::clone(&entry.1);
        lru.entries.push_back(entry);
        Some(pixels)
    }

    pub(crate) fn insert(&self, slot: u64, pixels: Pixels) {
        let mut lru = self.lock();
        lru.take(slot);
        lru.bytes += byte_len(&pixels);
        lru.entries.push_back((slot, pixels));
        while lru.bytes > self.max_bytes && lru.entries.len() > 1 {
            if let Some((evicted, p)) = lru.entries.pop_front() {
                lru.bytes -= byte_len(&p);
                tracing::trace!(slot = evicted, "evicted decoded pixels");
            }
        }
    }

    pub(crate) fn remove(&self, slot: u64) {
        self.lock().take(slot);
    }

    fn lock(&self) -> MutexGuard<'_, Lru> {
        self.lru.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PixelCache {
    fn default() -> Self {
        Self::new(DEFAULT_PIXEL_CACHE_BYTES)
    }
}

impl Lru {
    fn take(&mut self, slot: u64) {
        if let Some(pos) = self.entries.iter().position(|(s, _)| *s == slot)
            && let Some((_, p)) = self.entries.remove(pos)
        {
            self.bytes -= byte_len(&p);
        }
    }
}

fn byte_len(pixels: &[f32]) -> usize {
    std::mem::size_of_val(pixels)
}

#[cfg(test)]
#[path = "../../tests/unit/decode/pixel_cache.rs"]
mod tests;
