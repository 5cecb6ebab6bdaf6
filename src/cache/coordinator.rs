use std::{
    collections::HashMap,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};

use crate::{
    cache::descriptor::{Descriptor, FrameKey},
    cache::store::{CacheStats, DescriptorCache},
    decode::registry::DecoderRegistry,
    foundation::error::{SeqError, SeqResult},
};

type DecodeOutcome = SeqResult<Arc<Descriptor>>;

/// One header decode in progress. Waiters block on `cv` until the owner publishes.
struct InFlight {
    outcome: Mutex<Option<DecodeOutcome>>,
    cv: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            cv: Condvar::new(),
        }
    }

    fn publish(&self, outcome: DecodeOutcome) {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(outcome);
        self.cv.notify_all();
    }

    fn wait(&self) -> DecodeOutcome {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self.cv.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[derive(Default)]
struct State {
    cache: DescriptorCache,
    in_flight: HashMap<FrameKey, Arc<InFlight>>,
    stats: CacheStats,
    // Bumped by `clear`; decodes claimed under an older epoch are not cached.
    epoch: u64,
}

enum Claim {
    Hit(Arc<Descriptor>),
    Wait(Arc<InFlight>),
    Own(Arc<InFlight>, u64),
}

/// Serves descriptors from the cache and runs at most one header decode per key at a time.
///
/// A short lock guards the cache and the in-flight table. The header decode itself runs outside
/// that lock, so decodes for different keys proceed in parallel while callers asking for a key
/// that is already being decoded wait for that decode's outcome. Failures are handed to the
/// waiters of that attempt but never cached: the next call decodes again.
///
/// [`clear`](Self::clear) starts a new cache generation: decodes claimed before it never land
/// in the cache.
pub struct DecodeCoordinator {
    registry: DecoderRegistry,
    state: Mutex<State>,
}

impl DecodeCoordinator {
    /// Coordinator resolving decoders through `registry`.
    pub fn new(registry: DecoderRegistry) -> Self {
        Self {
            registry,
            state: Mutex::new(State::default()),
        }
    }

    /// Registry used to build decoders.
    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    /// Return the cached descriptor for `key`, decoding its header first if needed.
    ///
    /// Errors: [`SeqError::NoDecoderFound`] when the file type has no usable decoder,
    /// [`SeqError::HeaderReadFailed`] when the decoder rejects the header. Nothing is cached on
    /// failure.
    #[tracing::instrument(skip(self))]
    pub fn get_or_decode_header(&self, key: &FrameKey) -> DecodeOutcome {
        let claim = {
            let mut guard = self.lock();
            let st = &mut *guard;
            if let Some(found) = st.cache.lookup(key) {
                st.stats.hits += 1;
                Claim::Hit(found)
            } else if let Some(flight) = st.in_flight.get(key) {
                st.stats.waits += 1;
                Claim::Wait(Arc::clone(flight))
            } else {
                st.stats.misses += 1;
                let flight = Arc::new(InFlight::new());
                st.in_flight.insert(key.clone(), Arc::clone(&flight));
                Claim::Own(flight, st.epoch)
            }
        };

        match claim {
            Claim::Hit(found) => {
                tracing::trace!("descriptor cache hit");
                Ok(found)
            }
            Claim::Wait(flight) => {
                tracing::debug!("joining in-flight header decode");
                flight.wait()
            }
            Claim::Own(flight, epoch) => {
                let mut guard = FlightGuard {
                    coord: self,
                    key,
                    flight,
                    epoch,
                    finished: false,
                };
                let outcome = self.decode_header(key);
                guard.finish(outcome)
            }
        }
    }

    /// Cached descriptor for `key` without decoding.
    pub fn lookup(&self, key: &FrameKey) -> Option<Arc<Descriptor>> {
        self.lock().cache.lookup(key)
    }

    /// Return `true` when `key` is cached.
    pub fn contains(&self, key: &FrameKey) -> bool {
        self.lock().cache.contains(key)
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.lock().cache.len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.lock().cache.is_empty()
    }

    /// Cached keys, sorted.
    pub fn keys(&self) -> Vec<FrameKey> {
        self.lock().cache.keys()
    }

    /// Drop every cached descriptor.
    ///
    /// Decodes already in flight still hand their outcome to the callers waiting on them, but
    /// their descriptors are not cached. Requests made after `clear` start a fresh decode.
    pub fn clear(&self) {
        let mut st = self.lock();
        st.cache.clear();
        st.in_flight.clear();
        st.epoch += 1;
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every critical section leaves `State` consistent, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decode_header(&self, key: &FrameKey) -> DecodeOutcome {
        let mut decoder = self.registry.find_decoder(key)?;
        self.lock().stats.header_decodes += 1;
        decoder.read_header(key).map_err(|e| match e {
            SeqError::HeaderReadFailed { .. } => e,
            other => SeqError::header(key.as_str(), other.to_string()),
        })?;
        decoder.initialize_color_space();
        Ok(Arc::new(Descriptor::new(key.clone(), decoder)))
    }

    /// Commit the owner's outcome: cache on success, retire the in-flight slot, wake waiters.
    fn complete(
        &self,
        key: &FrameKey,
        flight: &Arc<InFlight>,
        epoch: u64,
        outcome: DecodeOutcome,
    ) -> DecodeOutcome {
        let outcome = {
            let mut st = self.lock();
            // After a `clear` the slot may belong to a newer decode of the same key.
            if st
                .in_flight
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, flight))
            {
                st.in_flight.remove(key);
            }
            match outcome {
                Ok(descriptor) if st.epoch != epoch => {
                    tracing::debug!(%key, "cache cleared during decode, not caching header");
                    Ok(descriptor)
                }
                Ok(descriptor) => {
                    tracing::debug!(%key, "caching decoded header");
                    Ok(st.cache.insert(key.clone(), descriptor))
                }
                Err(e) => {
                    st.stats.failures += 1;
                    tracing::warn!(%key, error = %e, "header decode failed");
                    Err(e)
                }
            }
        };
        flight.publish(outcome.clone());
        outcome
    }
}

impl std::fmt::Debug for DecodeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.lock();
        f.debug_struct("DecodeCoordinator")
            .field("registry", &self.registry)
            .field("cached", &st.cache.len())
            .field("in_flight", &st.in_flight.len())
            .finish()
    }
}

/// Retires the owner's in-flight slot even if the decoder panics, so waiters never hang.
struct FlightGuard<'a> {
    coord: &'a DecodeCoordinator,
    key: &'a FrameKey,
    flight: Arc<InFlight>,
    epoch: u64,
    finished: bool,
}

impl FlightGuard<'_> {
    fn finish(&mut self, outcome: DecodeOutcome) -> DecodeOutcome {
        self.finished = true;
        self.coord
            .complete(self.key, &self.flight, self.epoch, outcome)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let err = SeqError::header(self.key.as_str(), "decoder panicked during header read");
            let _ = self
                .coord
                .complete(self.key, &self.flight, self.epoch, Err(err));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/coordinator.rs"]
mod tests;
