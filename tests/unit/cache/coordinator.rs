use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::*;
use crate::decode::decoder::Decoder;
use crate::test_support::{StubFactory, StubSpec};

#[test]
fn second_call_is_served_from_cache() {
    let factory = StubFactory::default();
    let coord = DecodeCoordinator::new(factory.registry("exr"));
    let key = FrameKey::from("shot01.0001.exr");

    let a = coord.get_or_decode_header(&key).unwrap();
    let b = coord.get_or_decode_header(&key).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(factory.header_reads(), 1);
    assert_eq!(factory.color_inits(), 1);

    let st = coord.stats();
    assert_eq!(st.misses, 1);
    assert_eq!(st.hits, 1);
    assert_eq!(st.header_decodes, 1);
    assert_eq!(coord.len(), 1);
}

#[test]
fn concurrent_callers_share_one_decode() {
    let factory = StubFactory::new(StubSpec {
        header_delay: Duration::from_millis(50),
        ..StubSpec::default()
    });
    let coord = DecodeCoordinator::new(factory.registry("exr"));
    let key = FrameKey::from("shot01.0005.exr");

    let results: Vec<Arc<Descriptor>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| coord.get_or_decode_header(&key).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(factory.header_reads(), 1);
    for d in &results[1..] {
        assert!(Arc::ptr_eq(d, &results[0]));
    }
    assert_eq!(coord.keys(), vec![key]);
    let st = coord.stats();
    assert_eq!(st.misses, 1);
    assert_eq!(st.hits + st.waits, 7);
}

#[test]
fn missing_decoder_leaves_cache_empty() {
    let coord = DecodeCoordinator::new(DecoderRegistry::new());
    let key = FrameKey::from("shot01.0001.exr");
    let err = coord.get_or_decode_header(&key).unwrap_err();
    assert!(matches!(err, SeqError::NoDecoderFound { .. }));
    assert!(coord.is_empty());
    assert_eq!(coord.stats().failures, 1);
    assert_eq!(coord.stats().header_decodes, 0);
}

#[test]
fn header_failures_are_not_cached() {
    let factory = StubFactory::new(StubSpec {
        fail_header: true,
        ..StubSpec::default()
    });
    let coord = DecodeCoordinator::new(factory.registry("exr"));
    let key = FrameKey::from("broken.exr");

    for attempt in 1..=2 {
        let err = coord.get_or_decode_header(&key).unwrap_err();
        assert!(matches!(err, SeqError::HeaderReadFailed { .. }));
        assert_eq!(factory.header_reads(), attempt);
    }
    assert!(!coord.contains(&key));
    assert_eq!(factory.color_inits(), 0);
}

#[test]
fn clear_forces_a_new_decode() {
    let factory = StubFactory::default();
    let coord = DecodeCoordinator::new(factory.registry("exr"));
    let key = FrameKey::from("a.exr");

    coord.get_or_decode_header(&key).unwrap();
    coord.clear();
    assert!(coord.lookup(&key).is_none());
    coord.get_or_decode_header(&key).unwrap();
    assert_eq!(factory.header_reads(), 2);
}

struct PanicOnce {
    armed: Arc<AtomicBool>,
    inner: Box<dyn Decoder>,
}

impl Decoder for PanicOnce {
    fn read_header(&mut self, key: &FrameKey) -> SeqResult<()> {
        if self.armed.swap(false, Ordering::SeqCst) {
            panic!("decoder blew up");
        }
        self.inner.read_header(key)
    }

    fn initialize_color_space(&mut self) {
        self.inner.initialize_color_space();
    }

    fn render(
        &self,
        time: crate::FrameIndex,
        row: &mut crate::decode::row::Row,
    ) -> SeqResult<()> {
        self.inner.render(time, row)
    }

    fn data_window(&self) -> crate::DataWindow {
        self.inner.data_window()
    }

    fn channels(&self) -> crate::ChannelSet {
        self.inner.channels()
    }
}

#[test]
fn panicking_decoder_releases_in_flight_slot() {
    let armed = Arc::new(AtomicBool::new(true));
    let stub = StubFactory::default();
    let mut reg = DecoderRegistry::new();
    let flag = Arc::clone(&armed);
    reg.register("exr", move || -> SeqResult<Box<dyn Decoder>> {
        Ok(Box::new(PanicOnce {
            armed: Arc::clone(&flag),
            inner: stub.decoder(),
        }))
    });
    let coord = DecodeCoordinator::new(reg);
    let key = FrameKey::from("a.exr");

    let joined = std::thread::scope(|s| s.spawn(|| coord.get_or_decode_header(&key)).join());
    assert!(joined.is_err());
    assert!(coord.is_empty());

    coord.get_or_decode_header(&key).unwrap();
    assert_eq!(coord.len(), 1);
}

#[test]
fn clear_during_decode_does_not_cache_stale_header() {
    let factory = StubFactory::new(StubSpec {
        header_delay: Duration::from_millis(200),
        ..StubSpec::default()
    });
    let coord = DecodeCoordinator::new(factory.registry("exr"));
    let key = FrameKey::from("old.0001.exr");

    let (stale, fresh) = std::thread::scope(|s| {
        let before = s.spawn(|| coord.get_or_decode_header(&key));
        std::thread::sleep(Duration::from_millis(50));
        coord.clear();
        let after = s.spawn(|| coord.get_or_decode_header(&key));
        (before.join().unwrap(), after.join().unwrap())
    });

    // The caller that started before `clear` still gets its descriptor.
    let stale = stale.unwrap();
    let fresh = fresh.unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));
    assert_eq!(factory.header_reads(), 2);

    let cached = coord.lookup(&key).unwrap();
    assert!(Arc::ptr_eq(&cached, &fresh));
    assert_eq!(coord.len(), 1);
}

#[test]
fn clear_with_only_a_stale_decode_leaves_cache_empty() {
    let factory = StubFactory::new(StubSpec {
        header_delay: Duration::from_millis(200),
        ..StubSpec::default()
    });
    let coord = DecodeCoordinator::new(factory.registry("exr"));
    let key = FrameKey::from("old.0001.exr");

    let result = std::thread::scope(|s| {
        let owner = s.spawn(|| coord.get_or_decode_header(&key));
        std::thread::sleep(Duration::from_millis(50));
        coord.clear();
        owner.join().unwrap()
    });

    assert!(result.is_ok());
    assert!(coord.is_empty());
    coord.get_or_decode_header(&key).unwrap();
    assert_eq!(factory.header_reads(), 2);
}
