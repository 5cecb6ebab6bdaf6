use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use super::*;
use crate::decode::registry::DecoderRegistry;
use crate::foundation::color::{linear_to_srgb, to_u8};
use crate::foundation::core::{Channel, ChannelSet, FrameIndex, FrameRange};
use crate::reader::opts::ReaderOpts;
use crate::sequence::source::{FileSequence, SequenceSource};
use crate::test_support::{StubFactory, StubSpec};

fn reader(factory: &StubFactory, max_w: u32, max_h: u32) -> Arc<Reader> {
    let range = FrameRange::new(FrameIndex(1), FrameIndex(5)).unwrap();
    let seq: Arc<dyn SequenceSource> =
        Arc::new(FileSequence::from_range("shot01.####.exr", range).unwrap());
    let opts = ReaderOpts {
        preview_max_width: max_w,
        preview_max_height: max_h,
        ..ReaderOpts::default()
    };
    Arc::new(Reader::new(seq, factory.registry("exr"), opts).unwrap())
}

fn never() -> bool {
    false
}

#[test]
fn preview_size_bounds_each_axis() {
    let big = DataWindow::from_size(4000, 2000);
    assert_eq!(preview_size(big, 200, 150), (200, 150));
    let small = DataWindow::from_size(100, 50);
    assert_eq!(preview_size(small, 200, 150), (100, 50));
    let tall = DataWindow::from_size(120, 900);
    assert_eq!(preview_size(tall, 200, 150), (120, 150));
}

#[test]
fn nearest_index_uses_independent_scale() {
    assert_eq!(nearest_index(0, 200, 4000), 0);
    assert_eq!(nearest_index(1, 200, 4000), 20);
    assert_eq!(nearest_index(199, 200, 4000), 3980);
    for i in 0..7 {
        assert_eq!(nearest_index(i, 7, 7), i);
    }
    // Never past the last source index.
    assert_eq!(nearest_index(1, 2, 3), 2);
    assert_eq!(nearest_index(0, 0, 3), 0);
}

#[test]
fn compute_preview_samples_and_flips() {
    let factory = StubFactory::new(StubSpec {
        window: DataWindow::from_size(40, 20),
        channels: ChannelSet::rgb(),
        pixel: |x, y, c| match c {
            Channel::Red if y == 0 => 1.0,
            Channel::Green => x as f32 / 39.0,
            _ => 0.0,
        },
        ..StubSpec::default()
    });
    let reader = reader(&factory, 10, 5);

    let img = compute_preview(&reader, &never).unwrap().unwrap();
    assert_eq!(img.dimensions(), (10, 5));
    // Source row 0 is the bottom line; alpha defaults to opaque.
    assert_eq!(img.get_pixel(0, 4).0[0], 255);
    assert_eq!(img.get_pixel(0, 0).0[0], 0);
    assert_eq!(img.get_pixel(3, 2).0[3], 255);
    // Column 9 samples source column 36: sRGB-encoded 36/39.
    let expected = to_u8(linear_to_srgb(36.0 / 39.0));
    assert_eq!(img.get_pixel(9, 0).0[1], expected);
    assert_eq!(factory.header_reads(), 1);
}

#[test]
fn compute_preview_stops_when_cancelled() {
    let factory = StubFactory::default();
    let reader = reader(&factory, 8, 8);
    let out = compute_preview(&reader, &|| true).unwrap();
    assert!(out.is_none());
}

#[test]
fn background_preview_publishes_to_sink_and_reader() {
    let factory = StubFactory::default();
    let reader = reader(&factory, 3, 2);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let sink: Arc<dyn PreviewSink> = Arc::new(move |img: &PreviewImage| {
        assert_eq!(img.dimensions(), (3, 2));
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let handle = reader.show_file_preview(sink).unwrap();
    assert_eq!(handle.generation(), 1);
    assert_eq!(handle.join(), PreviewOutcome::Published);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(reader.preview().unwrap().dimensions(), (3, 2));
}

#[test]
fn newer_request_supersedes_older_task() {
    let factory = StubFactory::new(StubSpec {
        header_delay: Duration::from_millis(200),
        ..StubSpec::default()
    });
    let reader = reader(&factory, 4, 2);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let sink: Arc<dyn PreviewSink> = Arc::new(move |_: &PreviewImage| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let first = reader.show_file_preview(Arc::clone(&sink)).unwrap();
    let second = reader.show_file_preview(sink).unwrap();
    assert_eq!(first.join(), PreviewOutcome::Superseded);
    assert_eq!(second.join(), PreviewOutcome::Published);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(factory.header_reads(), 1);
}

#[test]
fn failed_header_gives_blank_preview() {
    let factory = StubFactory::new(StubSpec {
        fail_header: true,
        ..StubSpec::default()
    });
    let reader = reader(&factory, 4, 4);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let sink: Arc<dyn PreviewSink> = Arc::new(move |_: &PreviewImage| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let outcome = reader.show_file_preview(sink).unwrap().join();
    assert!(matches!(
        outcome,
        PreviewOutcome::Failed(SeqError::HeaderReadFailed { .. })
    ));
    assert!(reader.preview().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_decoder_preview_fails() {
    let range = FrameRange::new(FrameIndex(1), FrameIndex(1)).unwrap();
    let seq: Arc<dyn SequenceSource> =
        Arc::new(FileSequence::from_range("shot01.####.exr", range).unwrap());
    let reader = Reader::new(seq, DecoderRegistry::new(), ReaderOpts::default()).unwrap();
    let err = compute_preview(&reader, &never).unwrap_err();
    assert!(matches!(err, SeqError::NoDecoderFound { .. }));
}

#[test]
fn stale_generation_does_not_notify_sink() {
    let state = PreviewState::default();
    let old = state.begin();
    let new = state.begin();
    let calls = AtomicUsize::new(0);
    let sink = |_: &PreviewImage| {
        calls.fetch_add(1, Ordering::SeqCst);
    };

    assert!(!state.publish(old, PreviewImage::new(1, 1), &sink));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(state.latest().is_none());

    assert!(state.publish(new, PreviewImage::new(2, 1), &sink));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.latest().unwrap().dimensions(), (2, 1));
}

#[test]
fn sink_runs_inside_publish_critical_section() {
    let state = Arc::new(PreviewState::default());
    let generation = state.begin();
    let observer = Arc::clone(&state);
    let sink = move |_: &PreviewImage| {
        assert!(matches!(
            observer.latest.try_lock(),
            Err(std::sync::TryLockError::WouldBlock)
        ));
    };
    assert!(state.publish(generation, PreviewImage::new(1, 1), &sink));
}

#[test]
fn last_notification_matches_stored_preview() {
    let factory = StubFactory::default();
    let reader = reader(&factory, 3, 2);
    let notified = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&notified);
    let sink: Arc<dyn PreviewSink> = Arc::new(move |img: &PreviewImage| {
        seen.lock().unwrap().push(img as *const PreviewImage as usize);
    });

    let handles: Vec<_> = (0..16)
        .map(|_| reader.show_file_preview(Arc::clone(&sink)).unwrap())
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(PreviewHandle::join).collect();
    assert_eq!(outcomes.last(), Some(&PreviewOutcome::Published));

    let stored = reader.preview().unwrap();
    let notified = notified.lock().unwrap();
    assert_eq!(
        notified.last().copied(),
        Some(Arc::as_ptr(&stored) as usize)
    );
}
