use super::*;

fn frame(floats: usize) -> Pixels {
    Arc::new(vec![0.0; floats])
}

#[test]
fn evicts_least_recently_used_over_budget() {
    // Room for two 16-byte frames.
    let cache = PixelCache::new(32);
    let (a, b, c) = (cache.allocate_slot(), cache.allocate_slot(), cache.allocate_slot());
    cache.insert(a, frame(4));
    cache.insert(b, frame(4));
    assert!(cache.get(a).is_some());

    cache.insert(c, frame(4));
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.bytes(), 32);
    assert!(cache.get(b).is_none());
    assert!(cache.get(a).is_some());
    assert!(cache.get(c).is_some());
}

#[test]
fn keeps_latest_frame_even_when_oversized() {
    let cache = PixelCache::new(8);
    let (a, b) = (cache.allocate_slot(), cache.allocate_slot());
    cache.insert(a, frame(100));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.bytes(), 400);

    cache.insert(b, frame(100));
    assert_eq!(cache.len(), 1);
    assert!(cache.get(a).is_none());
    assert!(cache.get(b).is_some());
}

#[test]
fn reinsert_and_remove_keep_byte_count() {
    let cache = PixelCache::new(1024);
    let a = cache.allocate_slot();
    cache.insert(a, frame(4));
    cache.insert(a, frame(8));
    assert_eq!((cache.len(), cache.bytes()), (1, 32));

    cache.remove(a);
    assert!(cache.is_empty());
    assert_eq!(cache.bytes(), 0);
    cache.remove(a);
}

#[test]
fn slots_are_unique() {
    let cache = PixelCache::default();
    assert_ne!(cache.allocate_slot(), cache.allocate_slot());
    assert_eq!(cache.max_bytes(), DEFAULT_PIXEL_CACHE_BYTES);
}
