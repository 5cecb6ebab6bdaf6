use super::*;
use crate::test_support::StubFactory;

fn descriptor(key: &str) -> Arc<Descriptor> {
    Arc::new(Descriptor::new(
        FrameKey::from(key),
        StubFactory::default().decoder(),
    ))
}

#[test]
fn lookup_after_insert() {
    let mut cache = DescriptorCache::new();
    let key = FrameKey::from("shot01.0001.exr");
    assert!(cache.lookup(&key).is_none());

    let d = descriptor("shot01.0001.exr");
    let stored = cache.insert(key.clone(), Arc::clone(&d));
    assert!(Arc::ptr_eq(&stored, &d));
    assert!(Arc::ptr_eq(&cache.lookup(&key).unwrap(), &d));
    assert!(cache.contains(&key));
    assert_eq!(cache.len(), 1);
}

#[test]
fn first_insert_is_authoritative() {
    let mut cache = DescriptorCache::new();
    let key = FrameKey::from("a.0001.exr");
    let first = descriptor("a.0001.exr");
    let second = descriptor("a.0001.exr");

    cache.insert(key.clone(), Arc::clone(&first));
    let kept = cache.insert(key.clone(), second);
    assert!(Arc::ptr_eq(&kept, &first));
    assert_eq!(cache.len(), 1);
}

#[test]
fn clear_and_keys() {
    let mut cache = DescriptorCache::new();
    cache.insert(FrameKey::from("b.exr"), descriptor("b.exr"));
    cache.insert(FrameKey::from("a.exr"), descriptor("a.exr"));
    assert_eq!(
        cache.keys(),
        vec![FrameKey::from("a.exr"), FrameKey::from("b.exr")]
    );
    cache.clear();
    assert!(cache.is_empty());
}
