//! Concurrency stress tests for the image cache.
//!
//! Eight threads hammer a shared cache with a mixed get/put workload.
//! Values are tiny images whose pixels encode their key, so any torn read
//! or phantom value shows up as a key/value mismatch.

use std::sync::Arc;
use std::thread;

use image_warehouse::cache::ImageCache;
use image_warehouse::models::{Image, ImageHandle};

const THREADS: usize = 8;
const OPS_PER_THREAD: usize = 10_000;
const CAPACITY: usize = 64;
const KEY_SPACE: usize = 128;

/// Canonical value for a key: every byte of the pixel encodes the key
/// index, so value integrity is checkable on any get.
fn value_for(idx: usize) -> ImageHandle {
    let tag = (idx % 251) as u8;
    Arc::new(Image::Rgba8 {
        width: 1,
        height: 1,
        pixels: vec![tag, tag.wrapping_add(1), tag.wrapping_add(2), 255],
    })
}

fn assert_is_value_for(idx: usize, image: &Image) {
    let tag = (idx % 251) as u8;
    let Image::Rgba8 { pixels, .. } = image else {
        panic!("unexpected image variant in cache");
    };
    assert_eq!(
        pixels,
        &vec![tag, tag.wrapping_add(1), tag.wrapping_add(2), 255],
        "value for key {idx} was torn or fabricated"
    );
}

#[test]
fn mixed_workload_stays_bounded_and_consistent() {
    let cache = Arc::new(ImageCache::new(CAPACITY).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                // Cheap deterministic per-thread sequence; no shared state.
                let mut x = (t as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15);
                for _ in 0..OPS_PER_THREAD {
                    x ^= x << 13;
                    x ^= x >> 7;
                    x ^= x << 17;
                    let idx = (x as usize >> 8) % KEY_SPACE;
                    let key = format!("img-{idx}");
                    if x % 2 == 0 {
                        cache.put(key, value_for(idx));
                    } else if let Some(found) = cache.get(&key) {
                        assert_is_value_for(idx, &found);
                    }
                    assert!(cache.len() <= CAPACITY);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.len() <= CAPACITY);
    let stats = cache.stats();
    assert_eq!(stats.capacity, CAPACITY);
    assert!(stats.hits + stats.misses > 0);
}

#[test]
fn racing_gets_share_one_handle() {
    let cache = Arc::new(ImageCache::new(4).unwrap());
    cache.put("shared", value_for(1));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get("shared").unwrap())
        })
        .collect();

    let first = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .reduce(|a, b| {
            assert!(Arc::ptr_eq(&a, &b));
            a
        })
        .unwrap();
    assert_is_value_for(1, &first);
}

#[test]
fn replacement_is_never_observed_as_absent() {
    let cache = Arc::new(ImageCache::new(4).unwrap());
    cache.put("k", value_for(0));

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for i in 0..5_000 {
                cache.put("k", value_for(i % 2));
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..5_000 {
                    let found = cache
                        .get("k")
                        .expect("replaced key must never be transiently absent");
                    let Image::Rgba8 { pixels, .. } = found.as_ref() else {
                        panic!("unexpected variant");
                    };
                    assert!(pixels[0] == 0 || pixels[0] == 1);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
