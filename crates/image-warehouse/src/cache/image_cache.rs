//! Façade between the request handlers and the LRU cache.
//!
//! Narrows the cache to the two operations the handlers need, pins every
//! entry's size to 1 (so the capacity is simply "how many decoded images
//! to retain"), and is the single place cache hits and misses are counted.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::errors::CacheError;
use crate::models::ImageHandle;

use super::lru::LruCache;

/// Number of decoded images the server retains by default.
pub const DEFAULT_CAPACITY: usize = 50;

/// Point-in-time cache statistics for the status endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

/// Thread-safe image cache keyed by warehouse filename.
///
/// A single mutex covers the recency list and the index map; `get` mutates
/// recency order, so there is nothing to gain from a reader/writer split.
/// Stored images are `Arc`-shared and immutable, so a handle returned from
/// [`get`](Self::get) stays valid after the entry is evicted.
pub struct ImageCache {
    inner: Mutex<LruCache<String, ImageHandle>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ImageCache {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        Ok(Self {
            inner: Mutex::new(LruCache::new(capacity)?),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Fetch the image stored under `key`, refreshing its recency.
    pub fn get(&self, key: &str) -> Option<ImageHandle> {
        let hit = self.lock().get(key);
        match hit {
            Some(image) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(image)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `image` under `key`, evicting the least recently used entries
    /// if the cache is full.
    pub fn put(&self, key: impl Into<String>, image: ImageHandle) {
        self.lock().put(key.into(), image, 1);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap()
    }

    pub fn stats(&self) -> CacheStats {
        let guard = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: guard.len(),
            capacity: guard.cap(),
        }
    }

    /// A poisoned lock means a panic mid-operation; the list/map state is
    /// still structurally sound (links are rewritten before sizes), so we
    /// keep serving rather than propagate the poison.
    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, ImageHandle>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
