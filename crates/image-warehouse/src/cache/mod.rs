//! In-memory caching of decoded warehouse images.
//!
//! [`lru::LruCache`] is the bounded recency-ordered store;
//! [`image_cache::ImageCache`] wraps it behind a mutex as the façade the
//! request handlers use; [`builder`] pre-populates the façade from the
//! warehouse directory at startup.

pub mod builder;
pub mod image_cache;
pub mod lru;

pub use builder::{WarmupStats, build};
pub use image_cache::{CacheStats, DEFAULT_CAPACITY, ImageCache};
pub use lru::LruCache;
