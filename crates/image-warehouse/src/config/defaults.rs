//! Default values for configuration fields.

use std::path::PathBuf;

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_warehouse_path() -> PathBuf {
    PathBuf::from("warehouse")
}

pub fn default_warm_cache() -> bool {
    true
}

pub fn default_cache_capacity() -> usize {
    crate::cache::DEFAULT_CAPACITY
}

pub fn default_resize_workers() -> usize {
    0
}
