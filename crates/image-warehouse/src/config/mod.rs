use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod defaults;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub resize: ResizeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Directory the images are served from.
    #[serde(default = "default_warehouse_path")]
    pub path: PathBuf,
    /// Populate the cache from the warehouse before accepting requests.
    #[serde(default = "default_warm_cache")]
    pub warm_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of decoded images retained in memory.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeConfig {
    /// Worker strips per resize pass; 0 means one per CPU.
    #[serde(default = "default_resize_workers")]
    pub workers: usize,
}

impl Config {
    /// Load configuration from a TOML file merged with
    /// `IMAGE_WAREHOUSE_*` environment variables. A missing file is fine;
    /// every field has a default.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("IMAGE_WAREHOUSE_").split("__"))
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: default_warehouse_path(),
            warm_cache: default_warm_cache(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            workers: default_resize_workers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from_file("/definitely/not/here.toml").unwrap();
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.cache.capacity, 50);
        assert_eq!(config.resize.workers, 0);
        assert!(config.warehouse.warm_cache);
    }

    #[test]
    fn toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[web]\nport = 9001\n\n[cache]\ncapacity = 8\n\n[warehouse]\npath = \"/srv/images\"\nwarm_cache = false\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.web.port, 9001);
        assert_eq!(config.web.host, default_host());
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.warehouse.path, PathBuf::from("/srv/images"));
        assert!(!config.warehouse.warm_cache);
    }
}
