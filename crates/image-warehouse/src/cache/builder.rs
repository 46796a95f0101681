//! Warm-up population of the image cache from the warehouse directory.
//!
//! Runs once at startup: every regular file in the warehouse is decoded
//! and inserted through the cache's public contract. Files that fail to
//! decode are skipped; the request path will report them as missing.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::warehouse::Decoder;

use super::image_cache::ImageCache;

/// Outcome of a warm-up scan.
#[derive(Debug, Default, Clone, Copy)]
pub struct WarmupStats {
    /// Directory entries considered.
    pub scanned: usize,
    /// Images decoded and inserted.
    pub loaded: usize,
}

/// Scan `warehouse` and populate `cache` with every decodable image.
pub fn build(cache: &ImageCache, decoder: &dyn Decoder, warehouse: &Path) -> Result<WarmupStats> {
    info!(dir = %warehouse.display(), "building image cache from warehouse");
    let start = std::time::Instant::now();

    let mut stats = WarmupStats::default();
    let entries = std::fs::read_dir(warehouse)
        .with_context(|| format!("failed to read warehouse directory {}", warehouse.display()))?;

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            debug!(path = %entry.path().display(), "skipping non-UTF-8 filename");
            continue;
        };

        stats.scanned += 1;
        match decoder.decode(&name) {
            Some(image) => {
                cache.put(name, Arc::new(image));
                stats.loaded += 1;
            }
            None => debug!(file = %name, "warm-up decode failed, skipping"),
        }
    }

    info!(
        scanned = stats.scanned,
        loaded = stats.loaded,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "image cache build finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::image_cache::ImageCache;
    use crate::warehouse::WarehouseDecoder;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32) {
        let img = RgbImage::from_pixel(w, h, Rgb([10, 120, 230]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        std::fs::write(dir.join(name), bytes).unwrap();
    }

    #[test]
    fn populates_cache_and_skips_junk() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(dir.path(), "a.jpg", 8, 8);
        write_jpeg(dir.path(), "b.jpg", 4, 4);
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

        let cache = ImageCache::new(10).unwrap();
        let decoder = WarehouseDecoder::new(dir.path());
        let stats = build(&cache, &decoder, dir.path()).unwrap();

        assert_eq!(stats.scanned, 3);
        assert_eq!(stats.loaded, 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a.jpg").is_some());
        assert!(cache.get("notes.txt").is_none());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let cache = ImageCache::new(10).unwrap();
        let decoder = WarehouseDecoder::new("/nonexistent/warehouse");
        assert!(build(&cache, &decoder, Path::new("/nonexistent/warehouse")).is_err());
    }
}
