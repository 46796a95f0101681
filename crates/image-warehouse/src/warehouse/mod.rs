//! Warehouse directory access and image decoding.
//!
//! The decoder is the service's only I/O collaborator: it maps a request
//! key (a filename) to a decoded [`Image`], or `None` for anything that
//! cannot be served — missing file, unreadable file, undecodable bytes,
//! or a key that tries to escape the warehouse directory. The cache layer
//! treats every `None` as a miss; the handler turns it into a 404.

use std::path::{Component, Path, PathBuf};

use image::DynamicImage;
use tracing::debug;

use crate::models::{Image, Subsampling, YcbcrImage, color::rgb_to_ycbcr};

/// Source of decoded images, keyed by filename.
pub trait Decoder: Send + Sync {
    /// Decode the image stored under `key`. `None` on any I/O or codec
    /// error; failures are not retried.
    fn decode(&self, key: &str) -> Option<Image>;
}

/// Decoder reading JPEG/PNG files from a warehouse directory.
pub struct WarehouseDecoder {
    root: PathBuf,
}

impl WarehouseDecoder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a request key to a path inside the warehouse. Keys with
    /// parent/root components are rejected so requests cannot walk out of
    /// the directory.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty() {
            return None;
        }
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            debug!(key, "rejecting key that escapes the warehouse");
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl Decoder for WarehouseDecoder {
    fn decode(&self, key: &str) -> Option<Image> {
        let path = self.resolve(key)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(key, %err, "warehouse read failed");
                return None;
            }
        };

        let format = image::guess_format(&bytes).ok();
        let decoded = match image::load_from_memory(&bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(key, %err, "decode failed");
                return None;
            }
        };

        Some(into_model(decoded, format))
    }
}

/// Map a decoded raster into the service's pixel model.
///
/// JPEG sources are repacked as YCbCr 4:4:4 so the common warehouse case
/// rides the resampler's 8-bit path; 16-bit sources keep their depth, and
/// everything else flattens to RGBA-8.
fn into_model(decoded: DynamicImage, format: Option<image::ImageFormat>) -> Image {
    if format == Some(image::ImageFormat::Jpeg) {
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut out = YcbcrImage::new(width, height, Subsampling::Ratio444);
        for (i, px) in rgb.pixels().enumerate() {
            let (y, cb, cr) = rgb_to_ycbcr(px.0[0], px.0[1], px.0[2]);
            out.y[i] = y;
            out.cb[i] = cb;
            out.cr[i] = cr;
        }
        return Image::Ycbcr(out);
    }

    match decoded {
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgba16(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            let rgba = decoded.to_rgba16();
            let (width, height) = rgba.dimensions();
            Image::Rgba16 {
                width,
                height,
                pixels: rgba.into_raw(),
            }
        }
        _ => {
            let rgba = decoded.to_rgba8();
            let (width, height) = rgba.dimensions();
            Image::Rgba8 {
                width,
                height,
                pixels: rgba.into_raw(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn decoder_with_files() -> (tempfile::TempDir, WarehouseDecoder) {
        let dir = tempfile::tempdir().unwrap();

        let jpeg = RgbImage::from_pixel(8, 6, Rgb([120, 60, 200]));
        let mut bytes = Vec::new();
        jpeg.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        std::fs::write(dir.path().join("photo.jpg"), &bytes).unwrap();

        let png = RgbaImage::from_pixel(5, 4, Rgba([1, 2, 3, 255]));
        let mut bytes = Vec::new();
        png.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        std::fs::write(dir.path().join("icon.png"), &bytes).unwrap();

        std::fs::write(dir.path().join("broken.jpg"), b"\xff\xd8 definitely not jpeg").unwrap();

        let decoder = WarehouseDecoder::new(dir.path());
        (dir, decoder)
    }

    #[test]
    fn jpeg_decodes_to_packed_ycbcr() {
        let (_dir, decoder) = decoder_with_files();
        let img = decoder.decode("photo.jpg").unwrap();
        assert_eq!((img.width(), img.height()), (8, 6));
        assert!(matches!(img, Image::Ycbcr(_)));
    }

    #[test]
    fn png_decodes_to_rgba8() {
        let (_dir, decoder) = decoder_with_files();
        let img = decoder.decode("icon.png").unwrap();
        assert_eq!((img.width(), img.height()), (5, 4));
        let Image::Rgba8 { pixels, .. } = img else {
            panic!("expected rgba8");
        };
        assert_eq!(&pixels[..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn failures_are_misses_not_errors() {
        let (_dir, decoder) = decoder_with_files();
        assert!(decoder.decode("missing.jpg").is_none());
        assert!(decoder.decode("broken.jpg").is_none());
        assert!(decoder.decode("").is_none());
    }

    #[test]
    fn traversal_keys_are_rejected() {
        let (_dir, decoder) = decoder_with_files();
        assert!(decoder.decode("../photo.jpg").is_none());
        assert!(decoder.decode("/etc/hostname").is_none());
        assert!(decoder.decode("a/../../photo.jpg").is_none());
    }
}
