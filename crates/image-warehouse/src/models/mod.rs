//! Decoded image model shared between the cache, the resampler, and the
//! web layer.
//!
//! Images are immutable once constructed; request handlers and the cache
//! share them through [`ImageHandle`] (`Arc`), so an entry evicted from the
//! cache stays readable for any handler still holding a handle.

use std::sync::Arc;

pub mod color;

use color::ycbcr_to_rgb;

/// Shared, immutable handle to a decoded image.
pub type ImageHandle = Arc<Image>;

/// Chroma subsampling layout of a [`YcbcrImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsampling {
    /// One chroma sample per luma sample.
    Ratio444,
    /// Chroma halved horizontally.
    Ratio422,
    /// Chroma halved horizontally and vertically.
    Ratio420,
}

impl Subsampling {
    /// Dimensions of the chroma planes for the given luma dimensions.
    pub fn chroma_size(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Subsampling::Ratio444 => (width, height),
            Subsampling::Ratio422 => (width.div_ceil(2), height),
            Subsampling::Ratio420 => (width.div_ceil(2), height.div_ceil(2)),
        }
    }
}

/// Planar YCbCr raster with an explicit subsampling layout, one byte per
/// sample. This is the shape JPEG decodes map to.
#[derive(Debug, Clone)]
pub struct YcbcrImage {
    pub width: u32,
    pub height: u32,
    pub subsampling: Subsampling,
    pub y: Vec<u8>,
    pub cb: Vec<u8>,
    pub cr: Vec<u8>,
    pub y_stride: usize,
    pub c_stride: usize,
}

impl YcbcrImage {
    /// Allocate a zeroed raster.
    pub fn new(width: u32, height: u32, subsampling: Subsampling) -> Self {
        let (cw, ch) = subsampling.chroma_size(width, height);
        Self {
            width,
            height,
            subsampling,
            y: vec![0; width as usize * height as usize],
            cb: vec![0; cw as usize * ch as usize],
            cr: vec![0; cw as usize * ch as usize],
            y_stride: width as usize,
            c_stride: cw as usize,
        }
    }

    /// Sample the (Y, Cb, Cr) triple at a pixel, resolving subsampling.
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let yi = y as usize * self.y_stride + x as usize;
        let ci = match self.subsampling {
            Subsampling::Ratio444 => y as usize * self.c_stride + x as usize,
            Subsampling::Ratio422 => y as usize * self.c_stride + x as usize / 2,
            Subsampling::Ratio420 => (y as usize / 2) * self.c_stride + x as usize / 2,
        };
        (self.y[yi], self.cb[ci], self.cr[ci])
    }
}

/// A decoded raster in one of the pixel layouts the service understands.
#[derive(Debug, Clone)]
pub enum Image {
    /// Planar YCbCr in any supported subsampling; the resampler's fast path.
    Ycbcr(YcbcrImage),
    /// Interleaved RGBA, 8 bits per channel, row-major.
    Rgba8 {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// Interleaved RGBA, 16 bits per channel, row-major.
    Rgba16 {
        width: u32,
        height: u32,
        pixels: Vec<u16>,
    },
}

impl Image {
    pub fn width(&self) -> u32 {
        match self {
            Image::Ycbcr(img) => img.width,
            Image::Rgba8 { width, .. } | Image::Rgba16 { width, .. } => *width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Image::Ycbcr(img) => img.height,
            Image::Rgba8 { height, .. } | Image::Rgba16 { height, .. } => *height,
        }
    }

    /// Name of the pixel layout, for logs.
    pub fn format_name(&self) -> &'static str {
        match self {
            Image::Ycbcr(img) => match img.subsampling {
                Subsampling::Ratio444 => "ycbcr-4:4:4",
                Subsampling::Ratio422 => "ycbcr-4:2:2",
                Subsampling::Ratio420 => "ycbcr-4:2:0",
            },
            Image::Rgba8 { .. } => "rgba8",
            Image::Rgba16 { .. } => "rgba16",
        }
    }

    /// Read one pixel as 16-bit RGBA, whatever the underlying layout.
    ///
    /// This is the generic accessor the resampler falls back to when no
    /// packed fast path exists for the format.
    pub fn rgba16_at(&self, x: u32, y: u32) -> [u16; 4] {
        match self {
            Image::Ycbcr(img) => {
                let (yy, cb, cr) = img.pixel(x, y);
                let [r, g, b] = ycbcr_to_rgb(yy, cb, cr);
                [widen(r), widen(g), widen(b), u16::MAX]
            }
            Image::Rgba8 {
                width, pixels, ..
            } => {
                let i = (y as usize * *width as usize + x as usize) * 4;
                [
                    widen(pixels[i]),
                    widen(pixels[i + 1]),
                    widen(pixels[i + 2]),
                    widen(pixels[i + 3]),
                ]
            }
            Image::Rgba16 {
                width, pixels, ..
            } => {
                let i = (y as usize * *width as usize + x as usize) * 4;
                [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
            }
        }
    }

    /// Flatten to 8-bit RGB for response encoding. Alpha is dropped; the
    /// service serves JPEG, which has no alpha channel.
    pub fn to_rgb8(&self) -> image::RgbImage {
        let (w, h) = (self.width(), self.height());
        match self {
            Image::Ycbcr(img) => image::RgbImage::from_fn(w, h, |x, y| {
                let (yy, cb, cr) = img.pixel(x, y);
                image::Rgb(ycbcr_to_rgb(yy, cb, cr))
            }),
            Image::Rgba8 { pixels, .. } => image::RgbImage::from_fn(w, h, |x, y| {
                let i = (y as usize * w as usize + x as usize) * 4;
                image::Rgb([pixels[i], pixels[i + 1], pixels[i + 2]])
            }),
            Image::Rgba16 { pixels, .. } => image::RgbImage::from_fn(w, h, |x, y| {
                let i = (y as usize * w as usize + x as usize) * 4;
                image::Rgb([
                    (pixels[i] >> 8) as u8,
                    (pixels[i + 1] >> 8) as u8,
                    (pixels[i + 2] >> 8) as u8,
                ])
            }),
        }
    }
}

/// 8-bit channel to 16-bit (0xAB -> 0xABAB).
#[inline]
fn widen(v: u8) -> u16 {
    u16::from(v) * 257
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chroma_size_per_ratio() {
        assert_eq!(Subsampling::Ratio444.chroma_size(5, 3), (5, 3));
        assert_eq!(Subsampling::Ratio422.chroma_size(5, 3), (3, 3));
        assert_eq!(Subsampling::Ratio420.chroma_size(5, 3), (3, 2));
    }

    #[test]
    fn ycbcr_420_pixel_shares_chroma() {
        let mut img = YcbcrImage::new(4, 4, Subsampling::Ratio420);
        img.cb[0] = 90;
        img.cr[0] = 190;
        for y in 0..2 {
            for x in 0..2 {
                let (_, cb, cr) = img.pixel(x, y);
                assert_eq!((cb, cr), (90, 190));
            }
        }
        let (_, cb, _) = img.pixel(2, 0);
        assert_eq!(cb, 0);
    }

    #[test]
    fn rgba16_accessor_widens_8_bit_channels() {
        let img = Image::Rgba8 {
            width: 2,
            height: 1,
            pixels: vec![0xff, 0x00, 0x80, 0xff, 1, 2, 3, 4],
        };
        assert_eq!(img.rgba16_at(0, 0), [0xffff, 0x0000, 0x8080, 0xffff]);
        assert_eq!(img.rgba16_at(1, 0), [257, 514, 771, 1028]);
    }

    #[test]
    fn to_rgb8_takes_high_byte_of_rgba16() {
        let img = Image::Rgba16 {
            width: 1,
            height: 1,
            pixels: vec![0xab00, 0, 0, 0xffff],
        };
        let rgb = img.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0[0], 0xab);
    }
}
