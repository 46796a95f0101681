//! Packed YCbCr working buffer for the 8-bit resize path.
//!
//! Filtering walks one sample triple per pixel, so planar YCbCr with
//! per-plane subsampling is repacked into an interleaved Y/Cb/Cr layout
//! before the first pass. Repacking costs one pass over the image and
//! makes both filter passes straight row scans.
//!
//! Invariants: `stride >= 3 * width` and `pix.len() == stride * height`.

use crate::models::{Subsampling, YcbcrImage};

/// Interleaved 8-bit YCbCr raster, three samples per pixel, row-major.
#[derive(Debug, Clone)]
pub struct Planar8 {
    pub pix: Vec<u8>,
    pub stride: usize,
    pub width: u32,
    pub height: u32,
    /// Subsampling of the source image, retained so a repacked buffer can
    /// be reduced back to planes with the original layout.
    pub subsampling: Subsampling,
}

impl Planar8 {
    /// Allocate a zeroed buffer with a tight stride.
    pub fn new(width: u32, height: u32, subsampling: Subsampling) -> Self {
        let stride = 3 * width as usize;
        Self {
            pix: vec![0; stride * height as usize],
            stride,
            width,
            height,
            subsampling,
        }
    }

    /// Pack a planar image into the interleaved layout, expanding
    /// subsampled chroma to one sample per pixel.
    pub fn from_ycbcr(src: &YcbcrImage) -> Self {
        let mut out = Self::new(src.width, src.height, src.subsampling);
        for y in 0..src.height {
            let row = y as usize * out.stride;
            for x in 0..src.width {
                let (yy, cb, cr) = src.pixel(x, y);
                let i = row + 3 * x as usize;
                out.pix[i] = yy;
                out.pix[i + 1] = cb;
                out.pix[i + 2] = cr;
            }
        }
        out
    }

    /// Unpack into a planar 4:4:4 image.
    pub fn into_ycbcr444(self) -> YcbcrImage {
        let mut out = YcbcrImage::new(self.width, self.height, Subsampling::Ratio444);
        for y in 0..self.height as usize {
            let row = y * self.stride;
            let plane_row = y * out.y_stride;
            for x in 0..self.width as usize {
                let i = row + 3 * x;
                out.y[plane_row + x] = self.pix[i];
                out.cb[plane_row + x] = self.pix[i + 1];
                out.cr[plane_row + x] = self.pix[i + 2];
            }
        }
        out
    }
}
