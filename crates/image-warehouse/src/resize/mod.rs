//! Parallel separable Lanczos-3 image resampler.
//!
//! A resize is two horizontal filter passes. The first pass filters every
//! input row and writes its output transposed, so the second pass — run
//! over the transposed temporary with the vertical weight table — is the
//! same horizontal loop and lands back in the natural orientation. Each
//! pass partitions its destination rows into one strip per worker; strips
//! are disjoint slices of the destination buffer, so the inner loops run
//! without synchronization, and the second pass starts only after the
//! first has fully joined.
//!
//! YCbCr images (any subsampling) are repacked into [`planar::Planar8`]
//! and filtered with 8-bit samples and `i16` coefficients; everything else
//! goes through the generic 16-bit path using the per-pixel RGBA accessor.
//! All inner-loop arithmetic is integer: coefficients are fixed-point and
//! each accumulator is divided by the actual coefficient sum, which makes
//! the filter insensitive to tail truncation.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::models::{Image, ImageHandle};

pub mod kernel;
pub mod planar;

use kernel::{Weights8, Weights16, weights8, weights16};
use planar::Planar8;

/// Transposed 16-bit RGBA working buffer (four samples per pixel).
struct Plane16 {
    /// Pixels per row.
    width: usize,
    /// Row count.
    height: usize,
    pix: Vec<u16>,
}

impl Plane16 {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pix: vec![0; 4 * width * height],
        }
    }

    fn stride(&self) -> usize {
        4 * self.width
    }
}

/// Two-pass separable Lanczos-3 resizer.
pub struct Resampler {
    workers: usize,
}

impl Resampler {
    /// Create a resampler that fans each pass out over `workers` strips.
    /// Zero means one strip per available CPU.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            workers
        };
        Self { workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Resize `image` to `width` x `height`.
    ///
    /// A zero dimension is computed from the other one, preserving the
    /// aspect ratio; both zero (or a target equal to the source) returns
    /// the input handle unchanged. YCbCr input yields YCbCr 4:4:4 output;
    /// every other layout yields RGBA-16.
    pub fn resize(&self, width: u32, height: u32, image: &ImageHandle) -> ImageHandle {
        let (src_w, src_h) = (image.width(), image.height());
        if src_w == 0 || src_h == 0 {
            return Arc::clone(image);
        }

        let (scale_x, scale_y) =
            scale_factors(width, height, f64::from(src_w), f64::from(src_h));
        let width = if width == 0 {
            (0.7 + f64::from(src_w) / scale_x) as u32
        } else {
            width
        };
        let height = if height == 0 {
            (0.7 + f64::from(src_h) / scale_y) as u32
        } else {
            height
        };

        if width == src_w && height == src_h {
            return Arc::clone(image);
        }

        match image.as_ref() {
            Image::Ycbcr(src) => {
                let packed = Planar8::from_ycbcr(src);
                let horizontal = weights8(width as usize, scale_x);
                let temp = self.pass8(&packed, width as usize, &horizontal);
                let vertical = weights8(height as usize, scale_y);
                let result = self.pass8(&temp, height as usize, &vertical);
                Arc::new(Image::Ycbcr(result.into_ycbcr444()))
            }
            other => {
                debug!(
                    format = other.format_name(),
                    "no packed fast path, resampling through the rgba16 accessor"
                );
                let horizontal = weights16(width as usize, scale_x);
                let temp = self.pass16_accessor(other, width as usize, &horizontal);
                let vertical = weights16(height as usize, scale_y);
                let result = self.pass16(&temp, height as usize, &vertical);
                Arc::new(Image::Rgba16 {
                    width,
                    height,
                    pixels: result.pix,
                })
            }
        }
    }

    /// One 8-bit horizontal pass; the output is the transpose of the
    /// filtered input (`dst_rows` rows of `src.height` pixels).
    fn pass8(&self, src: &Planar8, dst_rows: usize, weights: &Weights8) -> Planar8 {
        let mut out = Planar8::new(src.height, dst_rows as u32, src.subsampling);
        let out_stride = out.stride;
        let strip = dst_rows.div_ceil(self.workers).max(1);
        let max_x = src.width as usize - 1;

        out.pix
            // max(1) keeps the chunk size legal for degenerate zero-size
            // destinations; the buffer is empty, so nothing runs.
            .par_chunks_mut((out_stride * strip).max(1))
            .enumerate()
            .for_each(|(s, chunk)| {
                filter_rows8(src, chunk, out_stride, s * strip, weights, max_x);
            });
        out
    }

    /// First 16-bit pass, sampling the source through its RGBA accessor.
    fn pass16_accessor(&self, src: &Image, dst_rows: usize, weights: &Weights16) -> Plane16 {
        let mut out = Plane16::new(src.height() as usize, dst_rows);
        let out_stride = out.stride();
        let strip = dst_rows.div_ceil(self.workers).max(1);

        out.pix
            .par_chunks_mut((out_stride * strip).max(1))
            .enumerate()
            .for_each(|(s, chunk)| {
                filter_rows16_accessor(src, chunk, out_stride, s * strip, weights);
            });
        out
    }

    /// Second 16-bit pass over the packed transposed temporary.
    fn pass16(&self, src: &Plane16, dst_rows: usize, weights: &Weights16) -> Plane16 {
        let mut out = Plane16::new(src.height, dst_rows);
        let out_stride = out.stride();
        let strip = dst_rows.div_ceil(self.workers).max(1);
        let max_x = src.width - 1;

        out.pix
            .par_chunks_mut((out_stride * strip).max(1))
            .enumerate()
            .for_each(|(s, chunk)| {
                filter_rows16(src, chunk, out_stride, s * strip, weights, max_x);
            });
        out
    }
}

/// Scale factors from target and source dimensions; a zero target copies
/// the factor of the other axis so the aspect ratio survives.
fn scale_factors(width: u32, height: u32, old_w: f64, old_h: f64) -> (f64, f64) {
    match (width, height) {
        (0, 0) => (1.0, 1.0),
        (0, h) => {
            let s = old_h / f64::from(h);
            (s, s)
        }
        (w, 0) => {
            let s = old_w / f64::from(w);
            (s, s)
        }
        (w, h) => (old_w / f64::from(w), old_h / f64::from(h)),
    }
}

/// Filter a strip of transposed output rows (8-bit path).
///
/// Output row `y` is destination column `y`; output column `x` is input
/// row `x`.
fn filter_rows8(
    src: &Planar8,
    chunk: &mut [u8],
    out_stride: usize,
    y0: usize,
    weights: &Weights8,
    max_x: usize,
) {
    let fl = weights.filter_length;
    for x in 0..src.height as usize {
        let row = &src.pix[x * src.stride..(x + 1) * src.stride];
        for (dy, out_row) in chunk.chunks_mut(out_stride).enumerate() {
            let y = y0 + dy;
            let start = weights.offsets[y];
            let coeffs = &weights.coeffs[y * fl..(y + 1) * fl];

            let mut p = [0i32; 3];
            let mut sum = 0i32;
            for (i, &coeff) in coeffs.iter().enumerate() {
                if coeff == 0 {
                    continue;
                }
                let coeff = i32::from(coeff);
                let xi = start + i as isize;
                // Clamp to the nearest valid column, then scale to bytes.
                let base = if xi >= 0 && (xi as usize) < max_x {
                    xi as usize * 3
                } else if xi >= max_x as isize {
                    max_x * 3
                } else {
                    0
                };
                p[0] += coeff * i32::from(row[base]);
                p[1] += coeff * i32::from(row[base + 1]);
                p[2] += coeff * i32::from(row[base + 2]);
                sum += coeff;
            }

            let o = 3 * x;
            if sum == 0 {
                out_row[o..o + 3].fill(0);
            } else {
                out_row[o] = clamp_u8(p[0] / sum);
                out_row[o + 1] = clamp_u8(p[1] / sum);
                out_row[o + 2] = clamp_u8(p[2] / sum);
            }
        }
    }
}

/// Filter a strip of transposed output rows, reading the source through
/// its per-pixel RGBA accessor (first 16-bit pass).
fn filter_rows16_accessor(
    src: &Image,
    chunk: &mut [u16],
    out_stride: usize,
    y0: usize,
    weights: &Weights16,
) {
    let fl = weights.filter_length;
    let max_x = src.width() as usize - 1;

    for x in 0..src.height() as usize {
        for (dy, out_row) in chunk.chunks_mut(out_stride).enumerate() {
            let y = y0 + dy;
            let start = weights.offsets[y];
            let coeffs = &weights.coeffs[y * fl..(y + 1) * fl];

            let mut rgba = [0i64; 4];
            let mut sum = 0i64;
            for (i, &coeff) in coeffs.iter().enumerate() {
                if coeff == 0 {
                    continue;
                }
                let xi = start + i as isize;
                let col = if xi >= 0 && (xi as usize) < max_x {
                    xi as usize
                } else if xi >= max_x as isize {
                    max_x
                } else {
                    0
                };
                let px = src.rgba16_at(col as u32, x as u32);
                for c in 0..4 {
                    rgba[c] += i64::from(coeff) * i64::from(px[c]);
                }
                sum += i64::from(coeff);
            }

            let o = 4 * x;
            if sum == 0 {
                out_row[o..o + 4].fill(0);
            } else {
                for c in 0..4 {
                    out_row[o + c] = clamp_u16(rgba[c] / sum);
                }
            }
        }
    }
}

/// Filter a strip of transposed output rows over a packed 16-bit buffer
/// (second 16-bit pass).
fn filter_rows16(
    src: &Plane16,
    chunk: &mut [u16],
    out_stride: usize,
    y0: usize,
    weights: &Weights16,
    max_x: usize,
) {
    let fl = weights.filter_length;
    let src_stride = src.stride();

    for x in 0..src.height {
        let row = &src.pix[x * src_stride..(x + 1) * src_stride];
        for (dy, out_row) in chunk.chunks_mut(out_stride).enumerate() {
            let y = y0 + dy;
            let start = weights.offsets[y];
            let coeffs = &weights.coeffs[y * fl..(y + 1) * fl];

            let mut rgba = [0i64; 4];
            let mut sum = 0i64;
            for (i, &coeff) in coeffs.iter().enumerate() {
                if coeff == 0 {
                    continue;
                }
                let xi = start + i as isize;
                let base = if xi >= 0 && (xi as usize) < max_x {
                    xi as usize * 4
                } else if xi >= max_x as isize {
                    max_x * 4
                } else {
                    0
                };
                for c in 0..4 {
                    rgba[c] += i64::from(coeff) * i64::from(row[base + c]);
                }
                sum += i64::from(coeff);
            }

            let o = 4 * x;
            if sum == 0 {
                out_row[o..o + 4].fill(0);
            } else {
                for c in 0..4 {
                    out_row[o + c] = clamp_u16(rgba[c] / sum);
                }
            }
        }
    }
}

/// Clamp an accumulator to the 8-bit range.
///
/// The unsigned cast folds the common in-range case into a single compare;
/// negative values overflow to large unsigned values, so the order of the
/// three arms is load-bearing.
#[inline]
fn clamp_u8(v: i32) -> u8 {
    if (v as u32) < 256 {
        v as u8
    } else if v > 255 {
        255
    } else {
        0
    }
}

/// Clamp an accumulator to the 16-bit range; same trick as [`clamp_u8`].
#[inline]
fn clamp_u16(v: i64) -> u16 {
    if (v as u64) < 65536 {
        v as u16
    } else if v > 65535 {
        65535
    } else {
        0
    }
}
