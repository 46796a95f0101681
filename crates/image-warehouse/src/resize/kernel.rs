//! Lanczos-3 kernel and fixed-point weight tables for one separable pass.
//!
//! A weight table row describes which input columns feed one output column
//! and with what integer coefficients: `offsets[y]` is the first input
//! column sampled and `coeffs[y * filter_length ..]` holds `filter_length`
//! coefficients. Coefficients are scaled by 256 for the 8-bit pass and by
//! 65536 for the 16-bit pass; the accumulator is later divided by the
//! coefficient sum, so the scale cancels and truncated filter tails do not
//! darken the output.

use std::f64::consts::PI;

/// Kernel taps on each side times two; Lanczos-3 spans six input samples
/// at unit scale.
pub const TAPS: usize = 6;

/// Values below 1.0 sharpen, above blur. The service resizes photographs
/// and keeps the neutral setting.
pub const BLUR: f64 = 1.0;

/// `sin(πx)/(πx)` with the customary guard around zero.
fn sinc(x: f64) -> f64 {
    let x = x.abs() * PI;
    if x >= 1.220703e-4 { x.sin() / x } else { 1.0 }
}

/// Windowed sinc with support (-3, 3).
pub fn lanczos3(x: f64) -> f64 {
    if x > -3.0 && x < 3.0 {
        sinc(x) * sinc(x / 3.0)
    } else {
        0.0
    }
}

/// Weight table with `i16` coefficients scaled by 256 (8-bit pass).
pub struct Weights8 {
    pub coeffs: Vec<i16>,
    pub offsets: Vec<isize>,
    pub filter_length: usize,
}

/// Weight table with `i32` coefficients scaled by 65536 (16-bit pass).
pub struct Weights16 {
    pub coeffs: Vec<i32>,
    pub offsets: Vec<isize>,
    pub filter_length: usize,
}

/// Boolean mask table selecting the single nearest sample. Kept for
/// nearest-neighbor experiments; the server always filters with Lanczos.
pub struct WeightsNearest {
    pub mask: Vec<bool>,
    pub offsets: Vec<isize>,
    pub filter_length: usize,
}

/// Support length and per-sample scale for one pass.
///
/// Downscaling widens the filter (`scale` input pixels map onto one output
/// pixel) and compresses the kernel argument by the same factor.
fn pass_geometry(scale: f64) -> (usize, f64) {
    let filter_length = TAPS * (BLUR * scale).ceil().max(1.0) as usize;
    let filter_factor = (1.0 / (BLUR * scale)).min(1.0);
    (filter_length, filter_factor)
}

/// Map output index `y` to the continuous input position and the first
/// sampled column.
fn sample_window(y: usize, scale: f64, filter_length: usize) -> (f64, isize) {
    let interp = scale * (y as f64 + 0.5) - 0.5;
    let start = interp.floor() as isize - filter_length as isize / 2 + 1;
    (interp, start)
}

pub fn weights8(dy: usize, scale: f64) -> Weights8 {
    let (filter_length, filter_factor) = pass_geometry(scale);
    let mut coeffs = vec![0i16; dy * filter_length];
    let mut offsets = vec![0isize; dy];

    for y in 0..dy {
        let (interp, start) = sample_window(y, scale, filter_length);
        offsets[y] = start;
        for i in 0..filter_length {
            let arg = (interp - start as f64 - i as f64) * filter_factor;
            coeffs[y * filter_length + i] = (lanczos3(arg) * 256.0).round() as i16;
        }
    }

    Weights8 {
        coeffs,
        offsets,
        filter_length,
    }
}

pub fn weights16(dy: usize, scale: f64) -> Weights16 {
    let (filter_length, filter_factor) = pass_geometry(scale);
    let mut coeffs = vec![0i32; dy * filter_length];
    let mut offsets = vec![0isize; dy];

    for y in 0..dy {
        let (interp, start) = sample_window(y, scale, filter_length);
        offsets[y] = start;
        for i in 0..filter_length {
            let arg = (interp - start as f64 - i as f64) * filter_factor;
            coeffs[y * filter_length + i] = (lanczos3(arg) * 65536.0).round() as i32;
        }
    }

    Weights16 {
        coeffs,
        offsets,
        filter_length,
    }
}

pub fn weights_nearest(dy: usize, scale: f64) -> WeightsNearest {
    let (filter_length, filter_factor) = pass_geometry(scale);
    let mut mask = vec![false; dy * filter_length];
    let mut offsets = vec![0isize; dy];

    for y in 0..dy {
        let (interp, start) = sample_window(y, scale, filter_length);
        offsets[y] = start;
        for i in 0..filter_length {
            let arg = (interp - start as f64 - i as f64) * filter_factor;
            mask[y * filter_length + i] = (-0.5..0.5).contains(&arg);
        }
    }

    WeightsNearest {
        mask,
        offsets,
        filter_length,
    }
}
