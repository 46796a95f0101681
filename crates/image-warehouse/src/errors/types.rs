//! Error type definitions for the image warehouse service.

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Cache construction errors
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration loading or validation errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Response encoding errors
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// Filesystem errors during startup (warehouse scan)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cache-specific errors.
///
/// Runtime cache operations are infallible; the only failure mode is a
/// misconfigured capacity, rejected at construction time.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,
}
