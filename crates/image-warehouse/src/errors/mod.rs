//! Centralized error handling for the image warehouse service.
//!
//! The service does very little fallible work outside of startup: decode
//! failures are surfaced to handlers as cache misses rather than errors,
//! and the resampler never fails at runtime. What remains is collected
//! here as a small `thiserror` hierarchy.

pub mod types;

pub use types::*;

/// Convenience alias for Results using [`AppError`].
pub type AppResult<T> = Result<T, AppError>;
