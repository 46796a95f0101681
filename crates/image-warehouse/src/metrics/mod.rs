//! Request counters for the status endpoint.
//!
//! Held by the web state rather than as process globals, so tests can
//! spin up isolated servers and assert on the numbers.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters shared across request handlers.
pub struct ServerMetrics {
    queries: AtomicU64,
    failed_queries: AtomicU64,
    started_at: DateTime<Utc>,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub queries: u64,
    pub failed_queries: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            queries: AtomicU64::new(0),
            failed_queries: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Count one successfully served request.
    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one request that could not be served.
    pub fn record_failure(&self) {
        self.failed_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_seconds: (Utc::now() - self.started_at).num_seconds(),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
