//! Core metrics traits.
//!
//! Provides `MetricsRecorder` trait and `NoopMetrics` so that services
//! can accept `Arc<dyn MetricsRecorder>` unconditionally. No exporter ships
//! with the crate; embedders plug in their own recorder.

use std::sync::Arc;

/// Trait for recording application metrics.
///
/// All methods are no-op by default, allowing partial implementation.
/// Implementations must be thread-safe (Send + Sync).
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync {
    // ===== Analytics =====

    /// Record an analytics event accepted for a card
    fn inc_event_recorded(&self, event_type: &str) {}

    /// Record summary read served from cache or recomputed
    fn inc_summary_read(&self, cached: bool) {}

    /// Record background refresh outcome ("ok" | "retry" | "failed")
    fn inc_summary_refresh(&self, status: &str) {}

    /// Record refresh job dropped before running ("queue_full" | "closed")
    fn inc_summary_refresh_dropped(&self, reason: &str) {}

    // ===== Payments =====

    /// Record gateway notification by outcome
    /// ("paid" | "failed" | "duplicate" | "rejected")
    fn inc_payment_notification(&self, outcome: &str) {}

    // ===== Auth =====

    /// Record authentication failure
    fn inc_auth_failure(&self, method: &str) {}
}

/// Noop metrics implementation for testing and default builds.
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {}

impl NoopMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn arc() -> Arc<dyn MetricsRecorder> {
        Arc::new(Self::new())
    }
}

impl Default for NoopMetrics {
    fn default() -> Self {
        Self::new()
    }
}
