//! Run counters using atomic counters.
//!
//! Counters exist only for the current run; nothing is persisted. They
//! are logged once at the end of a run as a diagnostic aid.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counters for the current run.
#[derive(Default)]
pub struct Metrics {
    pub connections_opened: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub trials_run: AtomicU64,
    pub trials_failed: AtomicU64,
}

/// Global metrics singleton.
pub static METRICS: once_cell::sync::Lazy<&'static Metrics> =
    once_cell::sync::Lazy::new(|| Box::leak(Box::new(Metrics::default())));

impl Metrics {
    /// One-line summary for end-of-run logging.
    pub fn render_summary(&self) -> String {
        format!(
            "run counters: connections={} bytes_sent={} bytes_received={} trials={} failed={}",
            self.connections_opened.load(Ordering::Relaxed),
            self.bytes_sent.load(Ordering::Relaxed),
            self.bytes_received.load(Ordering::Relaxed),
            self.trials_run.load(Ordering::Relaxed),
            self.trials_failed.load(Ordering::Relaxed),
        )
    }
}
