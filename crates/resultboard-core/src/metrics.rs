//! Global atomic counters for dashboard observability.
//!
//! Counters are incremented by the `obs` emitters. Call [`Metrics::flush`]
//! to emit current values as a single `tracing::info!` event (e.g. when the
//! CLI exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    syncs: AtomicU64,
    searches: AtomicU64,
    transcripts: AtomicU64,
    stale_loads: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            syncs: AtomicU64::new(0),
            searches: AtomicU64::new(0),
            transcripts: AtomicU64::new(0),
            stale_loads: AtomicU64::new(0),
        }
    }

    pub fn inc_syncs(&self) {
        self.syncs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "syncs", "counter incremented");
    }

    pub fn inc_searches(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_transcripts(&self) {
        self.transcripts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "transcripts", "counter incremented");
    }

    /// Loads whose result was dropped because a newer load was issued.
    pub fn inc_stale_loads(&self) {
        self.stale_loads.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "stale_loads", "counter incremented");
    }

    pub fn syncs(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }

    pub fn searches(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }

    pub fn transcripts(&self) -> u64 {
        self.transcripts.load(Ordering::Relaxed)
    }

    pub fn stale_loads(&self) -> u64 {
        self.stale_loads.load(Ordering::Relaxed)
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            syncs = self.syncs(),
            searches = self.searches(),
            transcripts = self.transcripts(),
            stale_loads = self.stale_loads(),
        );
    }
}
