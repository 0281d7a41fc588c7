//! Structured observability hooks for dashboard operations.
//!
//! This module provides:
//! - Session-scoped tracing spans via `SessionSpan` RAII guard (sync code)
//!   and [`session_span`] (async code)
//! - Emission functions for sync, search, transcript load and stale-load events
//!
//! Events are emitted at `info!` level (searches at `debug!`).
//! For JSON output, pass `json = true` to [`crate::init_tracing`].

use tracing::{debug, info, warn};

use crate::aggregator::AggregateStats;
use crate::metrics::METRICS;

/// RAII guard that enters a session-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = SessionSpan::enter("3f1c...");
/// // every event below is tagged with session_id = "3f1c..."
/// ```
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    pub fn enter(session_id: &str) -> Self {
        Self {
            _span: session_span(session_id).entered(),
        }
    }
}

/// The session span itself, for `.instrument(...)` on async work.
pub fn session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("resultboard.session", session_id = %session_id)
}

/// Emit event: roster rebuilt from `files` documents.
pub fn emit_roster_synced(files: usize, stats: &AggregateStats) {
    METRICS.inc_syncs();
    info!(
        event = "roster.synced",
        files = files,
        students = stats.total_students,
        records = stats.total_records,
        average_sgpa = stats.average_sgpa,
        pass_rate = stats.pass_rate,
    );
}

/// Emit event: a sync failed and the previous snapshot was kept.
pub fn emit_sync_failed(error: &dyn std::fmt::Display) {
    warn!(event = "roster.sync_failed", error = %error);
}

/// Emit event: search executed.
pub fn emit_search(query_chars: usize, matches: usize, collapsed: bool) {
    METRICS.inc_searches();
    debug!(
        event = "search.executed",
        query_chars = query_chars,
        matches = matches,
        collapsed = collapsed,
    );
}

/// Emit event: transcript built for a student.
pub fn emit_transcript_built(prn: &str, files: usize, entries: usize) {
    METRICS.inc_transcripts();
    info!(
        event = "transcript.built",
        prn = %prn,
        files = files,
        entries = entries,
    );
}

/// Emit event: a transcript load started.
pub fn emit_load_started(prn: &str, ticket: u64) {
    info!(event = "transcript.load_started", prn = %prn, ticket = ticket);
}

/// Emit event: a load finished after a newer one was issued; result dropped.
pub fn emit_load_superseded(prn: &str, ticket: u64, latest: u64) {
    METRICS.inc_stale_loads();
    info!(
        event = "transcript.load_superseded",
        prn = %prn,
        ticket = ticket,
        latest = latest,
    );
}

/// Emit event: a transcript load failed (warning level).
pub fn emit_load_failed(prn: &str, ticket: u64, error: &dyn std::fmt::Display) {
    warn!(event = "transcript.load_failed", prn = %prn, ticket = ticket, error = %error);
}

/// Emit event: cached document set dropped.
pub fn emit_cache_invalidated(documents: usize) {
    info!(event = "cache.invalidated", documents = documents);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_span_create() {
        let _span = SessionSpan::enter("test-session-id");
    }
}
