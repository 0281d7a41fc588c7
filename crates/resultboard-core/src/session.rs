//! Dashboard session: the single owner of roster, cache and displayed student.
//!
//! `sync` is the only writer of the roster snapshot; `search` reads it
//! synchronously. Transcript loads are tagged with a monotonically increasing
//! ticket so that a slow, older load can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use resultboard_store::{ExamFile, ResultStore};
use serde::Serialize;
use tracing::Instrument;

use crate::aggregator::{aggregate, RosterSnapshot};
use crate::config::{DashboardConfig, DocumentCache};
use crate::error::DashboardResult;
use crate::obs;
use crate::presentation::{StatsPanel, StudentView};
use crate::search::{SearchIndex, SearchOutcome};
use crate::transcript::{build_transcript, Transcript};

/// Roster sync state as shown by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Handle for one in-flight transcript load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    id: u64,
    prn: String,
    name: String,
}

impl LoadTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn prn(&self) -> &str {
        &self.prn
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The load was the latest one and its view is now displayed.
    Applied,
    /// A newer load was issued meanwhile; the result was dropped.
    Superseded,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DashboardSession {
    id: String,
    span: tracing::Span,
    store: Arc<dyn ResultStore>,
    config: DashboardConfig,
    index: SearchIndex,
    snapshot: RwLock<Arc<RosterSnapshot>>,
    documents: Mutex<Option<Arc<Vec<ExamFile>>>>,
    status: Mutex<SessionStatus>,
    view: Mutex<Option<StudentView>>,
    latest_ticket: AtomicU64,
}

impl DashboardSession {
    pub fn new(store: Arc<dyn ResultStore>, config: DashboardConfig) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        Self {
            span: obs::session_span(&id),
            id,
            store,
            index: SearchIndex::new(config.search_limit, config.min_query_chars),
            config,
            snapshot: RwLock::new(Arc::new(RosterSnapshot::default())),
            documents: Mutex::new(None),
            status: Mutex::new(SessionStatus::Idle),
            view: Mutex::new(None),
            latest_ticket: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.status).clone()
    }

    fn set_status(&self, status: SessionStatus) {
        *lock(&self.status) = status;
    }

    /// The latest successfully synced snapshot (empty before the first sync).
    pub fn snapshot(&self) -> Arc<RosterSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stats_panel(&self) -> StatsPanel {
        StatsPanel::from(&self.snapshot().stats)
    }

    /// Full document set, from the cache when the policy allows it.
    async fn documents(&self) -> DashboardResult<Arc<Vec<ExamFile>>> {
        let caching = self.config.document_cache == DocumentCache::UntilRefresh;
        if caching {
            if let Some(cached) = lock(&self.documents).clone() {
                return Ok(cached);
            }
        }
        let files = Arc::new(self.store.list_documents(&self.config.collection).await?);
        if caching {
            *lock(&self.documents) = Some(Arc::clone(&files));
        }
        Ok(files)
    }

    /// Rebuild the roster snapshot.
    ///
    /// On failure the previous snapshot stays in place, the status becomes
    /// [`SessionStatus::Failed`] and the error is returned.
    pub async fn sync(&self) -> DashboardResult<Arc<RosterSnapshot>> {
        async {
            self.set_status(SessionStatus::Loading);
            match self.documents().await {
                Ok(files) => {
                    let snapshot = Arc::new(aggregate(&files));
                    obs::emit_roster_synced(files.len(), &snapshot.stats);
                    *self
                        .snapshot
                        .write()
                        .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
                    self.set_status(SessionStatus::Ready);
                    Ok(snapshot)
                }
                Err(err) => {
                    obs::emit_sync_failed(&err);
                    self.set_status(SessionStatus::Failed(err.to_string()));
                    Err(err)
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    /// Search the current roster. Never touches the store.
    pub fn search(&self, query: &str) -> SearchOutcome {
        let snapshot = self.snapshot();
        let outcome = self.index.search(&snapshot.roster, query);
        obs::emit_search(
            query.trim().chars().count(),
            outcome.matches().len(),
            outcome.is_collapse(),
        );
        outcome
    }

    /// Start a load; any ticket issued earlier is now stale.
    pub fn begin_load(&self, prn: &str, name: &str) -> LoadTicket {
        let id = self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        obs::emit_load_started(prn, id);
        LoadTicket {
            id,
            prn: prn.to_string(),
            name: name.to_string(),
        }
    }

    /// Apply a finished load if `ticket` is still the latest.
    pub fn complete_load(&self, ticket: LoadTicket, transcript: &Transcript) -> LoadOutcome {
        let view = StudentView::build(&ticket.name, &ticket.prn, transcript);
        let mut current = lock(&self.view);
        let latest = self.latest_ticket.load(Ordering::SeqCst);
        if ticket.id != latest {
            obs::emit_load_superseded(&ticket.prn, ticket.id, latest);
            return LoadOutcome::Superseded;
        }
        *current = Some(view);
        LoadOutcome::Applied
    }

    /// Fetch every result file, build the transcript for `prn` and display it
    /// unless a newer load was started in the meantime.
    pub async fn load_student(&self, prn: &str, name: &str) -> DashboardResult<LoadOutcome> {
        async {
            let ticket = self.begin_load(prn, name);
            let files = match self.documents().await {
                Ok(files) => files,
                Err(err) => {
                    obs::emit_load_failed(prn, ticket.id, &err);
                    return Err(err);
                }
            };
            let transcript = build_transcript(&files, prn, Utc::now());
            obs::emit_transcript_built(prn, files.len(), transcript.len());
            Ok(self.complete_load(ticket, &transcript))
        }
        .instrument(self.span.clone())
        .await
    }

    /// The student currently on display.
    pub fn current_view(&self) -> Option<StudentView> {
        lock(&self.view).clone()
    }

    /// Expand or collapse one transcript entry of the displayed student.
    pub fn toggle_entry(&self, index: usize) -> Option<bool> {
        lock(&self.view).as_mut()?.transcript.toggle(index)
    }

    /// Forget cached documents; the next sync or load reads the store again.
    pub fn refresh(&self) {
        if let Some(dropped) = lock(&self.documents).take() {
            obs::emit_cache_invalidated(dropped.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resultboard_store::fakes::MemoryResultStore;
    use resultboard_store::StudentRecord;

    fn session_with(files: Vec<ExamFile>, cache: DocumentCache) -> (Arc<MemoryResultStore>, DashboardSession) {
        let store = Arc::new(MemoryResultStore::with_files(files));
        let session = DashboardSession::new(
            store.clone(),
            DashboardConfig::default().with_document_cache(cache),
        );
        (store, session)
    }

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let (_, session) = session_with(vec![], DocumentCache::Disabled);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.snapshot().roster.is_empty());
        assert!(session.current_view().is_none());
        assert_eq!(session.stats_panel().pass_rate, "0%");
    }

    #[tokio::test]
    async fn test_stale_ticket_is_dropped() {
        let files = vec![ExamFile::new("SE", None)
            .with_student(StudentRecord::new("P1", "Anna").with_sgpa(8.0))
            .with_student(StudentRecord::new("P2", "Bob").with_sgpa(7.0))];
        let (_, session) = session_with(files.clone(), DocumentCache::Disabled);

        let first = session.begin_load("P1", "Anna");
        let second = session.begin_load("P2", "Bob");
        let now = Utc::now();

        let second_out = session.complete_load(second, &build_transcript(&files, "P2", now));
        let first_out = session.complete_load(first, &build_transcript(&files, "P1", now));

        assert_eq!(second_out, LoadOutcome::Applied);
        assert_eq!(first_out, LoadOutcome::Superseded);
        assert_eq!(session.current_view().map(|v| v.prn), Some("P2".to_string()));
    }

    #[tokio::test]
    async fn test_toggle_entry_on_displayed_student() {
        let files = vec![ExamFile::new("SE", None).with_student(StudentRecord::new("P1", "Anna"))];
        let (_, session) = session_with(files, DocumentCache::Disabled);
        assert_eq!(session.toggle_entry(0), None);

        session.load_student("P1", "Anna").await.unwrap();
        assert_eq!(session.toggle_entry(0), Some(true));
        assert_eq!(session.toggle_entry(1), None);
    }

    #[tokio::test]
    async fn test_refresh_without_cache_is_noop() {
        let (store, session) = session_with(vec![], DocumentCache::Disabled);
        session.sync().await.unwrap();
        session.refresh();
        session.sync().await.unwrap();
        assert_eq!(store.read_count(), 2);
    }
}
