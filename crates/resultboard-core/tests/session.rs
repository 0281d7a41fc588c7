//! Dashboard session behaviour: snapshot replacement, caching policy and
//! out-of-order transcript loads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resultboard_core::{
    DashboardConfig, DashboardSession, DocumentCache, LoadOutcome, SearchOutcome, SessionStatus,
};
use resultboard_store::fakes::MemoryResultStore;
use resultboard_store::{ExamFile, ResultStore, StoreResult, StudentRecord, DEFAULT_COLLECTION};

fn fixture() -> Vec<ExamFile> {
    vec![ExamFile::new("SE Jun 2023", None)
        .with_student(StudentRecord::new("P1", "Anna Kale").with_sgpa(8.0).with_status("Pass"))
        .with_student(StudentRecord::new("P2", "Bob Rao").with_sgpa(6.0).with_status("Fail"))]
}

fn session(store: Arc<MemoryResultStore>, cache: DocumentCache) -> DashboardSession {
    DashboardSession::new(store, DashboardConfig::default().with_document_cache(cache))
}

/// Delays the first read so that a later load finishes before it.
struct SlowFirstRead {
    inner: MemoryResultStore,
    calls: AtomicU64,
}

#[async_trait]
impl ResultStore for SlowFirstRead {
    async fn list_documents(&self, collection: &str) -> StoreResult<Vec<ExamFile>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        self.inner.list_documents(collection).await
    }

    fn backend_name(&self) -> &'static str {
        "slow-first-read"
    }
}

#[tokio::test]
async fn test_sync_replaces_snapshot_and_marks_ready() {
    let store = Arc::new(MemoryResultStore::with_files(fixture()));
    let session = session(store, DocumentCache::Disabled);

    session.sync().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Ready);
    assert_eq!(session.snapshot().stats.total_students, 2);
    assert_eq!(session.stats_panel().pass_rate, "50%");
}

#[tokio::test]
async fn test_failed_sync_keeps_previous_snapshot() {
    let store = Arc::new(MemoryResultStore::with_files(fixture()));
    let session = session(store.clone(), DocumentCache::Disabled);
    session.sync().await.unwrap();

    store.insert(
        DEFAULT_COLLECTION,
        ExamFile::new("TE", None).with_student(StudentRecord::new("P9", "New")),
    );
    store.fail_next("network down");
    let err = session.sync().await.unwrap_err();

    assert!(err.to_string().contains("network down"));
    assert!(matches!(session.status(), SessionStatus::Failed(msg) if msg.contains("network down")));
    assert_eq!(session.snapshot().stats.total_students, 2);
    assert!(session.snapshot().roster.get("P9").is_none());
}

#[tokio::test]
async fn test_search_reads_snapshot_without_store_access() {
    let store = Arc::new(MemoryResultStore::with_files(fixture()));
    let session = session(store.clone(), DocumentCache::Disabled);
    session.sync().await.unwrap();
    let reads = store.read_count();

    assert_eq!(session.search("a"), SearchOutcome::Collapse);
    assert_eq!(session.search("rao").matches()[0].prn, "P2");
    assert_eq!(store.read_count(), reads);
}

#[tokio::test]
async fn test_search_before_sync_finds_nothing() {
    let store = Arc::new(MemoryResultStore::with_files(fixture()));
    let session = session(store, DocumentCache::Disabled);
    assert!(session.search("anna").matches().is_empty());
}

#[tokio::test]
async fn test_loaded_student_is_findable_by_name() {
    let store = Arc::new(MemoryResultStore::with_files(fixture()));
    let session = session(store, DocumentCache::Disabled);
    session.sync().await.unwrap();

    let outcome = session.load_student("P1", "Anna Kale").await.unwrap();
    assert_eq!(outcome, LoadOutcome::Applied);

    let view = session.current_view().unwrap();
    let found = session.search(&view.name.to_uppercase());
    assert!(found.matches().iter().any(|e| e.prn == view.prn));
}

#[tokio::test]
async fn test_without_cache_every_operation_reads_store() {
    let store = Arc::new(MemoryResultStore::with_files(fixture()));
    let session = session(store.clone(), DocumentCache::Disabled);

    session.sync().await.unwrap();
    session.load_student("P1", "Anna Kale").await.unwrap();
    session.load_student("P2", "Bob Rao").await.unwrap();
    assert_eq!(store.read_count(), 3);
}

#[tokio::test]
async fn test_cache_until_refresh_reuses_documents() {
    let store = Arc::new(MemoryResultStore::with_files(fixture()));
    let session = session(store.clone(), DocumentCache::UntilRefresh);

    session.sync().await.unwrap();
    session.load_student("P1", "Anna Kale").await.unwrap();
    assert_eq!(store.read_count(), 1);

    store.insert(
        DEFAULT_COLLECTION,
        ExamFile::new("TE", None).with_student(StudentRecord::new("P3", "Chitra")),
    );
    session.sync().await.unwrap();
    assert!(session.snapshot().roster.get("P3").is_none());

    session.refresh();
    session.sync().await.unwrap();
    assert_eq!(store.read_count(), 2);
    assert!(session.snapshot().roster.get("P3").is_some());
}

#[tokio::test]
async fn test_failed_load_leaves_view_untouched() {
    let store = Arc::new(MemoryResultStore::with_files(fixture()));
    let session = session(store.clone(), DocumentCache::Disabled);
    session.load_student("P1", "Anna Kale").await.unwrap();

    store.fail_next("timeout");
    assert!(session.load_student("P2", "Bob Rao").await.is_err());
    assert_eq!(session.current_view().map(|v| v.prn), Some("P1".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_slow_older_load_does_not_overwrite_newer() {
    let store = Arc::new(SlowFirstRead {
        inner: MemoryResultStore::with_files(fixture()),
        calls: AtomicU64::new(0),
    });
    let session = DashboardSession::new(store, DashboardConfig::default());

    let (first, second) = tokio::join!(
        session.load_student("P1", "Anna Kale"),
        session.load_student("P2", "Bob Rao"),
    );

    assert_eq!(first.unwrap(), LoadOutcome::Superseded);
    assert_eq!(second.unwrap(), LoadOutcome::Applied);
    let view = session.current_view().unwrap();
    assert_eq!(view.prn, "P2");
    assert_eq!(view.name, "Bob Rao");
}
