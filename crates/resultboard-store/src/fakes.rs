//! In-memory fake for the result store (testing only)
//!
//! `MemoryResultStore` satisfies the `ResultStore` contract without any
//! external dependencies, counts reads, and can fail the next read on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::schema::ExamFile;
use crate::storage_traits::*;

/// In-memory store backed by a `HashMap<collection, Vec<ExamFile>>`.
///
/// Documents are returned in insertion order.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    collections: Mutex<HashMap<String, Vec<ExamFile>>>,
    pending_failure: Mutex<Option<String>>,
    reads: AtomicU64,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose default collection holds `files`.
    pub fn with_files(files: Vec<ExamFile>) -> Self {
        let store = Self::new();
        for file in files {
            store.insert(DEFAULT_COLLECTION, file);
        }
        store
    }

    /// Append a document to a collection.
    pub fn insert(&self, collection: &str, file: ExamFile) {
        let mut collections = self.collections.lock().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .push(file);
    }

    /// Remove every document from a collection.
    pub fn clear(&self, collection: &str) {
        let mut collections = self.collections.lock().unwrap();
        collections.remove(collection);
    }

    /// Make the next `list_documents` call fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.pending_failure.lock().unwrap() = Some(message.into());
    }

    /// Number of `list_documents` calls served (including failed ones).
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn list_documents(&self, collection: &str) -> StoreResult<Vec<ExamFile>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.pending_failure.lock().unwrap().take() {
            return Err(StoreError::Injected(message));
        }
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
