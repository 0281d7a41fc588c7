//! Storage trait definitions for Resultboard
//!
//! The dashboard only ever needs one thing from its document store: an
//! unfiltered read of every document in a named collection. Backends:
//! - `MemoryResultStore` (fakes): in-memory, for tests
//! - `JsonFileStore` (fs): a JSON export on disk
//! - `FirestoreStore` (firestore): Firestore REST API
//!
//! The trait is read-only; uploads are written by a separate pipeline.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::schema::ExamFile;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Collection that holds uploaded result files.
pub const DEFAULT_COLLECTION: &str = "result_files";

/// Read-only access to result-file documents.
///
/// Guarantees:
/// - `list_documents` returns every document in the collection, unfiltered.
/// - An unknown collection yields an empty list, not an error.
/// - Implementations never retry; failures surface to the caller.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// List all documents of `collection`.
    async fn list_documents(&self, collection: &str) -> StoreResult<Vec<ExamFile>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
