//! Resultboard-Store: result-file schema and document store access
//!
//! This crate provides the read side of the results dashboard. It knows the
//! shape of uploaded result files and how to list them from a document store.
//!
//! ## Layer 0 - Data Access
//!
//! Focus: faithful decoding of loosely-typed uploads; no business logic.
//!
//! ## Key Components
//!
//! - `ResultStore`: backend-agnostic "list all documents" read
//! - `ExamFile` / `StudentRecord` / `Subject`: structured upload schema
//! - `FirestoreStore`, `JsonFileStore`, `fakes::MemoryResultStore`: backends

mod error;
pub mod fakes;
pub mod firestore;
pub mod fs;
mod schema;
pub mod storage_traits;

pub use error::StoreError;
pub use firestore::{FirestoreConfig, FirestoreStore};
pub use fs::JsonFileStore;
pub use schema::{
    parse_float_prefix, ExamFile, LooseNumber, StudentRecord, Subject, FAIL_STATUS, PASS_STATUS,
};
pub use storage_traits::{ResultStore, StoreResult, DEFAULT_COLLECTION};
