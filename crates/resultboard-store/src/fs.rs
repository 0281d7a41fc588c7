use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::schema::{decode_exam_file, ExamFile};
use crate::storage_traits::{ResultStore, StoreResult};

/// Result store backed by a JSON export on disk.
///
/// Layout: a single object mapping collection names to document arrays,
/// e.g. `{ "result_files": [ { "exam_tag": ..., "students_data": [...] } ] }`.
/// The file is re-read on every call so edits show up on the next sync.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultStore for JsonFileStore {
    async fn list_documents(&self, collection: &str) -> StoreResult<Vec<ExamFile>> {
        let bytes = tokio::fs::read(&self.path).await?;
        let mut collections = match serde_json::from_slice::<serde_json::Value>(&bytes)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(StoreError::Decode(format!(
                    "export root must be an object (found {})",
                    json_kind(&other)
                )))
            }
        };
        let docs = match collections.remove(collection) {
            None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
            Some(serde_json::Value::Array(docs)) => docs,
            Some(other) => {
                return Err(StoreError::Decode(format!(
                    "collection '{collection}' is not an array (found {})",
                    json_kind(&other)
                )))
            }
        };

        let files: Vec<ExamFile> = docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.get("id").and_then(|v| v.as_str()).map(str::to_string);
                decode_exam_file(doc, id)
            })
            .collect();
        debug!(path = ?self.path, collection, documents = files.len(), "read json export");
        Ok(files)
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
