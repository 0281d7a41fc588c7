//! Firestore REST backend
//!
//! Lists every document of a collection through the Firestore v1 REST API
//! and decodes the typed value envelopes (`stringValue`, `mapValue`, ...)
//! into plain JSON before mapping them onto [`ExamFile`].
//!
//! Pagination is followed until `nextPageToken` runs out, so a listing is
//! always the complete collection.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::schema::{decode_exam_file, ExamFile};
use crate::storage_traits::{ResultStore, StoreResult};

/// Default REST endpoint for Firestore
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Default page size requested per list call
pub const DEFAULT_PAGE_SIZE: u32 = 300;

/// Configuration for the Firestore REST connection
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// REST endpoint (default: "https://firestore.googleapis.com/v1")
    pub base_url: String,
    /// Google Cloud project id
    pub project_id: String,
    /// Database id (default: "(default)")
    pub database: String,
    /// Web API key, sent as the `key` query parameter when present
    pub api_key: Option<String>,
    /// Documents requested per page
    pub page_size: u32,
}

impl FirestoreConfig {
    /// Create a configuration for a project using the public endpoint
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            database: "(default)".to_string(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set a custom endpoint (emulators, proxies)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the web API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - RESULTBOARD_FIRESTORE_PROJECT (required)
    /// - RESULTBOARD_FIRESTORE_API_KEY (optional)
    /// - RESULTBOARD_FIRESTORE_BASE_URL (optional, default: public endpoint)
    /// - RESULTBOARD_FIRESTORE_PAGE_SIZE (optional, default: 300)
    pub fn from_env() -> StoreResult<Self> {
        let project = std::env::var("RESULTBOARD_FIRESTORE_PROJECT").map_err(|_| {
            StoreError::Config("RESULTBOARD_FIRESTORE_PROJECT not set".to_string())
        })?;
        let mut config = Self::new(project);
        if let Ok(key) = std::env::var("RESULTBOARD_FIRESTORE_API_KEY") {
            config = config.with_api_key(key);
        }
        if let Ok(url) = std::env::var("RESULTBOARD_FIRESTORE_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Ok(size) = std::env::var("RESULTBOARD_FIRESTORE_PAGE_SIZE") {
            let size = size.parse::<u32>().map_err(|_| {
                StoreError::Config(format!("RESULTBOARD_FIRESTORE_PAGE_SIZE is not a number: {size}"))
            })?;
            config = config.with_page_size(size);
        }
        Ok(config)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents/{}",
            self.base_url, self.project_id, self.database, collection
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Read-only Firestore client
pub struct FirestoreStore {
    config: FirestoreConfig,
    http_client: reqwest::Client,
}

impl FirestoreStore {
    /// Create a new client
    pub fn new(config: FirestoreConfig) -> StoreResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("resultboard-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> StoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?)
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }
}

/// Source of `documents.list` pages.
#[async_trait]
trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
    ) -> StoreResult<ListDocumentsResponse>;
}

#[async_trait]
impl PageFetcher for FirestoreStore {
    async fn fetch_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
    ) -> StoreResult<ListDocumentsResponse> {
        let mut query: Vec<(&str, String)> = vec![("pageSize", self.config.page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        if let Some(key) = &self.config.api_key {
            query.push(("key", key.clone()));
        }

        let response = self
            .http_client
            .get(self.config.collection_url(collection))
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Walk every page of a collection. Returns the decoded files and the number
/// of pages fetched; an absent or empty `nextPageToken` ends the walk.
async fn collect_pages(
    fetcher: &dyn PageFetcher,
    collection: &str,
) -> StoreResult<(Vec<ExamFile>, u32)> {
    let mut files = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0u32;

    loop {
        let page = fetcher.fetch_page(collection, page_token.as_deref()).await?;
        pages += 1;
        debug!(page = pages, documents = page.documents.len(), "fetched page");

        files.extend(page.documents.into_iter().filter_map(|doc| {
            let id = doc.name.rsplit('/').next().map(str::to_string);
            decode_exam_file(decode_fields(&doc.fields), id)
        }));

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    Ok((files, pages))
}

#[async_trait]
impl ResultStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn list_documents(&self, collection: &str) -> StoreResult<Vec<ExamFile>> {
        let (files, pages) = collect_pages(self, collection).await?;
        info!(
            project = %self.config.project_id,
            collection,
            documents = files.len(),
            pages,
            "listed firestore collection"
        );
        Ok(files)
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}

/// Decode a Firestore `fields` map into a plain JSON object.
pub fn decode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), decode_value(v)))
            .collect(),
    )
}

/// Decode one typed Firestore value envelope into plain JSON.
///
/// Unknown envelopes decode to `null`.
pub fn decode_value(value: &Value) -> Value {
    let Some(envelope) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = envelope.get("stringValue") {
        return s.clone();
    }
    if let Some(i) = envelope.get("integerValue") {
        // Int64 travels as a decimal string
        return match i {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(s.clone())),
            other => other.clone(),
        };
    }
    if let Some(d) = envelope.get("doubleValue") {
        return match d {
            Value::Number(_) => d.clone(),
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }
    if let Some(b) = envelope.get("booleanValue") {
        return b.clone();
    }
    if let Some(ts) = envelope.get("timestampValue") {
        return ts.clone();
    }
    if envelope.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(array) = envelope.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|vals| vals.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(map) = envelope.get("mapValue") {
        return match map.get("fields").and_then(Value::as_object) {
            Some(fields) => decode_fields(fields),
            None => Value::Object(Map::new()),
        };
    }
    if let Some(r) = envelope
        .get("referenceValue")
        .or_else(|| envelope.get("bytesValue"))
    {
        return r.clone();
    }
    if let Some(geo) = envelope.get("geoPointValue") {
        return geo.clone();
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_scalar_envelopes() {
        assert_eq!(decode_value(&json!({"stringValue": "Pass"})), json!("Pass"));
        assert_eq!(decode_value(&json!({"integerValue": "42"})), json!(42));
        assert_eq!(decode_value(&json!({"doubleValue": 8.5})), json!(8.5));
        assert_eq!(decode_value(&json!({"booleanValue": true})), json!(true));
        assert_eq!(decode_value(&json!({"nullValue": null})), Value::Null);
        assert_eq!(
            decode_value(&json!({"timestampValue": "2024-06-01T10:00:00Z"})),
            json!("2024-06-01T10:00:00Z")
        );
    }

    #[test]
    fn test_decode_nested_student_data() {
        let fields = json!({
            "exam_tag": {"stringValue": "TE Dec 2023"},
            "uploaded_at": {"timestampValue": "2023-12-20T08:30:00.123456Z"},
            "students_data": {"arrayValue": {"values": [
                {"mapValue": {"fields": {
                    "PRN": {"stringValue": "72000001A"},
                    "Name": {"stringValue": "Anna Kale"},
                    "SGPA": {"doubleValue": 8.9},
                    "Subjects": {"arrayValue": {}}
                }}}
            ]}}
        });
        let decoded = decode_fields(fields.as_object().unwrap());
        let file: ExamFile = serde_json::from_value(decoded).unwrap();
        assert_eq!(file.label(), "TE Dec 2023");
        assert!(file.uploaded_at.is_some());
        let student = file.find_student("72000001A").unwrap();
        assert_eq!(student.sgpa_value(), 8.9);
        assert!(student.subjects.is_empty());
    }

    #[test]
    fn test_empty_map_value_decodes_to_empty_object() {
        assert_eq!(decode_value(&json!({"mapValue": {}})), json!({}));
    }

    #[test]
    fn test_unknown_envelope_is_null() {
        assert_eq!(decode_value(&json!({"mysteryValue": 1})), Value::Null);
        assert_eq!(decode_value(&json!("bare")), Value::Null);
    }

    #[test]
    fn test_collection_url() {
        let config = FirestoreConfig::new("campus-results").with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            config.collection_url("result_files"),
            "http://localhost:8080/v1/projects/campus-results/databases/(default)/documents/result_files"
        );
    }

    /// Serves canned pages in order and records the token of every call.
    struct CannedPages {
        pages: Mutex<VecDeque<ListDocumentsResponse>>,
        tokens: Mutex<Vec<Option<String>>>,
    }

    impl CannedPages {
        fn new(pages: Vec<Value>) -> Self {
            Self {
                pages: Mutex::new(
                    pages
                        .into_iter()
                        .map(|p| serde_json::from_value(p).unwrap())
                        .collect(),
                ),
                tokens: Mutex::new(Vec::new()),
            }
        }

        fn tokens(&self) -> Vec<Option<String>> {
            self.tokens.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for CannedPages {
        async fn fetch_page(
            &self,
            _collection: &str,
            page_token: Option<&str>,
        ) -> StoreResult<ListDocumentsResponse> {
            self.tokens.lock().unwrap().push(page_token.map(str::to_string));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| StoreError::Connection("no more pages".to_string()))
        }
    }

    fn doc(id: &str, tag: Value) -> Value {
        json!({
            "name": format!("projects/p/databases/(default)/documents/result_files/{id}"),
            "fields": { "exam_tag": tag }
        })
    }

    #[tokio::test]
    async fn test_collect_pages_follows_tokens() {
        let fetcher = CannedPages::new(vec![
            json!({"documents": [doc("a", json!({"stringValue": "FE Dec 2022"}))], "nextPageToken": "t1"}),
            json!({"documents": [doc("b", json!({"stringValue": "FE May 2023"}))], "nextPageToken": "t2"}),
            json!({"documents": [doc("c", json!({"stringValue": "SE Dec 2023"}))]}),
        ]);
        let (files, pages) = collect_pages(&fetcher, "result_files").await.unwrap();

        assert_eq!(pages, 3);
        let ids: Vec<&str> = files.iter().filter_map(|f| f.id.as_deref()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(files[2].label(), "SE Dec 2023");
        assert_eq!(
            fetcher.tokens(),
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_page_token_ends_listing() {
        let fetcher = CannedPages::new(vec![
            json!({"documents": [doc("a", json!({"stringValue": "FE"}))], "nextPageToken": ""}),
            json!({"documents": [doc("never", json!({"stringValue": "unreached"}))]}),
        ]);
        let (files, pages) = collect_pages(&fetcher, "result_files").await.unwrap();
        assert_eq!(pages, 1);
        assert_eq!(files.len(), 1);
        assert_eq!(fetcher.tokens(), vec![None]);
    }

    #[tokio::test]
    async fn test_malformed_document_is_skipped_across_pages() {
        let fetcher = CannedPages::new(vec![
            json!({"documents": [
                doc("good", json!({"stringValue": "TE Dec 2023"})),
                doc("bad", json!({"integerValue": "42"}))
            ], "nextPageToken": "t1"}),
            json!({}),
        ]);
        let (files, pages) = collect_pages(&fetcher, "result_files").await.unwrap();
        assert_eq!(pages, 2);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id.as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_fetch_error_aborts_listing() {
        let fetcher = CannedPages::new(vec![json!({"nextPageToken": "t1"})]);
        let err = collect_pages(&fetcher, "result_files").await.unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[test]
    fn test_list_response_tolerates_empty_body() {
        let page: ListDocumentsResponse = serde_json::from_str("{}").unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
