//! Error types for resultboard-store

use thiserror::Error;

/// Errors that can occur while reading result documents
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure talking to the document store
    #[error("Store connection failed: {0}")]
    Connection(String),

    /// The store answered with a non-success status
    #[error("Store request failed with HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response or file body could not be decoded
    #[error("Decoding failed: {0}")]
    Decode(String),

    /// Local file access error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed configuration
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// Failure injected by a test fake
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_status_and_body() {
        let err = StoreError::Http {
            status: 403,
            body: "PERMISSION_DENIED".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("PERMISSION_DENIED"));
    }

    #[test]
    fn json_error_maps_to_decode() {
        let err: StoreError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
