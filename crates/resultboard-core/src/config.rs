//! Dashboard configuration.
//!
//! Defaults: collection `result_files`, five search matches, two-character
//! minimum query, and a fresh store read for every sync and every transcript
//! load.

use resultboard_store::DEFAULT_COLLECTION;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, DashboardResult};

/// Maximum number of search matches shown.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Queries shorter than this collapse the results panel.
pub const DEFAULT_MIN_QUERY_CHARS: usize = 2;

/// Whether the full document set is kept between reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCache {
    /// Every sync and every transcript load reads the whole collection.
    #[default]
    Disabled,
    /// The first read is reused until `refresh()` is called.
    UntilRefresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub collection: String,
    pub search_limit: usize,
    pub min_query_chars: usize,
    pub document_cache: DocumentCache,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            min_query_chars: DEFAULT_MIN_QUERY_CHARS,
            document_cache: DocumentCache::Disabled,
        }
    }
}

impl DashboardConfig {
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn with_min_query_chars(mut self, chars: usize) -> Self {
        self.min_query_chars = chars;
        self
    }

    pub fn with_document_cache(mut self, cache: DocumentCache) -> Self {
        self.document_cache = cache;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - RESULTBOARD_COLLECTION (optional, default: "result_files")
    /// - RESULTBOARD_SEARCH_LIMIT (optional, default: 5)
    /// - RESULTBOARD_MIN_QUERY (optional, default: 2)
    /// - RESULTBOARD_CACHE (optional, "true" keeps documents until refresh)
    pub fn from_env() -> DashboardResult<Self> {
        let mut config = Self::default();
        if let Ok(collection) = std::env::var("RESULTBOARD_COLLECTION") {
            config.collection = collection;
        }
        if let Ok(limit) = std::env::var("RESULTBOARD_SEARCH_LIMIT") {
            config.search_limit = parse_usize("RESULTBOARD_SEARCH_LIMIT", &limit)?;
        }
        if let Ok(min) = std::env::var("RESULTBOARD_MIN_QUERY") {
            config.min_query_chars = parse_usize("RESULTBOARD_MIN_QUERY", &min)?;
        }
        if let Ok(cache) = std::env::var("RESULTBOARD_CACHE") {
            config.document_cache = if cache.eq_ignore_ascii_case("true") {
                DocumentCache::UntilRefresh
            } else {
                DocumentCache::Disabled
            };
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DashboardResult<()> {
        if self.collection.trim().is_empty() {
            return Err(DashboardError::Config(
                "collection name must not be empty".to_string(),
            ));
        }
        if self.search_limit == 0 {
            return Err(DashboardError::Config(
                "search limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_usize(var: &str, raw: &str) -> DashboardResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| DashboardError::Config(format!("{var} is not a non-negative integer: {raw}")))
}
