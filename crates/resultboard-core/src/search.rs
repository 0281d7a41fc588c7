//! Incremental roster search.
//!
//! Runs on every keystroke against the in-memory roster; never touches the
//! store and never suspends.

use serde::Serialize;

use crate::aggregator::{Roster, RosterEntry};
use crate::config::{DEFAULT_MIN_QUERY_CHARS, DEFAULT_SEARCH_LIMIT};

/// What the results panel should do after a keystroke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "matches", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Query too short: hide the panel
    Collapse,
    /// Up to `limit` matches in roster order (possibly none)
    Matches(Vec<RosterEntry>),
}

impl SearchOutcome {
    pub fn matches(&self) -> &[RosterEntry] {
        match self {
            SearchOutcome::Collapse => &[],
            SearchOutcome::Matches(m) => m,
        }
    }

    pub fn is_collapse(&self) -> bool {
        matches!(self, SearchOutcome::Collapse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchIndex {
    limit: usize,
    min_query_chars: usize,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_LIMIT, DEFAULT_MIN_QUERY_CHARS)
    }
}

impl SearchIndex {
    pub fn new(limit: usize, min_query_chars: usize) -> Self {
        Self {
            limit,
            min_query_chars,
        }
    }

    /// Match `query` against the roster.
    ///
    /// The trimmed query is lowercased once, then matched against the
    /// lowercased name and against the PRN as stored. A PRN holding upper
    /// case letters is therefore only reachable through its digits. No
    /// ranking: the first `limit` hits in roster order are returned.
    pub fn search(&self, roster: &Roster, query: &str) -> SearchOutcome {
        let query = query.trim();
        if query.chars().count() < self.min_query_chars {
            return SearchOutcome::Collapse;
        }
        let needle = query.to_lowercase();

        let matches = roster
            .entries()
            .iter()
            .filter(|entry| {
                entry.name.to_lowercase().contains(&needle) || entry.prn.contains(&needle)
            })
            .take(self.limit)
            .cloned()
            .collect();
        SearchOutcome::Matches(matches)
    }
}
