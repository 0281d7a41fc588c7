//! Roster and statistics aggregation across result files.
//!
//! [`RecordAggregator`] reads every [`ExamFile`] once and produces a
//! [`RosterSnapshot`]: the deduplicated student roster plus
//! [`AggregateStats`]. The snapshot is always rebuilt from scratch.

use std::collections::HashMap;
use std::sync::Arc;

use resultboard_store::{ExamFile, ResultStore};
use serde::{Deserialize, Serialize};

use crate::error::DashboardResult;
use crate::obs;

/// A student as listed in the roster. First-seen name wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub prn: String,
    pub name: String,
}

/// Deduplicated students in first-seen order, indexed by PRN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    #[serde(skip)]
    by_prn: HashMap<String, usize>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the PRN is already present. Returns `true` if inserted.
    pub fn insert_if_absent(&mut self, prn: &str, name: &str) -> bool {
        if self.by_prn.contains_key(prn) {
            return false;
        }
        self.by_prn.insert(prn.to_string(), self.entries.len());
        self.entries.push(RosterEntry {
            prn: prn.to_string(),
            name: name.to_string(),
        });
        true
    }

    pub fn get(&self, prn: &str) -> Option<&RosterEntry> {
        self.by_prn.get(prn).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide summary shown in the stats panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Roster size
    pub total_students: usize,
    /// Mean of strictly positive SGPA values; 0 when there are none
    pub average_sgpa: f64,
    /// `round(passed / total * 100)`; 0 when there are no records
    pub pass_rate: u32,
    /// Every student record across all files
    pub total_records: usize,
    /// Records whose status is exactly "Pass"
    pub passed_records: usize,
    /// Records that contributed to `average_sgpa`
    pub sgpa_samples: usize,
}

/// Roster plus stats, replaced as one unit on every sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RosterSnapshot {
    pub roster: Roster,
    pub stats: AggregateStats,
}

/// Build a snapshot from an in-memory document set.
pub fn aggregate(files: &[ExamFile]) -> RosterSnapshot {
    let mut roster = Roster::new();
    let mut sgpa_sum = 0.0_f64;
    let mut sgpa_count = 0usize;
    let mut passed = 0usize;
    let mut total = 0usize;

    for file in files {
        for student in &file.students_data {
            if let Some(prn) = student.prn.as_deref() {
                roster.insert_if_absent(prn, student.name_or_empty());
            }
            let sgpa = student.sgpa_value();
            if sgpa > 0.0 {
                sgpa_sum += sgpa;
                sgpa_count += 1;
            }
            total += 1;
            if student.is_pass() {
                passed += 1;
            }
        }
    }

    let average_sgpa = if sgpa_count == 0 {
        0.0
    } else {
        sgpa_sum / sgpa_count as f64
    };
    let pass_rate = if total == 0 {
        0
    } else {
        (passed as f64 / total as f64 * 100.0).round() as u32
    };

    RosterSnapshot {
        stats: AggregateStats {
            total_students: roster.len(),
            average_sgpa,
            pass_rate,
            total_records: total,
            passed_records: passed,
            sgpa_samples: sgpa_count,
        },
        roster,
    }
}

/// Reads the whole collection and aggregates it.
pub struct RecordAggregator {
    store: Arc<dyn ResultStore>,
    collection: String,
}

impl RecordAggregator {
    pub fn new(store: Arc<dyn ResultStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Fetch all result files and rebuild the snapshot.
    ///
    /// A failed fetch is returned as-is; there is no retry.
    pub async fn sync(&self) -> DashboardResult<RosterSnapshot> {
        let files = self.store.list_documents(&self.collection).await?;
        let snapshot = aggregate(&files);
        obs::emit_roster_synced(files.len(), &snapshot.stats);
        Ok(snapshot)
    }
}
