//! Per-student transcript assembly.
//!
//! A transcript has one entry per result file that contains the student,
//! ordered by upload time (oldest first, ties keep encounter order).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use resultboard_store::{ExamFile, ResultStore, Subject};
use serde::Serialize;

use crate::error::DashboardResult;
use crate::obs;

/// One exam in a student's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    /// Exam label of the source file
    pub exam: String,
    /// Parsed SGPA (0 when missing or non-numeric)
    pub sgpa: f64,
    pub subjects: Vec<Subject>,
    /// Upload time of the source file, or load time when unknown
    pub date: DateTime<Utc>,
    pub result_status: Option<String>,
}

/// A subject graded as a fail somewhere in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSubject {
    pub exam: String,
    pub subject: String,
    pub grade: String,
}

const FAILING_GRADES: [&str; 3] = ["F", "FF", "FAIL"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    pub prn: String,
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Chronological entries (oldest first).
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries newest first, for the accordion list.
    pub fn most_recent_first(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter().rev()
    }

    /// SGPA values oldest first, the input of the trend predictor.
    pub fn sgpa_series(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.sgpa).collect()
    }

    /// Subjects whose grade reads F, FF or FAIL (any case), oldest first.
    pub fn failed_subjects(&self) -> Vec<FailedSubject> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry.subjects.iter().filter_map(move |sub| {
                    let grade = sub.grade.as_deref().unwrap_or("").trim().to_uppercase();
                    FAILING_GRADES.contains(&grade.as_str()).then(|| FailedSubject {
                        exam: entry.exam.clone(),
                        subject: sub
                            .course_name
                            .clone()
                            .unwrap_or_else(|| "Unknown".to_string()),
                        grade,
                    })
                })
            })
            .collect()
    }
}

/// Build the transcript for `prn` from a document set.
///
/// Takes the first matching record of each file. `now` stands in for files
/// without an upload time.
pub fn build_transcript(files: &[ExamFile], prn: &str, now: DateTime<Utc>) -> Transcript {
    let mut entries: Vec<TranscriptEntry> = files
        .iter()
        .filter_map(|file| {
            file.find_student(prn).map(|student| TranscriptEntry {
                exam: file.label().to_string(),
                sgpa: student.sgpa_value(),
                subjects: student.subjects.clone(),
                date: file.uploaded_at.unwrap_or(now),
                result_status: student.result_status.clone(),
            })
        })
        .collect();
    // stable: equal dates keep file order
    entries.sort_by_key(|e| e.date);

    Transcript {
        prn: prn.to_string(),
        entries,
    }
}

/// Loads transcripts with a fresh read of the whole collection.
pub struct TranscriptBuilder {
    store: Arc<dyn ResultStore>,
    collection: String,
}

impl TranscriptBuilder {
    pub fn new(store: Arc<dyn ResultStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Read every result file and build the transcript for `prn`.
    ///
    /// An unknown PRN yields an empty transcript, not an error.
    pub async fn load_student(&self, prn: &str) -> DashboardResult<Transcript> {
        let files = self.store.list_documents(&self.collection).await?;
        let transcript = build_transcript(&files, prn, Utc::now());
        obs::emit_transcript_built(prn, files.len(), transcript.len());
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use resultboard_store::StudentRecord;

    fn at(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single()
    }

    #[test]
    fn test_first_match_per_file_wins() {
        let file = ExamFile::new("SE", at(2023, 1, 1))
            .with_student(StudentRecord::new("P1", "Anna").with_sgpa(7.0))
            .with_student(StudentRecord::new("P1", "Anna").with_sgpa(9.0));
        let t = build_transcript(&[file], "P1", Utc::now());
        assert_eq!(t.len(), 1);
        assert_eq!(t.entries()[0].sgpa, 7.0);
    }

    #[test]
    fn test_missing_date_uses_now() {
        let now = at(2030, 1, 1).unwrap();
        let files = [
            ExamFile::new("undated", None).with_student(StudentRecord::new("P1", "A")),
            ExamFile::new("dated", at(2024, 1, 1)).with_student(StudentRecord::new("P1", "A")),
        ];
        let t = build_transcript(&files, "P1", now);
        let exams: Vec<&str> = t.entries().iter().map(|e| e.exam.as_str()).collect();
        assert_eq!(exams, vec!["dated", "undated"]);
        assert_eq!(t.entries()[1].date, now);
    }

    #[test]
    fn test_failed_subjects_are_case_insensitive() {
        let file = ExamFile::new("TE", at(2023, 1, 1)).with_student(
            StudentRecord::new("P1", "A")
                .with_subject(Subject::new("DBMS", "310241", "ff"))
                .with_subject(Subject::new("TOC", "310242", "A"))
                .with_subject(Subject::new("CN", "310243", "Fail")),
        );
        let failed = build_transcript(&[file], "P1", Utc::now()).failed_subjects();
        let names: Vec<&str> = failed.iter().map(|f| f.subject.as_str()).collect();
        assert_eq!(names, vec!["DBMS", "CN"]);
        assert_eq!(failed[0].grade, "FF");
        assert_eq!(failed[1].exam, "TE");
    }

    #[test]
    fn test_unknown_student_is_empty() {
        let file = ExamFile::new("SE", at(2023, 1, 1)).with_student(StudentRecord::new("P1", "A"));
        let t = build_transcript(&[file], "P9", Utc::now());
        assert!(t.is_empty());
        assert!(t.sgpa_series().is_empty());
    }
}
