//! Schema mapping for uploaded result files
//!
//! Field names follow the documents written by the upload pipeline
//! (`exam_tag`, `students_data`, `PRN`, `Result Status`, ...). Every field is
//! optional on the wire; absence is modelled with `Option` or an empty `Vec`
//! rather than failing the whole document. Lists that are `null` read as
//! empty, and a malformed list entry is dropped without losing its siblings.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// The literal result status counted as a pass.
pub const PASS_STATUS: &str = "Pass";

/// The literal result status counted as a fail by per-file insights.
pub const FAIL_STATUS: &str = "Fail";

/// One uploaded result batch (a document in the `result_files` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamFile {
    /// Document id (last segment of the document path), filled in by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Human label such as "SE Computer May 2024"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    /// Upload time; malformed values are treated as absent
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_students: Option<u64>,
    /// One record per student in this exam, in upload order
    #[serde(default, deserialize_with = "lenient_list")]
    pub students_data: Vec<StudentRecord>,
}

impl ExamFile {
    /// Create a file with a tag and an upload time.
    pub fn new(exam_tag: impl Into<String>, uploaded_at: Option<DateTime<Utc>>) -> Self {
        Self {
            exam_tag: Some(exam_tag.into()),
            uploaded_at,
            ..Default::default()
        }
    }

    /// Builder: append a student record
    pub fn with_student(mut self, student: StudentRecord) -> Self {
        self.students_data.push(student);
        self
    }

    /// Builder: set department and year
    pub fn with_cohort(mut self, department: impl Into<String>, year: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self.year = Some(year.into());
        self
    }

    /// Display label: exam tag, then file name, then empty text.
    pub fn label(&self) -> &str {
        self.exam_tag
            .as_deref()
            .or(self.file_name.as_deref())
            .unwrap_or("")
    }

    /// First record whose PRN equals `prn`.
    pub fn find_student(&self, prn: &str) -> Option<&StudentRecord> {
        self.students_data
            .iter()
            .find(|s| s.prn.as_deref() == Some(prn))
    }
}

/// A student's result as embedded in an [`ExamFile`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "PRN", default, skip_serializing_if = "Option::is_none")]
    pub prn: Option<String>,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "Mother Name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mother_name: Option<String>,
    #[serde(rename = "Seat No", default, skip_serializing_if = "Option::is_none")]
    pub seat_no: Option<String>,
    #[serde(rename = "SGPA", default, skip_serializing_if = "Option::is_none")]
    pub sgpa: Option<LooseNumber>,
    #[serde(
        rename = "Result Status",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub result_status: Option<String>,
    #[serde(rename = "Credits", default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<LooseNumber>,
    #[serde(rename = "Subjects", default, deserialize_with = "lenient_list")]
    pub subjects: Vec<Subject>,
}

impl StudentRecord {
    pub fn new(prn: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            prn: Some(prn.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Builder: set SGPA as a number
    pub fn with_sgpa(mut self, sgpa: f64) -> Self {
        self.sgpa = Some(LooseNumber::Number(sgpa));
        self
    }

    /// Builder: set SGPA as raw text (e.g. "--")
    pub fn with_sgpa_text(mut self, sgpa: impl Into<String>) -> Self {
        self.sgpa = Some(LooseNumber::Text(sgpa.into()));
        self
    }

    /// Builder: set result status
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.result_status = Some(status.into());
        self
    }

    /// Builder: append a subject
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Parsed SGPA; missing or non-numeric values read as `0.0`.
    pub fn sgpa_value(&self) -> f64 {
        self.sgpa.as_ref().map(LooseNumber::value).unwrap_or(0.0)
    }

    /// Exact match against [`PASS_STATUS`].
    pub fn is_pass(&self) -> bool {
        self.result_status.as_deref() == Some(PASS_STATUS)
    }

    /// Exact match against [`FAIL_STATUS`].
    pub fn is_fail(&self) -> bool {
        self.result_status.as_deref() == Some(FAIL_STATUS)
    }

    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// One course line of a student record. Rendered verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(
        rename = "Course Name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub course_name: Option<String>,
    #[serde(
        rename = "Course Code",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub course_code: Option<String>,
    #[serde(rename = "Grade", default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl Subject {
    pub fn new(
        course_name: impl Into<String>,
        course_code: impl Into<String>,
        grade: impl Into<String>,
    ) -> Self {
        Self {
            course_name: Some(course_name.into()),
            course_code: Some(course_code.into()),
            grade: Some(grade.into()),
        }
    }
}

/// A numeric field that uploads store either as a number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
    /// Anything else (booleans, maps); always reads as `0.0`
    Other(serde_json::Value),
}

impl LooseNumber {
    /// Numeric reading with lenient text parsing; never NaN or infinite.
    pub fn value(&self) -> f64 {
        let parsed = match self {
            LooseNumber::Number(n) => Some(*n),
            LooseNumber::Text(s) => parse_float_prefix(s),
            LooseNumber::Other(_) => None,
        };
        parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

/// Parse the longest leading decimal literal of `s` after leading whitespace.
///
/// `"8.5"` → 8.5, `" 7.2 (grace)"` → 7.2, `"--"` → None, `".5"` → 0.5.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    t[..end].parse::<f64>().ok()
}

/// Deserialize one raw document, logging and skipping it if its shape is wrong.
pub(crate) fn decode_exam_file(raw: serde_json::Value, id: Option<String>) -> Option<ExamFile> {
    match serde_json::from_value::<ExamFile>(raw) {
        Ok(mut file) => {
            if id.is_some() {
                file.id = id;
            }
            Some(file)
        }
        Err(e) => {
            tracing::warn!(
                event = "store.document_skipped",
                document_id = id.as_deref().unwrap_or("-"),
                error = %e,
            );
            None
        }
    }
}

/// `null` reads as an empty list; entries that fail to decode are logged and
/// dropped. A non-list value is still an error for the enclosing document.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(items) = Option::<Vec<serde_json::Value>>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<T>(item) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    event = "store.entry_skipped",
                    kind = std::any::type_name::<T>(),
                    index,
                    error = %e,
                );
                None
            }
        })
        .collect())
}

/// Accepts RFC 3339 strings, `{ "seconds": .., "nanoseconds": .. }` maps and
/// epoch-second integers. Anything else becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(timestamp_from_json))
}

pub(crate) fn timestamp_from_json(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        serde_json::Value::Object(map) => {
            let secs = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(|v| v.as_i64())?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            Utc.timestamp_opt(secs, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}
