//! Per-file and institution-wide analytics.
//!
//! These views work on already-fetched [`ExamFile`]s and never touch the
//! store. Percentages are rounded to one decimal, SGPA means to two.

use std::cmp::Reverse;
use std::collections::HashMap;

use resultboard_store::{ExamFile, StudentRecord};
use serde::Serialize;

/// Grade columns of the subject grade table, best first.
pub const GRADE_COLUMNS: [&str; 8] = ["O", "A+", "A", "B+", "B", "C", "P", "F"];

/// Grades excluded from subject statistics (incomplete, absent, unknown).
const UNGRADED: [&str; 3] = ["IC", "ABS", "N/A"];

/// Year ordering for the institution overview; unknown years sort last.
const YEAR_ORDER: [&str; 4] = ["FE", "SE", "TE", "BE"];

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_to(part as f64 / whole as f64 * 100.0, 1)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    records: usize,
    passed: usize,
    sgpa_sum: f64,
    sgpa_count: usize,
}

impl Tally {
    fn add(&mut self, student: &StudentRecord) {
        self.records += 1;
        if student.is_pass() {
            self.passed += 1;
        }
        let sgpa = student.sgpa_value();
        if sgpa > 0.0 {
            self.sgpa_sum += sgpa;
            self.sgpa_count += 1;
        }
    }

    fn average_sgpa(&self) -> f64 {
        if self.sgpa_count == 0 {
            0.0
        } else {
            round_to(self.sgpa_sum / self.sgpa_count as f64, 2)
        }
    }
}

/// Headline numbers for one uploaded result file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileSummary {
    pub total_students: usize,
    pub passed_students: usize,
    pub failed_students: usize,
    pub average_sgpa: f64,
    pub pass_percentage: f64,
}

pub fn file_summary(file: &ExamFile) -> FileSummary {
    let mut tally = Tally::default();
    file.students_data.iter().for_each(|s| tally.add(s));
    FileSummary {
        total_students: tally.records,
        passed_students: tally.passed,
        failed_students: tally.records - tally.passed,
        average_sgpa: tally.average_sgpa(),
        pass_percentage: percentage(tally.passed, tally.records),
    }
}

/// Students with a positive SGPA, best first; equal SGPAs keep upload order.
pub fn top_performers(file: &ExamFile, n: usize) -> Vec<&StudentRecord> {
    let mut ranked: Vec<&StudentRecord> = file
        .students_data
        .iter()
        .filter(|s| s.sgpa_value() > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.sgpa_value().total_cmp(&a.sgpa_value()));
    ranked.truncate(n);
    ranked
}

/// Students whose result status is exactly "Fail".
pub fn failed_students(file: &ExamFile) -> Vec<&StudentRecord> {
    file.students_data.iter().filter(|s| s.is_fail()).collect()
}

/// Spread of the valid (positive) SGPAs of one file, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SgpaDistribution {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Most frequent value; the lowest one wins a tie
    pub mode: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// 10th percentile, linear interpolation between ranks
    pub p10: f64,
    /// 90th percentile, linear interpolation between ranks
    pub p90: f64,
}

/// Linear-interpolated percentile of an ascending, non-empty slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Distribution of positive SGPAs; `None` when the file has none.
pub fn sgpa_distribution(file: &ExamFile) -> Option<SgpaDistribution> {
    let mut sgpas: Vec<f64> = file
        .students_data
        .iter()
        .map(StudentRecord::sgpa_value)
        .filter(|v| *v > 0.0)
        .collect();
    if sgpas.is_empty() {
        return None;
    }
    sgpas.sort_by(f64::total_cmp);

    let n = sgpas.len();
    let mean = sgpas.iter().sum::<f64>() / n as f64;
    let variance = sgpas.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        sgpas[n / 2]
    } else {
        (sgpas[n / 2 - 1] + sgpas[n / 2]) / 2.0
    };

    // runs of equal values in ascending order; strict `>` keeps the lowest on ties
    let mut mode = (sgpas[0], 0usize);
    let mut run = (sgpas[0], 0usize);
    for &v in &sgpas {
        if v == run.0 {
            run.1 += 1;
        } else {
            run = (v, 1);
        }
        if run.1 > mode.1 {
            mode = run;
        }
    }

    Some(SgpaDistribution {
        count: n,
        mean: round_to(mean, 2),
        median: round_to(median, 2),
        mode: mode.0,
        std_dev: round_to(variance.sqrt(), 2),
        min: sgpas[0],
        max: sgpas[n - 1],
        p10: round_to(percentile(&sgpas, 10.0), 2),
        p90: round_to(percentile(&sgpas, 90.0), 2),
    })
}

/// Result-status filter of the student registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum StatusFilter {
    #[default]
    All,
    Pass,
    Fail,
}

impl StatusFilter {
    fn admits(self, student: &StudentRecord) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pass => student.is_pass(),
            StatusFilter::Fail => student.is_fail(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SgpaOrder {
    #[default]
    HighToLow,
    LowToHigh,
}

/// Filter for [`student_registry`]. The default admits every record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegistryFilter {
    /// Inclusive lower bound on the parsed SGPA
    pub min_sgpa: f64,
    pub status: StatusFilter,
    pub order: SgpaOrder,
}

/// One registry line: the student record without its subjects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryRow {
    pub prn: Option<String>,
    pub name: Option<String>,
    pub mother_name: Option<String>,
    pub seat_no: Option<String>,
    pub sgpa: f64,
    pub result_status: Option<String>,
    pub credits: Option<f64>,
}

impl From<&StudentRecord> for RegistryRow {
    fn from(s: &StudentRecord) -> Self {
        Self {
            prn: s.prn.clone(),
            name: s.name.clone(),
            mother_name: s.mother_name.clone(),
            seat_no: s.seat_no.clone(),
            sgpa: s.sgpa_value(),
            result_status: s.result_status.clone(),
            credits: s.credits.as_ref().map(|c| c.value()),
        }
    }
}

/// Records with `SGPA >= min_sgpa` and a matching status, sorted by SGPA.
/// Equal SGPAs keep upload order in either direction.
pub fn student_registry(file: &ExamFile, filter: &RegistryFilter) -> Vec<RegistryRow> {
    let mut rows: Vec<RegistryRow> = file
        .students_data
        .iter()
        .filter(|s| s.sgpa_value() >= filter.min_sgpa && filter.status.admits(s))
        .map(RegistryRow::from)
        .collect();
    match filter.order {
        SgpaOrder::HighToLow => rows.sort_by(|a, b| b.sgpa.total_cmp(&a.sgpa)),
        SgpaOrder::LowToHigh => rows.sort_by(|a, b| a.sgpa.total_cmp(&b.sgpa)),
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeCount {
    pub grade: &'static str,
    pub count: usize,
}

/// Grade distribution of one course within a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectGradeRow {
    pub course_code: String,
    pub course_name: String,
    /// Graded attempts, including grades outside [`GRADE_COLUMNS`]
    pub total_students: usize,
    pub grades: Vec<GradeCount>,
    pub failure_rate: f64,
}

impl SubjectGradeRow {
    pub fn count(&self, grade: &str) -> usize {
        self.grades
            .iter()
            .find(|g| g.grade == grade)
            .map(|g| g.count)
            .unwrap_or(0)
    }
}

/// Per-course grade counts in first-seen course order.
///
/// `FF` and `Fail` fold into `F`; `IC`, `ABS` and `N/A` are skipped, as are
/// subjects without a code or grade. The course name is the last one seen
/// for the code.
pub fn subject_grade_summary(file: &ExamFile) -> Vec<SubjectGradeRow> {
    struct Acc {
        code: String,
        name: String,
        total: usize,
        counts: HashMap<String, usize>,
    }

    let mut order: Vec<Acc> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for student in &file.students_data {
        for subject in &student.subjects {
            let Some(code) = subject.course_code.as_deref().filter(|c| !c.is_empty()) else {
                continue;
            };
            let grade = subject.grade.as_deref().unwrap_or("N/A");
            if grade.is_empty() || UNGRADED.contains(&grade) {
                continue;
            }
            let grade = if grade == "FF" || grade == "Fail" {
                "F"
            } else {
                grade
            };

            let slot = *index.entry(code.to_string()).or_insert_with(|| {
                order.push(Acc {
                    code: code.to_string(),
                    name: String::new(),
                    total: 0,
                    counts: HashMap::new(),
                });
                order.len() - 1
            });
            let acc = &mut order[slot];
            acc.name = subject
                .course_name
                .clone()
                .unwrap_or_else(|| "Unknown Subject".to_string());
            acc.total += 1;
            *acc.counts.entry(grade.to_string()).or_default() += 1;
        }
    }

    order
        .into_iter()
        .map(|acc| {
            let grades: Vec<GradeCount> = GRADE_COLUMNS
                .iter()
                .map(|&grade| GradeCount {
                    grade,
                    count: acc.counts.get(grade).copied().unwrap_or(0),
                })
                .collect();
            let failures = acc.counts.get("F").copied().unwrap_or(0);
            SubjectGradeRow {
                course_code: acc.code,
                course_name: acc.name,
                total_students: acc.total,
                failure_rate: percentage(failures, acc.total),
                grades,
            }
        })
        .collect()
}

/// Filter for the archived result-file listing. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveFilter {
    pub query: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
}

/// Files matching `filter`, newest upload first; undated files last.
pub fn archive_listing<'a>(files: &'a [ExamFile], filter: &ArchiveFilter) -> Vec<&'a ExamFile> {
    let query = filter
        .query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut listed: Vec<&ExamFile> = files
        .iter()
        .filter(|f| {
            let Some(q) = &query else { return true };
            let tag = f.exam_tag.as_deref().unwrap_or("").to_lowercase();
            let name = f.file_name.as_deref().unwrap_or("").to_lowercase();
            tag.contains(q) || name.contains(q)
        })
        .filter(|f| match &filter.department {
            Some(d) => f.department.as_deref().unwrap_or("Uncategorized") == d,
            None => true,
        })
        .filter(|f| match &filter.year {
            Some(y) => f.year.as_deref().unwrap_or("Unknown") == y,
            None => true,
        })
        .collect();
    listed.sort_by_key(|f| Reverse(f.uploaded_at));
    listed
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentRow {
    pub department: String,
    pub students: usize,
    pub pass_rate: f64,
    pub average_sgpa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearRow {
    pub year: String,
    pub students: usize,
    pub pass_rate: f64,
}

/// Institution-wide roll-up of every uploaded record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstitutionOverview {
    pub total_students: usize,
    pub overall_pass_rate: f64,
    /// Mean of positive SGPA values across all records
    pub average_sgpa: f64,
    pub exams_analyzed: usize,
    pub departments: Vec<DepartmentRow>,
    pub years: Vec<YearRow>,
}

pub fn institution_overview(files: &[ExamFile]) -> InstitutionOverview {
    let mut overall = Tally::default();
    let mut departments: Vec<(String, Tally)> = Vec::new();
    let mut years: Vec<(String, Tally)> = Vec::new();

    fn slot<'a>(groups: &'a mut Vec<(String, Tally)>, key: &str) -> &'a mut Tally {
        let pos = match groups.iter().position(|(k, _)| k == key) {
            Some(pos) => pos,
            None => {
                groups.push((key.to_string(), Tally::default()));
                groups.len() - 1
            }
        };
        &mut groups[pos].1
    }

    for file in files {
        let dept = file.department.as_deref().unwrap_or("Uncategorized");
        let year = file.year.as_deref().unwrap_or("Unknown");
        for student in &file.students_data {
            overall.add(student);
            slot(&mut departments, dept).add(student);
            slot(&mut years, year).add(student);
        }
        // files without records still show up in the breakdowns
        slot(&mut departments, dept);
        slot(&mut years, year);
    }

    // stable: unknown years keep first-seen order after BE
    years.sort_by_key(|(year, _)| {
        YEAR_ORDER
            .iter()
            .position(|y| y == year)
            .unwrap_or(YEAR_ORDER.len())
    });

    InstitutionOverview {
        total_students: overall.records,
        overall_pass_rate: percentage(overall.passed, overall.records),
        average_sgpa: overall.average_sgpa(),
        exams_analyzed: files.len(),
        departments: departments
            .into_iter()
            .map(|(department, t)| DepartmentRow {
                department,
                students: t.records,
                pass_rate: percentage(t.passed, t.records),
                average_sgpa: t.average_sgpa(),
            })
            .collect(),
        years: years
            .into_iter()
            .map(|(year, t)| YearRow {
                year,
                students: t.records,
                pass_rate: percentage(t.passed, t.records),
            })
            .collect(),
    }
}
