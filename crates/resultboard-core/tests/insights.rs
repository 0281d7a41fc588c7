//! Per-file and institution-wide analytics.

use chrono::{TimeZone, Utc};
use resultboard_core::{
    archive_listing, failed_students, file_summary, institution_overview, sgpa_distribution,
    student_registry, subject_grade_summary, top_performers, ArchiveFilter, FileSummary,
    RegistryFilter, SgpaOrder, StatusFilter, GRADE_COLUMNS,
};
use resultboard_store::{ExamFile, StudentRecord, Subject};

fn se_comp() -> ExamFile {
    ExamFile::new("SE Comp Dec 2023", Some(Utc.with_ymd_and_hms(2023, 12, 20, 0, 0, 0).unwrap()))
        .with_cohort("Computer", "SE")
        .with_student(
            StudentRecord::new("P1", "Anna")
                .with_sgpa(9.1)
                .with_status("Pass")
                .with_subject(Subject::new("Data Structures", "210241", "O"))
                .with_subject(Subject::new("Discrete Maths", "210242", "A+")),
        )
        .with_student(
            StudentRecord::new("P2", "Bob")
                .with_sgpa(0.0)
                .with_status("Fail")
                .with_subject(Subject::new("Data Structures", "210241", "FF"))
                .with_subject(Subject::new("Discrete Maths", "210242", "IC")),
        )
        .with_student(
            StudentRecord::new("P3", "Chitra")
                .with_sgpa(7.5)
                .with_status("Pass")
                .with_subject(Subject::new("Data Structures", "210241", "B+")),
        )
}

fn te_mech() -> ExamFile {
    ExamFile::new("TE Mech May 2023", Some(Utc.with_ymd_and_hms(2023, 5, 10, 0, 0, 0).unwrap()))
        .with_cohort("Mechanical", "TE")
        .with_student(StudentRecord::new("M1", "Dev").with_sgpa(8.0).with_status("Pass"))
}

#[test]
fn test_file_summary() {
    let summary = file_summary(&se_comp());
    assert_eq!(summary.total_students, 3);
    assert_eq!(summary.passed_students, 2);
    assert_eq!(summary.failed_students, 1);
    assert_eq!(summary.average_sgpa, 8.3);
    assert_eq!(summary.pass_percentage, 66.7);
}

#[test]
fn test_file_summary_of_empty_file() {
    assert_eq!(file_summary(&ExamFile::new("empty", None)), FileSummary::default());
}

#[test]
fn test_top_performers_and_failures() {
    let file = se_comp();
    let top: Vec<&str> = top_performers(&file, 5)
        .into_iter()
        .map(|s| s.name_or_empty())
        .collect();
    assert_eq!(top, vec!["Anna", "Chitra"]);
    assert_eq!(top_performers(&file, 1).len(), 1);

    let failed = failed_students(&file);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].prn.as_deref(), Some("P2"));
}

fn spread() -> ExamFile {
    [
        ("P1", 8.0, "Pass"),
        ("P2", 10.0, "Pass"),
        ("P3", 0.0, "Fail"),
        ("P4", 7.0, "Pass"),
        ("P5", 9.0, "Pass"),
        ("P6", 8.0, "ATKT"),
    ]
    .into_iter()
    .fold(ExamFile::new("BE IT Dec 2023", None), |file, (prn, sgpa, status)| {
        file.with_student(
            StudentRecord::new(prn, format!("Student {prn}"))
                .with_sgpa(sgpa)
                .with_status(status)
                .with_subject(Subject::new("Cloud Computing", "414453", "A")),
        )
    })
    .with_student(StudentRecord::new("P7", "Pending").with_sgpa_text("--"))
}

#[test]
fn test_sgpa_distribution_uses_valid_sgpas_only() {
    let d = sgpa_distribution(&spread()).unwrap();
    assert_eq!(d.count, 5);
    assert_eq!(d.mean, 8.4);
    assert_eq!(d.median, 8.0);
    assert_eq!(d.mode, 8.0);
    // population deviation: sqrt(5.2 / 5)
    assert_eq!(d.std_dev, 1.02);
    assert_eq!((d.min, d.max), (7.0, 10.0));
    assert_eq!(d.p10, 7.4);
    assert_eq!(d.p90, 9.6);
}

#[test]
fn test_sgpa_distribution_even_count_median() {
    let d = sgpa_distribution(&se_comp()).unwrap();
    assert_eq!(d.count, 2);
    assert_eq!(d.median, 8.3);
    assert_eq!(d.mode, 7.5);
}

#[test]
fn test_sgpa_distribution_absent_without_valid_sgpa() {
    let file = ExamFile::new("X", None).with_student(StudentRecord::new("P1", "A").with_sgpa(0.0));
    assert!(sgpa_distribution(&file).is_none());
    assert!(sgpa_distribution(&ExamFile::new("empty", None)).is_none());
}

#[test]
fn test_registry_default_lists_everyone_high_to_low() {
    let rows = student_registry(&spread(), &RegistryFilter::default());
    let prns: Vec<&str> = rows.iter().filter_map(|r| r.prn.as_deref()).collect();
    // equal SGPAs keep upload order; zero and "--" sort last
    assert_eq!(prns, vec!["P2", "P5", "P1", "P6", "P4", "P3", "P7"]);
    assert_eq!(rows[0].sgpa, 10.0);
}

#[test]
fn test_registry_filters_by_min_sgpa_and_status() {
    let filter = RegistryFilter {
        min_sgpa: 8.0,
        status: StatusFilter::Pass,
        order: SgpaOrder::LowToHigh,
    };
    let rows = student_registry(&spread(), &filter);
    let prns: Vec<&str> = rows.iter().filter_map(|r| r.prn.as_deref()).collect();
    // P6 clears the bar but is not an exact "Pass"
    assert_eq!(prns, vec!["P1", "P5", "P2"]);

    let failed = student_registry(
        &spread(),
        &RegistryFilter {
            status: StatusFilter::Fail,
            ..Default::default()
        },
    );
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].result_status.as_deref(), Some("Fail"));
}

#[test]
fn test_registry_rows_omit_subjects() {
    let rows = student_registry(&spread(), &RegistryFilter::default());
    let json = serde_json::to_value(&rows[0]).unwrap();
    assert!(json.get("subjects").is_none());
    assert_eq!(json["name"], "Student P2");
}

#[test]
fn test_subject_grade_summary() {
    let rows = subject_grade_summary(&se_comp());
    assert_eq!(rows.len(), 2);

    let ds = &rows[0];
    assert_eq!(ds.course_name, "Data Structures");
    assert_eq!(ds.total_students, 3);
    assert_eq!(ds.count("O"), 1);
    assert_eq!(ds.count("B+"), 1);
    assert_eq!(ds.count("F"), 1);
    assert_eq!(ds.failure_rate, 33.3);
    assert_eq!(ds.grades.len(), GRADE_COLUMNS.len());

    // IC is not a graded attempt
    assert_eq!(rows[1].total_students, 1);
    assert_eq!(rows[1].failure_rate, 0.0);
}

#[test]
fn test_archive_listing_filters_and_sorts() {
    let files = vec![te_mech(), se_comp(), ExamFile::new("Misc", None)];

    let all = archive_listing(&files, &ArchiveFilter::default());
    let tags: Vec<&str> = all.iter().map(|f| f.label()).collect();
    assert_eq!(tags, vec!["SE Comp Dec 2023", "TE Mech May 2023", "Misc"]);

    let by_query = archive_listing(
        &files,
        &ArchiveFilter {
            query: Some("  mech ".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(by_query.len(), 1);

    let by_dept = archive_listing(
        &files,
        &ArchiveFilter {
            department: Some("Uncategorized".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(by_dept[0].label(), "Misc");

    let by_year = archive_listing(
        &files,
        &ArchiveFilter {
            year: Some("SE".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(by_year[0].label(), "SE Comp Dec 2023");
}

#[test]
fn test_institution_overview() {
    let overview = institution_overview(&[te_mech(), se_comp()]);

    assert_eq!(overview.total_students, 4);
    assert_eq!(overview.exams_analyzed, 2);
    assert_eq!(overview.overall_pass_rate, 75.0);
    // (8.0 + 9.1 + 7.5) / 3
    assert_eq!(overview.average_sgpa, 8.2);

    let years: Vec<&str> = overview.years.iter().map(|y| y.year.as_str()).collect();
    assert_eq!(years, vec!["SE", "TE"]);

    let computer = overview
        .departments
        .iter()
        .find(|d| d.department == "Computer")
        .unwrap();
    assert_eq!(computer.students, 3);
    assert_eq!(computer.pass_rate, 66.7);
}

#[test]
fn test_institution_overview_empty() {
    let overview = institution_overview(&[]);
    assert_eq!(overview.total_students, 0);
    assert_eq!(overview.overall_pass_rate, 0.0);
    assert!(overview.departments.is_empty());
}
