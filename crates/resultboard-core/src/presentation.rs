//! Display-ready view models and plain-text rendering.
//!
//! The core never draws charts itself: it hands a [`ChartSeries`] to a
//! [`ChartSink`], which is torn down and redrawn on every transcript load.

use std::fmt::Write as _;

use serde::Serialize;

use crate::aggregator::AggregateStats;
use crate::predictor::{predict, Prediction, SGPA_MAX, SGPA_MIN};
use crate::search::SearchOutcome;
use crate::transcript::{FailedSubject, Transcript, TranscriptEntry};

/// The three headline numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsPanel {
    pub total_students: String,
    pub average_sgpa: String,
    pub pass_rate: String,
}

impl From<&AggregateStats> for StatsPanel {
    fn from(stats: &AggregateStats) -> Self {
        Self {
            total_students: stats.total_students.to_string(),
            average_sgpa: format!("{:.2}", stats.average_sgpa),
            pass_rate: format!("{}%", stats.pass_rate),
        }
    }
}

/// First letter of each space-separated word, at most two.
pub fn avatar_initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|word| word.chars().next())
        .take(2)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectRow {
    pub course_name: String,
    pub course_code: String,
    pub grade: String,
}

/// One accordion entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptItem {
    pub exam: String,
    pub sgpa: String,
    pub subjects: Vec<SubjectRow>,
    pub expanded: bool,
}

impl From<&TranscriptEntry> for TranscriptItem {
    fn from(entry: &TranscriptEntry) -> Self {
        Self {
            exam: entry.exam.clone(),
            sgpa: format!("{:.2}", entry.sgpa),
            subjects: entry
                .subjects
                .iter()
                .map(|s| SubjectRow {
                    course_name: s.course_name.clone().unwrap_or_default(),
                    course_code: s.course_code.clone().unwrap_or_default(),
                    grade: s.grade.clone().unwrap_or_default(),
                })
                .collect(),
            expanded: false,
        }
    }
}

/// Transcript accordion, most recent exam first. Every entry starts collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscriptPanel {
    pub items: Vec<TranscriptItem>,
}

impl From<&Transcript> for TranscriptPanel {
    fn from(transcript: &Transcript) -> Self {
        Self {
            items: transcript.most_recent_first().map(TranscriptItem::from).collect(),
        }
    }
}

impl TranscriptPanel {
    /// Flip one entry; returns the new state, or `None` if out of range.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let item = self.items.get_mut(index)?;
        item.expanded = !item.expanded;
        Some(item.expanded)
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.items.get(index).is_some_and(|i| i.expanded)
    }

    pub fn expand_all(&mut self) {
        self.items.iter_mut().for_each(|i| i.expanded = true);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// SGPA over time, oldest first, on a fixed 0-10 axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<ChartPoint>,
    pub y_min: f64,
    pub y_max: f64,
}

impl From<&Transcript> for ChartSeries {
    fn from(transcript: &Transcript) -> Self {
        Self {
            label: "SGPA".to_string(),
            points: transcript
                .entries()
                .iter()
                .map(|e| ChartPoint {
                    label: e.exam.clone(),
                    value: e.sgpa,
                })
                .collect(),
            y_min: SGPA_MIN,
            y_max: SGPA_MAX,
        }
    }
}

/// External charting widget.
pub trait ChartSink {
    /// Draw a new chart. Called only after [`ChartSink::teardown`] of any live chart.
    fn draw(&mut self, series: &ChartSeries);

    /// Destroy the live chart.
    fn teardown(&mut self);
}

/// Owns a sink and guarantees teardown-before-draw.
pub struct ChartHost<S: ChartSink> {
    sink: S,
    live: bool,
}

impl<S: ChartSink> ChartHost<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, live: false }
    }

    /// Replace whatever is on screen with `series`.
    pub fn show(&mut self, series: &ChartSeries) {
        if self.live {
            self.sink.teardown();
        }
        self.sink.draw(series);
        self.live = true;
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Text bar chart, used by the terminal front-end.
#[derive(Debug, Clone, Default)]
pub struct AsciiChart {
    width: usize,
    rendered: Option<String>,
}

impl AsciiChart {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            rendered: None,
        }
    }

    pub fn rendered(&self) -> Option<&str> {
        self.rendered.as_deref()
    }
}

impl ChartSink for AsciiChart {
    fn draw(&mut self, series: &ChartSeries) {
        let label_width = series
            .points
            .iter()
            .map(|p| p.label.chars().count())
            .max()
            .unwrap_or(0);
        let span = (series.y_max - series.y_min).max(f64::EPSILON);

        let mut out = String::new();
        for p in &series.points {
            let ratio = ((p.value - series.y_min) / span).clamp(0.0, 1.0);
            let bar = "#".repeat((ratio * self.width as f64).round() as usize);
            let _ = writeln!(
                out,
                "{:<label_width$} | {:<width$} {:.2}",
                p.label,
                bar,
                p.value,
                width = self.width
            );
        }
        self.rendered = Some(out);
    }

    fn teardown(&mut self) {
        self.rendered = None;
    }
}

/// Everything shown for a selected student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentView {
    pub name: String,
    pub prn: String,
    pub prn_label: String,
    pub initials: String,
    pub prediction: Prediction,
    pub transcript: TranscriptPanel,
    pub chart: ChartSeries,
    pub failed_subjects: Vec<FailedSubject>,
}

impl StudentView {
    /// Works for an empty transcript too: prediction `0.00`, no entries.
    pub fn build(name: &str, prn: &str, transcript: &Transcript) -> Self {
        Self {
            name: name.to_string(),
            prn: prn.to_string(),
            prn_label: format!("PRN: {prn}"),
            initials: avatar_initials(name),
            prediction: predict(&transcript.sgpa_series()),
            transcript: TranscriptPanel::from(transcript),
            chart: ChartSeries::from(transcript),
            failed_subjects: transcript.failed_subjects(),
        }
    }
}

pub fn render_stats(panel: &StatsPanel) -> String {
    format!(
        "Total students : {}\nAverage SGPA   : {}\nPass rate      : {}\n",
        panel.total_students, panel.average_sgpa, panel.pass_rate
    )
}

pub fn render_matches(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::Collapse => "(collapsed)\n".to_string(),
        SearchOutcome::Matches(m) if m.is_empty() => "(no matches)\n".to_string(),
        SearchOutcome::Matches(m) => m
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{:>2}. {}  [{}]\n", i + 1, e.name, e.prn))
            .collect(),
    }
}

/// Profile, prediction, accordion (subject tables for expanded entries) and
/// failure alerts.
pub fn render_student(view: &StudentView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", view.initials, view.name);
    let _ = writeln!(out, "{}", view.prn_label);
    let _ = writeln!(out, "Predicted next SGPA: {}", view.prediction);
    out.push('\n');

    if view.transcript.items.is_empty() {
        out.push_str("No exam records found.\n");
    }
    for item in &view.transcript.items {
        let marker = if item.expanded { 'v' } else { '>' };
        let _ = writeln!(out, "{marker} {}  SGPA: {}", item.exam, item.sgpa);
        if item.expanded {
            for s in &item.subjects {
                let _ = writeln!(out, "    {:<40} {:<10} {}", s.course_name, s.course_code, s.grade);
            }
        }
    }

    if !view.failed_subjects.is_empty() {
        out.push_str("\nSubject failure alerts:\n");
        for f in &view.failed_subjects {
            let _ = writeln!(out, "  {} - {} ({})", f.subject, f.grade, f.exam);
        }
    }
    out
}
