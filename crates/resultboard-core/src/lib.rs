//! Resultboard Core Library
//!
//! Roster aggregation, search, transcripts, SGPA prediction and the
//! dashboard session that ties them to a result store.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod insights;
pub mod metrics;
pub mod obs;
pub mod predictor;
pub mod presentation;
pub mod search;
pub mod session;
pub mod telemetry;
pub mod transcript;

pub use aggregator::{aggregate, AggregateStats, RecordAggregator, Roster, RosterEntry, RosterSnapshot};
pub use config::{DashboardConfig, DocumentCache, DEFAULT_MIN_QUERY_CHARS, DEFAULT_SEARCH_LIMIT};
pub use error::{DashboardError, DashboardResult};
pub use insights::{
    archive_listing, failed_students, file_summary, institution_overview, sgpa_distribution,
    student_registry, subject_grade_summary, top_performers, ArchiveFilter, DepartmentRow,
    FileSummary, GradeCount, InstitutionOverview, RegistryFilter, RegistryRow, SgpaDistribution,
    SgpaOrder, StatusFilter, SubjectGradeRow, YearRow, GRADE_COLUMNS,
};
pub use predictor::{predict, Prediction, SGPA_MAX, SGPA_MIN};
pub use presentation::{
    avatar_initials, render_matches, render_stats, render_student, AsciiChart, ChartHost,
    ChartPoint, ChartSeries, ChartSink, StatsPanel, StudentView, SubjectRow, TranscriptItem,
    TranscriptPanel,
};
pub use search::{SearchIndex, SearchOutcome};
pub use session::{DashboardSession, LoadOutcome, LoadTicket, SessionStatus};
pub use transcript::{build_transcript, FailedSubject, Transcript, TranscriptBuilder, TranscriptEntry};

pub use resultboard_store::{ExamFile, ResultStore, StoreError, StudentRecord, Subject};

pub use metrics::METRICS;
pub use obs::{
    emit_cache_invalidated, emit_load_failed, emit_load_started, emit_load_superseded,
    emit_roster_synced, emit_search, emit_sync_failed, emit_transcript_built, session_span,
    SessionSpan,
};
pub use telemetry::init_tracing;

/// Resultboard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
