//! Resultboard - academic results dashboard CLI
//!
//! The `resultboard` command reads uploaded result files from a JSON export
//! or Firestore and prints roster stats, student transcripts and per-exam
//! analytics.
//!
//! ## Commands
//!
//! - `stats`: Roster size, average SGPA and pass rate
//! - `search`: Find students by name or PRN
//! - `show`: Transcript, prediction and failure alerts for one student
//! - `files`, `report`, `overview`: Archive listing and exam analytics
//! - `shell`: Interactive search-and-open loop

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, Level};

use resultboard_core::{
    archive_listing, failed_students, file_summary, institution_overview, render_matches,
    render_stats, render_student, sgpa_distribution, student_registry, subject_grade_summary,
    top_performers, ArchiveFilter, AsciiChart, ChartHost, DashboardConfig, DashboardSession,
    DocumentCache, FileSummary, InstitutionOverview, LoadOutcome, RecordAggregator,
    RegistryFilter, RegistryRow, RosterEntry, SearchOutcome, SgpaDistribution, SgpaOrder,
    StatsPanel, StatusFilter, StudentView, SubjectGradeRow, METRICS,
};
use resultboard_store::{ExamFile, FirestoreStore, JsonFileStore, ResultStore, StudentRecord};

/// Width of the SGPA bar chart in terminal cells.
const CHART_WIDTH: usize = 40;

#[derive(Parser)]
#[command(name = "resultboard")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Academic results dashboard", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Where result files are read from
    #[arg(long, global = true, value_enum, default_value_t = Source::File, env = "RESULTBOARD_SOURCE")]
    source: Source,

    /// JSON export to read with `--source file`
    #[arg(long, global = true, env = "RESULTBOARD_FILE")]
    file: Option<PathBuf>,

    /// Collection holding the result files (default: result_files)
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Reuse the fetched documents until `:refresh`
    #[arg(long, global = true)]
    cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    File,
    Firestore,
}

/// Result-status choice for the report's student registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    All,
    Pass,
    Fail,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => StatusFilter::All,
            StatusArg::Pass => StatusFilter::Pass,
            StatusArg::Fail => StatusFilter::Fail,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show total students, average SGPA and pass rate
    Stats,

    /// Search the roster by name or PRN
    Search {
        /// Search text (at least two characters)
        query: String,
    },

    /// Show one student's transcript and predicted next SGPA
    Show {
        /// Student PRN
        prn: String,
    },

    /// List uploaded result files
    Files {
        /// Match against exam tag or file name
        #[arg(short, long)]
        query: Option<String>,

        /// Exact department
        #[arg(short, long)]
        department: Option<String>,

        /// Exact year (FE, SE, TE, BE)
        #[arg(short, long)]
        year: Option<String>,
    },

    /// Analyse a single result file
    Report {
        /// Document id or exam tag
        #[arg(id = "report_file", value_name = "FILE")]
        file: String,

        /// Number of top performers to list
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Registry: only students with at least this SGPA
        #[arg(long, default_value = "0.0")]
        min_sgpa: f64,

        /// Registry: filter by result status
        #[arg(long, value_enum, default_value_t = StatusArg::All)]
        status: StatusArg,

        /// Registry: sort by SGPA low to high instead of high to low
        #[arg(long)]
        ascending: bool,
    },

    /// Institution-wide breakdown by department and year
    Overview,

    /// Interactive search loop (`:open N`, `:toggle N`, `:refresh`, `:quit`)
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    resultboard_core::init_tracing(cli.json_logs, level);

    let config = build_config(&cli)?;
    let store = open_store(&cli).context("Failed to open result store")?;
    info!(backend = store.backend_name(), collection = %config.collection, "store opened");

    let json = cli.json;
    let outcome = match cli.command {
        Commands::Stats => cmd_stats(store, &config, json).await,
        Commands::Search { query } => cmd_search(store, config, &query, json).await,
        Commands::Show { prn } => cmd_show(store, config, &prn, json).await,
        Commands::Files {
            query,
            department,
            year,
        } => {
            let filter = ArchiveFilter {
                query,
                department,
                year,
            };
            cmd_files(store, &config, &filter, json).await
        }
        Commands::Report {
            file,
            top,
            min_sgpa,
            status,
            ascending,
        } => {
            let registry = RegistryFilter {
                min_sgpa,
                status: status.into(),
                order: if ascending {
                    SgpaOrder::LowToHigh
                } else {
                    SgpaOrder::HighToLow
                },
            };
            cmd_report(store, &config, &file, top, &registry, json).await
        }
        Commands::Overview => cmd_overview(store, &config, json).await,
        Commands::Shell => {
            let session = DashboardSession::new(store, config);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            run_shell(&session, stdin, &mut stdout, json).await
        }
    };

    METRICS.flush();
    outcome
}

/// Environment config with CLI overrides on top.
fn build_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = DashboardConfig::from_env().context("Invalid RESULTBOARD_* configuration")?;
    if let Some(collection) = &cli.collection {
        config = config.with_collection(collection.clone());
    }
    if cli.cache {
        config = config.with_document_cache(DocumentCache::UntilRefresh);
    }
    config.validate()?;
    Ok(config)
}

fn open_store(cli: &Cli) -> Result<Arc<dyn ResultStore>> {
    match cli.source {
        Source::File => {
            let path = cli
                .file
                .as_ref()
                .ok_or_else(|| anyhow!("--file (or RESULTBOARD_FILE) is required with --source file"))?;
            Ok(Arc::new(JsonFileStore::new(path)))
        }
        Source::Firestore => {
            let store = FirestoreStore::from_env().context("Failed to configure Firestore access")?;
            Ok(Arc::new(store))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the stats panel
async fn cmd_stats(store: Arc<dyn ResultStore>, config: &DashboardConfig, json: bool) -> Result<()> {
    let snapshot = RecordAggregator::new(store, config.collection.clone())
        .sync()
        .await
        .context("Failed to load result files")?;
    let panel = StatsPanel::from(&snapshot.stats);

    if json {
        return print_json(&panel);
    }
    print!("{}", render_stats(&panel));
    Ok(())
}

/// Search the roster
async fn cmd_search(
    store: Arc<dyn ResultStore>,
    config: DashboardConfig,
    query: &str,
    json: bool,
) -> Result<()> {
    let session = DashboardSession::new(store, config);
    session.sync().await.context("Failed to load result files")?;
    let outcome = session.search(query);

    if json {
        return print_json(&outcome);
    }
    print!("{}", render_matches(&outcome));
    Ok(())
}

/// Show a student's transcript
async fn cmd_show(
    store: Arc<dyn ResultStore>,
    config: DashboardConfig,
    prn: &str,
    json: bool,
) -> Result<()> {
    let session = DashboardSession::new(store, config);
    let snapshot = session.sync().await.context("Failed to load result files")?;
    let name = snapshot
        .roster
        .get(prn)
        .map(|entry| entry.name.clone())
        .unwrap_or_default();

    session
        .load_student(prn, &name)
        .await
        .context(format!("Failed to load transcript for '{}'", prn))?;
    let mut view = session
        .current_view()
        .ok_or_else(|| anyhow!("no student view after loading '{}'", prn))?;

    if json {
        return print_json(&view);
    }
    view.transcript.expand_all();
    print!("{}", render_student(&view));
    print_chart(&mut ChartHost::new(AsciiChart::new(CHART_WIDTH)), &view);
    Ok(())
}

fn print_chart(host: &mut ChartHost<AsciiChart>, view: &StudentView) {
    host.show(&view.chart);
    if let Some(chart) = host.sink().rendered().filter(|c| !c.is_empty()) {
        println!("\nSGPA trend:\n{}", chart);
    }
}

#[derive(Serialize)]
struct FileListing {
    id: Option<String>,
    exam: String,
    department: String,
    year: String,
    uploaded_at: Option<String>,
    students: usize,
}

impl From<&ExamFile> for FileListing {
    fn from(file: &ExamFile) -> Self {
        Self {
            id: file.id.clone(),
            exam: file.label().to_string(),
            department: file.department.clone().unwrap_or_else(|| "Uncategorized".to_string()),
            year: file.year.clone().unwrap_or_else(|| "Unknown".to_string()),
            uploaded_at: file.uploaded_at.map(|d| d.format("%Y-%m-%d").to_string()),
            students: file.students_data.len(),
        }
    }
}

/// List archived result files
async fn cmd_files(
    store: Arc<dyn ResultStore>,
    config: &DashboardConfig,
    filter: &ArchiveFilter,
    json: bool,
) -> Result<()> {
    let files = store
        .list_documents(&config.collection)
        .await
        .context("Failed to load result files")?;
    let listing: Vec<FileListing> = archive_listing(&files, filter)
        .into_iter()
        .map(FileListing::from)
        .collect();

    if json {
        return print_json(&listing);
    }
    if listing.is_empty() {
        println!("No result files found.");
        return Ok(());
    }
    for f in &listing {
        println!(
            "{:<12} {:<32} {:<16} {:<8} {:>5} students  {}",
            f.uploaded_at.as_deref().unwrap_or("-"),
            f.exam,
            f.department,
            f.year,
            f.students,
            f.id.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct StudentLine {
    prn: String,
    name: String,
    sgpa: f64,
}

impl From<&StudentRecord> for StudentLine {
    fn from(s: &StudentRecord) -> Self {
        Self {
            prn: s.prn.clone().unwrap_or_default(),
            name: s.name_or_empty().to_string(),
            sgpa: s.sgpa_value(),
        }
    }
}

#[derive(Serialize)]
struct FileReport {
    exam: String,
    summary: FileSummary,
    top_performers: Vec<StudentLine>,
    failed_students: Vec<StudentLine>,
    subjects: Vec<SubjectGradeRow>,
    distribution: Option<SgpaDistribution>,
    registry: Vec<RegistryRow>,
}

fn build_report(file: &ExamFile, top: usize, registry: &RegistryFilter) -> FileReport {
    FileReport {
        exam: file.label().to_string(),
        summary: file_summary(file),
        top_performers: top_performers(file, top).into_iter().map(StudentLine::from).collect(),
        failed_students: failed_students(file).into_iter().map(StudentLine::from).collect(),
        subjects: subject_grade_summary(file),
        distribution: sgpa_distribution(file),
        registry: student_registry(file, registry),
    }
}

fn find_file<'a>(files: &'a [ExamFile], key: &str) -> Option<&'a ExamFile> {
    files
        .iter()
        .find(|f| f.id.as_deref() == Some(key))
        .or_else(|| files.iter().find(|f| f.exam_tag.as_deref() == Some(key)))
}

/// Analyse one result file
async fn cmd_report(
    store: Arc<dyn ResultStore>,
    config: &DashboardConfig,
    key: &str,
    top: usize,
    registry: &RegistryFilter,
    json: bool,
) -> Result<()> {
    let files = store
        .list_documents(&config.collection)
        .await
        .context("Failed to load result files")?;
    let Some(file) = find_file(&files, key) else {
        bail!("No result file with id or exam tag '{}'", key);
    };

    let report = build_report(file, top, registry);

    if json {
        return print_json(&report);
    }

    let s = &report.summary;
    println!("{}", report.exam);
    println!(
        "Students: {}  Passed: {}  Failed: {}  Avg SGPA: {:.2}  Pass: {:.1}%",
        s.total_students, s.passed_students, s.failed_students, s.average_sgpa, s.pass_percentage
    );
    if let Some(d) = &report.distribution {
        println!(
            "SGPA  mean {:.2}  median {:.2}  mode {:.2}  std {:.2}  range {:.2}-{:.2}  top 10% >= {:.2}  bottom 10% <= {:.2}",
            d.mean, d.median, d.mode, d.std_dev, d.min, d.max, d.p90, d.p10
        );
    }

    println!("\nTop performers:");
    for (i, st) in report.top_performers.iter().enumerate() {
        println!("  {:>2}. {:<30} {:<14} {:.2}", i + 1, st.name, st.prn, st.sgpa);
    }

    if !report.failed_students.is_empty() {
        println!("\nFailed students:");
        for st in &report.failed_students {
            println!("  {:<30} {}", st.name, st.prn);
        }
    }

    if !report.subjects.is_empty() {
        println!("\nSubject grades:");
        let header: Vec<String> = resultboard_core::GRADE_COLUMNS
            .iter()
            .map(|g| format!("{:>4}", g))
            .collect();
        println!("  {:<10} {:<30} {} {:>6}", "Code", "Course", header.join(""), "Fail%");
        for row in &report.subjects {
            let counts: Vec<String> = row.grades.iter().map(|g| format!("{:>4}", g.count)).collect();
            println!(
                "  {:<10} {:<30} {} {:>6.1}",
                row.course_code,
                row.course_name,
                counts.join(""),
                row.failure_rate
            );
        }
    }

    println!("\nStudent registry ({} shown):", report.registry.len());
    for row in &report.registry {
        println!(
            "  {:<14} {:<30} {:<10} {:>5.2}  {}",
            row.prn.as_deref().unwrap_or(""),
            row.name.as_deref().unwrap_or(""),
            row.seat_no.as_deref().unwrap_or(""),
            row.sgpa,
            row.result_status.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Institution-wide breakdown
async fn cmd_overview(store: Arc<dyn ResultStore>, config: &DashboardConfig, json: bool) -> Result<()> {
    let files = store
        .list_documents(&config.collection)
        .await
        .context("Failed to load result files")?;
    let overview: InstitutionOverview = institution_overview(&files);

    if json {
        return print_json(&overview);
    }
    println!(
        "Students: {}  Exams: {}  Pass rate: {:.1}%  Avg SGPA: {:.2}",
        overview.total_students,
        overview.exams_analyzed,
        overview.overall_pass_rate,
        overview.average_sgpa
    );
    println!("\nBy department:");
    for d in &overview.departments {
        println!(
            "  {:<24} {:>6} students  {:>5.1}% pass  {:.2} SGPA",
            d.department, d.students, d.pass_rate, d.average_sgpa
        );
    }
    println!("\nBy year:");
    for y in &overview.years {
        println!("  {:<8} {:>6} students  {:>5.1}% pass", y.year, y.students, y.pass_rate);
    }
    Ok(())
}

/// Line-oriented dashboard: every plain line is a search.
async fn run_shell<R, W>(session: &DashboardSession, input: R, out: &mut W, json: bool) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut chart = ChartHost::new(AsciiChart::new(CHART_WIDTH));
    let mut matches: Vec<RosterEntry> = Vec::new();

    match session.sync().await {
        Ok(snapshot) => write!(out, "{}", render_stats(&StatsPanel::from(&snapshot.stats)))?,
        Err(err) => writeln!(out, "sync failed: {}", err)?,
    }

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            ":quit" | ":q" => break,
            ":refresh" => {
                session.refresh();
                match session.sync().await {
                    Ok(snapshot) => {
                        write!(out, "{}", render_stats(&StatsPanel::from(&snapshot.stats)))?
                    }
                    Err(err) => writeln!(out, "sync failed: {}", err)?,
                }
            }
            ":open" => {
                let Some(entry) = pick(&matches, arg) else {
                    writeln!(out, "no match #{}", arg)?;
                    continue;
                };
                match session.load_student(&entry.prn, &entry.name).await {
                    Ok(LoadOutcome::Applied) => {
                        if let Some(view) = session.current_view() {
                            show_view(out, &mut chart, &view, json)?;
                        }
                    }
                    Ok(LoadOutcome::Superseded) => {}
                    Err(err) => writeln!(out, "load failed: {}", err)?,
                }
            }
            ":toggle" => {
                let index = arg.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
                match index.and_then(|i| session.toggle_entry(i)) {
                    Some(_) => {
                        if let Some(view) = session.current_view() {
                            write!(out, "{}", render_student(&view))?;
                        }
                    }
                    None => writeln!(out, "no transcript entry #{}", arg)?,
                }
            }
            _ => {
                let outcome = session.search(line);
                if json {
                    writeln!(out, "{}", serde_json::to_string(&outcome)?)?;
                } else {
                    write!(out, "{}", render_matches(&outcome))?;
                }
                matches = match outcome {
                    SearchOutcome::Matches(found) => found,
                    SearchOutcome::Collapse => Vec::new(),
                };
            }
        }
        out.flush()?;
    }
    Ok(())
}

/// 1-based pick from the last search results.
fn pick<'a>(matches: &'a [RosterEntry], arg: &str) -> Option<&'a RosterEntry> {
    let n = arg.parse::<usize>().ok()?;
    matches.get(n.checked_sub(1)?)
}

fn show_view<W: Write>(
    out: &mut W,
    chart: &mut ChartHost<AsciiChart>,
    view: &StudentView,
    json: bool,
) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(view)?)?;
        return Ok(());
    }
    write!(out, "{}", render_student(view))?;
    chart.show(&view.chart);
    if let Some(rendered) = chart.sink().rendered().filter(|c| !c.is_empty()) {
        write!(out, "\nSGPA trend:\n{}", rendered)?;
    }
    Ok(())
}
