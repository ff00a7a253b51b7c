//! Case runner
//!
//! Three entry points share discovery and path resolution:
//! - [`run_report`]: invoke the validator per case and print its output next to the case's annotations
//! - [`run_check`]: invoke the validator per fixture case and compare against the expected files
//! - [`run_list`]: show what would be run, without invoking anything
//!
//! ## CaseReporter Trait
//!
//! `check` results go through a [`CaseReporter`], so the console table and the JSON stream are two
//! implementations of the same callbacks. Execution and discovery are abstracted in
//! `case_interfaces.rs`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use std::{env, fs, process};

use casebook_core::compare::{compare_board, reason_label, streams_match};
use casebook_core::layout::{
    FIXTURE_OUTPUT_BOARD, FIXTURE_STDERR, FIXTURE_STDOUT, fixture_paths, named_paths,
};
use casebook_core::panes::{self, Palette};
use casebook_core::{Annotation, AnnotationScanner, CaseLayout, CasePaths, Mismatch, NONE_PLACEHOLDER, or_none};
use serde_json::json;
use tracing::{debug, warn};

use super::case_interfaces::{CaseDiscovery, HarnessError, Invocation, ProcessOutput, ValidatorExecutor};
use super::discovery::{Discovery, TestCase, scan_case_annotations};
use crate::config::{RunOptions, ValidatorCommand};
use crate::version::CASEBOOK_VERSION;

// ============================================================================
// Case Reporter Trait
// ============================================================================

/// Callbacks for reporting a `check` run.
///
/// Implement this trait to add an output format.
pub trait CaseReporter {
    /// Called once discovery has scanned every root
    fn on_discovery(&mut self, _discovery: &Discovery) -> io::Result<()> {
        Ok(())
    }

    /// Called for each case dropped because fixture files are missing
    fn on_invalid_case(&mut self, _case: &TestCase, _missing: &[&'static str]) -> io::Result<()> {
        Ok(())
    }

    /// Called when validation is done and execution is about to start
    fn on_collection_complete(&mut self, valid: usize, invalid: usize) -> io::Result<()>;

    /// Called after each case has run (`index` is 1-based)
    fn on_case_complete(&mut self, index: usize, total: usize, report: &CaseReport) -> io::Result<()>;

    /// Called after the last case
    fn on_run_complete(&mut self, summary: &RunSummary) -> io::Result<()>;
}

// ============================================================================
// Results
// ============================================================================

/// Expected output files of a fixture case. A missing file is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseExpectations {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub board: Option<String>,
}

impl CaseExpectations {
    pub fn load(case_dir: &Path) -> io::Result<Self> {
        Ok(Self {
            stdout: read_optional(&case_dir.join(FIXTURE_STDOUT))?,
            stderr: read_optional(&case_dir.join(FIXTURE_STDERR))?,
            board: read_optional(&case_dir.join(FIXTURE_OUTPUT_BOARD))?,
        })
    }
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Board written by the validator. A file that exists but cannot be read counts as missing.
fn read_produced_board(path: &Path) -> Option<String> {
    match read_optional(path) {
        Ok(board) => board,
        Err(e) => {
            warn!("Cannot read produced board {}: {}", path.display(), e);
            None
        }
    }
}

/// Compare one run against the case's expectations.
///
/// A timed-out run is only a timeout; its partial output is not compared. When a board is expected
/// and the validator wrote none, that is a board mismatch.
pub fn evaluate(expected: &CaseExpectations, output: &ProcessOutput, produced_board: Option<&str>) -> Vec<Mismatch> {
    if output.timed_out {
        return vec![Mismatch::Timeout];
    }

    let mut mismatches = Vec::new();
    if !streams_match(expected.stdout.as_deref(), &output.stdout) {
        mismatches.push(Mismatch::Stdout);
    }
    if !streams_match(expected.stderr.as_deref(), &output.stderr) {
        mismatches.push(Mismatch::Stderr);
    }
    if let Some(board) = &expected.board {
        match produced_board {
            Some(produced) => mismatches.extend(compare_board(board, produced)),
            None => mismatches.push(Mismatch::Board),
        }
    }
    mismatches
}

/// Pass/fail verdict for one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    /// Validator exit code; a timeout counts as 1, a failed launch or signal as `None`
    pub exit_code: Option<i32>,
    pub mismatches: Vec<Mismatch>,
    pub duration: Duration,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        !self.program_error() && self.mismatches.is_empty()
    }

    pub fn program_error(&self) -> bool {
        self.exit_code != Some(0)
    }

    pub fn timed_out(&self) -> bool {
        self.mismatches.contains(&Mismatch::Timeout)
    }

    /// Short reason for the results table.
    pub fn reason(&self) -> &'static str {
        if self.mismatches.is_empty() && self.program_error() {
            "program"
        } else {
            reason_label(&self.mismatches)
        }
    }
}

/// Everything known about one checked case.
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub name: String,
    pub dir: PathBuf,
    pub outcome: CaseOutcome,
    pub expected: CaseExpectations,
    pub output: ProcessOutput,
    /// Board file the validator wrote, if any
    pub produced_board: Option<String>,
    /// Set when the validator could not be started
    pub launch_error: Option<String>,
}

/// Totals for a `check` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Cases dropped before execution
    pub invalid: usize,
    /// Sum of per-case run times
    pub duration: Duration,
    pub board_errors: usize,
    pub stderr_errors: usize,
    pub stdout_errors: usize,
    pub program_errors: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &CaseOutcome) {
        self.total += 1;
        self.duration += outcome.duration;
        if outcome.passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        if outcome.mismatches.iter().any(|m| m.is_board()) {
            self.board_errors += 1;
        }
        if outcome.mismatches.contains(&Mismatch::Stderr) {
            self.stderr_errors += 1;
        }
        if outcome.mismatches.contains(&Mismatch::Stdout) {
            self.stdout_errors += 1;
        }
        if outcome.program_error() {
            self.program_errors += 1;
        }
    }

    pub fn has_errors(&self) -> bool {
        self.board_errors + self.stderr_errors + self.stdout_errors + self.program_errors > 0
    }
}

// ============================================================================
// Scratch directory
// ============================================================================

static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Per-run temporary directory for fixture output files, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create() -> io::Result<Self> {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = env::temp_dir().join(format!("casebook_{}_{}", process::id(), n));
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            debug!("failed to remove scratch dir {}: {}", self.path.display(), e);
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Validator arguments for a case under the run's layout.
pub fn case_paths(case: &TestCase, options: &RunOptions, scratch: &Path) -> CasePaths {
    match options.layout {
        CaseLayout::Named => {
            let output_root = options.output_root.as_deref().unwrap_or(&case.root);
            named_paths(&case.dir, &case.name, output_root, &options.output_dir)
        }
        CaseLayout::Fixture => fixture_paths(&case.dir, &case.name, scratch),
    }
}

/// Where the output file ends up, seen from the harness's working directory.
fn produced_output_path(paths: &CasePaths) -> PathBuf {
    match &paths.working_dir {
        Some(dir) if paths.output.is_relative() => dir.join(&paths.output),
        _ => paths.output.clone(),
    }
}

/// Create `<output root>/<output dir>` for every named-layout case before anything runs.
fn prepare_output_dirs(cases: &[TestCase], options: &RunOptions) -> io::Result<()> {
    if options.layout != CaseLayout::Named {
        return Ok(());
    }
    let mut roots: Vec<&Path> = match &options.output_root {
        Some(root) => vec![root.as_path()],
        None => cases.iter().map(|c| c.root.as_path()).collect(),
    };
    roots.dedup();
    for root in roots {
        fs::create_dir_all(root.join(&options.output_dir))?;
    }
    Ok(())
}

fn write_not_directories(out: &mut dyn Write, discovery: &Discovery) -> io::Result<()> {
    for path in &discovery.not_directories {
        writeln!(out, "Path '{}' is not a folder!", path.display())?;
    }
    Ok(())
}

// ============================================================================
// report
// ============================================================================

/// Render one `report` entry: the captured output and the expected-error annotations.
pub fn render_report_entry(index: usize, name: &str, output: &str, annotations: &[Annotation]) -> String {
    let mut text = format!("#{index} {name}\n  Output:\n");
    for line in or_none(output).lines() {
        push_indented(&mut text, line);
    }
    text.push_str("  Expected:\n");
    if annotations.is_empty() {
        push_indented(&mut text, NONE_PLACEHOLDER);
    }
    for annotation in annotations {
        push_indented(&mut text, &annotation.text);
    }
    text
}

fn push_indented(text: &mut String, line: &str) {
    if !line.is_empty() {
        text.push_str("    ");
        text.push_str(line);
    }
    text.push('\n');
}

/// Run every discovered case once and print output next to annotations.
///
/// Returns the number of cases run. Validator failures are shown, not judged.
pub fn run_report(
    roots: &[PathBuf],
    discovery: &dyn CaseDiscovery,
    executor: &dyn ValidatorExecutor,
    command: &ValidatorCommand,
    scanner: &AnnotationScanner,
    options: &RunOptions,
    out: &mut dyn Write,
) -> Result<usize, HarnessError> {
    let found = discovery.discover(roots);
    write_not_directories(out, &found)?;
    if found.is_empty() {
        return Err(HarnessError::NoCases);
    }

    prepare_output_dirs(&found.cases, options)?;
    let scratch = ScratchDir::create()?;

    let mut counter = 0;
    for case in &found.cases {
        counter += 1;
        let paths = case_paths(case, options, scratch.path());
        let invocation = Invocation::for_case(command, &paths);
        let captured = match executor.execute(&invocation, options.timeout) {
            Ok(output) if output.timed_out => format!("timed out after {:.1}s", options.timeout.as_secs_f64()),
            Ok(output) => output.combined(),
            Err(e) => e.to_string(),
        };
        let annotations = scan_case_annotations(&case.dir, scanner);
        write!(out, "{}", render_report_entry(counter, &case.name, &captured, &annotations))?;
    }
    out.flush()?;

    Ok(counter)
}

// ============================================================================
// check
// ============================================================================

/// Run a single case and judge it.
pub fn run_case(
    case: &TestCase,
    paths: &CasePaths,
    executor: &dyn ValidatorExecutor,
    command: &ValidatorCommand,
    timeout: Duration,
) -> Result<CaseReport, HarnessError> {
    let expected = CaseExpectations::load(&case.dir)?;
    let produced_path = produced_output_path(paths);
    if produced_path.exists() {
        fs::remove_file(&produced_path)?;
    }

    let invocation = Invocation::for_case(command, paths);
    let (output, launch_error) = match executor.execute(&invocation, timeout) {
        Ok(output) => (output, None),
        Err(e @ HarnessError::Spawn { .. }) => (ProcessOutput::default(), Some(e.to_string())),
        Err(e) => return Err(e),
    };

    let produced_board = read_produced_board(&produced_path);
    let (exit_code, mismatches) = if launch_error.is_some() {
        (None, Vec::new())
    } else {
        let mismatches = evaluate(&expected, &output, produced_board.as_deref());
        let exit_code = if output.timed_out { Some(1) } else { output.exit_code };
        (exit_code, mismatches)
    };

    Ok(CaseReport {
        name: case.name.clone(),
        dir: case.dir.clone(),
        outcome: CaseOutcome {
            exit_code,
            mismatches,
            duration: output.duration,
        },
        expected,
        output,
        produced_board,
        launch_error,
    })
}

/// Run every valid case and compare its output against the expected files.
pub fn run_check(
    roots: &[PathBuf],
    discovery: &dyn CaseDiscovery,
    executor: &dyn ValidatorExecutor,
    command: &ValidatorCommand,
    options: &RunOptions,
    reporter: &mut dyn CaseReporter,
) -> Result<RunSummary, HarnessError> {
    let found = discovery.discover(roots);
    reporter.on_discovery(&found)?;
    if found.is_empty() {
        return Err(HarnessError::NoCases);
    }

    let mut cases = Vec::new();
    let mut invalid = 0;
    for case in &found.cases {
        let missing = match options.layout {
            CaseLayout::Fixture => case.missing_fixture_files(),
            CaseLayout::Named => Vec::new(),
        };
        if missing.is_empty() {
            cases.push(case);
        } else {
            invalid += 1;
            reporter.on_invalid_case(case, &missing)?;
        }
    }
    if cases.is_empty() {
        return Err(HarnessError::NoValidCases { invalid });
    }
    reporter.on_collection_complete(cases.len(), invalid)?;

    prepare_output_dirs(&found.cases, options)?;
    let scratch = ScratchDir::create()?;

    let mut summary = RunSummary {
        invalid,
        ..RunSummary::default()
    };
    let total = cases.len();
    for (i, case) in cases.into_iter().enumerate() {
        let paths = case_paths(case, options, scratch.path());
        let report = run_case(case, &paths, executor, command, options.timeout)?;
        summary.record(&report.outcome);
        reporter.on_case_complete(i + 1, total, &report)?;

        if options.stop_on_fail && !report.outcome.passed() {
            debug!("stopping after first failure: {}", case.name);
            break;
        }
    }

    reporter.on_run_complete(&summary)?;
    Ok(summary)
}

// ============================================================================
// list
// ============================================================================

/// Print every discovered case with its resolved paths and annotations. Nothing is invoked.
pub fn run_list(
    roots: &[PathBuf],
    discovery: &dyn CaseDiscovery,
    scanner: &AnnotationScanner,
    options: &RunOptions,
    out: &mut dyn Write,
) -> Result<usize, HarnessError> {
    let found = discovery.discover(roots);
    write_not_directories(out, &found)?;
    if found.is_empty() {
        return Err(HarnessError::NoCases);
    }

    let scratch = Path::new("<scratch>");
    for case in &found.cases {
        let paths = case_paths(case, options, scratch);
        writeln!(out, "{} ({})", case.name, case.dir.display())?;
        if let Some(dir) = &paths.working_dir {
            writeln!(out, "  cwd:    {}", dir.display())?;
        }
        writeln!(out, "  board:  {}", paths.board.display())?;
        writeln!(out, "  output: {}", paths.output.display())?;
        writeln!(out, "  game:   {}", paths.game.display())?;
        if options.layout == CaseLayout::Fixture {
            let missing = case.missing_fixture_files();
            if !missing.is_empty() {
                writeln!(out, "  missing: {}", missing.join(", "))?;
            }
        }
        writeln!(out, "  annotations:")?;
        let annotations = scan_case_annotations(&case.dir, scanner);
        if annotations.is_empty() {
            writeln!(out, "    {NONE_PLACEHOLDER}")?;
        }
        for annotation in &annotations {
            writeln!(out, "    {}:{}: {}", annotation.file, annotation.line, annotation.text)?;
        }
    }
    out.flush()?;

    Ok(found.cases.len())
}

// ============================================================================
// Console reporter
// ============================================================================

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const CYAN: &str = "\x1b[96m";
const YELLOW: &str = "\x1b[93m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const TABLE_RULE: &str = "|----------------+----------------+----------------+----------------|";

/// Human-readable `check` output.
///
/// - verbosity 0: one `.`/`F` per case
/// - verbosity 1: results table
/// - verbosity 2: results table plus expected/found panes for failing cases
pub struct ConsoleReporter<W: Write> {
    out: W,
    verbosity: u8,
    color: bool,
    /// Print the results table regardless of verbosity
    table: bool,
    width: usize,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            verbosity: 0,
            color: false,
            table: false,
            width: 1,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_table(mut self, table: bool) -> Self {
        self.table = table;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn shows_table(&self) -> bool {
        self.table || self.verbosity >= 1
    }

    fn write_panes(&mut self, expected: &str, found: &str) -> io::Result<()> {
        let block = panes::render(expected.trim_end(), found.trim_end(), &Palette::new(self.color));
        write!(self.out, "{block}")
    }

    fn write_failure_details(&mut self, report: &CaseReport) -> io::Result<()> {
        let outcome = &report.outcome;

        if let Some(error) = &report.launch_error {
            let line = self.paint(RED, error);
            writeln!(self.out, "{line}")?;
            return Ok(());
        }
        if outcome.timed_out() {
            let line = self.paint(RED, &format!("Testcase '{}' timed out", report.name));
            writeln!(self.out, "{line}")?;
            return Ok(());
        }

        if outcome.mismatches.iter().any(|m| m.is_board()) {
            let line = self.paint(RED, "output board does not match");
            writeln!(self.out, "{line}")?;
            let expected = report.expected.board.as_deref().unwrap_or_default();
            let found = report.produced_board.as_deref().unwrap_or_default();
            self.write_panes(expected, found)?;
        }

        if outcome.mismatches.contains(&Mismatch::Stderr) || outcome.program_error() {
            let line = self.paint(RED, "stderr does not match");
            writeln!(self.out, "{line}")?;
            match &report.expected.stderr {
                Some(expected) => self.write_panes(expected, &report.output.stderr)?,
                None if outcome.program_error() => {
                    writeln!(self.out, "{}", traceback_excerpt(&report.output.stderr))?;
                }
                None => self.write_panes("", &report.output.stderr)?,
            }
        }

        if outcome.mismatches.contains(&Mismatch::Stdout) {
            let line = self.paint(RED, "stdout does not match");
            writeln!(self.out, "{line}")?;
            match &report.expected.stdout {
                Some(expected) => self.write_panes(expected, &report.output.stdout)?,
                None => writeln!(self.out, "{}", report.output.stdout)?,
            }
        }
        Ok(())
    }
}

/// First line and last four lines of a crash's stderr.
fn traceback_excerpt(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().split('\n').collect();
    let tail_start = lines.len().saturating_sub(4).max(1);
    let mut excerpt = vec![lines[0]];
    excerpt.extend(lines.iter().skip(tail_start));
    excerpt.join("\n")
}

/// `text ` padded with dashes to `width` characters.
fn dash_pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{text}{}", "-".repeat(width.saturating_sub(len)))
}

impl<W: Write> CaseReporter for ConsoleReporter<W> {
    fn on_discovery(&mut self, discovery: &Discovery) -> io::Result<()> {
        if self.verbosity >= 1 {
            for path in &discovery.missing {
                let line = self.paint(YELLOW, &format!("Folder {} does not exist!", path.display()));
                writeln!(self.out, " -: {line}")?;
            }
        }
        for path in &discovery.not_directories {
            let line = self.paint(YELLOW, &format!("Path '{}' is not a folder!", path.display()));
            writeln!(self.out, "{line}")?;
        }
        if self.verbosity >= 1 && !discovery.is_empty() {
            let line = self.paint(CYAN, &format!("Found {} testcases.", discovery.cases.len()));
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn on_invalid_case(&mut self, case: &TestCase, missing: &[&'static str]) -> io::Result<()> {
        let padding = dash_pad("", 50usize.saturating_sub(case.name.chars().count() + 6));
        let name = self.paint(RED, &case.name);
        writeln!(
            self.out,
            "  -: {name} {padding}| Testcase not valid (missing {})",
            missing.join(", ")
        )
    }

    fn on_collection_complete(&mut self, valid: usize, invalid: usize) -> io::Result<()> {
        if self.verbosity >= 1 && invalid > 0 {
            let line = self.paint(YELLOW, &format!("Found {invalid} invalid testcases"));
            writeln!(self.out, "{line}")?;
        }
        let line = self.paint(CYAN, &format!("Running {valid} testcases..."));
        writeln!(self.out, "{line}")?;
        writeln!(self.out)?;

        self.width = valid.to_string().len().max(2);
        if self.shows_table() {
            let index_width = self.width * 2 + 1;
            writeln!(self.out, " {:^index_width$} | RESULT | REASON     | TIME  | NAME", "TEST")?;
            writeln!(
                self.out,
                "{}+--------+------------+-------+{}",
                "-".repeat(index_width + 2),
                "-".repeat(32)
            )?;
        }
        Ok(())
    }

    fn on_case_complete(&mut self, index: usize, total: usize, report: &CaseReport) -> io::Result<()> {
        let passed = report.outcome.passed();

        if self.shows_table() {
            let status = if passed {
                self.paint(&format!("{BOLD}{GREEN}"), "PASS  ")
            } else {
                self.paint(&format!("{BOLD}{RED}"), "FAIL  ")
            };
            let name = self.paint(CYAN, &report.name);
            writeln!(
                self.out,
                " {index:>width$}/{total:<width$} | {status} | {reason:<10} | {secs:.2}s | {name}",
                width = self.width,
                reason = report.outcome.reason(),
                secs = report.outcome.duration.as_secs_f64(),
            )?;
        } else {
            let mark = if passed { self.paint(GREEN, ".") } else { self.paint(RED, "F") };
            write!(self.out, "{mark}")?;
            self.out.flush()?;
        }

        if !passed && self.verbosity >= 2 {
            self.write_failure_details(report)?;
        }
        Ok(())
    }

    fn on_run_complete(&mut self, summary: &RunSummary) -> io::Result<()> {
        if !self.shows_table() {
            writeln!(self.out)?;
        }
        writeln!(self.out)?;
        let time = self.paint(CYAN, "TIME   ");
        writeln!(self.out, "{time}| {:.3}s", summary.duration.as_secs_f64())?;
        let passed = self.paint(GREEN, "PASSED ");
        writeln!(self.out, "{passed}| {}", summary.passed)?;
        let failed = self.paint(RED, "FAILED ");
        writeln!(self.out, "{failed}| {}", summary.failed)?;
        if summary.invalid > 0 {
            let invalid = self.paint(YELLOW, "INVALID");
            writeln!(self.out, "{invalid}| {}", summary.invalid)?;
        }
        writeln!(self.out)?;

        if summary.has_errors() {
            let labels = ["Board errors", "Stderr errors", "Stdout errors", "Program errors"]
                .map(|label| self.paint(YELLOW, &format!("{label:<14}")));
            let counts = [
                summary.board_errors,
                summary.stderr_errors,
                summary.stdout_errors,
                summary.program_errors,
            ]
            .map(|count| {
                let code = if count == 0 { GREEN } else { RED };
                self.paint(code, &format!("{count:^14}"))
            });
            writeln!(self.out, "{TABLE_RULE}")?;
            writeln!(self.out, "| {} |", labels.join(" | "))?;
            writeln!(self.out, "{TABLE_RULE}")?;
            writeln!(self.out, "| {} |", counts.join(" | "))?;
            writeln!(self.out, "{TABLE_RULE}")?;
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

// ============================================================================
// JSON reporter
// ============================================================================

/// One JSON object per line: invalid cases, case results, then a summary.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> CaseReporter for JsonReporter<W> {
    fn on_discovery(&mut self, discovery: &Discovery) -> io::Result<()> {
        for path in &discovery.not_directories {
            let event = json!({ "type": "not_a_folder", "path": path.display().to_string() });
            writeln!(self.out, "{event}")?;
        }
        Ok(())
    }

    fn on_invalid_case(&mut self, case: &TestCase, missing: &[&'static str]) -> io::Result<()> {
        let event = json!({
            "type": "invalid",
            "name": case.name,
            "dir": case.dir.display().to_string(),
            "missing": missing,
        });
        writeln!(self.out, "{event}")
    }

    fn on_collection_complete(&mut self, _valid: usize, _invalid: usize) -> io::Result<()> {
        Ok(())
    }

    fn on_case_complete(&mut self, index: usize, total: usize, report: &CaseReport) -> io::Result<()> {
        let outcome = &report.outcome;
        let mismatches: Vec<&str> = outcome.mismatches.iter().map(|m| m.as_str()).collect();
        let event = json!({
            "type": "case",
            "index": index,
            "total": total,
            "name": report.name,
            "dir": report.dir.display().to_string(),
            "passed": outcome.passed(),
            "reason": outcome.reason(),
            "mismatches": mismatches,
            "exit_code": outcome.exit_code,
            "timed_out": outcome.timed_out(),
            "launch_error": report.launch_error,
            "duration_secs": outcome.duration.as_secs_f64(),
        });
        writeln!(self.out, "{event}")
    }

    fn on_run_complete(&mut self, summary: &RunSummary) -> io::Result<()> {
        let event = json!({
            "type": "summary",
            "version": CASEBOOK_VERSION,
            "total": summary.total,
            "passed": summary.passed,
            "failed": summary.failed,
            "invalid": summary.invalid,
            "duration_secs": summary.duration.as_secs_f64(),
            "board_errors": summary.board_errors,
            "stderr_errors": summary.stderr_errors,
            "stdout_errors": summary.stdout_errors,
            "program_errors": summary.program_errors,
        });
        writeln!(self.out, "{event}")?;
        self.out.flush()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(0),
            timed_out: false,
            duration: Duration::from_millis(20),
        }
    }

    fn expectations(stdout: &str, stderr: Option<&str>, board: Option<&str>) -> CaseExpectations {
        CaseExpectations {
            stdout: Some(stdout.to_string()),
            stderr: stderr.map(str::to_string),
            board: board.map(str::to_string),
        }
    }

    #[test]
    fn test_evaluate_positive_case_passes() {
        let expected = expectations("", None, Some("board\n"));
        assert!(evaluate(&expected, &output("", ""), Some("board\n")).is_empty());
    }

    #[test]
    fn test_unreadable_produced_board_counts_as_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let board = tmp.path().join("output_board.tmp");
        assert_eq!(read_produced_board(&board), None);

        // a folder in place of the board file cannot be read as one
        fs::create_dir(&board).unwrap();
        assert_eq!(read_produced_board(&board), None);

        fs::remove_dir(&board).unwrap();
        fs::write(&board, "rnbqkbnr\n").unwrap();
        assert_eq!(read_produced_board(&board).as_deref(), Some("rnbqkbnr\n"));
    }

    #[test]
    fn test_evaluate_missing_board_is_board_mismatch() {
        let expected = expectations("", None, Some("board\n"));
        assert_eq!(evaluate(&expected, &output("", ""), None), vec![Mismatch::Board]);
    }

    #[test]
    fn test_evaluate_negative_case() {
        let expected = expectations("", Some("ERROR: illegal move at e2-e5\n"), None);
        assert!(evaluate(&expected, &output("", "ERROR: illegal move at e2-e5"), None).is_empty());
        assert_eq!(
            evaluate(&expected, &output("", "ERROR: illegal board at a1"), None),
            vec![Mismatch::Stderr]
        );
    }

    #[test]
    fn test_evaluate_unexpected_stderr() {
        let expected = expectations("", None, None);
        assert_eq!(evaluate(&expected, &output("", "Traceback"), None), vec![Mismatch::Stderr]);
    }

    #[test]
    fn test_evaluate_timeout_only() {
        let expected = expectations("INFO: check", None, Some("board"));
        let mut timed_out = output("", "");
        timed_out.timed_out = true;
        assert_eq!(evaluate(&expected, &timed_out, None), vec![Mismatch::Timeout]);
    }

    #[test]
    fn test_outcome_reason() {
        let outcome = CaseOutcome {
            exit_code: Some(1),
            mismatches: Vec::new(),
            duration: Duration::ZERO,
        };
        assert!(!outcome.passed());
        assert_eq!(outcome.reason(), "program");

        let outcome = CaseOutcome {
            exit_code: Some(0),
            mismatches: vec![Mismatch::Stdout, Mismatch::Status],
            duration: Duration::ZERO,
        };
        assert_eq!(outcome.reason(), "various");
    }

    #[test]
    fn test_summary_counts_error_kinds() {
        let mut summary = RunSummary::default();
        summary.record(&CaseOutcome {
            exit_code: Some(0),
            mismatches: Vec::new(),
            duration: Duration::from_millis(10),
        });
        summary.record(&CaseOutcome {
            exit_code: Some(0),
            mismatches: vec![Mismatch::Status, Mismatch::Stdout],
            duration: Duration::from_millis(10),
        });
        summary.record(&CaseOutcome {
            exit_code: Some(1),
            mismatches: vec![Mismatch::Timeout],
            duration: Duration::from_millis(10),
        });

        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.board_errors, 1);
        assert_eq!(summary.stdout_errors, 1);
        assert_eq!(summary.stderr_errors, 0);
        assert_eq!(summary.program_errors, 1);
        assert_eq!(summary.duration, Duration::from_millis(30));
        assert!(summary.has_errors());
    }

    #[test]
    fn test_report_entry_with_output_and_annotation() {
        let annotations = vec![Annotation {
            file: "castle.game".to_string(),
            line: 3,
            text: "expected error: illegal castling".to_string(),
        }];
        let entry = render_report_entry(1, "castle", "ERROR: illegal castling at e1\n", &annotations);
        assert_eq!(
            entry,
            "#1 castle\n  Output:\n    ERROR: illegal castling at e1\n  Expected:\n    expected error: illegal castling\n"
        );
    }

    #[test]
    fn test_report_entry_none_placeholders() {
        let entry = render_report_entry(7, "quiet", "  \n", &[]);
        assert_eq!(entry, "#7 quiet\n  Output:\n    <NONE>\n  Expected:\n    <NONE>\n");
    }

    #[test]
    fn test_traceback_excerpt() {
        let stderr = "Traceback (most recent call last):\n  a\n  b\n  c\n  d\n  e\nValueError: x\n";
        assert_eq!(traceback_excerpt(stderr), "Traceback (most recent call last):\n  c\n  d\n  e\nValueError: x");
        assert_eq!(traceback_excerpt("boom"), "boom");
    }

    #[test]
    fn test_dash_pad() {
        assert_eq!(dash_pad("ab", 5), "ab---");
        assert_eq!(dash_pad("abcdef", 3), "abcdef");
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let scratch = ScratchDir::create().unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_produced_output_path_joins_working_dir() {
        let paths = CasePaths {
            board: PathBuf::from("initial.board"),
            output: PathBuf::from("out.tmp"),
            game: PathBuf::from("moves.game"),
            working_dir: Some(PathBuf::from("cases/c1")),
        };
        assert_eq!(produced_output_path(&paths), PathBuf::from("cases/c1/out.tmp"));
    }
}
