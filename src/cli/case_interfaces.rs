//! Case runner I/O boundary interfaces
//!
//! This module defines trait-based abstractions for the two operations that touch the outside world:
//! - Case discovery (filesystem scan of the supplied roots)
//! - Validator execution (child process invocation + output capture)
//!
//! The runner only talks to these traits, so tests can count and inspect invocations without spawning
//! anything, and a dry run is just a discovery without an executor.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use casebook_core::CasePaths;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use super::discovery::Discovery;
use crate::config::ValidatorCommand;

/// Errors that stop a harness run.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("no files found in the supplied folders")]
    #[diagnostic(
        code(casebook::no_cases),
        help("usage: casebook <report|check|list> <folder> [<folder> ...]\neach folder is searched for test case subfolders")
    )]
    NoCases,

    #[error("no valid testcases found ({invalid} invalid)")]
    #[diagnostic(
        code(casebook::no_valid_cases),
        help("fixture cases need initial.board, moves.game, stdout.output and either output.board or stderr.output")
    )]
    NoValidCases { invalid: usize },

    #[error("no validator configured")]
    #[diagnostic(
        code(casebook::no_validator),
        help("pass --validator <PROGRAM> or set `program` under [validator] in casebook.toml")
    )]
    NoValidator,

    #[error("failed to load config {}: {message}", path.display())]
    #[diagnostic(code(casebook::config))]
    Config { path: PathBuf, message: String },

    #[error("invalid annotation pattern: {0}")]
    #[diagnostic(code(casebook::annotations))]
    AnnotationPattern(String),

    #[error("failed to launch validator `{program}`: {source}")]
    #[diagnostic(code(casebook::spawn))]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    #[diagnostic(code(casebook::io))]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Discovery Interface
// ============================================================================

/// Find test case folders under a list of roots.
pub trait CaseDiscovery {
    fn discover(&self, roots: &[PathBuf]) -> Discovery;
}

// ============================================================================
// Executor Interface
// ============================================================================

/// One validator run: program, full argument list, working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    /// The validator command followed by the case's board, output and game paths.
    pub fn for_case(command: &ValidatorCommand, paths: &CasePaths) -> Self {
        let mut args: Vec<OsString> = command.args.iter().map(OsString::from).collect();
        args.extend(paths.positional_args().iter().map(|p| p.as_os_str().to_os_string()));
        Self {
            program: OsString::from(&command.program),
            args,
            working_dir: paths.working_dir.clone(),
        }
    }

    /// Human-readable command line (for logs).
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a validator run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process timed out or was killed by a signal
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

impl ProcessOutput {
    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !text.is_empty() && !self.stderr.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stderr);
        text
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run a validator invocation and capture its output.
///
/// Implementations must not retry: one call is one run.
pub trait ValidatorExecutor {
    fn execute(&self, invocation: &Invocation, timeout: Duration) -> Result<ProcessOutput, HarnessError>;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Child-process executor on a current-thread tokio runtime.
///
/// The child is killed when the timeout elapses (`kill_on_drop`).
pub struct ProcessExecutor {
    runtime: tokio::runtime::Runtime,
}

impl ProcessExecutor {
    pub fn new() -> Result<Self, HarnessError> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }
}

impl ValidatorExecutor for ProcessExecutor {
    fn execute(&self, invocation: &Invocation, timeout: Duration) -> Result<ProcessOutput, HarnessError> {
        debug!(command = %invocation.display(), "invoking validator");
        let start = Instant::now();

        self.runtime.block_on(async {
            let mut command = tokio::process::Command::new(&invocation.program);
            command
                .args(&invocation.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(dir) = &invocation.working_dir {
                command.current_dir(dir);
            }

            let child = command.spawn().map_err(|source| HarnessError::Spawn {
                program: invocation.program.to_string_lossy().into_owned(),
                source,
            })?;

            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(output) => {
                    let output = output?;
                    Ok(ProcessOutput {
                        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                        exit_code: output.status.code(),
                        timed_out: false,
                        duration: start.elapsed(),
                    })
                }
                Err(_) => {
                    debug!(command = %invocation.display(), "validator timed out after {:?}", timeout);
                    Ok(ProcessOutput {
                        stdout: String::new(),
                        stderr: String::new(),
                        exit_code: None,
                        timed_out: true,
                        duration: start.elapsed(),
                    })
                }
            }
        })
    }
}

/// Whether a case folder contains a regular file called `name`.
pub fn case_has_file(case_dir: &Path, name: &str) -> bool {
    case_dir.join(name).is_file()
}
