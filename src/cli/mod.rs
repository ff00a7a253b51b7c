//! CLI module for the casebook harness
//!
//! This module provides the command-line interface.
//!
//! ## Commands
//!
//! - `report <folders>` - Run the validator on every case and print output next to annotations
//! - `check <folders>` - Run fixture cases and compare against expected output files
//! - `list <folders>` - Show discovered cases and their resolved paths
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `case_interfaces` - Discovery/execution traits and the harness error type
//! - `discovery` - Case folder discovery and annotation scanning
//! - `case_runner` - Report/check/list loops and reporters
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod case_interfaces;
pub mod case_runner;
pub mod commands;
pub mod discovery;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use casebook_core::CaseLayout;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::{HarnessConfig, timeout_from_secs};
use crate::version::CASEBOOK_VERSION;
use case_interfaces::HarnessError;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        CliError::failure(format!("{:?}", miette::Report::new(err)))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Folder-based test harness for an external chess move validator
#[derive(Parser, Debug)]
#[command(name = "casebook")]
#[command(version = CASEBOOK_VERSION)]
#[command(about = "Folder-based test harness for an external chess move validator", long_about = None)]
pub struct Cli {
    /// Config file (default: $CASEBOOK_CONFIG, then ./casebook.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Case folder layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutArg {
    /// `<name>/<name>.board` + `<name>/<name>.game`, output under `output_v2/`
    Named,
    /// `initial.board` + `moves.game` + expected output files
    Fixture,
}

impl From<LayoutArg> for CaseLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Named => CaseLayout::Named,
            LayoutArg::Fixture => CaseLayout::Fixture,
        }
    }
}

/// Output format for `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// How to invoke the validator.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidatorArgs {
    /// Validator program run once per case (overrides the config file)
    #[arg(long, value_name = "PROGRAM")]
    pub validator: Option<String>,

    /// Argument placed before the case arguments (repeatable)
    #[arg(long = "validator-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub validator_args: Vec<String>,

    /// Seconds a validator run may take before it is killed
    #[arg(long, value_name = "SECS", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    timeout_from_secs(secs)
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the validator on every case and show its output next to the expected errors
    Report {
        /// Folders to search for test case subfolders
        #[arg(value_name = "FOLDER")]
        roots: Vec<PathBuf>,
        #[command(flatten)]
        validator: ValidatorArgs,
        /// Root for `output_v2/` (default: the folder each case was found in)
        #[arg(long, value_name = "DIR")]
        output_root: Option<PathBuf>,
        /// Case folder layout (default: named)
        #[arg(long, value_enum)]
        layout: Option<LayoutArg>,
    },

    /// Run fixture cases and compare stdout, stderr and the output board
    Check {
        /// Folders to search for test case subfolders
        #[arg(value_name = "FOLDER")]
        roots: Vec<PathBuf>,
        #[command(flatten)]
        validator: ValidatorArgs,
        /// Verbose output: `-v` for the results table, `-vv` to also show comparisons
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
        /// Disable colour output
        #[arg(long = "no-color", visible_alias = "nocolor")]
        no_color: bool,
        /// Write the results to a file instead of stdout
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
        /// Result format
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
        /// Stop on first failure
        #[arg(short = 'x', long = "exitfirst")]
        stop_on_fail: bool,
        /// Case folder layout (default: fixture)
        #[arg(long, value_enum)]
        layout: Option<LayoutArg>,
        /// Root for `output_v2/` with the named layout
        #[arg(long, value_name = "DIR")]
        output_root: Option<PathBuf>,
    },

    /// List discovered cases, their validator arguments and annotations
    List {
        /// Folders to search for test case subfolders
        #[arg(value_name = "FOLDER")]
        roots: Vec<PathBuf>,
        /// Case folder layout (default: named)
        #[arg(long, value_enum)]
        layout: Option<LayoutArg>,
        /// Root for `output_v2/` (default: the folder each case was found in)
        #[arg(long, value_name = "DIR")]
        output_root: Option<PathBuf>,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = HarnessConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Report {
            roots,
            validator,
            output_root,
            layout,
        } => {
            let options = commands::run_options(&config, CaseLayout::Named, layout, output_root, validator.timeout);
            commands::report(&config, &roots, &validator, &options)
        }
        Command::Check {
            roots,
            validator,
            verbose,
            no_color,
            output,
            format,
            stop_on_fail,
            layout,
            output_root,
        } => {
            let options = commands::run_options(&config, CaseLayout::Fixture, layout, output_root, validator.timeout)
                .with_stop_on_fail(stop_on_fail);
            let display = commands::CheckDisplay {
                verbosity: verbose,
                no_color,
                output,
                format,
            };
            commands::check(&config, &roots, &validator, &options, display)
        }
        Command::List {
            roots,
            layout,
            output_root,
        } => {
            let options = commands::run_options(&config, CaseLayout::Named, layout, output_root, None);
            commands::list(&config, &roots, &options)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
