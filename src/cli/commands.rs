//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use casebook_core::CaseLayout;
use tracing::{debug, info};

use super::case_interfaces::{CaseDiscovery, HarnessError, ProcessExecutor};
use super::case_runner::{CaseReporter, ConsoleReporter, JsonReporter, run_check, run_list, run_report};
use super::discovery::FsDiscovery;
use super::{CliError, CliResult, ExitCode, LayoutArg, OutputFormat, ValidatorArgs};
use crate::config::{HarnessConfig, RunOptions, ValidatorCommand};

/// Display settings for `check`.
#[derive(Debug, Clone, Default)]
pub struct CheckDisplay {
    pub verbosity: u8,
    pub no_color: bool,
    /// Results file; disables colour and always prints the results table
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
}

/// Merge config file values with command-line overrides. `default_layout` applies when neither sets one.
pub fn run_options(
    config: &HarnessConfig,
    default_layout: CaseLayout,
    layout: Option<LayoutArg>,
    output_root: Option<PathBuf>,
    timeout: Option<Duration>,
) -> RunOptions {
    let mut options = config.run_options(default_layout).with_output_root(output_root);
    if let Some(layout) = layout {
        options = options.with_layout(layout.into());
    }
    if let Some(timeout) = timeout {
        options = options.with_timeout(timeout);
    }
    options
}

/// Resolve the validator. An empty case tree is reported before a missing validator.
fn validator_command(
    config: &HarnessConfig,
    args: &ValidatorArgs,
    discovery: &dyn CaseDiscovery,
    roots: &[PathBuf],
) -> Result<ValidatorCommand, HarnessError> {
    config
        .validator_command(args.validator.as_deref(), &args.validator_args)
        .map_err(|e| match e {
            HarnessError::NoValidator if discovery.discover(roots).is_empty() => HarnessError::NoCases,
            e => e,
        })
}

/// `casebook report`
pub fn report(
    config: &HarnessConfig,
    roots: &[PathBuf],
    validator: &ValidatorArgs,
    options: &RunOptions,
) -> CliResult<ExitCode> {
    let discovery = FsDiscovery::new(options.output_dir.clone());
    let command = validator_command(config, validator, &discovery, roots)?;
    let scanner = config.annotation_scanner()?;
    let executor = ProcessExecutor::new()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let count = run_report(roots, &discovery, &executor, &command, &scanner, options, &mut out)?;
    debug!("report finished: {count} cases");

    Ok(ExitCode::SUCCESS)
}

/// `casebook check`
pub fn check(
    config: &HarnessConfig,
    roots: &[PathBuf],
    validator: &ValidatorArgs,
    options: &RunOptions,
    display: CheckDisplay,
) -> CliResult<ExitCode> {
    let discovery = FsDiscovery::new(options.output_dir.clone());
    let command = validator_command(config, validator, &discovery, roots)?;
    let executor = ProcessExecutor::new()?;

    let out: Box<dyn Write> = match &display.output {
        Some(path) => Box::new(BufWriter::new(create_output_file(path)?)),
        None => Box::new(io::stdout()),
    };
    let color = config.color
        && !display.no_color
        && display.output.is_none()
        && display.format == OutputFormat::Human
        && io::stdout().is_terminal();

    let mut reporter: Box<dyn CaseReporter> = match display.format {
        OutputFormat::Human => Box::new(
            ConsoleReporter::new(out)
                .with_verbosity(display.verbosity)
                .with_color(color)
                .with_table(display.output.is_some()),
        ),
        OutputFormat::Json => Box::new(JsonReporter::new(out)),
    };

    let summary = run_check(roots, &discovery, &executor, &command, options, reporter.as_mut())?;
    if let Some(path) = &display.output {
        info!("Results written to {}", path.display());
    }

    if summary.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn create_output_file(path: &Path) -> CliResult<File> {
    File::create(path).map_err(|e| CliError::failure(format!("Error creating output file {}: {}", path.display(), e)))
}

/// `casebook list`
pub fn list(config: &HarnessConfig, roots: &[PathBuf], options: &RunOptions) -> CliResult<ExitCode> {
    let discovery = FsDiscovery::new(options.output_dir.clone());
    let scanner = config.annotation_scanner()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_list(roots, &discovery, &scanner, options, &mut out)?;

    Ok(ExitCode::SUCCESS)
}
