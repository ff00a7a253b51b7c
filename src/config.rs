//! Harness configuration
//!
//! Config file search order:
//! 1. Path given with `--config` (must load, or the run fails)
//! 2. Path in the `CASEBOOK_CONFIG` environment variable
//! 3. `./casebook.toml` (current directory)
//!
//! Files found by searching that fail to parse are logged and ignored. Command-line flags override file
//! values.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use casebook_core::annotations::{DEFAULT_KEYWORD, DEFAULT_MARKER};
use casebook_core::layout::DEFAULT_OUTPUT_DIR;
use casebook_core::{AnnotationScanner, CaseLayout};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cli::LayoutArg;
use crate::cli::case_interfaces::HarnessError;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "CASEBOOK_CONFIG";

/// Config file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "casebook.toml";

/// Seconds a validator may run before it is killed.
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Contents of `casebook.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// External validator to invoke per case
    pub validator: ValidatorConfig,
    /// Case layout (`named` or `fixture`); each command has its own default when unset
    pub layout: Option<LayoutArg>,
    /// Folder under the output root that receives named-layout output files; a single name
    pub output_dir: String,
    /// Colour output for `check`
    pub color: bool,
    pub annotations: AnnotationConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            validator: ValidatorConfig::default(),
            layout: None,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            color: true,
            annotations: AnnotationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Program to run (e.g. `python3`)
    pub program: Option<String>,
    /// Arguments placed before the three case arguments (e.g. `["obstacleChess.py"]`)
    pub args: Vec<String>,
    pub timeout_secs: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub marker: char,
    pub keyword: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER,
            keyword: DEFAULT_KEYWORD.to_string(),
        }
    }
}

/// The program (plus leading arguments) invoked for every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HarnessConfig {
    /// Load configuration. An explicit path must exist and parse; otherwise the search paths are tried
    /// and defaults are used when nothing loads.
    pub fn load(explicit: Option<&Path>) -> Result<Self, HarnessError> {
        if let Some(path) = explicit {
            let config = Self::load_from(path)?;
            info!("Loaded config from: {}", path.display());
            return Ok(config);
        }

        for path in Self::config_search_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load_from(&path) {
                Ok(config) => {
                    info!("Loaded config from: {}", path.display());
                    return Ok(config);
                }
                Err(e) => warn!("Ignoring config file {}: {}", path.display(), e),
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a config file.
    pub fn load_from(path: &Path) -> Result<Self, HarnessError> {
        let content = fs::read_to_string(path).map_err(|e| HarnessError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|message| HarnessError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse config file contents.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        timeout_from_secs(config.validator.timeout_secs).map_err(|e| format!("validator.timeout_secs: {e}"))?;
        validate_output_dir(&config.output_dir)?;
        Ok(config)
    }

    fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            paths.push(PathBuf::from(path));
        }
        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Layout from the file, or `fallback` when unset.
    pub fn layout_or(&self, fallback: CaseLayout) -> CaseLayout {
        self.layout.map(CaseLayout::from).unwrap_or(fallback)
    }

    /// Validator timeout; falls back to the default if the field was set to something unusable.
    pub fn timeout(&self) -> Duration {
        timeout_from_secs(self.validator.timeout_secs).unwrap_or_else(|e| {
            warn!("Ignoring validator.timeout_secs: {}", e);
            Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)
        })
    }

    /// Resolve the validator command. A program given on the command line brings only its own
    /// arguments; otherwise the configured program runs with the configured arguments followed by any
    /// command-line arguments.
    pub fn validator_command(&self, program: Option<&str>, args: &[String]) -> Result<ValidatorCommand, HarnessError> {
        match (program, &self.validator.program) {
            (Some(program), _) => Ok(ValidatorCommand {
                program: program.to_string(),
                args: args.to_vec(),
            }),
            (None, Some(program)) => Ok(ValidatorCommand {
                program: program.clone(),
                args: self.validator.args.iter().chain(args).cloned().collect(),
            }),
            (None, None) => Err(HarnessError::NoValidator),
        }
    }

    pub fn annotation_scanner(&self) -> Result<AnnotationScanner, HarnessError> {
        AnnotationScanner::new(self.annotations.marker, &self.annotations.keyword)
            .map_err(|e| HarnessError::AnnotationPattern(e.to_string()))
    }

    /// Run options seeded from this file, for a command whose default layout is `layout`.
    pub fn run_options(&self, layout: CaseLayout) -> RunOptions {
        RunOptions::new()
            .with_layout(self.layout_or(layout))
            .with_output_dir(&self.output_dir)
            .with_timeout(self.timeout())
    }
}

/// Seconds to a validator timeout. Must be positive and fit in a `Duration`.
pub fn timeout_from_secs(secs: f64) -> Result<Duration, String> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got {secs}"));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| format!("timeout of {secs} seconds is too large"))
}

/// The output folder is skipped by name during discovery, so it has to be one plain folder name.
fn validate_output_dir(dir: &str) -> Result<(), String> {
    let mut components = Path::new(dir).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(format!("output_dir must be a single folder name, got `{dir}`")),
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub layout: CaseLayout,
    /// Root for named-layout output files (`None` = the root each case was found under)
    pub output_root: Option<PathBuf>,
    pub output_dir: String,
    pub timeout: Duration,
    pub stop_on_fail: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            layout: CaseLayout::Named,
            output_root: None,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            stop_on_fail: false,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: CaseLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_output_root(mut self, root: Option<PathBuf>) -> Self {
        self.output_root = root;
        self
    }

    pub fn with_output_dir(mut self, dir: &str) -> Self {
        self.output_dir = dir.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stop_on_fail(mut self, stop: bool) -> Self {
        self.stop_on_fail = stop;
        self
    }
}
