//! Case folder layouts and validator argument construction.
//!
//! A case folder is turned into the three positional arguments the validator expects:
//! board file, output file, game file (in that order).
//!
//! - [`CaseLayout::Named`]: files are named after the folder (`<name>.board`, `<name>.game`) and the
//!   output goes to `<outputroot>/output_v2/<name>.txt`.
//! - [`CaseLayout::Fixture`]: fixed file names plus expected-output files, run from inside the folder.

use std::path::{Path, PathBuf};

/// Directory (under the output root) that receives named-layout output files.
pub const DEFAULT_OUTPUT_DIR: &str = "output_v2";

pub const BOARD_EXTENSION: &str = "board";
pub const GAME_EXTENSION: &str = "game";
pub const OUTPUT_EXTENSION: &str = "txt";

pub const FIXTURE_INITIAL_BOARD: &str = "initial.board";
pub const FIXTURE_MOVES: &str = "moves.game";
pub const FIXTURE_STDOUT: &str = "stdout.output";
pub const FIXTURE_OUTPUT_BOARD: &str = "output.board";
pub const FIXTURE_STDERR: &str = "stderr.output";

/// How files are arranged inside a case folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseLayout {
    /// `<name>.board` + `<name>.game`, output under `output_v2/`
    #[default]
    Named,
    /// `initial.board` + `moves.game` + expected output files
    Fixture,
}

impl CaseLayout {
    pub const ALL: [CaseLayout; 2] = [CaseLayout::Named, CaseLayout::Fixture];

    pub fn as_str(self) -> &'static str {
        match self {
            CaseLayout::Named => "named",
            CaseLayout::Fixture => "fixture",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layout| layout.as_str() == s)
    }
}

/// Resolved validator arguments for one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasePaths {
    pub board: PathBuf,
    pub output: PathBuf,
    pub game: PathBuf,
    /// Directory to run the validator in (`None` = the harness's own working directory)
    pub working_dir: Option<PathBuf>,
}

impl CasePaths {
    /// The positional arguments in validator order: board, output, game.
    pub fn positional_args(&self) -> [&Path; 3] {
        [&self.board, &self.output, &self.game]
    }
}

/// Output file for a named-layout case: `<output_root>/<output_dir>/<name>.txt`.
pub fn named_output_path(output_root: &Path, output_dir: &str, name: &str) -> PathBuf {
    output_root.join(output_dir).join(format!("{name}.{OUTPUT_EXTENSION}"))
}

/// Arguments for a named-layout case.
pub fn named_paths(case_dir: &Path, name: &str, output_root: &Path, output_dir: &str) -> CasePaths {
    CasePaths {
        board: case_dir.join(format!("{name}.{BOARD_EXTENSION}")),
        output: named_output_path(output_root, output_dir, name),
        game: case_dir.join(format!("{name}.{GAME_EXTENSION}")),
        working_dir: None,
    }
}

/// Arguments for a fixture-layout case. Board and game are relative to the case folder, which becomes
/// the working directory; the output goes to the run's scratch directory.
pub fn fixture_paths(case_dir: &Path, name: &str, scratch_dir: &Path) -> CasePaths {
    CasePaths {
        board: PathBuf::from(FIXTURE_INITIAL_BOARD),
        output: scratch_dir.join(format!("output_{name}.tmp")),
        game: PathBuf::from(FIXTURE_MOVES),
        working_dir: Some(case_dir.to_path_buf()),
    }
}

/// Files a fixture case is missing. Empty means the case is runnable.
///
/// `has_file` answers whether the case folder contains a file with the given name.
pub fn missing_fixture_files(has_file: impl Fn(&str) -> bool) -> Vec<&'static str> {
    let mut missing: Vec<&'static str> = [FIXTURE_INITIAL_BOARD, FIXTURE_MOVES, FIXTURE_STDOUT]
        .into_iter()
        .filter(|name| !has_file(name))
        .collect();
    if !has_file(FIXTURE_OUTPUT_BOARD) && !has_file(FIXTURE_STDERR) {
        missing.push("output.board or stderr.output");
    }
    missing
}
