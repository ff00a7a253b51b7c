//! Golden snapshot tests for rendered reports
//!
//! These tests run the check and report loops against scratch case trees with a scripted validator and
//! compare the rendered output against inline snapshots. Colour is off and durations are fixed, so the
//! output is deterministic.
//!
//! Run with: `cargo test --test report_snapshot_tests`
//! Review changes: `cargo insta review`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use casebook::cli::case_interfaces::{HarnessError, Invocation, ProcessOutput, ValidatorExecutor};
use casebook::cli::case_runner::{ConsoleReporter, run_check, run_report};
use casebook::cli::discovery::FsDiscovery;
use casebook::config::{RunOptions, ValidatorCommand};
use casebook_core::{AnnotationScanner, CaseLayout};
use tempfile::TempDir;

const EXPECTED_BOARD: &str = "rnbqkbnr\npppppppp\n........\n........\n....P...\n........\nPPPP.PPP\nRNBQKBNR\nb 3 3 + + + + e3 0\n";
const WRONG_BOARD: &str = "rnbqkbnr\npppppppp\n........\n........\n........\n....P...\nPPPP.PPP\nRNBQKBNR\nb 3 3 + + + + - 0\n";

/// Validator stand-in: replies per case folder name and optionally writes the output board.
struct ScriptedValidator {
    duration: Duration,
}

impl ValidatorExecutor for ScriptedValidator {
    fn execute(&self, invocation: &Invocation, _timeout: Duration) -> Result<ProcessOutput, HarnessError> {
        // fixture cases run inside their folder; named cases pass `<name>.board` first
        let case = match &invocation.working_dir {
            Some(dir) => dir.file_name().unwrap().to_string_lossy().into_owned(),
            None => PathBuf::from(&invocation.args[0]).file_stem().unwrap().to_string_lossy().into_owned(),
        };

        let stderr = match case.as_str() {
            "a_pass" => "ERROR: illegal move at e2-e5\n",
            "b_fail" => "ERROR: illegal board at a1\n",
            "castle" => "ERROR: illegal castling at e1-g1\n",
            _ => "",
        };
        if case == "pawn_push" {
            let dir = invocation.working_dir.as_ref().unwrap();
            fs::write(dir.join(PathBuf::from(&invocation.args[1])), WRONG_BOARD).unwrap();
        }

        Ok(ProcessOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code: Some(0),
            timed_out: false,
            duration: self.duration,
        })
    }
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn negative_case(root: &Path, name: &str, stderr: &str) {
    let dir = root.join(name);
    write(&dir.join("initial.board"), "rnbqkbnr\n");
    write(&dir.join("moves.game"), "e2-e5\n");
    write(&dir.join("stdout.output"), "");
    write(&dir.join("stderr.output"), stderr);
}

fn check_output(root: &Path, verbosity: u8, duration: Duration) -> String {
    let discovery = FsDiscovery::new("output_v2");
    let executor = ScriptedValidator { duration };
    let command = ValidatorCommand {
        program: "validator".to_string(),
        args: Vec::new(),
    };
    let options = RunOptions::new().with_layout(CaseLayout::Fixture);
    let mut reporter = ConsoleReporter::new(Vec::new()).with_verbosity(verbosity);
    run_check(&[root.to_path_buf()], &discovery, &executor, &command, &options, &mut reporter).unwrap();
    String::from_utf8(reporter.into_inner()).unwrap()
}

#[test]
fn test_check_verbose_stderr_mismatch() {
    let tmp = TempDir::new().unwrap();
    negative_case(tmp.path(), "a_pass", "ERROR: illegal move at e2-e5\n");
    negative_case(tmp.path(), "b_fail", "ERROR: illegal move at e2-e5\n");

    let text = check_output(tmp.path(), 2, Duration::from_millis(10));
    insta::assert_snapshot!(text.trim_end(), @r"
Found 2 testcases.
Running 2 testcases...

 TEST  | RESULT | REASON     | TIME  | NAME
-------+--------+------------+-------+--------------------------------
  1/2  | PASS   | passed     | 0.01s | a_pass
  2/2  | FAIL   | stderr     | 0.01s | b_fail
stderr does not match
|------------ Expected ------------||------------- Found --------------|
| ERROR: illegal move at e2-e5     >> ERROR: illegal board at a1       |
|------------ Expected ------------||------------- Found --------------|


TIME   | 0.020s
PASSED | 1
FAILED | 1

|----------------+----------------+----------------+----------------|
| Board errors   | Stderr errors  | Stdout errors  | Program errors |
|----------------+----------------+----------------+----------------|
|       0        |       1        |       0        |       0        |
|----------------+----------------+----------------+----------------|
");
}

#[test]
fn test_check_quiet_progress() {
    let tmp = TempDir::new().unwrap();
    negative_case(tmp.path(), "a_pass", "ERROR: illegal move at e2-e5\n");
    negative_case(tmp.path(), "b_fail", "ERROR: illegal move at e2-e5\n");

    let text = check_output(tmp.path(), 0, Duration::from_millis(10));
    insta::assert_snapshot!(text.trim_end(), @r"
Running 2 testcases...

.F

TIME   | 0.020s
PASSED | 1
FAILED | 1

|----------------+----------------+----------------+----------------|
| Board errors   | Stderr errors  | Stdout errors  | Program errors |
|----------------+----------------+----------------+----------------|
|       0        |       1        |       0        |       0        |
|----------------+----------------+----------------+----------------|
");
}

#[test]
fn test_check_board_panes() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("pawn_push");
    write(&dir.join("initial.board"), "rnbqkbnr\n");
    write(&dir.join("moves.game"), "e2-e4\n");
    write(&dir.join("stdout.output"), "");
    write(&dir.join("output.board"), EXPECTED_BOARD);

    let text = check_output(tmp.path(), 2, Duration::from_millis(250));
    insta::assert_snapshot!(text.trim_end(), @r"
Found 1 testcases.
Running 1 testcases...

 TEST  | RESULT | REASON     | TIME  | NAME
-------+--------+------------+-------+--------------------------------
  1/1  | FAIL   | board      | 0.25s | pawn_push
output board does not match
|------------ Expected ------------||------------- Found --------------|
| rnbqkbnr                         || rnbqkbnr                         |
| pppppppp                         || pppppppp                         |
| ........                         || ........                         |
| ........                         || ........                         |
| ....P...                         >> ........                         |
| ........                         >> ....P...                         |
| PPPP.PPP                         || PPPP.PPP                         |
| RNBQKBNR                         || RNBQKBNR                         |
| b 3 3 + + + + e3 0               >> b 3 3 + + + + - 0                |
|------------ Expected ------------||------------- Found --------------|


TIME   | 0.250s
PASSED | 0
FAILED | 1

|----------------+----------------+----------------+----------------|
| Board errors   | Stderr errors  | Stdout errors  | Program errors |
|----------------+----------------+----------------+----------------|
|       1        |       0        |       0        |       0        |
|----------------+----------------+----------------+----------------|
");
}

#[test]
fn test_report_entries() {
    let tmp = TempDir::new().unwrap();
    let castle = tmp.path().join("castle");
    write(&castle.join("castle.board"), "% board with an error marker\nr...k..r\n");
    write(&castle.join("castle.game"), "e1-g1\n  %  Expected error: illegal castling\n");
    let quiet = tmp.path().join("quiet");
    write(&quiet.join("quiet.board"), "rnbqkbnr\n");
    write(&quiet.join("quiet.game"), "% just a comment\n");

    let discovery = FsDiscovery::new("output_v2");
    let executor = ScriptedValidator {
        duration: Duration::ZERO,
    };
    let command = ValidatorCommand {
        program: "validator".to_string(),
        args: Vec::new(),
    };
    let mut out = Vec::new();
    run_report(
        &[tmp.path().to_path_buf()],
        &discovery,
        &executor,
        &command,
        &AnnotationScanner::default(),
        &RunOptions::new(),
        &mut out,
    )
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    insta::assert_snapshot!(text.trim_end(), @r"
#1 castle
  Output:
    ERROR: illegal castling at e1-g1
  Expected:
    board with an error marker
    Expected error: illegal castling
#2 quiet
  Output:
    <NONE>
  Expected:
    <NONE>
");
}
