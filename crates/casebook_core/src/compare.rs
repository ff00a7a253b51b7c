//! Rules for deciding whether captured validator output matches a fixture case.

/// Number of leading lines of a board dump that are board rows (compared exactly).
/// Lines after these are status lines and are compared with surrounding whitespace trimmed.
pub const BOARD_ROWS: usize = 8;

/// A way in which a checked case diverged from its expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mismatch {
    Timeout,
    Stdout,
    Stderr,
    Board,
    Status,
}

impl Mismatch {
    pub fn as_str(self) -> &'static str {
        match self {
            Mismatch::Timeout => "timeout",
            Mismatch::Stdout => "stdout",
            Mismatch::Stderr => "stderr",
            Mismatch::Board => "board",
            Mismatch::Status => "status",
        }
    }

    /// Whether this mismatch is about the output board file.
    pub fn is_board(self) -> bool {
        matches!(self, Mismatch::Board | Mismatch::Status)
    }
}

/// Compare a captured stream against its expected file.
///
/// With an expected file, trailing whitespace is ignored on both sides. Without one, the stream must
/// be empty.
pub fn streams_match(expected: Option<&str>, actual: &str) -> bool {
    match expected {
        Some(expected) => expected.trim_end() == actual.trim_end(),
        None => actual.is_empty(),
    }
}

/// Compare a produced board dump against the expected one.
///
/// Board rows must be identical; later lines may differ in surrounding whitespace. A line present on one
/// side only is compared against an empty line.
pub fn compare_board(expected: &str, actual: &str) -> Option<Mismatch> {
    let expected: Vec<&str> = expected.lines().collect();
    let actual: Vec<&str> = actual.lines().collect();

    for k in 0..expected.len().max(actual.len()) {
        let e = expected.get(k).copied().unwrap_or("");
        let a = actual.get(k).copied().unwrap_or("");
        if k < BOARD_ROWS {
            if e != a {
                return Some(Mismatch::Board);
            }
        } else if e.trim() != a.trim() {
            return Some(Mismatch::Status);
        }
    }
    None
}

/// Short reason shown in the results table: `passed`, the single mismatch, or `various`.
pub fn reason_label(mismatches: &[Mismatch]) -> &'static str {
    match mismatches {
        [] => "passed",
        [only] => only.as_str(),
        _ => "various",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr\npppppppp\n........\n........\n........\n........\nPPPPPPPP\nRNBQKBNR\nw 3 3 + + + + - 0\n";

    #[test]
    fn test_streams_ignore_trailing_whitespace() {
        assert!(streams_match(Some("INFO: check\n"), "INFO: check"));
        assert!(streams_match(Some("INFO: check"), "INFO: check\n\n  "));
    }

    #[test]
    fn test_streams_leading_whitespace_matters() {
        assert!(!streams_match(Some("INFO: check"), " INFO: check"));
    }

    #[test]
    fn test_streams_without_expectation_must_be_empty() {
        assert!(streams_match(None, ""));
        assert!(!streams_match(None, "ERROR: illegal move at e2-e5"));
    }

    #[test]
    fn test_identical_boards_match() {
        assert_eq!(compare_board(START, START), None);
    }

    #[test]
    fn test_board_row_difference() {
        let moved = START.replacen("PPPPPPPP", "PPPP.PPP", 1);
        assert_eq!(compare_board(START, &moved), Some(Mismatch::Board));
    }

    #[test]
    fn test_board_row_whitespace_matters() {
        let padded = START.replacen("RNBQKBNR", "RNBQKBNR ", 1);
        assert_eq!(compare_board(START, &padded), Some(Mismatch::Board));
    }

    #[test]
    fn test_status_line_difference() {
        let status = START.replacen("w 3 3", "b 3 3", 1);
        assert_eq!(compare_board(START, &status), Some(Mismatch::Status));
    }

    #[test]
    fn test_status_line_whitespace_ignored() {
        let status = START.replacen("w 3 3 + + + + - 0", "  w 3 3 + + + + - 0  ", 1);
        assert_eq!(compare_board(START, &status), None);
    }

    #[test]
    fn test_empty_output_is_a_board_mismatch() {
        assert_eq!(compare_board(START, ""), Some(Mismatch::Board));
    }

    #[test]
    fn test_missing_status_line() {
        let truncated: String = START.lines().take(8).map(|l| format!("{l}\n")).collect();
        assert_eq!(compare_board(START, &truncated), Some(Mismatch::Status));
    }

    #[test]
    fn test_reason_label() {
        assert_eq!(reason_label(&[]), "passed");
        assert_eq!(reason_label(&[Mismatch::Stderr]), "stderr");
        assert_eq!(reason_label(&[Mismatch::Stderr, Mismatch::Board]), "various");
    }

    #[test]
    fn test_board_kinds() {
        assert!(Mismatch::Board.is_board());
        assert!(Mismatch::Status.is_board());
        assert!(!Mismatch::Stdout.is_board());
        assert!(!Mismatch::Timeout.is_board());
    }
}
