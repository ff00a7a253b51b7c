//! Expected-error annotation scanning.
//!
//! Test authors leave comment lines such as `% expected error: illegal castling` in the files of a case
//! folder. The harness prints the text after the marker next to what the validator actually produced.
//!
//! A line is an annotation when it starts (after optional indentation) with the marker character and the
//! rest of the line contains the keyword. Keyword matching is case-insensitive.

use regex::Regex;

/// Comment marker used by board and game files.
pub const DEFAULT_MARKER: char = '%';

/// Word an annotation line must contain.
pub const DEFAULT_KEYWORD: &str = "error";

/// One annotation found in a case file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// File name (not the full path) the line came from
    pub file: String,
    /// 1-based line number
    pub line: usize,
    /// Line text with the marker and the whitespace right after it removed
    pub text: String,
}

/// Matches annotation lines for one marker/keyword pair.
#[derive(Debug, Clone)]
pub struct AnnotationScanner {
    pattern: Regex,
}

impl AnnotationScanner {
    /// Build a scanner for `marker` followed by text containing `keyword`.
    pub fn new(marker: char, keyword: &str) -> Result<Self, regex::Error> {
        let marker = marker.to_string();
        let pattern = format!(
            r"(?i)^\s*{}\s*(?P<text>.*{}.*)$",
            regex::escape(&marker),
            regex::escape(keyword)
        );
        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// Return the annotation text if `line` is an annotation.
    pub fn scan_line(&self, line: &str) -> Option<String> {
        let caps = self.pattern.captures(line)?;
        let text = caps.name("text")?.as_str().trim_end();
        Some(text.to_string())
    }

    /// Collect every annotation in `contents`, in line order.
    pub fn scan(&self, file: &str, contents: &str) -> Vec<Annotation> {
        contents
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                self.scan_line(line).map(|text| Annotation {
                    file: file.to_string(),
                    line: idx + 1,
                    text,
                })
            })
            .collect()
    }
}

impl Default for AnnotationScanner {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, DEFAULT_KEYWORD).expect("INVARIANT: default annotation pattern is a valid regex")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_marker_and_following_space() {
        let scanner = AnnotationScanner::default();
        assert_eq!(
            scanner.scan_line("% expected error: illegal castling").as_deref(),
            Some("expected error: illegal castling")
        );
    }

    #[test]
    fn test_marker_without_space() {
        let scanner = AnnotationScanner::default();
        assert_eq!(scanner.scan_line("%error on move 3").as_deref(), Some("error on move 3"));
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let scanner = AnnotationScanner::default();
        assert_eq!(
            scanner.scan_line("% ERROR: illegal board at a8").as_deref(),
            Some("ERROR: illegal board at a8")
        );
    }

    #[test]
    fn test_indented_marker() {
        let scanner = AnnotationScanner::default();
        assert_eq!(scanner.scan_line("   %  errors expected").as_deref(), Some("errors expected"));
    }

    #[test]
    fn test_comment_without_keyword_is_ignored() {
        let scanner = AnnotationScanner::default();
        assert_eq!(scanner.scan_line("% white to move"), None);
    }

    #[test]
    fn test_keyword_without_marker_is_ignored() {
        let scanner = AnnotationScanner::default();
        assert_eq!(scanner.scan_line("expected error: none"), None);
        assert_eq!(scanner.scan_line("e2-e4 % error later"), None);
    }

    #[test]
    fn test_trailing_whitespace_and_crlf() {
        let scanner = AnnotationScanner::default();
        let found = scanner.scan("moves.game", "% expected error: mine  \r\ne2-e4\r\n");
        assert_eq!(
            found,
            vec![Annotation {
                file: "moves.game".to_string(),
                line: 1,
                text: "expected error: mine".to_string(),
            }]
        );
    }

    #[test]
    fn test_scan_reports_line_numbers_in_order() {
        let scanner = AnnotationScanner::default();
        let contents = "rnbqkbnr\n% error one\npppppppp\n% not this\n% Error two\n";
        let found = scanner.scan("initial.board", contents);
        let lines: Vec<(usize, &str)> = found.iter().map(|a| (a.line, a.text.as_str())).collect();
        assert_eq!(lines, vec![(2, "error one"), (5, "Error two")]);
    }

    #[test]
    fn test_custom_marker_is_escaped() {
        let scanner = AnnotationScanner::new('#', "fail").unwrap();
        assert_eq!(scanner.scan_line("# should fail here").as_deref(), Some("should fail here"));
        assert_eq!(scanner.scan_line("% should fail here"), None);

        let dotted = AnnotationScanner::new('.', "error").unwrap();
        assert_eq!(dotted.scan_line("x error"), None);
    }
}
