//! Provide shared, pure helpers and canonical vocabulary for the casebook harness.
//!
//! This crate is intentionally small and dependency-light. It contains deterministic helpers that the
//! harness uses to decide how a test case folder maps onto validator arguments, which comment lines count
//! as expected-error annotations, and when captured output matches what a case expects.
//!
//! ## Notes
//!
//! - **No IO**: callers read files and run processes; this crate only sees strings and paths.
//! - Board, game and output files are opaque text here. Nothing in this crate interprets chess.

pub mod annotations;
pub mod compare;
pub mod layout;
pub mod panes;

pub use annotations::{Annotation, AnnotationScanner};
pub use compare::Mismatch;
pub use layout::{CaseLayout, CasePaths};

/// Placeholder shown when there is nothing to display (no captured output, no annotation).
pub const NONE_PLACEHOLDER: &str = "<NONE>";

/// Return `text` with trailing whitespace removed, or [`NONE_PLACEHOLDER`] when nothing is left.
pub fn or_none(text: &str) -> &str {
    let trimmed = text.trim_end();
    if trimmed.is_empty() { NONE_PLACEHOLDER } else { trimmed }
}
