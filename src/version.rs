//! casebook version information.
//!
//! Exposed as a single constant so the CLI and the JSON reporter agree on the same value.

/// The casebook version string (for example, `0.1.0`).
pub const CASEBOOK_VERSION: &str = env!("CARGO_PKG_VERSION");
