#![forbid(unsafe_code)]
//! casebook: folder-based test harness for an external chess move validator
//!
//! Every subfolder of the supplied roots is a test case. The harness runs the validator once per case
//! and either prints its output next to the expected-error annotations found in the case files
//! (`report`) or compares it against expected output files (`check`). The validator itself is an
//! external program; nothing here interprets boards or games.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents a harness bug (logic error), use `.expect("INVARIANT: reason")` with a
//!   clear explanation.

pub mod cli;
pub mod config;
pub mod version;

pub use cli::case_interfaces::{HarnessError, Invocation, ProcessOutput, ValidatorExecutor};
pub use config::{HarnessConfig, RunOptions, ValidatorCommand};
