//! Self-correcting report editor.
//!
//! The redactor keeps a structured report in line with a fixed editorial
//! methodology (introduction first, conclusion last). Every request runs a
//! bounded Assess -> Plan -> Act loop that repairs the structure before it
//! adds user content, and stops once the planner has nothing left to do.
//!
//! - **[`core`]**: Pure, deterministic logic (policy checks, planning, edits).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (document and session files,
//!   iteration and message logs, the research backend).
//!
//! Orchestration modules ([`step`], [`looping`], [`conversation`]) coordinate
//! core logic with I/O for the CLI and the HTTP server.

pub mod conversation;
pub mod core;
pub mod document;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
