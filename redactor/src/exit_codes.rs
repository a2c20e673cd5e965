//! Stable exit codes for redactor CLI commands.

/// Command succeeded; for `check`, the document is compliant.
pub const OK: i32 = 0;
/// Command failed due to invalid input, layout, config or other errors.
pub const INVALID: i32 = 1;
/// `redactor check` found deviations, or a loop stopped with issues left.
pub const NONCOMPLIANT: i32 = 2;
/// The edit loop hit its iteration cap without converging.
pub const UNRESOLVED: i32 = 3;
