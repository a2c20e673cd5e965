//! Deterministic, pure logic shared by the redactor.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! documents and return deterministic outputs suitable for tests.

pub mod edit;
pub mod instruction;
pub mod methodology;
pub mod planner;
pub mod policy;
pub mod types;
