//! Side-effecting helpers: files, child processes and the research backend.

pub mod config;
pub mod document_store;
pub mod init;
pub mod iteration_log;
pub mod messages;
pub mod process;
pub mod prompt;
pub mod research;
pub mod session_state;
