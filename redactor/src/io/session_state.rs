//! Session state: the pending instruction and iteration bookkeeping.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::document_store::write_atomic;
use crate::core::types::{Action, Instruction};
use crate::error::StoreError;

/// Persisted loop bookkeeping (`.redactor/session.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionState {
    /// User request not yet carried out. Cleared once its edit is persisted.
    pub pending_instruction: Option<Instruction>,
    /// Next iteration number (1-indexed, monotonically increasing).
    pub next_iter: u32,
    pub last_action: Option<Action>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            pending_instruction: None,
            next_iter: 1,
            last_action: None,
        }
    }
}

/// Load session state; a missing file yields the default state.
pub fn load_session_state(path: &Path) -> Result<SessionState, StoreError> {
    debug!(path = %path.display(), "loading session state");
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SessionState::default()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let state: SessionState =
        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(next_iter = state.next_iter, pending = state.pending_instruction.is_some(), "session state loaded");
    Ok(state)
}

/// Atomically write session state to disk (temp file + rename).
pub fn write_session_state(path: &Path, state: &SessionState) -> Result<(), StoreError> {
    debug!(path = %path.display(), next_iter = state.next_iter, "writing session state");
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies write then read preserves every field.
    #[test]
    fn session_state_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("session.json");
        let state = SessionState {
            pending_instruction: Some(Instruction::AddKpi {
                description: "revenue".to_string(),
            }),
            next_iter: 7,
            last_action: Some(Action::NoOp),
        };
        write_session_state(&path, &state).expect("write");
        assert_eq!(load_session_state(&path).expect("load"), state);
    }

    #[test]
    fn missing_file_is_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = load_session_state(&temp.path().join("nope.json")).expect("load");
        assert_eq!(state, SessionState::default());
    }
}
