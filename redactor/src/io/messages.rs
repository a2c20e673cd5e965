//! Conversation transcript stored as a JSON array (`.redactor/messages.json`).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::document_store::write_atomic;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// What a transcript entry records. Unrecognized kinds load as `Unknown`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    UserInput,
    AgentToolCall,
    AgentToolResult,
    AgentThinking,
    FinalResponse,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    #[serde(rename = "message_type")]
    pub kind: MessageKind,
    pub content: String,
    /// Placeholder shown while the reply is still being produced.
    #[serde(default)]
    pub is_loading: bool,
    pub created_at: String,
}

/// File-backed message log. Each mutation rewrites the file atomically.
#[derive(Debug, Clone)]
pub struct MessageLog {
    path: PathBuf,
}

impl MessageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Message>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn append(
        &self,
        role: Role,
        kind: MessageKind,
        content: impl Into<String>,
        is_loading: bool,
    ) -> Result<Message, StoreError> {
        let mut messages = self.load()?;
        let id = messages.iter().map(|m| m.id).max().map_or(1, |max| max + 1);
        let message = Message {
            id,
            role,
            kind,
            content: content.into(),
            is_loading,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        debug!(id, kind = ?kind, "appending message");
        messages.push(message.clone());
        self.write(&messages)?;
        Ok(message)
    }

    /// Replace the content and kind of message `id` and clear its loading flag.
    ///
    /// Returns `None` when no message has that id.
    pub fn finalize(
        &self,
        id: u64,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Result<Option<Message>, StoreError> {
        let mut messages = self.load()?;
        let Some(message) = messages.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        message.kind = kind;
        message.content = content.into();
        message.is_loading = false;
        let updated = message.clone();
        self.write(&messages)?;
        Ok(Some(updated))
    }

    fn write(&self, messages: &[Message]) -> Result<(), StoreError> {
        let mut buf = serde_json::to_string_pretty(messages)?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }
}
