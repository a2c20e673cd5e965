//! Error taxonomy for the edit loop and its collaborators.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::edit::EditError;
use crate::core::types::Deviation;

/// Failure of the document store or another JSON-backed store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{} does not match the document schema: {}", path.display(), messages.join("; "))]
    Schema { path: PathBuf, messages: Vec<String> },
}

/// The research collaborator could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("research on '{topic}' failed: {reason}")]
pub struct ResearchError {
    pub topic: String,
    pub reason: String,
}

impl ResearchError {
    pub fn new(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RedactorError {
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Collaborator(#[from] ResearchError),
    #[error(
        "document still violates the methodology after {iterations} iterations: {}",
        deviations.iter().map(|d| d.detail.as_str()).collect::<Vec<_>>().join(" ")
    )]
    PolicyViolationUnresolved {
        iterations: u32,
        deviations: Vec<Deviation>,
    },
    #[error("invalid edit: {0}")]
    Edit(#[from] EditError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_error_lists_deviations() {
        let err = RedactorError::PolicyViolationUnresolved {
            iterations: 16,
            deviations: vec![Deviation::missing_introduction()],
        };
        let msg = err.to_string();
        assert!(msg.contains("16 iterations"));
        assert!(msg.contains("Introduction"));
    }

    #[test]
    fn research_error_names_topic() {
        let err: RedactorError = ResearchError::new("bananas", "timed out").into();
        assert_eq!(err.to_string(), "research on 'bananas' failed: timed out");
    }
}
