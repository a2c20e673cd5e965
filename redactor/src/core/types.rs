//! Shared deterministic types for the redactor core.
//!
//! These types are the contracts between the policy checker, the planner and
//! the executor. They carry no I/O handles and serialize to stable JSON so they
//! can be written into session state and iteration logs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of research queries that ask for a KPI value.
pub const KPI_QUERY_PREFIX: &str = "key performance indicator value for ";

/// Category of a structural finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DeviationKind {
    MissingIntroduction,
    MissingConclusion,
    /// Reported by a rule added through [`crate::core::policy::Policy::with_rule`].
    Custom { rule: String },
}

/// A detected mismatch between the document and the methodology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deviation {
    #[serde(flatten)]
    pub kind: DeviationKind,
    pub detail: String,
}

impl Deviation {
    pub fn missing_introduction() -> Self {
        Self {
            kind: DeviationKind::MissingIntroduction,
            detail: "Missing or incorrect Introduction section at the beginning.".to_string(),
        }
    }

    pub fn missing_conclusion() -> Self {
        Self {
            kind: DeviationKind::MissingConclusion,
            detail: "Missing or incorrect Conclusion section at the end.".to_string(),
        }
    }
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// The single next edit chosen by the planner.
///
/// Content-bearing variants carry the topic handed to the research
/// collaborator; the executor turns the researched text into a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Action {
    InsertIntroduction { topic: String },
    AppendConclusion { topic: String },
    InsertSection { topic: String, position: usize },
    AppendKpi { description: String, position: usize },
    NoOp,
}

impl Action {
    /// Query handed to the research collaborator, `None` for `NoOp`.
    ///
    /// KPI queries are prefixed with [`KPI_QUERY_PREFIX`] so the collaborator
    /// answers with a bare value.
    pub fn research_query(&self) -> Option<String> {
        match self {
            Action::InsertIntroduction { topic }
            | Action::AppendConclusion { topic }
            | Action::InsertSection { topic, .. } => Some(topic.clone()),
            Action::AppendKpi { description, .. } => {
                Some(format!("{KPI_QUERY_PREFIX}{description}"))
            }
            Action::NoOp => None,
        }
    }

    /// True for actions that translate the pending user instruction.
    pub fn consumes_instruction(&self) -> bool {
        matches!(self, Action::InsertSection { .. } | Action::AppendKpi { .. })
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Action::NoOp)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::InsertIntroduction { .. } => "insert_introduction",
            Action::AppendConclusion { .. } => "append_conclusion",
            Action::InsertSection { .. } => "insert_section",
            Action::AppendKpi { .. } => "append_kpi",
            Action::NoOp => "no_op",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::InsertIntroduction { topic } => write!(f, "insert introduction ({topic})"),
            Action::AppendConclusion { topic } => write!(f, "append conclusion ({topic})"),
            Action::InsertSection { topic, position } => {
                write!(f, "insert section about {topic} at {position}")
            }
            Action::AppendKpi {
                description,
                position,
            } => write!(f, "add KPI for {description} at {position}"),
            Action::NoOp => f.write_str("no-op"),
        }
    }
}

/// A parsed user request waiting to be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "instruction")]
pub enum Instruction {
    AddSection { topic: String },
    AddKpi { description: String },
    ListSections,
    /// Anything the planner has no rule for; never produces an edit.
    Other { text: String },
}
