//! Pure document edits.
//!
//! Every function takes the current document by reference and returns the
//! edited copy; persistence is the caller's job.

use thiserror::Error;

use crate::core::policy::{
    CONCLUSION_MARKER, INTRODUCTION_MARKER, is_compliant_conclusion, is_compliant_introduction,
};
use crate::core::types::Action;
use crate::document::{Document, Section};

const INTRODUCTION_STEM: &str = "intro";
const CONCLUSION_STEM: &str = "conclu";

/// Rejected direct edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("section {index} is out of bounds (document has {len} sections)")]
    OutOfBounds { index: usize, len: usize },
    #[error("section {index} is not a text section")]
    NotText { index: usize },
}

/// Apply a planned action using researched content.
///
/// `NoOp` returns the document unchanged. Positions past the end are clamped
/// to an append.
pub fn apply_action(document: &Document, action: &Action, researched: &str) -> Document {
    let mut next = document.clone();
    match action {
        Action::InsertIntroduction { .. } => {
            if is_near_miss_introduction(&next) {
                next.sections.remove(0);
            }
            let body = with_heading(researched, INTRODUCTION_MARKER, "## Introduction");
            next.sections.insert(0, Section::text(body));
        }
        Action::AppendConclusion { .. } => {
            if is_near_miss_conclusion(&next) {
                next.sections.pop();
            }
            let body = with_heading(researched, CONCLUSION_MARKER, "## Conclusion");
            next.sections.push(Section::text(body));
        }
        Action::InsertSection { position, .. } => {
            let at = (*position).min(next.sections.len());
            next.sections.insert(at, Section::text(researched));
        }
        Action::AppendKpi {
            description,
            position,
        } => {
            let at = (*position).min(next.sections.len());
            next.sections
                .insert(at, Section::kpi(researched.trim(), description.as_str()));
        }
        Action::NoOp => {}
    }
    next
}

/// Replace the body of the text section at `index`.
pub fn update_text_section(
    document: &Document,
    index: usize,
    body: &str,
) -> Result<Document, EditError> {
    let len = document.sections.len();
    match document.sections.get(index) {
        None => Err(EditError::OutOfBounds { index, len }),
        Some(Section::Kpi(_)) => Err(EditError::NotText { index }),
        Some(Section::Text(_)) => {
            let mut next = document.clone();
            next.sections[index] = Section::text(body);
            Ok(next)
        }
    }
}

pub fn delete_section(document: &Document, index: usize) -> Result<Document, EditError> {
    let len = document.sections.len();
    if index >= len {
        return Err(EditError::OutOfBounds { index, len });
    }
    let mut next = document.clone();
    next.sections.remove(index);
    Ok(next)
}

/// First section is a text section that looks like an attempted introduction
/// but fails the check. A section that is also the compliant conclusion is
/// never a near miss.
fn is_near_miss_introduction(document: &Document) -> bool {
    let Some(first) = document.first() else {
        return false;
    };
    if document.sections.len() == 1 && is_compliant_conclusion(Some(first)) {
        return false;
    }
    !is_compliant_introduction(Some(first)) && first.text_contains(INTRODUCTION_STEM)
}

fn is_near_miss_conclusion(document: &Document) -> bool {
    let Some(last) = document.last() else {
        return false;
    };
    if document.sections.len() == 1 && is_compliant_introduction(Some(last)) {
        return false;
    }
    !is_compliant_conclusion(Some(last)) && last.text_contains(CONCLUSION_STEM)
}

fn with_heading(body: &str, marker: &str, heading: &str) -> String {
    if body.to_lowercase().contains(marker) {
        body.to_string()
    } else {
        format!("{heading}\n\n{body}")
    }
}
