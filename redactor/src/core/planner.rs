//! Next-action selection.
//!
//! A planner maps the current document, its deviations and the pending user
//! instruction to exactly one [`Action`]. Structural repairs always win over
//! user content so the methodology holds before anything is added.

use crate::core::policy::is_compliant_conclusion;
use crate::core::types::{Action, Deviation, DeviationKind, Instruction};
use crate::document::Document;

pub trait Planner {
    fn plan(
        &self,
        document: &Document,
        deviations: &[Deviation],
        instruction: Option<&Instruction>,
    ) -> Action;
}

/// Deterministic rule-based planner for the built-in methodology.
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodologyPlanner;

impl Planner for MethodologyPlanner {
    fn plan(
        &self,
        document: &Document,
        deviations: &[Deviation],
        instruction: Option<&Instruction>,
    ) -> Action {
        // Custom rules have no built-in repair; skip them and let the loop
        // report them when nothing else applies.
        for deviation in deviations {
            match deviation.kind {
                DeviationKind::MissingIntroduction => {
                    return Action::InsertIntroduction {
                        topic: introduction_topic(document),
                    };
                }
                DeviationKind::MissingConclusion => {
                    return Action::AppendConclusion {
                        topic: conclusion_topic(document),
                    };
                }
                DeviationKind::Custom { .. } => {}
            }
        }

        match instruction {
            Some(Instruction::AddSection { topic }) => Action::InsertSection {
                topic: topic.clone(),
                position: content_position(document),
            },
            Some(Instruction::AddKpi { description }) => Action::AppendKpi {
                description: description.clone(),
                position: content_position(document),
            },
            Some(Instruction::ListSections) | Some(Instruction::Other { .. }) | None => {
                Action::NoOp
            }
        }
    }
}

pub fn introduction_topic(document: &Document) -> String {
    format!("introduction to {}", document.title)
}

pub fn conclusion_topic(document: &Document) -> String {
    format!("conclusion about {}", document.title)
}

/// Index at which new body content goes: just before a conclusion-bearing
/// last section, else at the end.
pub fn content_position(document: &Document) -> usize {
    let len = document.sections.len();
    if is_compliant_conclusion(document.last()) {
        len - 1
    } else {
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::policy::Policy;
    use crate::document::Section;
    use crate::test_support::{conclusion, doc_with, intro};

    fn plan(doc: &Document, instruction: Option<&Instruction>) -> Action {
        let deviations = Policy::methodology().check(doc);
        MethodologyPlanner.plan(doc, &deviations, instruction)
    }

    #[test]
    fn introduction_is_repaired_before_conclusion_and_content() {
        let doc = doc_with(Vec::new());
        let instruction = Instruction::AddSection {
            topic: "bananas".to_string(),
        };
        assert_eq!(
            plan(&doc, Some(&instruction)),
            Action::InsertIntroduction {
                topic: "introduction to Bananas".to_string()
            }
        );
    }

    #[test]
    fn conclusion_follows_introduction() {
        let doc = doc_with(vec![intro()]);
        assert_eq!(
            plan(&doc, None),
            Action::AppendConclusion {
                topic: "conclusion about Bananas".to_string()
            }
        );
    }

    #[test]
    fn content_goes_before_conclusion() {
        let doc = doc_with(vec![intro(), Section::text("body"), conclusion()]);
        let instruction = Instruction::AddKpi {
            description: "revenue".to_string(),
        };
        assert_eq!(
            plan(&doc, Some(&instruction)),
            Action::AppendKpi {
                description: "revenue".to_string(),
                position: 2
            }
        );
    }

    #[test]
    fn compliant_document_without_instruction_is_noop() {
        let doc = doc_with(vec![intro(), conclusion()]);
        assert_eq!(plan(&doc, None), Action::NoOp);
        assert_eq!(plan(&doc, Some(&Instruction::ListSections)), Action::NoOp);
        assert_eq!(
            plan(
                &doc,
                Some(&Instruction::Other {
                    text: "shorter please".to_string()
                })
            ),
            Action::NoOp
        );
    }

    #[test]
    fn custom_deviations_do_not_block_content() {
        let doc = doc_with(vec![intro(), conclusion()]);
        let deviations = vec![Deviation {
            kind: DeviationKind::Custom {
                rule: "tone".to_string(),
            },
            detail: "Too informal.".to_string(),
        }];
        let instruction = Instruction::AddSection {
            topic: "x".to_string(),
        };
        assert_eq!(
            MethodologyPlanner.plan(&doc, &deviations, Some(&instruction)),
            Action::InsertSection {
                topic: "x".to_string(),
                position: 1
            }
        );
        assert_eq!(MethodologyPlanner.plan(&doc, &deviations, None), Action::NoOp);
    }

    #[test]
    fn position_is_end_when_last_section_is_not_a_conclusion() {
        let doc = doc_with(vec![intro(), Section::text("body")]);
        assert_eq!(content_position(&doc), 2);
        assert_eq!(content_position(&doc_with(Vec::new())), 0);
    }
}
