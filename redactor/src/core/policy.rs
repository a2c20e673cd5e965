//! Structural policy checks: document in, ordered deviations out.

use crate::core::types::Deviation;
use crate::document::{Document, Section};

/// Word that makes a text section count as the introduction.
pub const INTRODUCTION_MARKER: &str = "introduction";
/// Word that makes a text section count as the conclusion.
pub const CONCLUSION_MARKER: &str = "conclusion";

/// A structural rule. Rules append their findings in priority order.
pub trait Rule: Send + Sync {
    fn check(&self, document: &Document, deviations: &mut Vec<Deviation>);
}

/// First section must be a text section mentioning "introduction".
pub struct IntroductionFirst;

impl Rule for IntroductionFirst {
    fn check(&self, document: &Document, deviations: &mut Vec<Deviation>) {
        if !is_compliant_introduction(document.first()) {
            deviations.push(Deviation::missing_introduction());
        }
    }
}

/// Last section must be a text section mentioning "conclusion".
pub struct ConclusionLast;

impl Rule for ConclusionLast {
    fn check(&self, document: &Document, deviations: &mut Vec<Deviation>) {
        if !is_compliant_conclusion(document.last()) {
            deviations.push(Deviation::missing_conclusion());
        }
    }
}

/// Ordered set of rules making up the methodology.
///
/// The checker is a pure function of the document: the same document always
/// yields the same deviations in the same order.
pub struct Policy {
    rules: Vec<Box<dyn Rule>>,
}

impl Policy {
    /// The mandatory methodology: introduction first, conclusion last.
    pub fn methodology() -> Self {
        Self {
            rules: vec![Box::new(IntroductionFirst), Box::new(ConclusionLast)],
        }
    }

    /// Append a rule. Its findings rank after every rule already present.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn check(&self, document: &Document) -> Vec<Deviation> {
        let mut deviations = Vec::new();
        for rule in &self.rules {
            rule.check(document, &mut deviations);
        }
        deviations
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::methodology()
    }
}

pub fn is_compliant_introduction(section: Option<&Section>) -> bool {
    section.is_some_and(|s| s.text_contains(INTRODUCTION_MARKER))
}

pub fn is_compliant_conclusion(section: Option<&Section>) -> bool {
    section.is_some_and(|s| s.text_contains(CONCLUSION_MARKER))
}
