//! Research prompt rendering.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::methodology::METHODOLOGY;
use crate::core::types::KPI_QUERY_PREFIX;
use crate::document::Document;

const RESEARCH_TEMPLATE: &str = include_str!("prompts/research.md");

/// What the research answer will become in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Introduction,
    Conclusion,
    Kpi,
    Section,
}

impl QueryKind {
    pub fn of(query: &str) -> Self {
        let lower = query.to_lowercase();
        if lower.starts_with(KPI_QUERY_PREFIX) {
            QueryKind::Kpi
        } else if lower.starts_with("introduction to ") {
            QueryKind::Introduction
        } else if lower.starts_with("conclusion about ") {
            QueryKind::Conclusion
        } else {
            QueryKind::Section
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            QueryKind::Introduction => "introduction",
            QueryKind::Conclusion => "conclusion",
            QueryKind::Kpi => "kpi",
            QueryKind::Section => "section",
        }
    }
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("research", RESEARCH_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Render the research prompt for `query` with the current document as context.
    pub fn render_research(&self, query: &str, document: &Document) -> Result<String> {
        let template = self.env.get_template("research")?;
        let sections = (!document.sections.is_empty()).then(|| document.section_listing());
        let subtitle = document.subtitle.trim();
        let rendered = template.render(context! {
            topic => query.trim(),
            kind => QueryKind::of(query).as_str(),
            title => document.title.as_str(),
            subtitle => (!subtitle.is_empty()).then_some(subtitle),
            sections => sections,
            methodology => METHODOLOGY.trim(),
        })?;
        Ok(rendered)
    }
}
