//! The persisted report: a title, a subtitle and an ordered list of sections.
//!
//! The serialized shape mirrors the report record used by the chat front-end:
//! `{ "title", "sub_title", "content": [{ "type": "text" | "kpi", "result": {..} }] }`.
//! Sections are values; an edit replaces a section instead of mutating it.

use serde::{Deserialize, Serialize};

/// Payload of a text section.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextResult {
    pub text: String,
}

/// Payload of a KPI section.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KpiResult {
    /// The KPI value (e.g. `115 million tonnes`).
    pub kpi: String,
    pub description: String,
}

/// One ordered unit of document content.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "result", rename_all = "lowercase")]
pub enum Section {
    Text(TextResult),
    Kpi(KpiResult),
}

impl Section {
    pub fn text(body: impl Into<String>) -> Self {
        Section::Text(TextResult { text: body.into() })
    }

    pub fn kpi(value: impl Into<String>, description: impl Into<String>) -> Self {
        Section::Kpi(KpiResult {
            kpi: value.into(),
            description: description.into(),
        })
    }

    /// Body of a text section, `None` for KPIs.
    pub fn body(&self) -> Option<&str> {
        match self {
            Section::Text(result) => Some(&result.text),
            Section::Kpi(_) => None,
        }
    }

    /// True if this is a text section whose body contains `needle`, ignoring case.
    pub fn text_contains(&self, needle: &str) -> bool {
        self.body()
            .is_some_and(|body| body.to_lowercase().contains(&needle.to_lowercase()))
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Section::Text(_) => "Text",
            Section::Kpi(_) => "KPI",
        }
    }

    pub fn to_markdown(&self) -> String {
        match self {
            Section::Text(result) => result.text.clone(),
            Section::Kpi(result) => format!(
                "\n| **{}** |\n-----------------------\n| {} |\n",
                result.kpi, result.description
            ),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    #[serde(rename = "sub_title")]
    pub subtitle: String,
    #[serde(rename = "content")]
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            sections: Vec::new(),
        }
    }

    pub fn first(&self) -> Option<&Section> {
        self.sections.first()
    }

    pub fn last(&self) -> Option<&Section> {
        self.sections.last()
    }

    /// Render the whole document as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n\n> {}\n\n", self.title, self.subtitle);
        let body = self
            .sections
            .iter()
            .map(Section::to_markdown)
            .collect::<Vec<_>>()
            .join("\n\n");
        out.push_str(&body);
        out
    }

    /// Human-readable one-line-per-section listing.
    pub fn section_listing(&self) -> String {
        if self.sections.is_empty() {
            return "The report is empty.".to_string();
        }
        self.sections
            .iter()
            .enumerate()
            .map(|(idx, section)| match section {
                Section::Text(result) => {
                    let preview: String = result.text.chars().take(50).collect();
                    format!("Section {idx} (Text): {preview}...")
                }
                Section::Kpi(result) => {
                    format!("Section {idx} (KPI): {} - {}", result.kpi, result.description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn default_document() -> Document {
    Document::new("Untitled report", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_serialize_in_record_shape() {
        let doc = Document {
            title: "Bananas".to_string(),
            subtitle: "A report".to_string(),
            sections: vec![Section::text("## Introduction"), Section::kpi("42", "answers")],
        };
        let value = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "title": "Bananas",
                "sub_title": "A report",
                "content": [
                    { "type": "text", "result": { "text": "## Introduction" } },
                    { "type": "kpi", "result": { "kpi": "42", "description": "answers" } }
                ]
            })
        );
        let back: Document = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, doc);
    }

    #[test]
    fn text_contains_ignores_case_and_kpis() {
        assert!(Section::text("## INTRODUCTION to it").text_contains("introduction"));
        assert!(!Section::text("Intro only").text_contains("introduction"));
        assert!(!Section::kpi("introduction", "introduction").text_contains("introduction"));
    }

    #[test]
    fn listing_previews_text_and_kpis() {
        let mut doc = default_document();
        assert_eq!(doc.section_listing(), "The report is empty.");

        doc.sections.push(Section::text("a".repeat(80)));
        doc.sections.push(Section::kpi("115 million tonnes", "annual production"));
        let listing = doc.section_listing();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], format!("Section 0 (Text): {}...", "a".repeat(50)));
        assert_eq!(lines[1], "Section 1 (KPI): 115 million tonnes - annual production");
    }

    #[test]
    fn markdown_has_title_subtitle_and_kpi_table() {
        let doc = Document {
            title: "T".to_string(),
            subtitle: "S".to_string(),
            sections: vec![Section::text("body"), Section::kpi("1", "one")],
        };
        let md = doc.to_markdown();
        assert!(md.starts_with("# T\n\n> S\n\n"));
        assert!(md.contains("body\n\n\n| **1** |"));
        assert!(md.ends_with("| one |\n"));
    }
}
