//! Parsing of free-form user requests into [`Instruction`]s.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Instruction;

static ADD_SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)add a section about(.*)$").expect("valid regex"));
static ADD_KPI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)add a kpi for(.*)$").expect("valid regex"));
static LIST_SECTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)list sections").expect("valid regex"));

/// Parse user input. Returns `None` for blank input.
///
/// The extracted topic is lowercased, trimmed and stripped of periods, so
/// "Add a section about Bananas." yields `AddSection { topic: "bananas" }`.
/// Section requests win over KPI requests, which win over listing.
pub fn parse_instruction(input: &str) -> Option<Instruction> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let single_line = trimmed.replace('\n', " ");

    if let Some(topic) = capture_tail(&ADD_SECTION_RE, &single_line) {
        return Some(Instruction::AddSection { topic });
    }
    if let Some(description) = capture_tail(&ADD_KPI_RE, &single_line) {
        return Some(Instruction::AddKpi { description });
    }
    if LIST_SECTIONS_RE.is_match(&single_line) {
        return Some(Instruction::ListSections);
    }
    Some(Instruction::Other {
        text: trimmed.to_string(),
    })
}

fn capture_tail(re: &Regex, input: &str) -> Option<String> {
    let caps = re.captures(input)?;
    let tail = caps.get(1)?.as_str();
    let cleaned = tail.to_lowercase().replace('.', "").trim().to_string();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned)
}
