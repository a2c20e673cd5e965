//! The editorial methodology served to readers and to the research prompt.

/// Mandatory report structure, in Markdown.
pub const METHODOLOGY: &str = "# Report Structure Methodology (Mandatory)

Every report follows this structure at all times. Content is Markdown; use LaTeX for mathematical elements.

## 1. Introduction (mandatory first section)

The report begins with an \"Introduction\" section covering:
- **Topic introduction**: a brief overview of the subject.
- **Problematic**: the core question the report addresses.
- **Hypothesis**: the proposition the report investigates.
- **Data used**: the data sources behind the analysis.

## 2. Details (main body)

The body is a sequence of self-contained sections (text or KPI), ordered to build a narrative.

## 3. Conclusion (mandatory last section)

The report ends with a \"Conclusion\" section covering:
- **Recap and answers**: key findings and a direct answer to the problematic.
- **Next steps**: further research, actions or implications.
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_both_structural_sections() {
        assert!(METHODOLOGY.contains("Introduction"));
        assert!(METHODOLOGY.contains("Conclusion"));
    }
}
