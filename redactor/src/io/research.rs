//! Research collaborator abstraction.
//!
//! The [`Researcher`] trait decouples the edit loop from the backend that
//! writes content. [`CommandResearcher`] pipes a rendered prompt into an
//! external command; [`CannedResearcher`] answers offline and deterministically.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::types::KPI_QUERY_PREFIX;
use crate::document::Document;
use crate::error::ResearchError;
use crate::io::config::{ResearchBackend, ResearchConfig};
use crate::io::process::run_command_with_timeout;
use crate::io::prompt::{PromptEngine, QueryKind};

pub trait Researcher {
    /// Produce content for `topic`. `document` is read-only context.
    fn research(&self, topic: &str, document: &Document) -> Result<String, ResearchError>;
}

impl<R: Researcher + ?Sized> Researcher for Box<R> {
    fn research(&self, topic: &str, document: &Document) -> Result<String, ResearchError> {
        (**self).research(topic, document)
    }
}

/// Build the researcher selected by `config`.
pub fn researcher_from_config(
    config: &ResearchConfig,
    workdir: impl Into<PathBuf>,
) -> Result<Box<dyn Researcher + Send>> {
    Ok(match config.backend {
        ResearchBackend::Command => Box::new(CommandResearcher::new(config, workdir)?),
        ResearchBackend::Canned => Box::new(CannedResearcher),
    })
}

/// Researcher that spawns a configured command with the prompt on stdin.
pub struct CommandResearcher {
    command: Vec<String>,
    workdir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
    prompts: PromptEngine,
}

impl CommandResearcher {
    pub fn new(config: &ResearchConfig, workdir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            command: config.command.clone(),
            workdir: workdir.into(),
            timeout: Duration::from_secs(config.timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
            prompts: PromptEngine::new()?,
        })
    }
}

impl Researcher for CommandResearcher {
    #[instrument(skip_all, fields(topic = %topic))]
    fn research(&self, topic: &str, document: &Document) -> Result<String, ResearchError> {
        let fail = |reason: String| ResearchError::new(topic, reason);
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| fail("research command is empty".to_string()))?;
        let prompt = self
            .prompts
            .render_research(topic, document)
            .map_err(|err| fail(format!("render prompt: {err:#}")))?;

        info!(program = %program, "starting research command");
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&self.workdir);
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .map_err(|err| fail(format!("{err:#}")))?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "research timed out");
            return Err(fail(format!("timed out after {:?}", self.timeout)));
        }
        if !output.status.success() {
            let stderr = output.stderr_lossy();
            let first_line = stderr.lines().next().unwrap_or("").trim();
            warn!(exit_code = ?output.status.code(), "research command failed");
            return Err(fail(format!(
                "command exited with status {:?}: {first_line}",
                output.status.code()
            )));
        }
        let answer = output.stdout_lossy().trim().to_string();
        if answer.is_empty() {
            return Err(fail("command produced no output".to_string()));
        }
        debug!(bytes = answer.len(), "research completed");
        Ok(answer)
    }
}

/// Offline researcher with fixed, topic-shaped answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct CannedResearcher;

impl Researcher for CannedResearcher {
    fn research(&self, topic: &str, _document: &Document) -> Result<String, ResearchError> {
        let topic = topic.trim();
        let answer = match QueryKind::of(topic) {
            QueryKind::Introduction => {
                let subject = strip_prefix_ignore_case(topic, "introduction to ");
                format!(
                    "## Introduction to {subject}\n\n\
                     **Topic introduction:** This report gives an overview of {subject}.\n\n\
                     **Problematic:** What matters most about {subject}, and why?\n\n\
                     **Hypothesis:** A small set of factors explains most of what we observe about {subject}.\n\n\
                     **Data used:** Public literature and the figures quoted in this report."
                )
            }
            QueryKind::Conclusion => {
                let subject = strip_prefix_ignore_case(topic, "conclusion about ");
                format!(
                    "## Conclusion\n\n\
                     **Recap and answers:** The sections above cover the main facts about {subject} \
                     and answer the question raised in the introduction.\n\n\
                     **Next steps:** Extend the analysis with fresher data on {subject}."
                )
            }
            QueryKind::Kpi => {
                let description = strip_prefix_ignore_case(topic, KPI_QUERY_PREFIX);
                format!("n/a ({description})")
            }
            QueryKind::Section => {
                format!("## {}\n\nThis is a canned research response for: {topic}", title_case(topic))
            }
        };
        Ok(answer)
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> &'a str {
    match text.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &text[prefix.len()..],
        _ => text,
    }
}

fn title_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
