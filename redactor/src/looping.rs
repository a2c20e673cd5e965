//! The convergence loop: Assess, Plan, Act, repeat until the planner says `NoOp`.

use tracing::{info, warn};

use crate::core::planner::Planner;
use crate::core::types::{Action, Deviation, Instruction};
use crate::document::Document;
use crate::error::RedactorError;
use crate::io::config::RedactorConfig;
use crate::io::document_store::DocumentStore;
use crate::io::research::Researcher;
use crate::io::session_state::{load_session_state, write_session_state};
use crate::step::{AppliedStep, Assessment, StepEnv, act, assess};

/// Bounds for one loop invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum number of Act phases before giving up.
    pub max_iterations: u32,
    /// Consecutive research failures tolerated before stopping.
    pub research_retries: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        RedactorConfig::default().loop_config()
    }
}

impl RedactorConfig {
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            max_iterations: self.max_iterations,
            research_retries: self.research_retries,
        }
    }
}

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// The planner returned `NoOp` and the document is compliant.
    Converged,
    /// The planner returned `NoOp` while deviations remain.
    Stalled,
    /// Research kept failing; the pending instruction was dropped.
    ResearchFailed { warning: String },
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Reply for the user.
    pub message: String,
    pub document: Document,
    /// Every action taken, ending with the terminal `NoOp`.
    pub actions: Vec<Action>,
    /// Deviations left in `document`.
    pub deviations: Vec<Deviation>,
    pub edits_applied: u32,
    pub stop: LoopStop,
}

impl LoopOutcome {
    pub fn is_compliant(&self) -> bool {
        self.deviations.is_empty()
    }
}

/// Store `instruction` as the pending request for the next loop.
pub fn submit_instruction<S, R, P>(
    env: &StepEnv<'_, S, R, P>,
    instruction: Option<Instruction>,
) -> Result<(), RedactorError> {
    let mut session = load_session_state(&env.paths.session_path)?;
    session.pending_instruction = instruction;
    write_session_state(&env.paths.session_path, &session)?;
    Ok(())
}

/// Run iterations until the planner returns `NoOp`.
///
/// A research failure is retried from a fresh assessment up to
/// `research_retries` times in a row, then the loop stops with
/// [`LoopStop::ResearchFailed`]. Reaching `max_iterations` edits without a
/// `NoOp` is an error carrying the outstanding deviations. Any other error
/// stops the loop immediately.
pub fn run_loop<S, R, P, F>(
    env: &StepEnv<'_, S, R, P>,
    config: &LoopConfig,
    mut on_step: F,
) -> Result<LoopOutcome, RedactorError>
where
    S: DocumentStore,
    R: Researcher,
    P: Planner,
    F: FnMut(&AppliedStep),
{
    let mut actions = Vec::new();
    let mut attempts = 0u32;
    let mut edits_applied = 0u32;
    let mut consecutive_failures = 0u32;
    let mut reply: Option<String> = None;

    loop {
        let assessment = assess(env)?;
        if assessment.action.is_noop() {
            actions.push(Action::NoOp);
            return finish(env, assessment, actions, edits_applied, reply);
        }
        if attempts >= config.max_iterations {
            warn!(attempts, "iteration cap reached");
            return Err(RedactorError::PolicyViolationUnresolved {
                iterations: attempts,
                deviations: assessment.deviations,
            });
        }
        attempts += 1;

        let planned = assessment.action.clone();
        match act(env, assessment) {
            Ok(step) => {
                consecutive_failures = 0;
                edits_applied += 1;
                if step.action.consumes_instruction() {
                    reply = Some(step.confirmation.clone());
                }
                actions.push(step.action.clone());
                on_step(&step);
            }
            Err(RedactorError::Collaborator(err)) => {
                consecutive_failures += 1;
                if consecutive_failures <= config.research_retries {
                    warn!(action = %planned, err = %err, "retrying after research failure");
                    continue;
                }
                return give_up(env, actions, edits_applied, err.to_string());
            }
            Err(err) => return Err(err),
        }
    }
}

fn finish<S, R, P>(
    env: &StepEnv<'_, S, R, P>,
    assessment: Assessment,
    actions: Vec<Action>,
    edits_applied: u32,
    reply: Option<String>,
) -> Result<LoopOutcome, RedactorError> {
    let Assessment {
        mut session,
        document,
        deviations,
        ..
    } = assessment;

    // A request with no edit rule is answered now and never replayed.
    let leftover = session.pending_instruction.take();
    if leftover.is_some() {
        write_session_state(&env.paths.session_path, &session)?;
    }

    let (message, stop) = if !deviations.is_empty() {
        let details = join_details(&deviations);
        (
            format!("Stopped: no action can resolve the remaining issues. {details}"),
            LoopStop::Stalled,
        )
    } else {
        let message = match (leftover, reply) {
            (Some(Instruction::ListSections), _) => document.section_listing(),
            (Some(Instruction::Other { text }), _) => {
                let help = "I can add a section (\"add a section about ...\") or a KPI (\"add a KPI for ...\").";
                if edits_applied > 0 {
                    format!(
                        "{help} Made {} to follow the methodology; nothing else was changed for: {text}",
                        edit_count(edits_applied)
                    )
                } else {
                    format!("{help} Nothing was changed for: {text}")
                }
            }
            (_, Some(reply)) => reply,
            (_, None) if edits_applied > 0 => format!(
                "The report now follows the methodology ({}).",
                edit_count(edits_applied)
            ),
            (_, None) => "The report already follows the methodology.".to_string(),
        };
        (message, LoopStop::Converged)
    };

    info!(edits_applied, stop = ?stop, "loop finished");
    Ok(LoopOutcome {
        message,
        document,
        actions,
        deviations,
        edits_applied,
        stop,
    })
}

fn give_up<S, R, P>(
    env: &StepEnv<'_, S, R, P>,
    mut actions: Vec<Action>,
    edits_applied: u32,
    warning: String,
) -> Result<LoopOutcome, RedactorError>
where
    S: DocumentStore,
{
    warn!(warning = %warning, "giving up after repeated research failures");
    let mut session = load_session_state(&env.paths.session_path)?;
    if session.pending_instruction.take().is_some() {
        write_session_state(&env.paths.session_path, &session)?;
    }
    let document = env.store.load()?;
    let deviations = env.policy.check(&document);
    actions.push(Action::NoOp);

    let mut message = format!("Warning: {warning}. The report was left at its last saved state.");
    if !deviations.is_empty() {
        message.push_str(" Outstanding issues: ");
        message.push_str(&join_details(&deviations));
    }
    Ok(LoopOutcome {
        message,
        document,
        actions,
        deviations,
        edits_applied,
        stop: LoopStop::ResearchFailed { warning },
    })
}

fn edit_count(edits: u32) -> String {
    format!("{edits} corrective edit{}", if edits == 1 { "" } else { "s" })
}

fn join_details(deviations: &[Deviation]) -> String {
    deviations
        .iter()
        .map(|d| d.detail.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::planner::MethodologyPlanner;
    use crate::core::policy::Policy;
    use crate::document::Section;
    use crate::test_support::{FailingResearcher, FlakyResearcher, ScriptedResearcher, TestWorkspace};

    #[test]
    fn loop_stops_on_noop_without_calling_research() {
        let ws = TestWorkspace::new("Bananas").expect("workspace");
        ws.seed(vec![Section::text("## Introduction"), Section::text("## Conclusion")])
            .expect("seed");
        let researcher = ScriptedResearcher::new(Vec::new());
        let policy = Policy::methodology();
        let env = ws.env(&researcher, &MethodologyPlanner, &policy);

        let outcome = run_loop(&env, &LoopConfig::default(), |_| {}).expect("loop");
        assert_eq!(outcome.actions, vec![Action::NoOp]);
        assert_eq!(outcome.stop, LoopStop::Converged);
        assert_eq!(outcome.message, "The report already follows the methodology.");
        assert!(researcher.queries().is_empty());
    }

    #[test]
    fn one_retry_then_success() {
        let ws = TestWorkspace::new("Bananas").expect("workspace");
        let researcher = FlakyResearcher::new(1);
        let policy = Policy::methodology();
        let env = ws.env(&researcher, &MethodologyPlanner, &policy);

        let outcome = run_loop(&env, &LoopConfig::default(), |_| {}).expect("loop");
        assert_eq!(outcome.stop, LoopStop::Converged);
        assert_eq!(outcome.edits_applied, 2);
        assert_eq!(researcher.calls(), 3);
    }

    #[test]
    fn repeated_research_failure_stops_with_warning() {
        let ws = TestWorkspace::new("Bananas").expect("workspace");
        ws.set_instruction(Instruction::AddSection {
            topic: "bananas".to_string(),
        })
        .expect("instruction");
        let before = std::fs::read_to_string(&ws.paths.document_path).expect("read");
        let policy = Policy::methodology();
        let env = ws.env(&FailingResearcher, &MethodologyPlanner, &policy);

        let outcome = run_loop(&env, &LoopConfig::default(), |_| {}).expect("loop");
        assert!(matches!(outcome.stop, LoopStop::ResearchFailed { .. }));
        assert_eq!(outcome.actions, vec![Action::NoOp]);
        assert_eq!(outcome.deviations.len(), 2);
        assert!(outcome.message.starts_with("Warning: research on"));
        assert_eq!(
            std::fs::read_to_string(&ws.paths.document_path).expect("read"),
            before
        );
        assert_eq!(ws.load_session().expect("session").pending_instruction, None);
    }

    #[test]
    fn on_step_sees_every_applied_edit() {
        let ws = TestWorkspace::new("Bananas").expect("workspace");
        let researcher = ScriptedResearcher::new(vec!["## Introduction", "## Conclusion"]);
        let policy = Policy::methodology();
        let env = ws.env(&researcher, &MethodologyPlanner, &policy);

        let mut seen = Vec::new();
        let outcome =
            run_loop(&env, &LoopConfig::default(), |step| seen.push(step.iter)).expect("loop");
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(
            outcome.message,
            "The report now follows the methodology (2 corrective edits)."
        );
    }

    #[test]
    fn unsupported_request_reply_counts_corrective_edits() {
        let ws = TestWorkspace::new("Bananas").expect("workspace");
        ws.set_instruction(Instruction::Other {
            text: "hello".to_string(),
        })
        .expect("instruction");
        let researcher = ScriptedResearcher::new(vec!["## Introduction", "## Conclusion"]);
        let policy = Policy::methodology();
        let env = ws.env(&researcher, &MethodologyPlanner, &policy);

        let outcome = run_loop(&env, &LoopConfig::default(), |_| {}).expect("loop");
        assert_eq!(outcome.edits_applied, 2);
        assert!(outcome.message.contains("Made 2 corrective edits"));
        assert!(outcome.message.ends_with("nothing else was changed for: hello"));
    }

    #[test]
    fn unsupported_request_on_compliant_report_changes_nothing() {
        let ws = TestWorkspace::new("Bananas").expect("workspace");
        ws.seed(vec![Section::text("## Introduction"), Section::text("## Conclusion")])
            .expect("seed");
        ws.set_instruction(Instruction::Other {
            text: "hello".to_string(),
        })
        .expect("instruction");
        let researcher = ScriptedResearcher::new(Vec::new());
        let policy = Policy::methodology();
        let env = ws.env(&researcher, &MethodologyPlanner, &policy);

        let outcome = run_loop(&env, &LoopConfig::default(), |_| {}).expect("loop");
        assert!(outcome.message.ends_with("Nothing was changed for: hello"));
    }

    #[test]
    fn list_sections_replies_with_listing_and_is_consumed() {
        let ws = TestWorkspace::new("Bananas").expect("workspace");
        ws.seed(vec![Section::text("## Introduction"), Section::text("## Conclusion")])
            .expect("seed");
        ws.set_instruction(Instruction::ListSections)
            .expect("instruction");
        let researcher = ScriptedResearcher::new(Vec::new());
        let policy = Policy::methodology();
        let env = ws.env(&researcher, &MethodologyPlanner, &policy);

        let outcome = run_loop(&env, &LoopConfig::default(), |_| {}).expect("loop");
        assert_eq!(
            outcome.message,
            "Section 0 (Text): ## Introduction...\nSection 1 (Text): ## Conclusion..."
        );
        assert_eq!(ws.load_session().expect("session").pending_instruction, None);
    }
}
