//! One Assess-Plan-Act iteration.
//!
//! [`assess`] is read-only: it loads the session and the document, checks the
//! policy and asks the planner for the next action. [`act`] carries that
//! action out: research, reload, apply, persist session, persist document,
//! write the iteration log.

use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, instrument, warn};

use crate::core::edit::apply_action;
use crate::core::planner::Planner;
use crate::core::policy::Policy;
use crate::core::types::{Action, Deviation, Instruction};
use crate::document::Document;
use crate::error::RedactorError;
use crate::io::document_store::DocumentStore;
use crate::io::init::RedactorPaths;
use crate::io::iteration_log::{IterationMeta, IterationWriteRequest, write_iteration};
use crate::io::research::Researcher;
use crate::io::session_state::{SessionState, load_session_state, write_session_state};

/// Everything one iteration needs. Borrowed so callers keep ownership.
pub struct StepEnv<'a, S, R, P> {
    pub paths: &'a RedactorPaths,
    pub store: &'a S,
    pub researcher: &'a R,
    pub planner: &'a P,
    pub policy: &'a Policy,
}

/// Result of the Assess and Plan phases.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub session: SessionState,
    pub document: Document,
    pub deviations: Vec<Deviation>,
    pub action: Action,
}

impl Assessment {
    pub fn instruction(&self) -> Option<&Instruction> {
        self.session.pending_instruction.as_ref()
    }
}

/// A persisted edit.
#[derive(Debug, Clone)]
pub struct AppliedStep {
    /// Iteration number (1-indexed).
    pub iter: u32,
    pub action: Action,
    /// Deviations found before the action ran.
    pub deviations: Vec<Deviation>,
    pub confirmation: String,
    pub document: Document,
}

pub fn assess<S, R, P>(env: &StepEnv<'_, S, R, P>) -> Result<Assessment, RedactorError>
where
    S: DocumentStore,
    P: Planner,
{
    let session = load_session_state(&env.paths.session_path)?;
    let document = env.store.load()?;
    let deviations = env.policy.check(&document);
    let action = env
        .planner
        .plan(&document, &deviations, session.pending_instruction.as_ref());
    debug!(
        deviations = deviations.len(),
        action = %action,
        pending = session.pending_instruction.is_some(),
        "assessed document"
    );
    Ok(Assessment {
        session,
        document,
        deviations,
        action,
    })
}

/// Execute the planned action of `assessment` and persist the result.
///
/// On a research failure nothing is written to the document; the failed
/// attempt is still recorded in the iteration log and the iteration counter
/// advances. The pending instruction is cleared in the session before the
/// document is saved and put back if the save fails, so it is applied at most
/// once.
#[instrument(skip_all, fields(action = %assessment.action))]
pub fn act<S, R, P>(
    env: &StepEnv<'_, S, R, P>,
    assessment: Assessment,
) -> Result<AppliedStep, RedactorError>
where
    S: DocumentStore,
    R: Researcher,
{
    let start = Instant::now();
    let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let Assessment {
        mut session,
        document: before,
        deviations,
        action,
    } = assessment;
    let iter = session.next_iter;

    let Some(query) = action.research_query() else {
        return Ok(AppliedStep {
            iter,
            confirmation: confirmation(&action, ""),
            action,
            deviations,
            document: before,
        });
    };

    let researched = match env.researcher.research(&query, &before) {
        Ok(text) => text,
        Err(err) => {
            warn!(iter, err = %err, "research failed");
            session.next_iter = iter + 1;
            session.last_action = Some(action.clone());
            write_session_state(&env.paths.session_path, &session)?;
            let logged = write_iteration(&IterationWriteRequest {
                root: &env.paths.root,
                meta: &IterationMeta {
                    iter,
                    action,
                    deviations,
                    confirmation: None,
                    error: Some(err.to_string()),
                    started_at,
                    duration_ms: elapsed_ms(start),
                },
                document_before: &before,
                document_after: &before,
            });
            if let Err(log_err) = logged {
                warn!(iter, err = %log_err, "could not record failed iteration");
            }
            return Err(err.into());
        }
    };

    // The document may have been edited directly while research ran.
    let current = env.store.load()?;
    let after = apply_action(&current, &action, &researched);

    // The instruction is consumed before the edit lands: an interruption
    // between the two writes loses it instead of applying it twice.
    let consumed = if action.consumes_instruction() {
        session.pending_instruction.take()
    } else {
        None
    };
    session.next_iter = iter + 1;
    session.last_action = Some(action.clone());
    write_session_state(&env.paths.session_path, &session)?;

    if let Err(err) = env.store.save(&after) {
        if consumed.is_some() {
            session.pending_instruction = consumed;
            if let Err(restore_err) = write_session_state(&env.paths.session_path, &session) {
                warn!(iter, err = %restore_err, "could not restore pending instruction");
            }
        }
        return Err(err.into());
    }

    let confirmation = confirmation(&action, &researched);
    write_iteration(&IterationWriteRequest {
        root: &env.paths.root,
        meta: &IterationMeta {
            iter,
            action: action.clone(),
            deviations: deviations.clone(),
            confirmation: Some(confirmation.clone()),
            error: None,
            started_at,
            duration_ms: elapsed_ms(start),
        },
        document_before: &current,
        document_after: &after,
    })?;

    info!(iter, sections = after.sections.len(), "{confirmation}");
    Ok(AppliedStep {
        iter,
        action,
        deviations,
        confirmation,
        document: after,
    })
}

fn confirmation(action: &Action, researched: &str) -> String {
    match action {
        Action::InsertIntroduction { .. } => {
            "Inserted an introduction at the top of the report.".to_string()
        }
        Action::AppendConclusion { .. } => {
            "Appended a conclusion at the end of the report.".to_string()
        }
        Action::InsertSection { topic, position } => {
            format!("Added a section about {topic} at position {position}.")
        }
        Action::AppendKpi {
            description,
            position,
        } => format!(
            "Added KPI '{}' for {description} at position {position}.",
            researched.trim()
        ),
        Action::NoOp => "Nothing to do.".to_string(),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
