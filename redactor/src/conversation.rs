//! Message-level entry point shared by the CLI and the server.
//!
//! A user message is recorded, an empty assistant reply is shown as loading,
//! the edit loop runs with every applied action logged as a tool call and its
//! result, and the reply is finalized with the loop's message or the error.

use tracing::{debug, warn};

use crate::core::instruction::parse_instruction;
use crate::core::planner::Planner;
use crate::error::{RedactorError, StoreError};
use crate::io::document_store::DocumentStore;
use crate::io::messages::{Message, MessageKind, MessageLog, Role};
use crate::io::research::Researcher;
use crate::looping::{LoopConfig, LoopOutcome, run_loop, submit_instruction};
use crate::step::{AppliedStep, StepEnv};

#[derive(Debug)]
pub struct Reply {
    /// The finalized assistant message.
    pub message: Message,
    pub outcome: Result<LoopOutcome, RedactorError>,
}

/// Handle one user message end to end.
///
/// Blank input stores no new instruction, so it resumes whatever request is
/// still pending. Errors writing the message log itself are returned as `Err`;
/// loop failures are recorded as an error reply and returned in [`Reply::outcome`].
pub fn handle_message<S, R, P, F>(
    env: &StepEnv<'_, S, R, P>,
    messages: &MessageLog,
    config: &LoopConfig,
    user_input: &str,
    mut on_step: F,
) -> Result<Reply, StoreError>
where
    S: DocumentStore,
    R: Researcher,
    P: Planner,
    F: FnMut(&AppliedStep),
{
    messages.append(Role::User, MessageKind::UserInput, user_input, false)?;
    let placeholder = messages.append(Role::Assistant, MessageKind::FinalResponse, "", true)?;

    let instruction = parse_instruction(user_input);
    debug!(instruction = ?instruction, "parsed user input");

    let mut log_error: Option<StoreError> = None;
    let outcome = match instruction {
        Some(instruction) => submit_instruction(env, Some(instruction)),
        None => Ok(()),
    }
    .and_then(|()| {
        run_loop(env, config, |step| {
            if log_error.is_none()
                && let Err(err) = record_step(messages, step)
            {
                log_error = Some(err);
            }
            on_step(step);
        })
    });
    if let Some(err) = log_error {
        return Err(err);
    }

    let (kind, content) = match &outcome {
        Ok(outcome) => (MessageKind::FinalResponse, outcome.message.clone()),
        Err(err) => {
            warn!(err = %err, "edit loop failed");
            (MessageKind::Error, format!("Error: {err}"))
        }
    };
    let message = match messages.finalize(placeholder.id, kind, content.clone())? {
        Some(message) => message,
        None => messages.append(Role::Assistant, kind, content, false)?,
    };
    Ok(Reply { message, outcome })
}

fn record_step(messages: &MessageLog, step: &AppliedStep) -> Result<(), StoreError> {
    let call = serde_json::to_string(&step.action)?;
    messages.append(Role::Assistant, MessageKind::AgentToolCall, call, false)?;
    messages.append(
        Role::Assistant,
        MessageKind::AgentToolResult,
        step.confirmation.as_str(),
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::planner::MethodologyPlanner;
    use crate::core::policy::Policy;
    use crate::test_support::{FailingResearcher, ScriptedResearcher, TestWorkspace};

    #[test]
    fn records_input_tool_calls_and_final_reply() {
        let ws = TestWorkspace::new("Bananas").expect("workspace");
        let researcher = ScriptedResearcher::new(vec!["## Introduction", "## Conclusion", "Body"]);
        let policy = Policy::methodology();
        let env = ws.env(&researcher, &MethodologyPlanner, &policy);
        let log = MessageLog::new(&ws.paths.messages_path);

        let reply = handle_message(
            &env,
            &log,
            &LoopConfig::default(),
            "Add a section about bananas.",
            |_| {},
        )
        .expect("handle");

        let outcome = reply.outcome.expect("outcome");
        assert_eq!(outcome.edits_applied, 3);
        assert_eq!(reply.message.content, "Added a section about bananas at position 1.");
        assert!(!reply.message.is_loading);

        let kinds: Vec<MessageKind> = log.load().expect("load").iter().map(|m| m.kind).collect();
        assert_eq!(kinds[0], MessageKind::UserInput);
        assert_eq!(kinds[1], MessageKind::FinalResponse);
        assert_eq!(
            kinds[2..],
            [
                MessageKind::AgentToolCall,
                MessageKind::AgentToolResult,
                MessageKind::AgentToolCall,
                MessageKind::AgentToolResult,
                MessageKind::AgentToolCall,
                MessageKind::AgentToolResult,
            ]
        );
    }

    #[test]
    fn loop_failure_becomes_error_reply() {
        let ws = TestWorkspace::new("Bananas").expect("workspace");
        let policy = Policy::methodology();
        let env = ws.env(&FailingResearcher, &MethodologyPlanner, &policy);
        let log = MessageLog::new(&ws.paths.messages_path);
        let config = LoopConfig {
            max_iterations: 1,
            research_retries: 5,
        };

        let reply = handle_message(&env, &log, &config, "hello", |_| {}).expect("handle");
        assert!(matches!(
            reply.outcome,
            Err(RedactorError::PolicyViolationUnresolved { iterations: 1, .. })
        ));
        assert_eq!(reply.message.kind, MessageKind::Error);
        assert!(reply.message.content.starts_with("Error: document still violates"));
    }
}
