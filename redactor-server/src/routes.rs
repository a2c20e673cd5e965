//! HTTP route handlers for the editing API.

use std::path::Path as FsPath;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use redactor::conversation::{Reply, handle_message};
use redactor::core::methodology::METHODOLOGY;
use redactor::core::planner::MethodologyPlanner;
use redactor::core::policy::Policy;
use redactor::core::types::{Action, Deviation};
use redactor::document::Document;
use redactor::error::StoreError;
use redactor::io::config::{ResearchBackend, load_config};
use redactor::io::document_store::{DocumentStore, FileDocumentStore};
use redactor::io::init::{RedactorPaths, ensure_workspace};
use redactor::io::messages::{Message, MessageLog};
use redactor::io::research::researcher_from_config;
use redactor::looping::LoopStop;
use redactor::step::StepEnv;

use crate::state::{AppState, ChangeEvent};

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/methodology", get(methodology))
        .route(
            "/conversations/{id}/messages",
            get(get_messages).post(post_message),
        )
        .route("/conversations/{id}/document", get(get_document))
        .route("/conversations/{id}/document.md", get(get_document_markdown))
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/methodology - the editorial methodology as Markdown.
async fn methodology() -> &'static str {
    METHODOLOGY
}

#[derive(Debug, Deserialize)]
struct PostMessage {
    user_input: String,
}

#[derive(Debug, Serialize)]
struct ReplyBody {
    message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<Document>,
    actions: Vec<Action>,
    deviations: Vec<Deviation>,
    stop: &'static str,
}

impl From<Reply> for ReplyBody {
    fn from(reply: Reply) -> Self {
        match reply.outcome {
            Ok(outcome) => ReplyBody {
                message: reply.message,
                stop: stop_label(&outcome.stop),
                document: Some(outcome.document),
                actions: outcome.actions,
                deviations: outcome.deviations,
            },
            Err(_) => ReplyBody {
                message: reply.message,
                document: None,
                actions: Vec::new(),
                deviations: Vec::new(),
                stop: "error",
            },
        }
    }
}

fn stop_label(stop: &LoopStop) -> &'static str {
    match stop {
        LoopStop::Converged => "converged",
        LoopStop::Stalled => "stalled",
        LoopStop::ResearchFailed { .. } => "research_failed",
    }
}

/// POST /api/conversations/:id/messages - send a message and run the edit loop.
async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PostMessage>,
) -> Result<Json<ReplyBody>, StatusCode> {
    let root = state.conversation_dir(&id).ok_or(StatusCode::BAD_REQUEST)?;
    let lock = state.conversation_lock(&id);
    let result = {
        let _guard = lock.lock().await;
        info!(conversation = %id, "handling message");
        let worker_state = state.clone();
        let worker_id = id.clone();
        tokio::task::spawn_blocking(move || {
            run_message(&worker_state, &worker_id, &root, &body.user_input)
        })
        .await
    };
    state.release_conversation_lock(&id, lock);

    let reply = result
        .map_err(|err| {
            warn!(error = %err, "edit task panicked");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|err| {
            warn!(conversation = %id, error = %format!("{err:#}"), "message failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let body = ReplyBody::from(reply);
    let _ = state.event_tx.send(ChangeEvent::EditCompleted {
        conversation_id: id,
        stop: body.stop.to_string(),
    });
    Ok(Json(body))
}

fn run_message(
    state: &AppState,
    id: &str,
    root: &FsPath,
    user_input: &str,
) -> anyhow::Result<Reply> {
    let paths = ensure_workspace(root)?;
    let mut cfg = load_config(&paths.config_path)?;
    if state.canned_research {
        cfg.research.backend = ResearchBackend::Canned;
    }
    let store = FileDocumentStore::new(&paths.document_path);
    let researcher = researcher_from_config(&cfg.research, &paths.root)?;
    let policy = Policy::methodology();
    let env = StepEnv {
        paths: &paths,
        store: &store,
        researcher: &researcher,
        planner: &MethodologyPlanner,
        policy: &policy,
    };
    let messages = MessageLog::new(&paths.messages_path);

    let reply = handle_message(&env, &messages, &cfg.loop_config(), user_input, |step| {
        let _ = state.event_tx.send(ChangeEvent::StepApplied {
            conversation_id: id.to_string(),
            iter: step.iter,
            confirmation: step.confirmation.clone(),
        });
    })?;
    Ok(reply)
}

/// GET /api/conversations/:id/messages - the message log, oldest first.
async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let paths = conversation_paths(&state, &id)?;
    let messages = MessageLog::new(&paths.messages_path)
        .load()
        .map_err(status_of)?;
    Ok(Json(messages))
}

/// GET /api/conversations/:id/document - the document as JSON.
async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, StatusCode> {
    let paths = conversation_paths(&state, &id)?;
    let document = FileDocumentStore::new(&paths.document_path)
        .load()
        .map_err(status_of)?;
    Ok(Json(document))
}

/// GET /api/conversations/:id/document.md - the document rendered as Markdown.
async fn get_document_markdown(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, StatusCode> {
    let paths = conversation_paths(&state, &id)?;
    let document = FileDocumentStore::new(&paths.document_path)
        .load()
        .map_err(status_of)?;
    Ok(document.to_markdown())
}

fn conversation_paths(state: &AppState, id: &str) -> Result<RedactorPaths, StatusCode> {
    let root = state.conversation_dir(id).ok_or(StatusCode::BAD_REQUEST)?;
    Ok(RedactorPaths::new(root))
}

fn status_of(err: StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        other => {
            warn!(error = %other, "store read failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
