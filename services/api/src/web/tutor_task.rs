//! services/api/src/web/tutor_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! handling a single tutor question-and-answer cycle.

use crate::web::state::AppState;
use snapstudy_core::{
    domain::{ChatMessage, RawInput},
    ports::{PortError, PortResult},
    tutor_context::assemble_tutor_context,
    CallFamily,
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub const TUTOR_FAILURE_MESSAGE: &str =
    "Sorry, I encountered an error while processing your request.";

/// Answers one question for `session_id` and records the exchange in its
/// chat history.
///
/// The user's question is appended before the model is called; the answer,
/// or a system message on failure, is appended afterwards.
pub async fn tutor_process(
    app_state: Arc<AppState>,
    session_id: Uuid,
    question: String,
) -> PortResult<String> {
    let question = question.trim().to_string();
    if question.is_empty() {
        return Err(PortError::InputValidation("Question is required.".to_string()));
    }

    let (ticket, context) = {
        let mut store = app_state.sessions.lock().await;
        let ticket = store.begin(session_id, CallFamily::Tutor)?;
        let session = store.get(session_id)?;
        let context = assemble_tutor_context(
            &session.materials,
            session.raw_input.as_ref().and_then(RawInput::as_text),
        );
        store.append_message(session_id, ChatMessage::user(question.clone()))?;
        (ticket, context)
    };
    info!("Tutor question for session {}: '{}'", session_id, question);

    let result = app_state
        .orchestrator
        .answer_question(&question, &context)
        .await;

    let mut store = app_state.sessions.lock().await;
    store.finish_tutor(ticket)?;
    match result {
        Ok(answer) => {
            store.append_message(session_id, ChatMessage::ai(answer.clone()))?;
            Ok(answer)
        }
        Err(e) => {
            error!("Tutor call failed for session {}: {}", session_id, e);
            store.append_message(session_id, ChatMessage::system(TUTOR_FAILURE_MESSAGE))?;
            Err(e)
        }
    }
}

/// Spawns `tutor_process` so it runs to completion even if the caller goes
/// away, then waits for it.
pub async fn run_tutor(
    app_state: Arc<AppState>,
    session_id: Uuid,
    question: String,
) -> PortResult<String> {
    tokio::spawn(tutor_process(app_state, session_id, question))
        .await
        .map_err(|e| PortError::Unexpected(format!("Tutor task failed: {}", e)))?
}
