//! services/api/src/web/generation_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! turning a session's raw input into study materials.

use crate::web::{ingest::ingest, state::AppState};
use snapstudy_core::{
    domain::{FetchOutcome, RawInput},
    normalizer,
    ports::{PortError, PortResult},
    CallFamily, StudyMaterials,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Represents the outcome of the `generation_process` task.
#[derive(Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The session's materials were replaced with these.
    Generated(StudyMaterials),
    /// The link had nothing to read; the session is unchanged.
    NoContentFound,
}

/// Runs one generation for `session_id`: ingest, invoke the model, normalize,
/// and replace the session's materials.
///
/// Rejected with `SessionBusy` while another generation for the same session
/// is outstanding. On any failure the session keeps its previous materials.
pub async fn generation_process(
    app_state: Arc<AppState>,
    session_id: Uuid,
    input: RawInput,
) -> PortResult<GenerationOutcome> {
    let started = Instant::now();

    let ticket = {
        let mut store = app_state.sessions.lock().await;
        let ticket = store.begin(session_id, CallFamily::Generation)?;
        store.set_raw_input(session_id, input.clone())?;
        ticket
    };
    info!("Generation started for session {}.", session_id);

    let result = generate(&app_state, &input).await;

    let mut store = app_state.sessions.lock().await;
    match result {
        Ok(GenerationOutcome::Generated(materials)) => {
            store.finish_generation(ticket, Some(materials.clone()))?;
            info!(
                "⏱️ Generation for session {} took: {:?} ({} flashcards, {} quiz questions).",
                session_id,
                started.elapsed(),
                materials.flashcards.len(),
                materials.quiz_questions.len()
            );
            Ok(GenerationOutcome::Generated(materials))
        }
        Ok(GenerationOutcome::NoContentFound) => {
            store.finish_generation(ticket, None)?;
            Ok(GenerationOutcome::NoContentFound)
        }
        Err(e) => {
            store.finish_generation(ticket, None)?;
            error!("Generation failed for session {}: {}", session_id, e);
            Err(e)
        }
    }
}

async fn generate(app_state: &AppState, input: &RawInput) -> PortResult<GenerationOutcome> {
    let extracted = match ingest(app_state, input).await? {
        FetchOutcome::Content(extracted) => extracted,
        FetchOutcome::NoContentFound => return Ok(GenerationOutcome::NoContentFound),
    };
    let raw_reply = app_state.orchestrator.generate_materials(&extracted).await?;
    let materials = normalizer::normalize_reply(&raw_reply)?;
    Ok(GenerationOutcome::Generated(materials))
}

/// Spawns `generation_process` so it runs to completion even if the caller
/// goes away, then waits for it.
pub async fn run_generation(
    app_state: Arc<AppState>,
    session_id: Uuid,
    input: RawInput,
) -> PortResult<GenerationOutcome> {
    tokio::spawn(generation_process(app_state, session_id, input))
        .await
        .map_err(|e| PortError::Unexpected(format!("Generation task failed: {}", e)))?
}
