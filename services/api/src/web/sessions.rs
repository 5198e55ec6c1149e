//! services/api/src/web/sessions.rs
//!
//! Handlers for the in-memory study sessions: listing, creating and selecting
//! sessions, generating materials into one, and asking its tutor.

use crate::web::{
    errors::{ErrorBody, ErrorResponse},
    generation_task::{run_generation, GenerationOutcome},
    ingest::{read_upload, NO_CONTENT_FOUND_MESSAGE},
    protocol::{
        AnswerResponse, GenerateRequest, MessageResponse, SessionListResponse,
        SessionQuestionRequest, SessionSummary, SessionView, StudyMaterialsResponse,
    },
    rest::{
        required, ASK_FAILURE_HEADLINE, CONTENT_FAILURE_HEADLINE, LINK_FAILURE_HEADLINE,
        UPLOAD_FAILURE_HEADLINE,
    },
    state::AppState,
    tutor_task::run_tutor,
};
use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use snapstudy_core::domain::RawInput;
use std::sync::Arc;
use uuid::Uuid;

/// List all sessions in creation order.
#[utoipa::path(
    get,
    path = "/api/sessions",
    responses(
        (status = 200, description = "All sessions and the current one", body = SessionListResponse)
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<SessionListResponse> {
    let store = app_state.sessions.lock().await;
    let current_id = store.current_id();
    Json(SessionListResponse {
        current_session_id: current_id,
        sessions: store
            .sessions()
            .iter()
            .map(|s| SessionSummary::from_session(s, current_id))
            .collect(),
    })
}

/// Start a new, empty session and make it current.
#[utoipa::path(
    post,
    path = "/api/sessions",
    responses(
        (status = 201, description = "Session created", body = SessionSummary)
    )
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let mut store = app_state.sessions.lock().await;
    let id = store.create_session();
    let summary = SessionSummary::from_session(store.get(id)?, id);
    Ok((StatusCode::CREATED, Json(summary)))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 200, description = "The session", body = SessionView),
        (status = 404, description = "No such session", body = ErrorBody)
    )
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ErrorResponse> {
    let store = app_state.sessions.lock().await;
    let session = store.get(id)?;
    Ok(Json(SessionView::from_session(session, store.current_id())))
}

/// Make an existing session the current one.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/select",
    params(("id" = Uuid, Path, description = "The session ID.")),
    responses(
        (status = 200, description = "Session selected", body = SessionSummary),
        (status = 404, description = "No such session", body = ErrorBody)
    )
)]
pub async fn select_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, ErrorResponse> {
    let mut store = app_state.sessions.lock().await;
    store.select(id)?;
    Ok(Json(SessionSummary::from_session(store.get(id)?, id)))
}

/// Generate materials for a session from pasted text or a link.
///
/// Exactly one of `text` or `link` must be given. On success the session's
/// materials are replaced and returned; on failure they are left untouched.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/generate",
    params(("id" = Uuid, Path, description = "The session ID.")),
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "The new materials, or a message when the link is empty", body = StudyMaterialsResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 404, description = "No such session", body = ErrorBody),
        (status = 409, description = "A generation is already running for this session", body = ErrorBody),
        (status = 502, description = "The model reply could not be normalized", body = ErrorBody)
    )
)]
pub async fn generate_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ErrorResponse> {
    let Json(request) = payload?;
    let (input, headline) = match (required(request.text), required(request.link)) {
        (Some(text), None) => (RawInput::Text(text), CONTENT_FAILURE_HEADLINE),
        (None, Some(link)) => (RawInput::Link(link), LINK_FAILURE_HEADLINE),
        (Some(_), Some(_)) => {
            return Err(ErrorResponse::bad_request(
                "Provide either text or a link, not both.",
            ))
        }
        (None, None) => return Err(ErrorResponse::bad_request("Content is required")),
    };

    let outcome = run_generation(app_state, id, input)
        .await
        .map_err(|e| ErrorResponse::from(e).context(headline))?;
    Ok(generation_response(outcome))
}

/// Generate materials for a session from an uploaded document.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/generate/upload",
    params(("id" = Uuid, Path, description = "The session ID.")),
    request_body(content_type = "multipart/form-data", description = "The document to study."),
    responses(
        (status = 200, description = "The new materials", body = StudyMaterialsResponse),
        (status = 400, description = "Missing file, unsupported type or empty extraction", body = ErrorBody),
        (status = 404, description = "No such session", body = ErrorBody),
        (status = 409, description = "A generation is already running for this session", body = ErrorBody)
    )
)]
pub async fn generate_upload_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, ErrorResponse> {
    let file = read_upload(multipart).await?;
    let outcome = run_generation(app_state, id, RawInput::File(file))
        .await
        .map_err(|e| ErrorResponse::from(e).context(UPLOAD_FAILURE_HEADLINE))?;
    Ok(generation_response(outcome))
}

/// Ask the session's tutor a question about its materials.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/ask",
    params(("id" = Uuid, Path, description = "The session ID.")),
    request_body = SessionQuestionRequest,
    responses(
        (status = 200, description = "The tutor's answer", body = AnswerResponse),
        (status = 400, description = "Question missing", body = ErrorBody),
        (status = 404, description = "No such session", body = ErrorBody),
        (status = 409, description = "A question is already being answered for this session", body = ErrorBody),
        (status = 500, description = "The model call failed", body = ErrorBody)
    )
)]
pub async fn ask_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<SessionQuestionRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ErrorResponse> {
    let Json(request) = payload?;
    let question = required(request.question)
        .ok_or_else(|| ErrorResponse::bad_request("Question is required."))?;

    let answer = run_tutor(app_state, id, question)
        .await
        .map_err(|e| ErrorResponse::from(e).context(ASK_FAILURE_HEADLINE))?;
    Ok(Json(AnswerResponse { answer }))
}

fn generation_response(outcome: GenerationOutcome) -> Response {
    match outcome {
        GenerationOutcome::Generated(study_materials) => {
            Json(StudyMaterialsResponse { study_materials }).into_response()
        }
        GenerationOutcome::NoContentFound => Json(MessageResponse {
            message: NO_CONTENT_FOUND_MESSAGE.to_string(),
        })
        .into_response(),
    }
}
