//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the stateless REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    errors::{ErrorBody, ErrorResponse},
    ingest::{ingest, read_upload, NO_CONTENT_FOUND_MESSAGE},
    protocol::{
        AnswerResponse, AskRequest, ContentRequest, GenerateRequest, LinkRequest,
        MessageResponse, ModelReplyResponse, SessionListResponse, SessionQuestionRequest,
        SessionSummary, SessionView, StudyMaterialsResponse,
    },
    sessions,
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use snapstudy_core::{
    domain::{FetchOutcome, RawInput},
    normalizer,
    ports::PortError,
};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        response_handler,
        upload_handler,
        link_handler,
        ask_handler,
        normalize_handler,
        sessions::list_sessions_handler,
        sessions::create_session_handler,
        sessions::get_session_handler,
        sessions::select_session_handler,
        sessions::generate_handler,
        sessions::generate_upload_handler,
        sessions::ask_session_handler,
    ),
    components(
        schemas(
            ContentRequest, LinkRequest, AskRequest, GenerateRequest, SessionQuestionRequest,
            ModelReplyResponse, MessageResponse, AnswerResponse, StudyMaterialsResponse,
            SessionSummary, SessionListResponse, SessionView, ErrorBody
        )
    ),
    tags(
        (name = "SnapStudy API", description = "Turns pasted text, links and documents into study materials.")
    )
)]
pub struct ApiDoc;

pub const UPLOAD_FAILURE_HEADLINE: &str = "Failed to process the file and call the AI";
pub const LINK_FAILURE_HEADLINE: &str = "Failed to process the link and call the AI.";
pub const CONTENT_FAILURE_HEADLINE: &str = "Failed to call the AI";
pub const ASK_FAILURE_HEADLINE: &str = "Failed to process the request.";

/// Treats a blank string the same as a missing one.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate study materials from pasted text.
///
/// Returns the model's reply verbatim; the client normalizes it.
#[utoipa::path(
    post,
    path = "/api/response",
    request_body = ContentRequest,
    responses(
        (status = 200, description = "Raw model reply", body = ModelReplyResponse),
        (status = 400, description = "Content is missing", body = ErrorBody),
        (status = 500, description = "The model call failed", body = ErrorBody)
    )
)]
pub async fn response_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<ModelReplyResponse>, ErrorResponse> {
    let Json(request) = payload?;
    let content = required(request.content)
        .ok_or_else(|| ErrorResponse::bad_request("Content is required"))?;

    let outcome = ingest(&app_state, &RawInput::Text(content)).await?;
    reply_for(&app_state, outcome)
        .await
        .map_err(|e| ErrorResponse::from(e).context(CONTENT_FAILURE_HEADLINE))
}

/// Generate study materials from an uploaded document.
///
/// Accepts a multipart/form-data request with a single part named `file`.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "The document to study."),
    responses(
        (status = 200, description = "Raw model reply", body = ModelReplyResponse),
        (status = 400, description = "Missing file, unsupported type or empty extraction", body = ErrorBody),
        (status = 500, description = "Extraction or model failure", body = ErrorBody)
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ModelReplyResponse>, ErrorResponse> {
    let file = read_upload(multipart).await?;
    let result = async {
        let outcome = ingest(&app_state, &RawInput::File(file)).await?;
        reply_for(&app_state, outcome).await
    }
    .await;
    result.map_err(|e| ErrorResponse::from(e).context(UPLOAD_FAILURE_HEADLINE))
}

/// Generate study materials from the text behind a link.
///
/// An empty page is reported with `{message}` and a 200 status.
#[utoipa::path(
    post,
    path = "/api/link",
    request_body = LinkRequest,
    responses(
        (status = 200, description = "Raw model reply, or a message when the page is empty", body = ModelReplyResponse),
        (status = 400, description = "Missing link or unsupported content type", body = ErrorBody),
        (status = 500, description = "The model call failed", body = ErrorBody)
    )
)]
pub async fn link_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<LinkRequest>, JsonRejection>,
) -> Result<Response, ErrorResponse> {
    let Json(request) = payload?;
    let link = required(request.link).ok_or_else(|| {
        ErrorResponse::bad_request("Please provide a link in the request body.")
    })?;

    let outcome = ingest(&app_state, &RawInput::Link(link.clone()))
        .await
        .map_err(|e| ErrorResponse::from(e).context(LINK_FAILURE_HEADLINE))?;
    if outcome == FetchOutcome::NoContentFound {
        info!("Link '{}' had no text content.", link);
        return Ok(Json(MessageResponse {
            message: NO_CONTENT_FOUND_MESSAGE.to_string(),
        })
        .into_response());
    }

    let reply = reply_for(&app_state, outcome)
        .await
        .map_err(|e| ErrorResponse::from(e).context(LINK_FAILURE_HEADLINE))?;
    Ok(reply.into_response())
}

/// Answer a follow-up question against client-supplied context.
#[utoipa::path(
    post,
    path = "/api/ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "The tutor's answer", body = AnswerResponse),
        (status = 400, description = "Question or context missing", body = ErrorBody),
        (status = 500, description = "The model call failed", body = ErrorBody)
    )
)]
pub async fn ask_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ErrorResponse> {
    let Json(request) = payload?;
    let (Some(question), Some(context)) = (required(request.question), required(request.ai_content))
    else {
        return Err(ErrorResponse::bad_request(
            "Question and AI content are required.",
        ));
    };

    let answer = app_state
        .orchestrator
        .answer_question(question.trim(), &context)
        .await
        .map_err(|e| ErrorResponse::from(e).context(ASK_FAILURE_HEADLINE))?;
    Ok(Json(AnswerResponse { answer }))
}

/// Normalize a model reply, in any of its envelopes, into study materials.
#[utoipa::path(
    post,
    path = "/api/normalize",
    request_body(content = Object, description = "A `{response}`, `{data: {response}}` or `{data: {...}}` envelope."),
    responses(
        (status = 200, description = "Normalized study materials", body = StudyMaterialsResponse),
        (status = 400, description = "Body is not JSON", body = ErrorBody),
        (status = 422, description = "The reply could not be normalized", body = ErrorBody)
    )
)]
pub async fn normalize_handler(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<StudyMaterialsResponse>, ErrorResponse> {
    let Json(body) = payload?;
    let study_materials = normalizer::normalize_envelope(body).map_err(|e| {
        let unprocessable = matches!(
            e,
            PortError::MalformedResponse { .. } | PortError::MissingStudyMaterials
        );
        let mut response = ErrorResponse::from(e);
        if unprocessable {
            response.status = StatusCode::UNPROCESSABLE_ENTITY;
        }
        response
    })?;
    Ok(Json(StudyMaterialsResponse { study_materials }))
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Invokes the model for ingested content. `NoContentFound` never reaches the
/// model; the handlers that can produce it answer before calling this.
async fn reply_for(
    app_state: &AppState,
    outcome: FetchOutcome,
) -> Result<Json<ModelReplyResponse>, PortError> {
    let extracted = match outcome {
        FetchOutcome::Content(extracted) => extracted,
        FetchOutcome::NoContentFound => {
            return Err(PortError::InputValidation(NO_CONTENT_FOUND_MESSAGE.to_string()))
        }
    };
    let response = app_state.orchestrator.generate_materials(&extracted).await?;
    Ok(Json(ModelReplyResponse { response }))
}
