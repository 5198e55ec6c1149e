//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API
//! server.
//!
//! Required request fields are declared optional so that a missing field is
//! answered with the shared error envelope rather than a deserializer message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snapstudy_core::{ChatMessage, Session, SourceKind, StudyMaterials};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ContentRequest {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LinkRequest {
    pub link: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct AskRequest {
    pub question: Option<String>,
    pub ai_content: Option<String>,
}

/// Input for a session generation: exactly one of `text` or `link`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct GenerateRequest {
    pub text: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SessionQuestionRequest {
    pub question: Option<String>,
}

//=========================================================================================
// Responses
//=========================================================================================

/// The raw model text, exactly as the model produced it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModelReplyResponse {
    pub response: String,
}

/// An informational outcome that is not an error, e.g. an empty web page.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnswerResponse {
    pub answer: String,
}

/// A normalized record under its `studyMaterials` key.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudyMaterialsResponse {
    #[schema(value_type = Object)]
    pub study_materials: StudyMaterials,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_current: bool,
    pub is_generating: bool,
    pub is_answering: bool,
    pub has_materials: bool,
    pub message_count: usize,
}

impl SessionSummary {
    pub fn from_session(session: &Session, current_id: Uuid) -> Self {
        Self {
            id: session.id,
            created_at: session.created_at,
            is_current: session.id == current_id,
            is_generating: session.is_generating(),
            is_answering: session.is_answering(),
            has_materials: !session.materials.is_empty(),
            message_count: session.chat_history.len(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub current_session_id: Uuid,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub summary: SessionSummary,
    #[schema(value_type = Option<String>)]
    pub input_kind: Option<SourceKind>,
    #[schema(value_type = Object)]
    pub materials: StudyMaterials,
    #[schema(value_type = Vec<Object>)]
    pub chat_history: Vec<ChatMessage>,
}

impl SessionView {
    pub fn from_session(session: &Session, current_id: Uuid) -> Self {
        Self {
            summary: SessionSummary::from_session(session, current_id),
            input_kind: session.raw_input.as_ref().map(|input| input.kind()),
            materials: session.materials.clone(),
            chat_history: session.chat_history.clone(),
        }
    }
}
