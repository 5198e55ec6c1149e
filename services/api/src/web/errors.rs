//! services/api/src/web/errors.rs
//!
//! Maps pipeline errors onto HTTP statuses and the shared `{error, details?}`
//! response body.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use snapstudy_core::ports::PortError;
use tracing::error;
use utoipa::ToSchema;

use crate::extraction;

/// The body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details: None,
            },
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.body.details = Some(details.into());
        self
    }

    /// For server-side failures, replaces the headline with `headline` and
    /// keeps the original message as the details. Client errors are untouched.
    pub fn context(mut self, headline: &str) -> Self {
        if self.status.is_server_error() {
            let original = std::mem::replace(&mut self.body.error, headline.to_string());
            if self.body.details.is_none() {
                self.body.details = Some(original);
            }
        }
        self
    }
}

impl From<PortError> for ErrorResponse {
    fn from(err: PortError) -> Self {
        let message = err.to_string();
        match err {
            PortError::InputValidation(_)
            | PortError::UnsupportedContentType(_)
            | PortError::ExtractionFailed(_) => Self::bad_request(message),
            PortError::UnsupportedMediaType {
                media_type,
                supported,
            } => {
                let details = match extraction::unsupported_note(&media_type) {
                    Some(note) => note.to_string(),
                    None => format!("Supported types: {}", supported.join(", ")),
                };
                Self::bad_request(message).with_details(details)
            }
            PortError::UpstreamFetch { status, reason } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                Self::new(
                    status,
                    format!("Failed to fetch content from the link: {}", reason),
                )
            }
            PortError::SessionNotFound(_) => Self::new(StatusCode::NOT_FOUND, message),
            PortError::SessionBusy(_) => Self::new(StatusCode::CONFLICT, message),
            PortError::MalformedResponse { excerpt } => {
                Self::new(StatusCode::BAD_GATEWAY, message).with_details(excerpt)
            }
            PortError::MissingStudyMaterials => Self::new(StatusCode::BAD_GATEWAY, message),
            PortError::EmptyModelResponse => Self::new(StatusCode::INTERNAL_SERVER_ERROR, message),
            PortError::Unexpected(details) => {
                error!("Unexpected pipeline failure: {}", details);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred")
                    .with_details(details)
            }
        }
    }
}

impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("Request body must be a JSON object").with_details(rejection.body_text())
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_mirrored() {
        let response = ErrorResponse::from(PortError::UpstreamFetch {
            status: 404,
            reason: "Not Found".into(),
        });
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.error.contains("Not Found"));
    }

    #[test]
    fn context_only_rewrites_server_errors() {
        let server = ErrorResponse::from(PortError::Unexpected("pdf exploded".into()))
            .context("Failed to process the file and call the AI");
        assert_eq!(server.body.error, "Failed to process the file and call the AI");
        assert_eq!(server.body.details.as_deref(), Some("pdf exploded"));

        let client = ErrorResponse::from(PortError::ExtractionFailed("a.txt".into()))
            .context("Failed to process the file and call the AI");
        assert_eq!(client.status, StatusCode::BAD_REQUEST);
        assert!(client.body.error.contains("a.txt"));
    }

    #[test]
    fn busy_sessions_conflict() {
        let response = ErrorResponse::from(PortError::SessionBusy(
            snapstudy_core::CallFamily::Generation,
        ));
        assert_eq!(response.status, StatusCode::CONFLICT);
    }
}
