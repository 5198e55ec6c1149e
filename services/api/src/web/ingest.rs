//! services/api/src/web/ingest.rs
//!
//! Routes a raw input to the component that turns it into plain text:
//! pasted text passes through, links go to the fetcher, files to the extractor.

use axum::extract::Multipart;
use snapstudy_core::domain::{ExtractedText, FetchOutcome, RawInput, UploadedFile};
use snapstudy_core::ports::{PortError, PortResult};
use tracing::info;

use crate::extraction;
use crate::web::state::AppState;

/// The multipart field carrying the uploaded document.
pub const FILE_FIELD: &str = "file";

pub const NO_CONTENT_FOUND_MESSAGE: &str = "No text content found at the provided link.";

/// Produces the text to send to the model, or `NoContentFound` for a link
/// whose page is empty.
pub async fn ingest(app_state: &AppState, input: &RawInput) -> PortResult<FetchOutcome> {
    match input {
        RawInput::Text(text) => {
            if text.trim().is_empty() {
                return Err(PortError::InputValidation("Content is required".to_string()));
            }
            Ok(FetchOutcome::Content(ExtractedText::from_text(text.trim())))
        }
        RawInput::Link(link) => {
            if link.trim().is_empty() {
                return Err(PortError::InputValidation(
                    "Please provide a link in the request body.".to_string(),
                ));
            }
            app_state.fetcher.fetch(link).await
        }
        RawInput::File(file) => extraction::extract(file.clone())
            .await
            .map(FetchOutcome::Content),
    }
}

/// Reads the single `file` field out of a multipart upload. Other fields are ignored.
pub async fn read_upload(mut multipart: Multipart) -> PortResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PortError::InputValidation(format!("Upload error: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("untitled").to_string();
        let media_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| PortError::InputValidation(format!("Upload error: {}", e)))?;

        info!(
            "Received upload '{}' ({}, {} bytes).",
            file_name,
            media_type.as_deref().unwrap_or("no media type"),
            bytes.len()
        );
        return Ok(UploadedFile {
            file_name,
            media_type,
            bytes,
        });
    }
    Err(PortError::InputValidation("No file uploaded.".to_string()))
}
