//! crates/snapstudy_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: the core never
//! talks to a model vendor or the network directly, only through these ports.

use async_trait::async_trait;

use crate::domain::FetchOutcome;
use crate::session_store::CallFamily;

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// The error taxonomy shared by every stage of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Unsupported file type: {media_type}")]
    UnsupportedMediaType {
        media_type: String,
        supported: Vec<String>,
    },

    #[error("Unsupported content type: {0}. Only plain text and HTML are supported.")]
    UnsupportedContentType(String),

    #[error("Failed to extract content from {0}")]
    ExtractionFailed(String),

    #[error("Failed to fetch content from the link: upstream returned {status}")]
    UpstreamFetch { status: u16, reason: String },

    #[error("Received empty response from the model")]
    EmptyModelResponse,

    #[error("The model response is not valid JSON")]
    MalformedResponse { excerpt: String },

    #[error("The model response is missing the studyMaterials object")]
    MissingStudyMaterials,

    #[error("A {0} request is already in progress for this session")]
    SessionBusy(CallFamily),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Model Invocation
//=========================================================================================

/// Which of the two call families a model request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPurpose {
    Generation,
    Tutor,
}

/// A single, fully rendered model invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub purpose: ModelPurpose,
    pub instructions: String,
    pub input: String,
}

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Sends one request to the model and returns its raw textual reply.
    async fn complete(&self, request: &ModelRequest) -> PortResult<String>;
}

//=========================================================================================
// Link Fetching
//=========================================================================================

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Performs a single GET against `url` and returns its readable text.
    async fn fetch(&self, url: &str) -> PortResult<FetchOutcome>;
}
