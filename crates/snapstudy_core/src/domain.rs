//! crates/snapstudy_core/src/domain.rs
//!
//! Defines the pure, core data structures that flow through the ingestion
//! pipeline: what the user submitted, what was extracted from it, and the chat
//! messages exchanged with the tutor.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Raw Input
//=========================================================================================

/// A single uploaded file, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    /// The media type declared by the client, possibly with parameters.
    pub media_type: Option<String>,
    pub bytes: Bytes,
}

/// What the user submitted for a session.
///
/// Being an enum, exactly one payload kind is ever populated: choosing a new
/// kind replaces the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    Text(String),
    Link(String),
    File(UploadedFile),
}

impl RawInput {
    pub fn kind(&self) -> SourceKind {
        match self {
            RawInput::Text(_) => SourceKind::Text,
            RawInput::Link(_) => SourceKind::Link,
            RawInput::File(_) => SourceKind::File,
        }
    }

    /// The user's own typed text, if this input is pasted text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawInput::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Text,
    Link,
    File,
}

//=========================================================================================
// Extraction Results
//=========================================================================================

/// Plain text pulled out of a raw input, together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub source_kind: SourceKind,
    /// The filename or URL the text was taken from. `None` for pasted text.
    pub origin: Option<String>,
}

impl ExtractedText {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_kind: SourceKind::Text,
            origin: None,
        }
    }

    pub fn from_file(text: impl Into<String>, file_name: &str) -> Self {
        Self {
            text: text.into(),
            source_kind: SourceKind::File,
            origin: Some(file_name.to_string()),
        }
    }

    pub fn from_link(text: impl Into<String>, url: &str) -> Self {
        Self {
            text: text.into(),
            source_kind: SourceKind::Link,
            origin: Some(url.to_string()),
        }
    }
}

/// The result of fetching a link.
///
/// An empty body is a legitimate outcome, reported to the user as information
/// rather than as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Content(ExtractedText),
    NoContentFound,
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Ai,
    System,
}

/// A single entry in a session's chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Ai, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }
}
