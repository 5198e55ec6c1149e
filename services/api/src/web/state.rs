//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler.

use snapstudy_core::ports::{ContentFetcher, LanguageModelService};
use snapstudy_core::{PromptOrchestrator, SessionStore};
use std::sync::Arc;
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: PromptOrchestrator,
    pub fetcher: Arc<dyn ContentFetcher>,
    /// The ordered session list. Locked only for short, non-awaiting sections;
    /// never held across a model call.
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl AppState {
    pub fn new(model: Arc<dyn LanguageModelService>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self {
            orchestrator: PromptOrchestrator::new(model),
            fetcher,
            sessions: Arc::new(Mutex::new(SessionStore::new())),
        }
    }
}
