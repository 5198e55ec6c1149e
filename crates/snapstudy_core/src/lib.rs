pub mod domain;
pub mod materials;
pub mod normalizer;
pub mod ports;
pub mod prompt;
pub mod session_store;
pub mod tutor_context;

pub use domain::{
    ChatMessage, ChatRole, ExtractedText, FetchOutcome, RawInput, SourceKind, UploadedFile,
};
pub use materials::StudyMaterials;
pub use ports::{
    ContentFetcher, LanguageModelService, ModelPurpose, ModelRequest, PortError, PortResult,
};
pub use prompt::PromptOrchestrator;
pub use session_store::{CallFamily, InFlight, Session, SessionStore};
