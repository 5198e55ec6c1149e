pub mod errors;
pub mod generation_task;
pub mod ingest;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod sessions;
pub mod state;
pub mod tutor_task;

// Re-export the router builder so the binary can assemble the server.
pub use router::build_router;
pub use state::AppState;
