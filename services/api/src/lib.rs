//! services/api/src/lib.rs
//!
//! The library half of the `api` service, shared by the server binary, the
//! OpenAPI generator and the integration tests.

pub mod adapters;
pub mod config;
pub mod error;
pub mod extraction;
pub mod web;
