//! Core library for the SmartMemory superadmin console.
//!
//! This crate contains the authenticated API access core:
//! - `api`: request execution with bearer tokens and one-shot refresh recovery
//! - `auth`: durable credentials and the privileged console session
//! - `report`: the error-reporting hook and its implementations
//! - `config`: console configuration
//! - `context`: process-wide wiring of the above
//! - `models`: payloads exchanged with the backend

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod models;
pub mod report;

#[cfg(test)]
mod test_support;

pub use api::{AdminApi, ApiError, AuthRequiredReason, RefreshCoordinator, RequestDescriptor, RequestExecutor};
pub use auth::{CredentialPair, CredentialStore, SessionManager, SessionState};
pub use config::Config;
pub use context::AdminContext;
pub use models::Identity;
pub use report::{ErrorReporter, Severity};
