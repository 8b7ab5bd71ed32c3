//! Authentication module for credentials and the console session.
//!
//! This module provides:
//! - `CredentialStore`: durable access/refresh token slots (keychain or file)
//! - `SessionManager`: bootstrap, login and logout with the privileged-role gate

pub mod credentials;
pub mod session;

pub use credentials::{
    CredentialError, CredentialPair, CredentialStore, FileCredentialStore, KeyringCredentialStore,
};
pub use session::{SessionManager, SessionState, PRIVILEGED_ACCESS_REQUIRED, PRIVILEGED_ROLE};
