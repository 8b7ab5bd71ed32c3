//! Data models exchanged with the SmartMemory backend.
//!
//! - `Identity`: the signed-in account and its roles
//! - Auth payloads: `LoginRequest`, `LoginResponse`, `TokenPair`, `RefreshResponse`
//! - Admin query types: `PageParams`, `ActivityFilters`

pub mod admin;
pub mod identity;

pub use admin::{ActivityFilters, PageParams};
pub use identity::{Identity, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, TokenPair};
