//! Authenticated client for the SmartMemory REST API.
//!
//! Layers, from the wire up:
//! - `transport`: the HTTP boundary (`Transport` trait, reqwest implementation)
//! - `executor`: one call with the bearer token attached, typed failures
//! - `refresh`: 401 recovery through the refresh endpoint, one retry at most
//! - `admin`: superadmin endpoints expressed as calls through the coordinator

pub mod admin;
pub mod error;
pub mod executor;
pub mod refresh;
pub mod request;
pub mod transport;

pub use admin::AdminApi;
pub use error::{ApiError, AuthRequiredReason};
pub use executor::RequestExecutor;
pub use refresh::{RefreshCoordinator, REFRESH_PATH};
pub use request::{decode, RequestDescriptor};
pub use transport::{
    HttpRequest, HttpResponse, NetworkErrorKind, ReqwestTransport, Transport, TransportError,
};
