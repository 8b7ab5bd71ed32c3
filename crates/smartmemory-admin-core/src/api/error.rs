use std::fmt;

use thiserror::Error;

use super::transport::{NetworkErrorKind, TransportError};
use crate::auth::CredentialError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - token may be expired")]
    AuthExpired { detail: Option<String> },

    #[error("Authentication required: {0}")]
    AuthRequired(AuthRequiredReason),

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] TransportError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error(transparent)]
    CredentialStorage(#[from] CredentialError),
}

/// Why a 401 could not be recovered through the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequiredReason {
    /// No refresh token was stored.
    NoRefreshToken,
    /// The request was already a retry when it was rejected.
    AlreadyRetried,
    /// The refresh endpoint itself answered 401.
    RefreshEndpoint,
    /// Refresh succeeded but the retried request was rejected again.
    RetryRejected,
    /// The refresh endpoint answered with a non-2xx status.
    RefreshRejected { status: u16 },
    /// The refresh endpoint could not be reached.
    RefreshUnreachable(NetworkErrorKind),
    /// The refresh response could not be used (bad body, storage failure).
    RefreshFailed(String),
}

impl fmt::Display for AuthRequiredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRefreshToken => write!(f, "no refresh token stored"),
            Self::AlreadyRetried => write!(f, "request was already retried"),
            Self::RefreshEndpoint => write!(f, "refresh endpoint rejected the session"),
            Self::RetryRejected => write!(f, "retried request was rejected after refresh"),
            Self::RefreshRejected { status } => write!(f, "token refresh rejected (HTTP {})", status),
            Self::RefreshUnreachable(kind) => write!(f, "token refresh failed ({})", kind),
            Self::RefreshFailed(reason) => write!(f, "token refresh failed: {}", reason),
        }
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Fallback text when an error body carries no usable detail
const GENERIC_FAILURE: &str = "Request failed";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Extract a human-readable message from an error body.
    ///
    /// Uses the `detail` field when the body is JSON and carries one, and
    /// falls back to a generic message with the status code otherwise.
    pub fn detail_message(status: u16, body: &str) -> String {
        Self::server_detail(body)
            .unwrap_or_else(|| format!("{} (HTTP {})", GENERIC_FAILURE, status))
    }

    /// The `detail` field of a JSON error body, if any.
    pub(crate) fn server_detail(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        match value.get("detail")? {
            serde_json::Value::String(s) if !s.is_empty() => Some(Self::truncate_body(s)),
            serde_json::Value::Null => None,
            other => Some(Self::truncate_body(&other.to_string())),
        }
    }

    pub fn request_failed(status: u16, body: &str) -> Self {
        ApiError::RequestFailed {
            status,
            message: Self::detail_message(status, body),
        }
    }

    /// HTTP status associated with this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthExpired { .. } | ApiError::AuthRequired(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures that mean the caller no longer has a usable session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::AuthExpired { .. } | ApiError::AuthRequired(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_message_uses_server_detail() {
        let body = r#"{"detail": "Tenant not found"}"#;
        assert_eq!(ApiError::detail_message(404, body), "Tenant not found");
    }

    #[test]
    fn test_detail_message_falls_back_on_non_json() {
        assert_eq!(
            ApiError::detail_message(502, "<html>Bad Gateway</html>"),
            "Request failed (HTTP 502)"
        );
        assert_eq!(ApiError::detail_message(500, ""), "Request failed (HTTP 500)");
    }

    #[test]
    fn test_detail_message_falls_back_without_detail_field() {
        assert_eq!(
            ApiError::detail_message(400, r#"{"error": "nope"}"#),
            "Request failed (HTTP 400)"
        );
    }

    #[test]
    fn test_detail_message_serializes_structured_detail() {
        let body = r#"{"detail": [{"loc": ["body", "email"], "msg": "field required"}]}"#;
        let message = ApiError::detail_message(422, body);
        assert!(message.contains("field required"));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated, 520 total bytes"));

        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::AuthExpired { detail: None }.status(), Some(401));
        assert_eq!(ApiError::Forbidden("no".into()).status(), Some(403));
        assert_eq!(ApiError::request_failed(409, "").status(), Some(409));
        assert_eq!(ApiError::InvalidResponse("bad".into()).status(), None);
    }

    #[test]
    fn test_auth_required_reason_display() {
        let err = ApiError::AuthRequired(AuthRequiredReason::RefreshRejected { status: 400 });
        assert_eq!(
            err.to_string(),
            "Authentication required: token refresh rejected (HTTP 400)"
        );
        assert!(err.is_auth_failure());
    }
}
