//! Error reporting hook.
//!
//! The API core reports classified failures through the [`ErrorReporter`]
//! trait and never depends on a concrete tracking service. Two reporters are
//! provided:
//! - `TracingReporter`: writes captured errors to the log (local development)
//! - `HttpReporter`: forwards reports as JSON to an error-tracking endpoint

pub mod http;
pub mod logging;

use std::error::Error as StdError;

use serde::Serialize;

use crate::models::Identity;

pub use http::{ErrorReport, HttpReporter};
pub use logging::TracingReporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Tags attached to a captured exception.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportContext {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ReportContext {
    pub fn status(endpoint: &str, status: u16) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn request_failed(endpoint: &str, status: u16, method: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: Some(status),
            method: Some(method.to_string()),
            kind: None,
        }
    }

    pub fn network(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            kind: Some("network_error".to_string()),
            ..Default::default()
        }
    }
}

/// The identity fields forwarded with every report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportIdentity {
    pub id: String,
    pub email: String,
}

impl From<&Identity> for ReportIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
        }
    }
}

/// Log a captured exception at the level matching its severity.
pub(crate) fn log_exception(err: &dyn StdError, severity: Severity, context: &ReportContext, user: &str) {
    let ReportContext {
        endpoint,
        status,
        method,
        kind,
    } = context;

    match severity {
        Severity::Error => tracing::error!(
            error = %err, %endpoint, ?status, ?method, ?kind, %user,
            "Error captured"
        ),
        Severity::Warning => tracing::warn!(
            error = %err, %endpoint, ?status, ?method, ?kind, %user,
            "Error captured"
        ),
        Severity::Info => tracing::info!(
            error = %err, %endpoint, ?status, ?method, ?kind, %user,
            "Error captured"
        ),
    }
}

pub trait ErrorReporter: Send + Sync {
    fn report_exception(&self, error: &dyn StdError, severity: Severity, context: ReportContext);

    /// Attach (or with `None`, detach) the signed-in identity.
    fn set_identity(&self, identity: Option<&Identity>);

    fn capture_message(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::error!(text = message, "Message captured"),
            Severity::Warning => tracing::warn!(text = message, "Message captured"),
            Severity::Info => tracing::info!(text = message, "Message captured"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_serializes_only_present_tags() {
        let json = serde_json::to_value(ReportContext::status("/superadmin/stats", 403)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"endpoint": "/superadmin/stats", "status": 403})
        );
    }

    #[test]
    fn test_network_context_uses_type_tag() {
        let json = serde_json::to_value(ReportContext::network("/auth/me")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"endpoint": "/auth/me", "type": "network_error"})
        );
    }

    #[test]
    fn test_request_failed_context() {
        let ctx = ReportContext::request_failed("/superadmin/tenants/9", 500, "DELETE");
        assert_eq!(ctx.status, Some(500));
        assert_eq!(ctx.method.as_deref(), Some("DELETE"));
        assert!(ctx.kind.is_none());
    }
}
