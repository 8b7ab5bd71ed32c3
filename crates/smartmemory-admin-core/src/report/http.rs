use std::error::Error as StdError;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::{log_exception, ErrorReporter, ReportContext, ReportIdentity, Severity};
use crate::models::Identity;

/// JSON document delivered to the error-tracking endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub message: String,
    pub level: Severity,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<ReportContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ReportIdentity>,
}

/// Reporter that POSTs each capture to an error-tracking service.
///
/// Delivery is fire-and-forget on the current tokio runtime; a failed
/// delivery is logged and otherwise ignored so reporting never turns into a
/// second failure for the caller.
pub struct HttpReporter {
    client: Client,
    endpoint: String,
    identity: RwLock<Option<ReportIdentity>>,
}

impl HttpReporter {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            identity: RwLock::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn identity(&self) -> Option<ReportIdentity> {
        self.identity
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn build_report(
        &self,
        message: String,
        level: Severity,
        tags: Option<ReportContext>,
    ) -> ErrorReport {
        ErrorReport {
            message,
            level,
            timestamp: Utc::now(),
            tags,
            user: self.identity(),
        }
    }

    fn deliver(&self, report: ErrorReport) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, dropping error report");
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        handle.spawn(async move {
            match client.post(&endpoint).json(&report).send().await {
                Ok(resp) if resp.status().is_success() => debug!("Error report delivered"),
                Ok(resp) => warn!(status = resp.status().as_u16(), "Error tracking service rejected report"),
                Err(e) => warn!(error = %e, "Failed to send error to tracking service"),
            }
        });
    }
}

impl ErrorReporter for HttpReporter {
    fn report_exception(&self, err: &dyn StdError, severity: Severity, context: ReportContext) {
        let user = self.identity().map(|u| u.email).unwrap_or_default();
        log_exception(err, severity, &context, &user);
        let report = self.build_report(err.to_string(), severity, Some(context));
        self.deliver(report);
    }

    fn set_identity(&self, identity: Option<&Identity>) {
        *self
            .identity
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = identity.map(ReportIdentity::from);
    }

    fn capture_message(&self, message: &str, severity: Severity) {
        let report = self.build_report(message.to_string(), severity, None);
        self.deliver(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{self, Layer};
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_report_includes_identity_and_tags() {
        let reporter = HttpReporter::new(Client::new(), "http://localhost:9/errors");
        let identity: Identity = serde_json::from_str(
            r#"{"id": "u-1", "email": "admin@x.com", "roles": ["superadmin"]}"#,
        )
        .unwrap();
        reporter.set_identity(Some(&identity));

        let report = reporter.build_report(
            "Superadmin access required".into(),
            Severity::Warning,
            Some(ReportContext::status("/superadmin/stats", 403)),
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["message"], "Superadmin access required");
        assert_eq!(json["level"], "warning");
        assert_eq!(json["tags"]["status"], 403);
        assert_eq!(json["user"]["email"], "admin@x.com");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_message_report_omits_missing_fields() {
        let reporter = HttpReporter::new(Client::new(), "http://localhost:9/errors");
        let report = reporter.build_report("hello".into(), Severity::Info, None);
        let json = serde_json::to_value(&report).unwrap();

        assert!(json.get("tags").is_none());
        assert!(json.get("user").is_none());
    }

    #[derive(Clone, Default)]
    struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for LevelRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: layer::Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    #[test]
    fn test_warning_is_not_logged_as_error() {
        let reporter = HttpReporter::new(Client::new(), "http://localhost:9/errors");
        let recorder = LevelRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());

        tracing::subscriber::with_default(subscriber, || {
            reporter.report_exception(
                &std::io::Error::new(std::io::ErrorKind::Other, "Session expired"),
                Severity::Warning,
                ReportContext::status("/superadmin/stats", 401),
            );
        });

        let levels = recorder.0.lock().unwrap().clone();
        assert!(levels.contains(&Level::WARN));
        assert!(!levels.contains(&Level::ERROR));
    }

    #[test]
    fn test_deliver_without_runtime_does_not_panic() {
        let reporter = HttpReporter::new(Client::new(), "http://localhost:9/errors");
        reporter.capture_message("outside runtime", Severity::Info);
    }
}
