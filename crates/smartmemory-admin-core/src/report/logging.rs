use std::error::Error as StdError;
use std::sync::RwLock;

use super::{log_exception, ErrorReporter, ReportContext, ReportIdentity, Severity};
use crate::models::Identity;

/// Reporter that writes captured errors to the tracing log.
#[derive(Debug, Default)]
pub struct TracingReporter {
    identity: RwLock<Option<ReportIdentity>>,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Option<ReportIdentity> {
        self.identity
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ErrorReporter for TracingReporter {
    fn report_exception(&self, err: &dyn StdError, severity: Severity, context: ReportContext) {
        let user = self.identity().map(|u| u.email).unwrap_or_default();
        log_exception(err, severity, &context, &user);
    }

    fn set_identity(&self, identity: Option<&Identity>) {
        *self
            .identity
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = identity.map(ReportIdentity::from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        serde_json::from_str(r#"{"id": "u-1", "email": "admin@x.com", "roles": ["superadmin"]}"#)
            .unwrap()
    }

    #[test]
    fn test_set_identity_attaches_and_detaches() {
        let reporter = TracingReporter::new();
        assert!(reporter.identity().is_none());

        reporter.set_identity(Some(&identity()));
        assert_eq!(
            reporter.identity(),
            Some(ReportIdentity {
                id: "u-1".into(),
                email: "admin@x.com".into()
            })
        );

        reporter.set_identity(None);
        assert!(reporter.identity().is_none());
    }
}
