//! Process-wide wiring.
//!
//! `AdminContext` is built once at startup and owns the one session of the
//! process. Everything that talks to the API gets its collaborators from
//! here rather than from global state.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::{AdminApi, RefreshCoordinator, RequestExecutor, ReqwestTransport, Transport};
use crate::auth::{CredentialStore, FileCredentialStore, KeyringCredentialStore, SessionManager};
use crate::config::{Config, CredentialBackend};
use crate::report::{ErrorReporter, HttpReporter, TracingReporter};

pub struct AdminContext {
    pub config: Config,
    pub api: AdminApi,
    pub session: SessionManager,
}

impl AdminContext {
    /// Build the context from configuration with the real transport,
    /// configured credential backend and reporter.
    pub fn new(config: Config) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;

        let credentials: Arc<dyn CredentialStore> = match config.credential_backend {
            CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::new()),
            CredentialBackend::File => {
                let path = FileCredentialStore::default_path()
                    .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
                Arc::new(FileCredentialStore::open(&path).context("Failed to open credential file")?)
            }
        };

        let reporter: Arc<dyn ErrorReporter> = match config.tracking_endpoint() {
            Some(endpoint) => {
                info!(%endpoint, "Error tracking enabled");
                Arc::new(HttpReporter::new(transport.client().clone(), endpoint))
            }
            None => Arc::new(TracingReporter::new()),
        };

        Ok(Self::with_parts(config, Arc::new(transport), credentials, reporter))
    }

    /// Build the context from explicit collaborators.
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        debug!(base_url = %config.api_base_url, backend = ?config.credential_backend, "Building context");
        let executor = RequestExecutor::new(&config.api_base_url, transport, credentials, reporter);
        let coordinator = RefreshCoordinator::new(executor);

        Self {
            config,
            api: AdminApi::new(coordinator.clone()),
            session: SessionManager::new(coordinator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionState;
    use crate::test_support::{identity_json, Harness, Scripted};
    use serde_json::json;

    fn context_for(harness: &Harness) -> AdminContext {
        let config = Config {
            api_base_url: "http://api.test/".into(),
            ..Default::default()
        };
        AdminContext::with_parts(
            config,
            harness.transport.clone(),
            harness.store.clone(),
            harness.reporter.clone(),
        )
    }

    #[tokio::test]
    async fn test_login_then_admin_call_shares_credentials() {
        let harness = Harness::new(vec![Scripted::json(
            200,
            json!({
                "user": identity_json("admin@x.com", &["superadmin"]),
                "tokens": {"access_token": "A1", "refresh_token": "R1"},
            }),
        )]);
        let mut ctx = context_for(&harness);

        ctx.session.login("admin@x.com", "pw").await.unwrap();
        harness
            .transport
            .push(Scripted::json(200, json!({"users": 42})));
        let stats = ctx.api.system_stats().await.unwrap();

        assert_eq!(stats, Some(json!({"users": 42})));
        let sent = harness.transport.sent();
        assert_eq!(sent[1].url, "http://api.test/superadmin/stats");
        assert_eq!(sent[1].authorization(), Some("Bearer A1"));
    }

    #[tokio::test]
    async fn test_expired_background_call_degrades_session_on_next_bootstrap() {
        let harness = Harness::new(vec![Scripted::status(401, "")]);
        harness.store.set_access(Some("A1")).unwrap();
        let mut ctx = context_for(&harness);

        let err = ctx.api.system_health().await.unwrap_err();
        assert!(err.is_auth_failure());

        ctx.session.bootstrap().await;
        assert_eq!(ctx.session.state(), &SessionState::Unauthenticated);
        assert_eq!(harness.transport.sent().len(), 1);
    }
}
