//! Token refresh with a single retry.
//!
//! When a call is rejected with 401, the coordinator exchanges the stored
//! refresh token for a new access token and re-issues the call exactly once.
//! For any one logical call at most one refresh and one retry are sent, no
//! matter how many 401s are observed.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::error::AuthRequiredReason;
use super::executor::RequestExecutor;
use super::request::{decode, RequestDescriptor};
use super::ApiError;
use crate::models::{RefreshRequest, RefreshResponse};
use crate::report::{ReportContext, Severity};

/// Path of the token refresh endpoint
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Wraps a [`RequestExecutor`] with 401 recovery.
#[derive(Clone)]
pub struct RefreshCoordinator {
    executor: RequestExecutor,
    refresh_path: String,
}

impl RefreshCoordinator {
    pub fn new(executor: RequestExecutor) -> Self {
        Self {
            executor,
            refresh_path: REFRESH_PATH.to_string(),
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Option<Value>, ApiError> {
        match self.executor.execute(descriptor).await {
            Err(ApiError::AuthExpired { .. }) => {}
            other => return other,
        }

        let reason = if descriptor.is_retry() {
            AuthRequiredReason::AlreadyRetried
        } else if descriptor.path() == self.refresh_path {
            AuthRequiredReason::RefreshEndpoint
        } else {
            let stored = self.executor.credentials().get()?.refresh_token;
            match stored.filter(|token| !token.is_empty()) {
                None => AuthRequiredReason::NoRefreshToken,
                Some(refresh_token) => match self.refresh(&refresh_token).await {
                    Ok(()) => {
                        debug!(endpoint = %descriptor.path(), "Retrying with refreshed token");
                        match self.executor.execute(&descriptor.as_retry()).await {
                            Err(ApiError::AuthExpired { .. }) => AuthRequiredReason::RetryRejected,
                            other => return other,
                        }
                    }
                    Err(reason) => {
                        warn!(endpoint = %descriptor.path(), %reason, "Token refresh failed");
                        reason
                    }
                },
            }
        };

        Err(self.terminal(descriptor, reason))
    }

    /// Execute and deserialize the result.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T, ApiError> {
        decode(self.execute(descriptor).await?)
    }

    /// Exchange the refresh token for a new access token and store it.
    ///
    /// The call carries no bearer header and is never itself recovered.
    async fn refresh(&self, refresh_token: &str) -> Result<(), AuthRequiredReason> {
        let body = serde_json::to_value(RefreshRequest { refresh_token })
            .map_err(|e| AuthRequiredReason::RefreshFailed(e.to_string()))?;
        let descriptor = RequestDescriptor::post(&self.refresh_path).with_json(body);

        let response = match self.executor.dispatch(&descriptor, false).await {
            Ok(response) => response,
            Err(ApiError::NetworkError(e)) => {
                return Err(AuthRequiredReason::RefreshUnreachable(e.kind))
            }
            Err(e) => return Err(AuthRequiredReason::RefreshFailed(e.to_string())),
        };

        if !response.status.is_success() {
            return Err(AuthRequiredReason::RefreshRejected {
                status: response.status.as_u16(),
            });
        }

        let tokens: RefreshResponse = serde_json::from_str(&response.body)
            .map_err(|e| AuthRequiredReason::RefreshFailed(format!("invalid response: {}", e)))?;

        let credentials = self.executor.credentials();
        credentials
            .set_access(Some(&tokens.access_token))
            .map_err(|e| AuthRequiredReason::RefreshFailed(e.to_string()))?;
        // Keep the current refresh token unless the backend rotated it
        if let Some(ref rotated) = tokens.refresh_token {
            credentials
                .set_refresh(Some(rotated))
                .map_err(|e| AuthRequiredReason::RefreshFailed(e.to_string()))?;
        }

        info!(rotated = tokens.refresh_token.is_some(), "Access token refreshed");
        Ok(())
    }

    fn terminal(&self, descriptor: &RequestDescriptor, reason: AuthRequiredReason) -> ApiError {
        if let Err(e) = self.executor.credentials().clear() {
            error!(error = %e, "Failed to clear credentials after authentication failure");
        }

        let err = ApiError::AuthRequired(reason);
        self.executor.reporter().report_exception(
            &err,
            Severity::Warning,
            ReportContext::status(descriptor.path(), 401),
        );
        err
    }
}
