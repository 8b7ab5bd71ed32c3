//! Single-call request execution.
//!
//! `RequestExecutor` turns a [`RequestDescriptor`] into one HTTP call with
//! the stored bearer token attached, and maps the response onto
//! [`ApiError`]. It never retries; recovery from an expired token lives in
//! the refresh coordinator.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use super::request::RequestDescriptor;
use super::transport::{HttpRequest, HttpResponse, Transport};
use super::ApiError;
use crate::auth::CredentialStore;
use crate::report::{ErrorReporter, ReportContext, Severity};

/// Message attached to a 403 from the backend.
const FORBIDDEN_MESSAGE: &str = "Superadmin access required";

/// Executes one request against the API.
/// Clone is cheap - all collaborators are shared behind `Arc`.
#[derive(Clone)]
pub struct RequestExecutor {
    base_url: String,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    reporter: Arc<dyn ErrorReporter>,
}

impl RequestExecutor {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
            credentials,
            reporter,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn reporter(&self) -> &Arc<dyn ErrorReporter> {
        &self.reporter
    }

    /// Join the base URL with a request path.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn headers_for(
        &self,
        descriptor: &RequestDescriptor,
        authorize: bool,
    ) -> Result<HeaderMap, ApiError> {
        let mut headers = descriptor.headers().clone();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        // A caller-supplied Authorization header never outlives the stored token
        headers.remove(header::AUTHORIZATION);
        if authorize {
            if let Some(token) = self.credentials.get()?.access_token {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
                value.set_sensitive(true);
                headers.insert(header::AUTHORIZATION, value);
            }
        }
        Ok(headers)
    }

    /// Send a descriptor without interpreting or reporting the outcome.
    ///
    /// With `authorize` false no Authorization header is attached, which is
    /// how the refresh call is made.
    pub(crate) async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        authorize: bool,
    ) -> Result<HttpResponse, ApiError> {
        let request = HttpRequest {
            method: descriptor.method().clone(),
            url: self.url_for(descriptor.path()),
            headers: self.headers_for(descriptor, authorize)?,
            body: descriptor.body().cloned(),
        };
        Ok(self.transport.send(request).await?)
    }

    /// Issue one call and interpret its response.
    ///
    /// Returns `None` for 204 and the parsed body for any other 2xx. Every
    /// failure except a 401 is reported once before it is returned.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Option<Value>, ApiError> {
        let endpoint = descriptor.path();

        let response = match self.dispatch(descriptor, true).await {
            Ok(response) => response,
            Err(err @ ApiError::NetworkError(_)) => {
                warn!(%endpoint, error = %err, "Request failed before a response was received");
                self.reporter
                    .report_exception(&err, Severity::Error, ReportContext::network(endpoint));
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        self.interpret(descriptor, response)
    }

    fn interpret(
        &self,
        descriptor: &RequestDescriptor,
        response: HttpResponse,
    ) -> Result<Option<Value>, ApiError> {
        let endpoint = descriptor.path();
        let status = response.status.as_u16();

        match status {
            204 => Ok(None),
            _ if response.status.is_success() => {
                serde_json::from_str(&response.body).map(Some).map_err(|e| {
                    warn!(%endpoint, error = %e, "Failed to parse JSON response");
                    ApiError::InvalidResponse(format!("{}: {}", endpoint, e))
                })
            }
            401 => {
                debug!(%endpoint, retry = descriptor.is_retry(), "Access token rejected");
                Err(ApiError::AuthExpired {
                    detail: ApiError::server_detail(&response.body),
                })
            }
            403 => {
                let err = ApiError::Forbidden(FORBIDDEN_MESSAGE.to_string());
                self.reporter.report_exception(
                    &err,
                    Severity::Warning,
                    ReportContext::status(endpoint, status),
                );
                Err(err)
            }
            _ => {
                let err = ApiError::request_failed(status, &response.body);
                warn!(%endpoint, status, error = %err, "Request failed");
                self.reporter.report_exception(
                    &err,
                    Severity::Error,
                    ReportContext::request_failed(endpoint, status, descriptor.method().as_str()),
                );
                Err(err)
            }
        }
    }
}
