//! Scripted transport and recording reporter shared by unit tests.

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use crate::api::transport::{HttpRequest, HttpResponse, NetworkErrorKind, Transport, TransportError};
use crate::api::{RefreshCoordinator, RequestExecutor};
use crate::auth::{FileCredentialStore, SessionManager};
use crate::models::Identity;
use crate::report::{ErrorReporter, ReportContext, Severity};

pub const BASE_URL: &str = "http://api.test";

pub enum Scripted {
    Respond(HttpResponse),
    Fail(TransportError),
}

impl Scripted {
    pub fn json(status: u16, body: Value) -> Self {
        Scripted::Respond(HttpResponse::new(status, body.to_string()))
    }

    pub fn status(status: u16, body: &str) -> Self {
        Scripted::Respond(HttpResponse::new(status, body))
    }
}

/// Replays scripted outcomes in order and records every request.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, next: Scripted) {
        self.script.lock().unwrap().push_back(next);
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.sent.lock().unwrap().push(request);
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(err)) => Err(err),
            None => Err(TransportError::new(
                NetworkErrorKind::Other,
                format!("no scripted response for {}", url),
            )),
        }
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(Severity, ReportContext)>>,
    identity: Mutex<Option<Identity>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<(Severity, ReportContext)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report_exception(&self, _error: &dyn StdError, severity: Severity, context: ReportContext) {
        self.reports.lock().unwrap().push((severity, context));
    }

    fn set_identity(&self, identity: Option<&Identity>) {
        *self.identity.lock().unwrap() = identity.cloned();
    }
}

/// A file-backed store in a temp directory plus fakes for the rest.
pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub store: Arc<FileCredentialStore>,
    pub reporter: Arc<RecordingReporter>,
    _dir: TempDir,
}

impl Harness {
    pub fn new(script: Vec<Scripted>) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = FileCredentialStore::open(dir.path().join("credentials.json"))
            .expect("open credential store");
        Self {
            transport: Arc::new(FakeTransport::new(script)),
            store: Arc::new(store),
            reporter: Arc::new(RecordingReporter::default()),
            _dir: dir,
        }
    }

    pub fn executor(&self) -> RequestExecutor {
        RequestExecutor::new(
            BASE_URL,
            self.transport.clone(),
            self.store.clone(),
            self.reporter.clone(),
        )
    }

    pub fn coordinator(&self) -> RefreshCoordinator {
        RefreshCoordinator::new(self.executor())
    }

    pub fn session(&self) -> SessionManager {
        SessionManager::new(self.coordinator())
    }
}

pub fn identity_json(email: &str, roles: &[&str]) -> Value {
    serde_json::json!({
        "id": format!("id-{}", email),
        "email": email,
        "full_name": "Test User",
        "roles": roles,
    })
}
