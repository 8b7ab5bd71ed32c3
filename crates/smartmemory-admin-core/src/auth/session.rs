use tracing::{debug, error, info, warn};

use crate::api::{decode, ApiError, RefreshCoordinator, RequestDescriptor, RequestExecutor};
use crate::models::{Identity, LoginRequest, LoginResponse};
use crate::report::{ReportContext, Severity};

/// Role an identity must hold to open a console session
pub const PRIVILEGED_ROLE: &str = "superadmin";

/// Reason recorded when a signed-in identity lacks the privileged role
pub const PRIVILEGED_ACCESS_REQUIRED: &str = "privileged access required";

/// Message shown when the login endpoint rejects credentials without a detail
const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const ME_PATH: &str = "/auth/me";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Authenticated(Identity),
    Unauthenticated,
    Error(String),
}

/// Owns the console session: who is signed in and how we got here.
///
/// There is one `SessionManager` per process. Its state only changes through
/// [`bootstrap`](Self::bootstrap), [`login`](Self::login) and
/// [`logout`](Self::logout).
pub struct SessionManager {
    coordinator: RefreshCoordinator,
    state: SessionState,
    required_role: String,
}

impl SessionManager {
    pub fn new(coordinator: RefreshCoordinator) -> Self {
        Self {
            coordinator,
            state: SessionState::Idle,
            required_role: PRIVILEGED_ROLE.to_string(),
        }
    }

    pub fn with_required_role(mut self, role: impl Into<String>) -> Self {
        self.required_role = role.into();
        self
    }

    fn executor(&self) -> &RequestExecutor {
        self.coordinator.executor()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self.state {
            SessionState::Authenticated(ref identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    pub fn is_privileged(&self) -> bool {
        self.identity()
            .map(|identity| identity.has_role(&self.required_role))
            .unwrap_or(false)
    }

    pub fn last_error(&self) -> Option<&str> {
        match self.state {
            SessionState::Error(ref reason) => Some(reason),
            _ => None,
        }
    }

    /// Restore the session from stored credentials at startup.
    pub async fn bootstrap(&mut self) -> &SessionState {
        self.state = SessionState::Loading;

        let has_token = match self.executor().credentials().get() {
            Ok(pair) => pair.access_token.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored credentials");
                false
            }
        };
        if !has_token {
            debug!("No stored access token");
            self.state = SessionState::Unauthenticated;
            return &self.state;
        }

        match self.fetch_identity().await {
            Ok(identity) if identity.has_role(&self.required_role) => {
                info!(user = %identity.email, "Session restored");
                self.executor().reporter().set_identity(Some(&identity));
                self.state = SessionState::Authenticated(identity);
            }
            Ok(identity) => {
                warn!(user = %identity.email, "Stored session lacks privileged role");
                self.forget();
                self.state = SessionState::Error(PRIVILEGED_ACCESS_REQUIRED.to_string());
            }
            Err(e) => {
                warn!(error = %e, "Failed to load current user");
                self.forget();
                self.state = SessionState::Unauthenticated;
            }
        }
        &self.state
    }

    /// Sign in with email and password.
    ///
    /// The login call goes to the executor directly; there is no session yet
    /// for the refresh flow to recover.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Identity, ApiError> {
        self.state = SessionState::Loading;

        match self.authenticate(email, password).await {
            Ok(identity) => {
                info!(user = %identity.email, "Login successful");
                self.executor().reporter().set_identity(Some(&identity));
                self.state = SessionState::Authenticated(identity.clone());
                Ok(identity)
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.executor().reporter().set_identity(None);
                self.state = SessionState::Error(e.to_string());
                Err(e)
            }
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let body = serde_json::to_value(LoginRequest { email, password })
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let descriptor = RequestDescriptor::post(LOGIN_PATH).with_json(body);

        let response: LoginResponse = match self.executor().execute(&descriptor).await {
            Ok(value) => decode(value)?,
            Err(ApiError::AuthExpired { detail }) => {
                self.forget();
                let err = ApiError::RequestFailed {
                    status: 401,
                    message: detail.unwrap_or_else(|| INVALID_CREDENTIALS.to_string()),
                };
                self.executor().reporter().report_exception(
                    &err,
                    Severity::Warning,
                    ReportContext::status(LOGIN_PATH, 401),
                );
                return Err(err);
            }
            Err(e) => return Err(e),
        };

        if !response.user.has_role(&self.required_role) {
            warn!(user = %response.user.email, "Login rejected: privileged role missing");
            self.clear_credentials();
            return Err(ApiError::Forbidden(PRIVILEGED_ACCESS_REQUIRED.to_string()));
        }

        let credentials = self.executor().credentials();
        let stored = credentials
            .set_access(Some(&response.tokens.access_token))
            .and_then(|()| credentials.set_refresh(Some(&response.tokens.refresh_token)));
        if let Err(e) = stored {
            self.clear_credentials();
            return Err(e.into());
        }

        Ok(response.user)
    }

    /// Sign out. The logout call is best-effort; local state is always cleared.
    pub async fn logout(&mut self) {
        if let Err(e) = self
            .coordinator
            .execute(&RequestDescriptor::post(LOGOUT_PATH))
            .await
        {
            debug!(error = %e, "Logout request failed, clearing session anyway");
        }

        self.forget();
        self.state = SessionState::Unauthenticated;
        info!("Logged out");
    }

    /// Fetch the identity behind the current access token.
    pub async fn fetch_identity(&self) -> Result<Identity, ApiError> {
        self.coordinator
            .execute_json(&RequestDescriptor::get(ME_PATH))
            .await
    }

    /// Drop stored tokens and the identity attached to error reports.
    fn forget(&self) {
        self.clear_credentials();
        self.executor().reporter().set_identity(None);
    }

    fn clear_credentials(&self) {
        if let Err(e) = self.executor().credentials().clear() {
            error!(error = %e, "Failed to clear stored credentials");
        }
    }
}
