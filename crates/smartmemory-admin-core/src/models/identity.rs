use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The account behind the current access token, as returned by `/auth/me`
/// and the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default, alias = "fullName", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Name for display, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: Identity,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// The backend may rotate the refresh token; when it doesn't, the field is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let json = r#"{
            "user": {"id": "u-1", "email": "admin@x.com", "full_name": "Ada Admin", "roles": ["superadmin", "owner"]},
            "tokens": {"access_token": "A1", "refresh_token": "R1", "token_type": "bearer"}
        }"#;

        let resp: LoginResponse = serde_json::from_str(json).expect("Failed to parse login JSON");
        assert_eq!(resp.user.email, "admin@x.com");
        assert!(resp.user.has_role("superadmin"));
        assert_eq!(resp.tokens.access_token, "A1");
        assert_eq!(resp.tokens.refresh_token, "R1");
    }

    #[test]
    fn test_identity_without_roles_has_no_privileges() {
        let identity: Identity =
            serde_json::from_str(r#"{"id": "u-2", "email": "member@x.com"}"#).unwrap();
        assert!(identity.roles.is_empty());
        assert!(!identity.has_role("superadmin"));
    }

    #[test]
    fn test_identity_accepts_camel_case_full_name() {
        let identity: Identity =
            serde_json::from_str(r#"{"id": "u-3", "email": "c@x.com", "fullName": "Cam Case"}"#)
                .unwrap();
        assert_eq!(identity.display_name(), "Cam Case");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let identity: Identity =
            serde_json::from_str(r#"{"id": "u-4", "email": "d@x.com", "full_name": "  "}"#)
                .unwrap();
        assert_eq!(identity.display_name(), "d@x.com");
    }

    #[test]
    fn test_refresh_response_without_rotation() {
        let resp: RefreshResponse = serde_json::from_str(r#"{"access_token": "A2"}"#).unwrap();
        assert_eq!(resp.access_token, "A2");
        assert!(resp.refresh_token.is_none());
    }
}
