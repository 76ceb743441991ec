//! Bearer credential and account request types.

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Shortest password the registration form accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Opaque bearer token issued by login.
///
/// Wrapped in [`SecretString`] so it never shows up in `Debug` output or
/// logs. It is only exposed when building the `Authorization` header or
/// writing it back to durable storage.
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for AuthToken {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response. A missing `token` means the backend did not log us in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub birth_date: String,
}

impl RegisterRequest {
    /// Every field is required before the request may leave the client.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        if self.birth_date.trim().is_empty() {
            missing.push("birth date");
        }
        missing
    }

    /// Client-side checks run before any network call.
    pub fn validate(&self) -> Result<(), String> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(format!("missing {}", missing.join(", ")));
        }
        if NaiveDate::parse_from_str(self.birth_date.trim(), "%Y-%m-%d").is_err() {
            return Err("birth date must be YYYY-MM-DD".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!("password must be at least {MIN_PASSWORD_LEN} characters"));
        }
        Ok(())
    }
}
