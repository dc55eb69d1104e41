//! Identity API contract.
//!
//! The identity service is always an external collaborator. This module
//! only fixes the shapes we exchange with it; the HTTP transport lives in
//! `gatekeep-interaction`.

use crate::error::{GatekeepError, MSG_UNKNOWN_ACCOUNT};
use crate::session::Credentials;
use crate::user::UserProfile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `code` value the identity API uses for success.
pub const SUCCESS_CODE: i64 = 200;
/// `code` the identity API sends for an unknown account or wrong password.
pub const LOGIN_REJECTED_CODE: i64 = -1;

/// Response envelope used by every identity API endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: None,
            data: Some(data),
        }
    }

    pub fn failure(code: i64, message: Option<&str>) -> Self {
        Self {
            code,
            message: message.map(str::to_string),
            data: None,
        }
    }

    /// Returns the payload when the envelope signals success, or the
    /// envelope's message otherwise.
    pub fn into_data(self) -> Result<T, Option<String>> {
        match (self.code, self.data) {
            (SUCCESS_CODE, Some(data)) => Ok(data),
            _ => Err(self.message),
        }
    }
}

/// Payload of a successful login.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for LoginData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginData").finish_non_exhaustive()
    }
}

/// Payload of a successful token refresh. Servers may or may not rotate
/// the refresh token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshData {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for RefreshData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshData").finish_non_exhaustive()
    }
}

/// Transport-level outcome of an identity API call that did not produce an
/// envelope we can act on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// HTTP 429.
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    /// Non-2xx answer. `code`/`message` come from the body when it was an envelope.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        code: Option<i64>,
        message: Option<String>,
    },

    /// The request never got an answer.
    #[error("network error: {0}")]
    Network(String),

    /// The body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classifies a failed login call.
    pub fn into_login_error(self) -> GatekeepError {
        match self {
            ApiError::RateLimited => GatekeepError::RateLimited,
            ApiError::Network(e) => GatekeepError::Network(e),
            ApiError::Status {
                status,
                code,
                message,
            } => match message.filter(|m| !m.trim().is_empty()) {
                Some(message) => GatekeepError::CredentialsRejected { message },
                None if code == Some(LOGIN_REJECTED_CODE) => GatekeepError::CredentialsRejected {
                    message: MSG_UNKNOWN_ACCOUNT.to_string(),
                },
                None => GatekeepError::UnexpectedResponse(format!("HTTP {status}")),
            },
            ApiError::Decode(e) => GatekeepError::UnexpectedResponse(e),
        }
    }

    /// Classifies a failed validation (`account_info`) call.
    pub fn into_verification_error(self) -> GatekeepError {
        match self {
            ApiError::RateLimited => GatekeepError::RateLimited,
            ApiError::Network(e) => GatekeepError::Network(e),
            ApiError::Status { message, .. } => GatekeepError::verification(message),
            ApiError::Decode(e) => GatekeepError::verification(Some(format!(
                "Malformed account info response: {e}"
            ))),
        }
    }
}

impl From<ApiError> for GatekeepError {
    fn from(err: ApiError) -> Self {
        err.into_login_error()
    }
}

/// Result of one identity API call.
pub type ApiResult<T> = Result<ApiEnvelope<T>, ApiError>;

/// The identity service as seen by the session logic.
///
/// Authenticated calls carry no token argument: the implementation reads
/// the bearer token from the token store at request time, which is why
/// tokens must be persisted before `account_info` is called.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// `POST /login`
    async fn login(&self, credentials: &Credentials) -> ApiResult<LoginData>;

    /// `POST /account_info`, authenticated with the stored access token.
    async fn account_info(&self) -> ApiResult<UserProfile>;

    /// `POST /logout`. Callers treat failures as non-fatal.
    async fn logout(&self, refresh_token: &str) -> ApiResult<serde_json::Value>;

    /// `POST /refresh_token`
    async fn refresh_token(&self, refresh_token: &str) -> ApiResult<RefreshData>;
}
