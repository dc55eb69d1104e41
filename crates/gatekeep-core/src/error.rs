//! Error types for Gatekeep.

use crate::session::AuthState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown when the identity API answers 429.
pub const MSG_RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";
/// Shown for connection-level failures.
pub const MSG_NETWORK: &str = "Network error. Please check your connection and try again.";
/// Shown when a login response is rejected without a server message.
pub const MSG_CREDENTIALS_FALLBACK: &str = "Login failed. Please check your credentials.";
/// Shown when the login call fails with the rejected-credentials code and no message.
pub const MSG_UNKNOWN_ACCOUNT: &str = "User does not exist or password is incorrect";
/// Last-resort message.
pub const MSG_GENERIC: &str = "Login failed. Please try again.";
/// Shown when post-login verification fails without a server message.
pub const MSG_VERIFICATION_FALLBACK: &str = "Failed to complete login. Please try again.";

/// A shared error type for the whole Gatekeep workspace.
///
/// Every variant maps to a user-facing message through [`GatekeepError::user_message`].
/// None of them is fatal: callers always end up in a well-defined
/// unauthenticated state.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatekeepError {
    /// Input rejected before any network call.
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    /// The identity API refused the credentials.
    #[error("Credentials rejected: {message}")]
    CredentialsRejected { message: String },

    /// Transport-level failure (unreachable host, timeout, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The identity API answered 429.
    #[error("Rate limited by identity API")]
    RateLimited,

    /// Tokens were issued but the follow-up validation failed.
    #[error("Session verification failed: {message}")]
    VerificationFailed { message: String },

    /// The identity API answered with something we could not interpret.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Another login is already running on this session.
    #[error("A login attempt is already in progress")]
    LoginInProgress,

    /// The session is still being restored.
    #[error("Session bootstrap has not completed")]
    BootstrapPending,

    /// Login was requested on an authenticated session.
    #[error("Session is already authenticated")]
    AlreadyAuthenticated,

    /// Rejected state machine transition.
    #[error("Invalid session transition: {from:?} -> {to:?}")]
    InvalidTransition { from: AuthState, to: AuthState },

    /// Token storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatekeepError {
    /// Creates a Validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a CredentialsRejected error, falling back to the generic
    /// credentials message when the server sent none.
    pub fn rejected(message: Option<String>) -> Self {
        Self::CredentialsRejected {
            message: non_blank(message).unwrap_or_else(|| MSG_CREDENTIALS_FALLBACK.to_string()),
        }
    }

    /// Creates a VerificationFailed error with the verification fallback message.
    pub fn verification(message: Option<String>) -> Self {
        Self::VerificationFailed {
            message: non_blank(message).unwrap_or_else(|| MSG_VERIFICATION_FALLBACK.to_string()),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The message to surface to an end user.
    ///
    /// Rate limiting and network failures get fixed texts, server-provided
    /// messages are passed through verbatim, anything else falls back to
    /// [`MSG_GENERIC`].
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::CredentialsRejected { message } => message.clone(),
            Self::VerificationFailed { message } => message.clone(),
            Self::RateLimited => MSG_RATE_LIMITED.to_string(),
            Self::Network(_) => MSG_NETWORK.to_string(),
            Self::LoginInProgress => "A sign-in attempt is already in progress.".to_string(),
            Self::AlreadyAuthenticated => "You are already signed in.".to_string(),
            _ => MSG_GENERIC.to_string(),
        }
    }

    /// Check if this error came from the transport rather than the server.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}

impl From<std::io::Error> for GatekeepError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for GatekeepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GatekeepError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for GatekeepError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, GatekeepError>`.
pub type Result<T> = std::result::Result<T, GatekeepError>;
