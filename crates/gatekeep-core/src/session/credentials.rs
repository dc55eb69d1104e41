//! Login credentials.

use crate::error::{GatekeepError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Account identifier and secret for one login call.
///
/// Never persisted and never serialized; `Debug` hides the password.
#[derive(Clone)]
pub struct Credentials {
    account: String,
    password: String,
}

impl Credentials {
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Rejects malformed input before anything touches the network.
    pub fn validate(&self) -> Result<()> {
        if self.account.is_empty() {
            return Err(GatekeepError::validation("account", "Email is required"));
        }
        if !EMAIL_PATTERN.is_match(&self.account) {
            return Err(GatekeepError::validation(
                "account",
                "Please enter a valid email address",
            ));
        }
        if self.password.trim().is_empty() {
            return Err(GatekeepError::validation("password", "Password is required"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}
