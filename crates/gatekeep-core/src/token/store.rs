//! Token store trait.

use crate::error::Result;
use crate::session::SessionTokens;
use crate::user::UserProfile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key of the cached user profile.
pub const USER_KEY: &str = "user";

/// Everything a token store holds for one identity domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl StoredSession {
    /// The stored access token, ignoring blank values.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// The stored refresh token, ignoring blank values.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Both tokens, when both are present.
    pub fn tokens(&self) -> Option<SessionTokens> {
        match (self.access_token(), self.refresh_token()) {
            (Some(access), Some(refresh)) => SessionTokens::new(access, refresh).ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token().is_none() && self.refresh_token().is_none() && self.user.is_none()
    }
}

/// Key-value persistence for the bearer token pair and the cached profile.
///
/// Implementations must guarantee:
/// - `save_tokens` is durable when it returns, so a transport reading
///   [`TokenStore::access_token`] right afterwards sees the new value
/// - `clear` removes tokens and profile together, never partially
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Reads the full persisted record. Missing storage is an empty record.
    async fn load(&self) -> Result<StoredSession>;

    /// Persists both tokens, replacing any previous pair and dropping the
    /// profile cached for it.
    async fn save_tokens(&self, tokens: &SessionTokens) -> Result<()>;

    /// Persists the cached profile next to the tokens.
    async fn save_user(&self, user: &UserProfile) -> Result<()>;

    /// Removes tokens and profile.
    async fn clear(&self) -> Result<()>;

    /// The access token the transport should send as bearer.
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.load().await?.access_token().map(str::to_string))
    }
}
