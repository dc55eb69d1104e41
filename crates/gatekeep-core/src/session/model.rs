//! Session domain model.

use crate::error::{GatekeepError, Result};
use crate::user::UserProfile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication state of a session.
///
/// ```text
/// Loading ──► Unauthenticated ◄──► Authenticated
///    └──────────────────────────────────▲
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Bootstrap has not finished yet.
    Loading,
    /// No valid tokens.
    Unauthenticated,
    /// Tokens validated against the identity API.
    Authenticated,
}

impl AuthState {
    /// Returns true when `next` is a permitted state change from `self`.
    pub fn can_transition_to(self, next: AuthState) -> bool {
        use AuthState::*;
        matches!(
            (self, next),
            (Loading, Unauthenticated)
                | (Loading, Authenticated)
                | (Authenticated, Unauthenticated)
                | (Unauthenticated, Authenticated)
        )
    }

    /// Applies a transition.
    ///
    /// Re-entering the current terminal state is accepted as a no-op;
    /// everything else outside the transition table is rejected.
    pub fn transition(self, next: AuthState) -> Result<AuthState> {
        if self == next && self != AuthState::Loading {
            return Ok(self);
        }
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(GatekeepError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_authenticated(self) -> bool {
        self == AuthState::Authenticated
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthState::Loading => "loading",
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authenticated => "authenticated",
        };
        f.write_str(s)
    }
}

/// The bearer token pair issued by the identity API.
///
/// Both tokens are opaque. `Debug` never prints them.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl SessionTokens {
    /// Creates a token pair, rejecting blank tokens.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        let refresh_token = refresh_token.into();
        if access_token.trim().is_empty() {
            return Err(GatekeepError::UnexpectedResponse(
                "identity API returned an empty access token".to_string(),
            ));
        }
        if refresh_token.trim().is_empty() {
            return Err(GatekeepError::UnexpectedResponse(
                "identity API returned an empty refresh token".to_string(),
            ));
        }
        Ok(Self {
            access_token,
            refresh_token,
        })
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Client-side record of authentication state and the cached profile.
///
/// A session starts in [`AuthState::Loading`] with nothing populated. The
/// owning context is the only writer; everybody else reads snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub tokens: Option<SessionTokens>,
    pub user: Option<UserProfile>,
    pub state: AuthState,
}

impl Session {
    /// The empty session created at process start.
    pub fn loading() -> Self {
        Self {
            tokens: None,
            user: None,
            state: AuthState::Loading,
        }
    }

    /// Marks the session authenticated with the given tokens and profile.
    pub fn authenticate(&mut self, tokens: SessionTokens, user: UserProfile) -> Result<()> {
        self.state = self.state.transition(AuthState::Authenticated)?;
        self.tokens = Some(tokens);
        self.user = Some(user);
        Ok(())
    }

    /// Drops tokens and profile and marks the session unauthenticated.
    pub fn clear(&mut self) -> Result<()> {
        self.state = self.state.transition(AuthState::Unauthenticated)?;
        self.tokens = None;
        self.user = None;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::loading()
    }
}
