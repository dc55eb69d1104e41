//! Startup restore of a persisted session.

use crate::session::SessionContext;
use crate::verification::fetch_profile;
use chrono::Utc;
use gatekeep_core::api::IdentityApi;
use gatekeep_core::session::AuthState;
use gatekeep_core::token::{DEFAULT_EXPIRY_SKEW_SECS, TokenExpiry, TokenStore, inspect_expiry};
use std::sync::Arc;

/// Restores the session from the token store and validates it.
///
/// Bootstrap never fails outward: every problem (missing or incomplete
/// tokens, expired JWT, rejected or unreachable validation, unreadable
/// storage) ends with storage cleared and the session unauthenticated.
pub struct SessionBootstrapper {
    api: Arc<dyn IdentityApi>,
    store: Arc<dyn TokenStore>,
    context: Arc<SessionContext>,
    expiry_skew_secs: i64,
}

impl SessionBootstrapper {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        store: Arc<dyn TokenStore>,
        context: Arc<SessionContext>,
    ) -> Self {
        Self {
            api,
            store,
            context,
            expiry_skew_secs: DEFAULT_EXPIRY_SKEW_SECS,
        }
    }

    /// Runs the bootstrap sequence once. Later calls report the current state.
    pub async fn bootstrap(&self) -> AuthState {
        if self.context.state() != AuthState::Loading {
            tracing::debug!("[Bootstrap] Already bootstrapped ({})", self.context.state());
            return self.context.state();
        }

        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("[Bootstrap] Failed to read stored session: {}", e);
                return self.discard().await;
            }
        };

        if stored.access_token().is_none() {
            tracing::info!("[Bootstrap] No stored session");
            if !stored.is_empty() {
                return self.discard().await;
            }
            return self.mark_unauthenticated().await;
        }

        let Some(tokens) = stored.tokens() else {
            tracing::warn!("[Bootstrap] Stored session has no refresh token, discarding");
            return self.discard().await;
        };

        if let TokenExpiry::Expired { expired_at } =
            inspect_expiry(&tokens.access_token, Utc::now(), self.expiry_skew_secs)
        {
            tracing::info!("[Bootstrap] Access token expired at {}, discarding", expired_at);
            return self.discard().await;
        }

        match fetch_profile(self.api.as_ref()).await {
            Ok(user) => {
                if let Err(e) = self.store.save_user(&user).await {
                    tracing::warn!("[Bootstrap] Failed to cache profile: {}", e);
                }
                match self.context.authenticate(tokens, user).await {
                    Ok(()) => {
                        tracing::info!("[Bootstrap] Session restored");
                        AuthState::Authenticated
                    }
                    Err(e) => {
                        tracing::error!("[Bootstrap] {}", e);
                        self.discard().await
                    }
                }
            }
            Err(e) => {
                tracing::info!("[Bootstrap] Stored session rejected: {}", e);
                self.discard().await
            }
        }
    }

    async fn discard(&self) -> AuthState {
        if let Err(e) = self.store.clear().await {
            tracing::warn!("[Bootstrap] Failed to clear stored session: {}", e);
        }
        self.mark_unauthenticated().await
    }

    async fn mark_unauthenticated(&self) -> AuthState {
        if let Err(e) = self.context.clear().await {
            tracing::error!("[Bootstrap] {}", e);
        }
        self.context.state()
    }
}
