//! Auth service: the session facade for one identity domain.

use crate::bootstrapper::SessionBootstrapper;
use crate::login_sequencer::LoginSequencer;
use crate::session::SessionContext;
use crate::verification::fetch_profile;
use gatekeep_core::api::{ApiError, IdentityApi, SUCCESS_CODE};
use gatekeep_core::config::{DomainConfig, VerificationPolicy};
use gatekeep_core::route::{Redirect, RouteGuard};
use gatekeep_core::session::{AuthState, Credentials, Session, SessionTokens};
use gatekeep_core::token::TokenStore;
use gatekeep_core::user::UserProfile;
use gatekeep_core::{GatekeepError, Result};
use gatekeep_interaction::HttpIdentityApi;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// Owns the session of one identity domain and every operation on it.
///
/// # Example
///
/// ```ignore
/// let service = AuthService::for_domain(&domain, store, config.routes.guard())?;
/// service.bootstrap().await;
/// if let Some(redirect) = service.guard("/(tabs)/dashboard").await {
///     navigate(&redirect.to);
/// }
/// ```
pub struct AuthService {
    api: Arc<dyn IdentityApi>,
    store: Arc<dyn TokenStore>,
    context: Arc<SessionContext>,
    bootstrapper: SessionBootstrapper,
    sequencer: LoginSequencer,
    guard: Mutex<RouteGuard>,
}

impl AuthService {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        store: Arc<dyn TokenStore>,
        policy: VerificationPolicy,
        guard: RouteGuard,
    ) -> Self {
        let context = Arc::new(SessionContext::new());
        Self {
            bootstrapper: SessionBootstrapper::new(api.clone(), store.clone(), context.clone()),
            sequencer: LoginSequencer::new(api.clone(), store.clone(), context.clone(), policy),
            api,
            store,
            context,
            guard: Mutex::new(guard),
        }
    }

    /// Wires the HTTP transport for `domain` to `store`.
    pub fn for_domain(
        domain: &DomainConfig,
        store: Arc<dyn TokenStore>,
        guard: RouteGuard,
    ) -> Result<Self> {
        let api = HttpIdentityApi::new(domain, store.clone())?;
        tracing::debug!("[Auth] Domain '{}' at {}", domain.name, api.base_url());
        Ok(Self::new(Arc::new(api), store, domain.verification, guard))
    }

    /// Restores the persisted session. See [`SessionBootstrapper`].
    pub async fn bootstrap(&self) -> AuthState {
        self.bootstrapper.bootstrap().await
    }

    /// Signs in. See [`LoginSequencer`].
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile> {
        self.sequencer.login(credentials).await
    }

    /// Signs out. The server-side logout is best effort; local state is
    /// always cleared.
    pub async fn logout(&self) {
        let refresh_token = match self.store.load().await {
            Ok(stored) => stored.refresh_token().map(str::to_string),
            Err(e) => {
                tracing::warn!("[Auth] Failed to read stored session: {}", e);
                None
            }
        };

        if let Some(refresh_token) = refresh_token {
            match self.api.logout(&refresh_token).await {
                Ok(envelope) if envelope.code == SUCCESS_CODE => {
                    tracing::debug!("[Auth] Server-side logout succeeded");
                }
                Ok(envelope) => tracing::warn!(
                    "[Auth] Server-side logout answered code {}, ignoring",
                    envelope.code
                ),
                Err(e) => tracing::warn!("[Auth] Server-side logout failed, ignoring: {}", e),
            }
        }

        self.discard().await;
        tracing::info!("[Auth] Signed out");
    }

    /// Re-validates the current session and refreshes the cached profile.
    ///
    /// Any failure degrades the session to unauthenticated.
    pub async fn refresh_profile(&self) -> Result<UserProfile> {
        if !self.context.state().is_authenticated() {
            return Err(GatekeepError::verification(Some(
                "You are not signed in.".to_string(),
            )));
        }

        match fetch_profile(self.api.as_ref()).await {
            Ok(user) => {
                if let Err(e) = self.store.save_user(&user).await {
                    tracing::warn!("[Auth] Failed to cache profile: {}", e);
                }
                self.context.update_user(user.clone()).await;
                Ok(user)
            }
            Err(e) => {
                tracing::info!("[Auth] Session no longer valid: {}", e);
                self.discard().await;
                Err(e)
            }
        }
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// The refresh token is kept unless the server rotates it. On failure
    /// the session is discarded.
    pub async fn refresh_tokens(&self) -> Result<()> {
        let stored = self.store.load().await?;
        let Some(refresh_token) = stored.refresh_token().map(str::to_string) else {
            self.discard().await;
            return Err(GatekeepError::verification(Some(
                "No refresh token is stored.".to_string(),
            )));
        };

        let result = self
            .api
            .refresh_token(&refresh_token)
            .await
            .map_err(ApiError::into_verification_error)
            .and_then(|envelope| envelope.into_data().map_err(GatekeepError::verification))
            .and_then(|data| {
                SessionTokens::new(
                    data.access_token,
                    data.refresh_token.unwrap_or_else(|| refresh_token.clone()),
                )
            });

        let tokens = match result {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::info!("[Auth] Token refresh failed: {}", e);
                self.discard().await;
                return Err(e);
            }
        };

        self.store.save_tokens(&tokens).await?;
        // save_tokens drops the cached profile; it still belongs to this account.
        if let Some(user) = stored.user.as_ref() {
            if let Err(e) = self.store.save_user(user).await {
                tracing::warn!("[Auth] Failed to cache profile: {}", e);
            }
        }
        self.context.update_tokens(tokens).await;
        tracing::info!("[Auth] Tokens refreshed");
        Ok(())
    }

    pub fn state(&self) -> AuthState {
        self.context.state()
    }

    pub async fn snapshot(&self) -> Session {
        self.context.snapshot().await
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.context.subscribe()
    }

    /// Evaluates the route guard for `path` against the current state.
    pub async fn guard(&self, path: &str) -> Option<Redirect> {
        let state = self.context.state();
        self.guard.lock().await.evaluate_path(state, path)
    }

    async fn discard(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!("[Auth] Failed to clear stored session: {}", e);
        }
        if let Err(e) = self.context.clear().await {
            tracing::error!("[Auth] {}", e);
        }
    }
}
