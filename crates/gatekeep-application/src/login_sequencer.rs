//! Interactive sign-in.

use crate::session::SessionContext;
use crate::verification::verify_with_policy;
use gatekeep_core::api::{ApiError, IdentityApi};
use gatekeep_core::config::VerificationPolicy;
use gatekeep_core::session::{AuthState, Credentials, SessionTokens};
use gatekeep_core::token::TokenStore;
use gatekeep_core::user::UserProfile;
use gatekeep_core::{GatekeepError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Runs the login sequence: validate input, exchange credentials for
/// tokens, persist them, wait, then validate them with `account_info`.
///
/// Only one login may run at a time; a second attempt is rejected with
/// [`GatekeepError::LoginInProgress`] before touching the network or the
/// store. Any failure after the credentials call rolls back to an empty,
/// unauthenticated session.
pub struct LoginSequencer {
    api: Arc<dyn IdentityApi>,
    store: Arc<dyn TokenStore>,
    context: Arc<SessionContext>,
    policy: VerificationPolicy,
    in_flight: Mutex<()>,
}

impl LoginSequencer {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        store: Arc<dyn TokenStore>,
        context: Arc<SessionContext>,
        policy: VerificationPolicy,
    ) -> Self {
        Self {
            api,
            store,
            context,
            policy,
            in_flight: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile> {
        let _guard = self.in_flight.try_lock().map_err(|_| {
            tracing::warn!("[Login] Rejected: another login is in progress");
            GatekeepError::LoginInProgress
        })?;

        match self.context.state() {
            AuthState::Loading => return Err(GatekeepError::BootstrapPending),
            AuthState::Authenticated => return Err(GatekeepError::AlreadyAuthenticated),
            AuthState::Unauthenticated => {}
        }

        credentials.validate()?;

        tracing::info!("[Login] Signing in");
        match self.run(credentials).await {
            Ok(user) => {
                tracing::info!("[Login] Signed in as {}", user.display_name());
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("[Login] Failed: {}", e);
                self.rollback().await;
                Err(e)
            }
        }
    }

    async fn run(&self, credentials: &Credentials) -> Result<UserProfile> {
        let data = self
            .api
            .login(credentials)
            .await
            .map_err(ApiError::into_login_error)?
            .into_data()
            .map_err(GatekeepError::rejected)?;

        let tokens = SessionTokens::new(data.access_token, data.refresh_token)?;

        // The transport reads the bearer token from the store, so the pair
        // must be durable before validation.
        self.store.save_tokens(&tokens).await?;
        tracing::debug!("[Login] Tokens persisted, validating");

        let user = verify_with_policy(self.api.as_ref(), &self.policy).await?;

        if let Err(e) = self.store.save_user(&user).await {
            tracing::warn!("[Login] Failed to cache profile: {}", e);
        }
        self.context.authenticate(tokens, user.clone()).await?;
        Ok(user)
    }

    async fn rollback(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!("[Login] Failed to clear tokens: {}", e);
        }
        if let Err(e) = self.context.clear().await {
            tracing::error!("[Login] {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use gatekeep_core::error::{
        MSG_GENERIC, MSG_NETWORK, MSG_RATE_LIMITED, MSG_VERIFICATION_FALLBACK,
    };
    use gatekeep_infrastructure::MemoryTokenStore;
    use std::time::Duration;
    use tokio::time::Instant;

    struct Fixture {
        store: Arc<MemoryTokenStore>,
        api: Arc<MockIdentityApi>,
        context: Arc<SessionContext>,
        sequencer: LoginSequencer,
    }

    async fn fixture(policy: VerificationPolicy) -> Fixture {
        let store = Arc::new(MemoryTokenStore::new());
        let api = Arc::new(MockIdentityApi::new(store.clone()));
        let context = Arc::new(SessionContext::new());
        context.clear().await.unwrap();
        let sequencer = LoginSequencer::new(api.clone(), store.clone(), context.clone(), policy);
        Fixture {
            store,
            api,
            context,
            sequencer,
        }
    }

    fn creds() -> Credentials {
        Credentials::new("a@b.co", "secret")
    }

    fn is_account_info(call: &Call) -> bool {
        matches!(call, Call::AccountInfo { .. })
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_login() {
        let f = fixture(VerificationPolicy::default()).await;
        f.api.push_login(login_ok("T1", "R1")).push_account_info(account_ok(9));

        let user = f.sequencer.login(&creds()).await.unwrap();
        assert_eq!(user, profile(9));
        assert_eq!(f.context.state(), AuthState::Authenticated);

        let stored = f.store.snapshot().await;
        assert_eq!(stored.access_token(), Some("T1"));
        assert_eq!(stored.refresh_token(), Some("R1"));
        assert_eq!(stored.user, Some(profile(9)));

        // Validation ran with the freshly persisted token, one second later.
        let calls = f.api.timed_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].1,
            Call::AccountInfo {
                bearer: Some("T1".into())
            }
        );
        assert!(calls[1].0 - calls[0].0 >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_credentials_surface_server_message() {
        let f = fixture(VerificationPolicy::default()).await;
        f.api.push_login(envelope_failure(-1, Some("bad credentials")));

        let err = f.sequencer.login(&creds()).await.unwrap_err();
        assert_eq!(
            err,
            GatekeepError::CredentialsRejected {
                message: "bad credentials".into()
            }
        );
        assert_eq!(err.user_message(), "bad credentials");
        assert_eq!(f.api.count(is_account_info), 0);
        assert_eq!(f.context.state(), AuthState::Unauthenticated);
        assert!(f.store.snapshot().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_validation_rolls_back_tokens() {
        let f = fixture(VerificationPolicy::default()).await;
        f.api
            .push_login(login_ok("T1", "R1"))
            .push_account_info(envelope_failure(401, None));

        let err = f.sequencer.login(&creds()).await.unwrap_err();
        assert_eq!(err.user_message(), MSG_VERIFICATION_FALLBACK);
        assert_eq!(f.context.state(), AuthState::Unauthenticated);
        assert!(f.store.snapshot().await.is_empty());
        assert!(f.context.snapshot().await.tokens.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_message() {
        let f = fixture(VerificationPolicy::default()).await;
        f.api.push_login(Err(ApiError::RateLimited));

        let err = f.sequencer.login(&creds()).await.unwrap_err();
        assert_eq!(err.user_message(), MSG_RATE_LIMITED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_message() {
        let f = fixture(VerificationPolicy::default()).await;
        f.api.push_login(Err(ApiError::Network("timeout".into())));

        let err = f.sequencer.login(&creds()).await.unwrap_err();
        assert_eq!(err.user_message(), MSG_NETWORK);
        assert!(f.store.snapshot().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_error_message_is_passed_through() {
        let f = fixture(VerificationPolicy::default()).await;
        f.api.push_login(Err(ApiError::Status {
            status: 400,
            code: Some(-2),
            message: Some("User does not exist".into()),
        }));

        let err = f.sequencer.login(&creds()).await.unwrap_err();
        assert_eq!(err.user_message(), "User does not exist");
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_without_message_uses_generic_text() {
        let f = fixture(VerificationPolicy::default()).await;
        f.api.push_login(Err(ApiError::Status {
            status: 502,
            code: None,
            message: None,
        }));

        let err = f.sequencer.login(&creds()).await.unwrap_err();

        assert_eq!(err.user_message(), MSG_GENERIC);
        assert_eq!(f.context.state(), AuthState::Unauthenticated);
        assert!(f.store.snapshot().await.is_empty());
        assert_eq!(f.api.count(|c| matches!(c, Call::AccountInfo { .. })), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_makes_no_call() {
        let f = fixture(VerificationPolicy::default()).await;

        for (account, password) in [("", "pw"), ("not-an-email", "pw"), ("a@b.co", "")] {
            let err = f
                .sequencer
                .login(&Credentials::new(account, password))
                .await
                .unwrap_err();
            assert!(matches!(err, GatekeepError::Validation { .. }));
        }
        assert!(f.api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_login_is_rejected() {
        let f = fixture(VerificationPolicy::default()).await;
        f.api.push_login(login_ok("T1", "R1")).push_account_info(account_ok(1));

        let (a, b) = (creds(), creds());
        let (first, second) = tokio::join!(f.sequencer.login(&a), f.sequencer.login(&b));

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), GatekeepError::LoginInProgress);
        assert_eq!(f.api.count(|c| matches!(c, Call::Login { .. })), 1);
        assert_eq!(f.store.snapshot().await.access_token(), Some("T1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_requires_unauthenticated_session() {
        let store = Arc::new(MemoryTokenStore::new());
        let api = Arc::new(MockIdentityApi::new(store.clone()));
        let context = Arc::new(SessionContext::new());
        let sequencer = LoginSequencer::new(
            api.clone(),
            store,
            context.clone(),
            VerificationPolicy::default(),
        );

        assert_eq!(
            sequencer.login(&creds()).await.unwrap_err(),
            GatekeepError::BootstrapPending
        );

        context
            .authenticate(SessionTokens::new("T0", "R0").unwrap(), profile(1))
            .await
            .unwrap();
        assert_eq!(
            sequencer.login(&creds()).await.unwrap_err(),
            GatekeepError::AlreadyAuthenticated
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_skips_validation() {
        let store = Arc::new(FlakyTokenStore {
            fail_save_tokens: true,
            ..Default::default()
        });
        let api = Arc::new(MockIdentityApi::new(store.clone()));
        let context = Arc::new(SessionContext::new());
        context.clear().await.unwrap();
        let sequencer = LoginSequencer::new(
            api.clone(),
            store,
            context.clone(),
            VerificationPolicy::default(),
        );
        api.push_login(login_ok("T1", "R1"));

        let err = sequencer.login(&creds()).await.unwrap_err();
        assert!(matches!(err, GatekeepError::Storage(_)));
        assert_eq!(api.count(is_account_info), 0);
        assert_eq!(context.state(), AuthState::Unauthenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_retries_until_success() {
        let f = fixture(VerificationPolicy::Backoff {
            max_attempts: 3,
            initial_delay_ms: 250,
            max_delay_ms: 1000,
        })
        .await;
        f.api
            .push_login(login_ok("T1", "R1"))
            .push_account_info(envelope_failure(401, Some("not yet")))
            .push_account_info(account_ok(3));

        let start = Instant::now();
        let user = f.sequencer.login(&creds()).await.unwrap();
        assert_eq!(user, profile(3));
        assert_eq!(f.api.count(is_account_info), 2);
        assert!(start.elapsed() >= Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_stops_on_rate_limit() {
        let f = fixture(VerificationPolicy::Backoff {
            max_attempts: 5,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
        })
        .await;
        f.api
            .push_login(login_ok("T1", "R1"))
            .push_account_info(Err(ApiError::RateLimited));

        let err = f.sequencer.login(&creds()).await.unwrap_err();
        assert_eq!(err, GatekeepError::RateLimited);
        assert_eq!(f.api.count(is_account_info), 1);
        assert!(f.store.snapshot().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_exhaustion_returns_last_error() {
        let f = fixture(VerificationPolicy::Backoff {
            max_attempts: 2,
            initial_delay_ms: 100,
            max_delay_ms: 100,
        })
        .await;
        f.api
            .push_login(login_ok("T1", "R1"))
            .push_account_info(envelope_failure(401, Some("first")))
            .push_account_info(envelope_failure(401, Some("second")));

        let err = f.sequencer.login(&creds()).await.unwrap_err();
        assert_eq!(err.user_message(), "second");
        assert_eq!(f.context.state(), AuthState::Unauthenticated);
    }
}
