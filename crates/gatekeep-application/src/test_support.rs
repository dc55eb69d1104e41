//! Hand-written doubles shared by the unit tests of this crate.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use gatekeep_core::api::{
    ApiEnvelope, ApiError, ApiResult, IdentityApi, LoginData, RefreshData,
};
use gatekeep_core::session::{Credentials, SessionTokens};
use gatekeep_core::token::{StoredSession, TokenStore};
use gatekeep_core::user::{AccountId, UserProfile};
use gatekeep_core::{GatekeepError, Result};
use gatekeep_infrastructure::MemoryTokenStore;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// A call observed by [`MockIdentityApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Login { account: String },
    /// `bearer` is what the store held when the call was made.
    AccountInfo { bearer: Option<String> },
    Logout { refresh_token: String },
    Refresh { refresh_token: String },
}

/// Scripted identity API. Unscripted calls fail with a network error.
pub struct MockIdentityApi {
    store: Arc<dyn TokenStore>,
    login: Mutex<VecDeque<ApiResult<LoginData>>>,
    account_info: Mutex<VecDeque<ApiResult<UserProfile>>>,
    logout: Mutex<VecDeque<ApiResult<Value>>>,
    refresh: Mutex<VecDeque<ApiResult<RefreshData>>>,
    calls: Mutex<Vec<(Instant, Call)>>,
}

impl MockIdentityApi {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            login: Mutex::new(VecDeque::new()),
            account_info: Mutex::new(VecDeque::new()),
            logout: Mutex::new(VecDeque::new()),
            refresh: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_login(&self, response: ApiResult<LoginData>) -> &Self {
        self.login.lock().unwrap().push_back(response);
        self
    }

    pub fn push_account_info(&self, response: ApiResult<UserProfile>) -> &Self {
        self.account_info.lock().unwrap().push_back(response);
        self
    }

    pub fn push_logout(&self, response: ApiResult<Value>) -> &Self {
        self.logout.lock().unwrap().push_back(response);
        self
    }

    pub fn push_refresh(&self, response: ApiResult<RefreshData>) -> &Self {
        self.refresh.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, c)| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }

    fn next<T>(queue: &Mutex<VecDeque<ApiResult<T>>>) -> ApiResult<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted response".into())))
    }
}

#[async_trait]
impl IdentityApi for MockIdentityApi {
    async fn login(&self, credentials: &Credentials) -> ApiResult<LoginData> {
        self.record(Call::Login {
            account: credentials.account().to_string(),
        });
        Self::next(&self.login)
    }

    async fn account_info(&self) -> ApiResult<UserProfile> {
        let bearer = self.store.access_token().await.unwrap_or(None);
        self.record(Call::AccountInfo { bearer });
        Self::next(&self.account_info)
    }

    async fn logout(&self, refresh_token: &str) -> ApiResult<Value> {
        self.record(Call::Logout {
            refresh_token: refresh_token.to_string(),
        });
        Self::next(&self.logout)
    }

    async fn refresh_token(&self, refresh_token: &str) -> ApiResult<RefreshData> {
        self.record(Call::Refresh {
            refresh_token: refresh_token.to_string(),
        });
        Self::next(&self.refresh)
    }
}

/// Token store whose operations can be made to fail.
#[derive(Default)]
pub struct FlakyTokenStore {
    pub inner: MemoryTokenStore,
    pub fail_load: bool,
    pub fail_save_tokens: bool,
}

#[async_trait]
impl TokenStore for FlakyTokenStore {
    async fn load(&self) -> Result<StoredSession> {
        if self.fail_load {
            return Err(GatekeepError::storage("disk unavailable"));
        }
        self.inner.load().await
    }

    async fn save_tokens(&self, tokens: &SessionTokens) -> Result<()> {
        if self.fail_save_tokens {
            return Err(GatekeepError::storage("disk full"));
        }
        self.inner.save_tokens(tokens).await
    }

    async fn save_user(&self, user: &UserProfile) -> Result<()> {
        self.inner.save_user(user).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

pub fn login_ok(access: &str, refresh: &str) -> ApiResult<LoginData> {
    Ok(ApiEnvelope::success(LoginData {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }))
}

pub fn profile(id: i64) -> UserProfile {
    let mut user = UserProfile::with_id(AccountId::Numeric(id));
    user.email = Some("a@b.co".to_string());
    user
}

pub fn account_ok(id: i64) -> ApiResult<UserProfile> {
    Ok(ApiEnvelope::success(profile(id)))
}

pub fn envelope_failure<T>(code: i64, message: Option<&str>) -> ApiResult<T> {
    Ok(ApiEnvelope::failure(code, message))
}

pub fn stored(access: &str, refresh: Option<&str>) -> StoredSession {
    StoredSession {
        access_token: Some(access.to_string()),
        refresh_token: refresh.map(str::to_string),
        user: None,
    }
}

/// Unsigned JWT whose `exp` is `offset_secs` away from now.
pub fn jwt_expiring_in(offset_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + offset_secs;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "1", "exp": exp }).to_string());
    format!("{header}.{payload}.signature")
}
