//! HttpIdentityApi - reqwest implementation of [`IdentityApi`].
//!
//! Every endpoint is a JSON `POST` under the domain's base URL answering an
//! [`ApiEnvelope`]. Authenticated calls read the bearer token from the
//! token store when the request is built, never from a cached copy.

use crate::pacer::RequestPacer;
use async_trait::async_trait;
use gatekeep_core::api::{ApiEnvelope, ApiError, ApiResult, IdentityApi, LoginData, RefreshData};
use gatekeep_core::config::DomainConfig;
use gatekeep_core::session::Credentials;
use gatekeep_core::token::TokenStore;
use gatekeep_core::user::UserProfile;
use gatekeep_core::{GatekeepError, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

#[derive(Serialize)]
struct LoginRequest<'a> {
    account: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshTokenRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct EmptyRequest {}

/// Identity API client for one identity domain.
pub struct HttpIdentityApi {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    pacer: RequestPacer,
}

impl HttpIdentityApi {
    /// Creates a client using the domain's base URL, timeout and pacing.
    pub fn new(domain: &DomainConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(domain.timeout())
            .build()
            .map_err(|e| GatekeepError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: domain.base_url.trim_end_matches('/').to_string(),
            store,
            pacer: RequestPacer::new(domain.min_request_interval()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B, authenticated: bool) -> ApiResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.pacer.wait().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        let mut request = self.client.post(&url).json(body);

        if authenticated {
            match self.store.access_token().await {
                Ok(Some(token)) => request = request.bearer_auth(token),
                Ok(None) => tracing::debug!("[Api] No access token for /{}", endpoint),
                Err(e) => tracing::warn!("[Api] Could not read access token for /{}: {}", endpoint, e),
            }
        }

        tracing::debug!("[Api] POST /{}", endpoint);
        let response = request.send().await.map_err(|e| {
            tracing::warn!("[Api] /{} failed: {}", endpoint, e);
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("[Api] /{} rate limited", endpoint);
            return Err(ApiError::RateLimited);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let envelope = serde_json::from_slice::<ApiEnvelope<Value>>(&body).ok();
            tracing::debug!("[Api] /{} answered HTTP {}", endpoint, status.as_u16());
            return Err(ApiError::Status {
                status: status.as_u16(),
                code: envelope.as_ref().map(|e| e.code),
                message: envelope.and_then(|e| e.message),
            });
        }

        serde_json::from_slice::<ApiEnvelope<T>>(&body).map_err(|e| {
            tracing::warn!("[Api] /{} returned a malformed body: {}", endpoint, e);
            ApiError::Decode(e.to_string())
        })
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn login(&self, credentials: &Credentials) -> ApiResult<LoginData> {
        let body = LoginRequest {
            account: credentials.account(),
            password: credentials.password(),
        };
        self.post("login", &body, false).await
    }

    async fn account_info(&self) -> ApiResult<UserProfile> {
        self.post("account_info", &EmptyRequest {}, true).await
    }

    async fn logout(&self, refresh_token: &str) -> ApiResult<Value> {
        self.post("logout", &RefreshTokenRequest { refresh_token }, true)
            .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> ApiResult<RefreshData> {
        self.post("refresh_token", &RefreshTokenRequest { refresh_token }, false)
            .await
    }
}
