//! End-to-end login flows: real HTTP transport, file-backed token store,
//! fake identity server.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use gatekeep_application::AuthService;
use gatekeep_core::config::{DomainConfig, VerificationPolicy};
use gatekeep_core::route::RouteGuard;
use gatekeep_core::session::{AuthState, Credentials};
use gatekeep_core::token::TokenStore;
use gatekeep_infrastructure::{FileTokenStore, GatekeepPaths};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

struct Script {
    login: Value,
    account_info: Value,
    account_info_calls: AtomicUsize,
}

async fn login(State(script): State<Arc<Script>>) -> Response {
    Json(script.login.clone()).into_response()
}

async fn account_info(State(script): State<Arc<Script>>) -> Response {
    script.account_info_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(script.account_info.clone())).into_response()
}

async fn spawn_server(login_body: Value, account_info_body: Value) -> (SocketAddr, Arc<Script>) {
    let script = Arc::new(Script {
        login: login_body,
        account_info: account_info_body,
        account_info_calls: AtomicUsize::new(0),
    });
    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/account_info", post(account_info))
        .with_state(script.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    (addr, script)
}

async fn service(addr: SocketAddr, dir: &TempDir) -> (AuthService, Arc<FileTokenStore>) {
    let mut domain = DomainConfig::new("primary", format!("http://{addr}/api"));
    domain.min_request_interval_ms = 0;
    domain.verification = VerificationPolicy::Fixed { delay_ms: 0 };

    let paths = GatekeepPaths::new(Some(dir.path()));
    let store = Arc::new(FileTokenStore::for_domain(&paths, &domain.name).expect("store"));
    let service =
        AuthService::for_domain(&domain, store.clone(), RouteGuard::default()).expect("service");
    assert_eq!(service.bootstrap().await, AuthState::Unauthenticated);
    (service, store)
}

fn credentials() -> Credentials {
    Credentials::new("a@b.com", "x")
}

#[tokio::test]
async fn test_successful_login_persists_both_tokens() {
    let (addr, script) = spawn_server(
        json!({ "code": 200, "data": { "access_token": "T1", "refresh_token": "R1" } }),
        json!({ "code": 200, "data": { "id": 1 } }),
    )
    .await;
    let dir = TempDir::new().unwrap();
    let (service, store) = service(addr, &dir).await;

    service.login(&credentials()).await.unwrap();

    assert_eq!(service.state(), AuthState::Authenticated);
    let stored = store.load().await.unwrap();
    assert_eq!(stored.access_token(), Some("T1"));
    assert_eq!(stored.refresh_token(), Some("R1"));
    assert_eq!(script.account_info_calls.load(Ordering::SeqCst), 1);

    // A fresh process restores the session from disk.
    let mut domain = DomainConfig::new("primary", format!("http://{addr}/api"));
    domain.min_request_interval_ms = 0;
    let reopened =
        Arc::new(FileTokenStore::for_domain(&GatekeepPaths::new(Some(dir.path())), "primary").unwrap());
    let restarted = AuthService::for_domain(&domain, reopened, RouteGuard::default()).unwrap();
    assert_eq!(restarted.bootstrap().await, AuthState::Authenticated);
}

#[tokio::test]
async fn test_rejected_validation_leaves_no_tokens() {
    let (addr, _) = spawn_server(
        json!({ "code": 200, "data": { "access_token": "T1", "refresh_token": "R1" } }),
        json!({ "code": 401 }),
    )
    .await;
    let dir = TempDir::new().unwrap();
    let (service, store) = service(addr, &dir).await;

    assert!(service.login(&credentials()).await.is_err());

    assert_eq!(service.state(), AuthState::Unauthenticated);
    assert!(store.load().await.unwrap().is_empty());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_bad_credentials_message_and_no_validation_call() {
    let (addr, script) = spawn_server(
        json!({ "code": -1, "message": "bad credentials" }),
        json!({ "code": 200, "data": { "id": 1 } }),
    )
    .await;
    let dir = TempDir::new().unwrap();
    let (service, store) = service(addr, &dir).await;

    let err = service.login(&credentials()).await.unwrap_err();

    assert_eq!(err.user_message(), "bad credentials");
    assert_eq!(script.account_info_calls.load(Ordering::SeqCst), 0);
    assert!(store.load().await.unwrap().is_empty());
}
