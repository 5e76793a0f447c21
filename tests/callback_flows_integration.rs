//! Integration tests for the three redirect flows against real HTTP.
//!
//! Each test spins up an Axum server on a random port that plays both the
//! identity provider and the backend, then drives the orchestrators through
//! the reqwest clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Url;
use rust_decimal_macros::dec;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use onboard_callbacks::config::{ClientConfig, ConnectionConfig, PollConfig};
use onboard_callbacks::error::{Error, RemoteError};
use onboard_callbacks::lifetime::PageLifetime;
use onboard_callbacks::navigation::{Destination, Navigation, Notice, RecordingHost};
use onboard_callbacks::orchestrator::{
    ConnectionCallbackHandler, ConnectionOutcome, ExchangeDeps, ExchangeOutcome, PaymentPoller,
    PaymentView, SessionExchange,
};
use onboard_callbacks::redirect::{OAuthPayload, PaymentPayload};
use onboard_callbacks::remote::{Backend, HttpBackend, HttpIdentityProvider};
use onboard_callbacks::store::{InMemorySessionStore, MemoryTokenStore, SessionStore, TokenStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Knobs and recordings for the mock servers.
#[derive(Default)]
struct Mock {
    onboarding_step: Option<u32>,
    /// Checkout reports paid from this call on (1-based); 0 means never.
    paid_from_call: usize,
    connect_detail: Option<String>,

    identity_calls: AtomicUsize,
    session_calls: AtomicUsize,
    connect_calls: AtomicUsize,
    checkout_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    session_ids: Mutex<Vec<String>>,
    session_bodies: Mutex<Vec<Value>>,
    connect_requests: Mutex<Vec<(String, HashMap<String, String>)>>,
    checkout_auth: Mutex<Vec<Option<String>>>,
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn session_data(State(mock): State<Arc<Mock>>, headers: HeaderMap) -> Response {
    mock.identity_calls.fetch_add(1, Ordering::SeqCst);
    let session_id = headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    mock.session_ids.lock().unwrap().push(session_id.clone());

    if session_id != "good-session" {
        let body = Json(json!({"detail": "Invalid session"}));
        return (StatusCode::UNAUTHORIZED, body).into_response();
    }
    Json(json!({
        "id": "ext-42",
        "email": "ada@example.com",
        "name": "Ada",
        "picture": "https://cdn.example.com/ada.png",
        "session_token": "provider-token"
    }))
    .into_response()
}

async fn create_session(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Response {
    mock.session_calls.fetch_add(1, Ordering::SeqCst);
    mock.session_bodies.lock().unwrap().push(body);
    Json(json!({
        "session_token": "local-token",
        "user": {
            "id": "user-1",
            "email": "ada@example.com",
            "name": "Ada",
            "onboarding_step": mock.onboarding_step,
            "subscription_tier": "free"
        }
    }))
    .into_response()
}

async fn me(headers: HeaderMap) -> Response {
    if bearer(&headers).as_deref() != Some("Bearer local-token") {
        let body = Json(json!({"detail": "Not authenticated"}));
        return (StatusCode::UNAUTHORIZED, body).into_response();
    }
    Json(json!({"id": "user-1", "email": "ada@example.com", "name": "Ada", "onboarding_step": 2}))
        .into_response()
}

async fn logout(State(mock): State<Arc<Mock>>) -> Json<Value> {
    mock.logout_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({"message": "Logged out"}))
}

async fn connect_callback(
    State(mock): State<Arc<Mock>>,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    mock.connect_calls.fetch_add(1, Ordering::SeqCst);
    mock.connect_requests.lock().unwrap().push((provider, params));
    match &mock.connect_detail {
        Some(detail) => (StatusCode::BAD_REQUEST, Json(json!({"detail": detail}))).into_response(),
        None => Json(json!({"status": "connected"})).into_response(),
    }
}

async fn checkout_status(
    State(mock): State<Arc<Mock>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let call = mock.checkout_calls.fetch_add(1, Ordering::SeqCst) + 1;
    mock.checkout_auth.lock().unwrap().push(bearer(&headers));
    if session_id != "cs_test_1" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Unknown session"}))).into_response();
    }
    if mock.paid_from_call > 0 && call >= mock.paid_from_call {
        return Json(json!({
            "payment_status": "paid", "status": "complete", "plan_name": "Professional"
        }))
        .into_response();
    }
    Json(json!({"payment_status": "unpaid", "status": "open"})).into_response()
}

async fn plans() -> Json<Value> {
    Json(json!({
        "plans": [
            {"id": "starter", "name": "Starter", "price": "29.00", "currency": "usd"},
            {"id": "professional", "name": "Professional", "price": "79.00", "currency": "usd"}
        ]
    }))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "service": "onboarding-api"}))
}

/// Start the mock on a random port, return a config pointing at it.
async fn start_server(mock: Mock) -> (ClientConfig, Arc<Mock>) {
    let mock = Arc::new(mock);
    let app = Router::new()
        .route("/auth/v1/env/oauth/session-data", get(session_data))
        .route("/api/auth/session", post(create_session))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/integrations/{provider}/callback", post(connect_callback))
        .route("/api/stripe/checkout-status/{session_id}", get(checkout_status))
        .route("/api/stripe/plans", get(plans))
        .route("/api/health", get(health))
        .with_state(Arc::clone(&mock));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ClientConfig {
        api_url: format!("http://127.0.0.1:{port}"),
        identity_url: format!("http://127.0.0.1:{port}/auth/v1/env/oauth/session-data"),
        request_timeout: Duration::from_secs(2),
        poll: PollConfig {
            interval: Duration::from_millis(5),
            max_attempts: 10,
        },
        connection: ConnectionConfig {
            redirect_delay: Duration::from_millis(20),
            ..ConnectionConfig::default()
        },
        ..ClientConfig::default()
    };
    (config, mock)
}

fn backend(config: &ClientConfig, tokens: Arc<MemoryTokenStore>) -> Arc<HttpBackend> {
    Arc::new(HttpBackend::new(config, tokens).unwrap())
}

#[tokio::test]
async fn session_exchange_end_to_end() {
    timeout(TEST_TIMEOUT, async {
        let (config, mock) = start_server(Mock {
            onboarding_step: Some(3),
            ..Mock::default()
        })
        .await;
        let tokens = Arc::new(MemoryTokenStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let host = Arc::new(RecordingHost::new());
        let exchange = SessionExchange::new(
            ExchangeDeps {
                identity: Arc::new(HttpIdentityProvider::new(&config).unwrap()),
                backend: backend(&config, tokens.clone()),
                tokens: tokens.clone(),
                sessions: sessions.clone(),
                host: host.clone(),
            },
            PageLifetime::new(),
        );

        let location =
            Url::parse("https://app.example.com/auth/callback#session_id=good-session").unwrap();
        let outcome = exchange.run(&location).await;

        assert!(matches!(
            outcome,
            ExchangeOutcome::Authenticated {
                destination: Destination::OnboardingStep(4)
            }
        ));
        assert_eq!(*mock.session_ids.lock().unwrap(), vec!["good-session".to_string()]);

        let body = mock.session_bodies.lock().unwrap()[0].clone();
        assert_eq!(body["user_id"], "ext-42");
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["picture"], "https://cdn.example.com/ada.png");
        assert_eq!(body["session_token"], "provider-token");

        assert_eq!(
            tokens.load().await.unwrap().unwrap().expose_secret(),
            "local-token"
        );
        let session = sessions.current().await.unwrap();
        assert_eq!(session.user.extra["subscription_tier"], "free");

        let navs = host.navigations();
        assert_eq!(navs.len(), 1);
        assert_eq!(navs[0].destination, Destination::OnboardingStep(4));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_identity_session_goes_to_sign_in() {
    timeout(TEST_TIMEOUT, async {
        let (config, mock) = start_server(Mock::default()).await;
        let tokens = Arc::new(MemoryTokenStore::new());
        let host = Arc::new(RecordingHost::new());
        let exchange = SessionExchange::new(
            ExchangeDeps {
                identity: Arc::new(HttpIdentityProvider::new(&config).unwrap()),
                backend: backend(&config, tokens.clone()),
                tokens: tokens.clone(),
                sessions: Arc::new(InMemorySessionStore::new()),
                host: host.clone(),
            },
            PageLifetime::new(),
        );

        let location =
            Url::parse("https://app.example.com/auth/callback#session_id=stale-session").unwrap();
        let outcome = exchange.run(&location).await;

        assert!(matches!(outcome, ExchangeOutcome::Failed(_)));
        assert_eq!(mock.identity_calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.session_calls.load(Ordering::SeqCst), 0);
        assert!(tokens.load().await.unwrap().is_none());
        assert_eq!(host.navigations(), vec![Navigation::to(Destination::SignIn)]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn connection_callback_forwards_code_and_state() {
    timeout(TEST_TIMEOUT, async {
        let (config, mock) = start_server(Mock::default()).await;
        let host = Arc::new(RecordingHost::new());
        let handler = ConnectionCallbackHandler::new(
            backend(&config, Arc::new(MemoryTokenStore::new())),
            host.clone(),
            config.connection.clone(),
            PageLifetime::new(),
        );

        let location =
            Url::parse("https://app.example.com/integrations/callback?code=auth-code&state=csrf-1")
                .unwrap();
        let outcome = handler.handle(OAuthPayload::from_location(&location)).await;

        assert!(matches!(outcome, ConnectionOutcome::Connected));
        let requests = mock.connect_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "instagram");
        assert_eq!(requests[0].1["code"], "auth-code");
        assert_eq!(requests[0].1["state"], "csrf-1");
        assert_eq!(
            host.navigations(),
            vec![Navigation::to(Destination::OnboardingStep(4))]
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn connection_failure_shows_backend_detail() {
    timeout(TEST_TIMEOUT, async {
        let (config, _mock) = start_server(Mock {
            connect_detail: Some("Instagram rejected the authorization code".into()),
            ..Mock::default()
        })
        .await;
        let host = Arc::new(RecordingHost::new());
        let handler = ConnectionCallbackHandler::new(
            backend(&config, Arc::new(MemoryTokenStore::new())),
            host.clone(),
            config.connection.clone(),
            PageLifetime::new(),
        );

        handler
            .handle(OAuthPayload::from_query("code=bad-code&state=csrf-1"))
            .await;

        assert_eq!(
            host.notices(),
            vec![Notice::Error("Instagram rejected the authorization code".into())]
        );
        assert!(host.navigations().is_empty());
        handler.redirect_settled().await;
        assert_eq!(
            host.navigations(),
            vec![Navigation::to(Destination::OnboardingStep(4))]
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn denied_connection_never_reaches_backend() {
    timeout(TEST_TIMEOUT, async {
        let (config, mock) = start_server(Mock::default()).await;
        let host = Arc::new(RecordingHost::new());
        let handler = ConnectionCallbackHandler::new(
            backend(&config, Arc::new(MemoryTokenStore::new())),
            host.clone(),
            config.connection.clone(),
            PageLifetime::new(),
        );

        handler
            .handle(OAuthPayload::from_query("error=access_denied&state=csrf-1"))
            .await;
        handler.redirect_settled().await;

        assert_eq!(mock.connect_calls.load(Ordering::SeqCst), 0);
        assert_eq!(host.navigations().len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn payment_polls_until_paid_without_auth_header() {
    timeout(TEST_TIMEOUT, async {
        let (config, mock) = start_server(Mock {
            paid_from_call: 3,
            ..Mock::default()
        })
        .await;
        // A stored token must not leak into the unauthenticated status check.
        let tokens = Arc::new(MemoryTokenStore::new());
        tokens.save(&SecretString::from("local-token")).await.unwrap();

        let host = Arc::new(RecordingHost::new());
        let poller = PaymentPoller::new(
            backend(&config, tokens),
            host.clone(),
            config.poll.clone(),
            PageLifetime::new(),
        );

        poller
            .run(&PaymentPayload::from_query("session_id=cs_test_1"))
            .await;

        assert_eq!(mock.checkout_calls.load(Ordering::SeqCst), 3);
        assert!(mock.checkout_auth.lock().unwrap().iter().all(Option::is_none));
        assert_eq!(
            poller.view(),
            PaymentView::Success {
                plan_name: Some("Professional".into())
            }
        );
        assert!(poller.continue_to_sign_in());
        assert_eq!(host.navigations(), vec![Navigation::to(Destination::SignIn)]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn payment_gives_up_after_ten_checks() {
    timeout(TEST_TIMEOUT, async {
        let (config, mock) = start_server(Mock::default()).await;
        let poller = PaymentPoller::new(
            backend(&config, Arc::new(MemoryTokenStore::new())),
            Arc::new(RecordingHost::new()),
            config.poll.clone(),
            PageLifetime::new(),
        );

        poller
            .run(&PaymentPayload::from_query("session_id=cs_test_1"))
            .await;

        assert_eq!(mock.checkout_calls.load(Ordering::SeqCst), 10);
        assert!(matches!(poller.view(), PaymentView::Error { .. }));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn checkout_status_surfaces_not_found_detail() {
    timeout(TEST_TIMEOUT, async {
        let (config, _mock) = start_server(Mock::default()).await;
        let backend = backend(&config, Arc::new(MemoryTokenStore::new()));

        let err = backend.checkout_status("cs_unknown").await.unwrap_err();
        match err {
            RemoteError::Status { status, detail, .. } => {
                assert_eq!(status, 404);
                assert_eq!(detail.as_deref(), Some("Unknown session"));
            }
            other => panic!("unexpected error: {other}"),
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn me_uses_stored_token_and_logout_clears_it() {
    timeout(TEST_TIMEOUT, async {
        let (config, mock) = start_server(Mock::default()).await;
        let tokens = Arc::new(MemoryTokenStore::new());
        let backend = backend(&config, tokens.clone());

        let err = backend.current_user().await.unwrap_err();
        assert!(matches!(err, RemoteError::Status { status: 401, .. }));

        tokens.save(&SecretString::from("local-token")).await.unwrap();
        let user = backend.current_user().await.unwrap();
        assert_eq!(user.id.as_deref(), Some("user-1"));
        assert_eq!(user.onboarding_step, Some(2));

        backend.logout().await.unwrap();
        assert_eq!(mock.logout_calls.load(Ordering::SeqCst), 1);
        assert!(tokens.load().await.unwrap().is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn logout_clears_token_even_when_backend_is_down() {
    timeout(TEST_TIMEOUT, async {
        let config = ClientConfig {
            // Nothing listens on the discard port.
            api_url: "http://127.0.0.1:9".into(),
            request_timeout: Duration::from_millis(500),
            ..ClientConfig::default()
        };
        let tokens = Arc::new(MemoryTokenStore::new());
        tokens.save(&SecretString::from("local-token")).await.unwrap();
        let backend = backend(&config, tokens.clone());

        let err = backend.logout().await.unwrap_err();
        assert!(matches!(err, Error::Remote(RemoteError::Transport { .. })));
        assert!(tokens.load().await.unwrap().is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn plans_and_health() {
    timeout(TEST_TIMEOUT, async {
        let (config, _mock) = start_server(Mock::default()).await;
        let backend = backend(&config, Arc::new(MemoryTokenStore::new()));

        let plans = backend.plans().await.unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, "starter");
        assert_eq!(plans[0].price, dec!(29.00));
        assert_eq!(plans[1].currency, "usd");

        let health = backend.health().await.unwrap();
        assert!(health.is_ok());
        assert_eq!(health.service.as_deref(), Some("onboarding-api"));
    })
    .await
    .expect("test timed out");
}
