#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pi_relay::application::relay::PaymentRelay;
use pi_relay::domain::payment::ClaimPolicy;
use pi_relay::domain::ports::PaymentStoreBox;
use pi_relay::infrastructure::pi_api::{PiApiClient, PiApiConfig};
use pi_relay::interfaces::http::router;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const API_KEY: &str = "test-key";
pub const GOOD_TOKEN: &str = "good-token";

/// Stand-in for the Pi Platform API that records every payment call.
#[derive(Default)]
pub struct MockPiApi {
    pub calls: Mutex<Vec<(String, String)>>,
    pub auth_headers: Mutex<Vec<String>>,
    /// Number of upcoming payment calls to answer with a 500.
    pub failures: AtomicUsize,
    pub delay_ms: AtomicU64,
}

impl MockPiApi {
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub async fn calls_for(&self, payment_id: &str, action: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(id, a)| id == payment_id && a == action)
            .count()
    }

    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

async fn payment_action(
    State(mock): State<Arc<MockPiApi>>,
    Path((payment_id, action)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let delay = mock.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    mock.auth_headers.lock().await.push(auth);
    mock.calls.lock().await.push((payment_id.clone(), action));

    let failing = mock
        .failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    Json(json!({ "identifier": payment_id })).into_response()
}

async fn me(headers: HeaderMap) -> Response {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if bearer == format!("Bearer {GOOD_TOKEN}") {
        Json(json!({ "uid": "uid-1", "username": "pioneer" })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "invalid token").into_response()
    }
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}")
}

/// Starts the mock Pi API on an ephemeral port and returns its base URL.
pub async fn spawn_mock_pi_api() -> (String, Arc<MockPiApi>) {
    let mock = Arc::new(MockPiApi::default());
    let app = Router::new()
        .route("/v2/payments/{payment_id}/{action}", post(payment_action))
        .route("/v2/me", get(me))
        .with_state(mock.clone());

    (serve(app).await, mock)
}

pub fn pi_client(base_url: &str) -> PiApiClient {
    PiApiClient::new(PiApiConfig {
        base_url: base_url.to_string(),
        api_key: API_KEY.to_string(),
        app_secret: Some("app-secret".to_string()),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

/// Starts the relay against `pi_base_url` and returns its base URL.
pub async fn spawn_relay(pi_base_url: &str, store: PaymentStoreBox, policy: ClaimPolicy) -> String {
    let relay = PaymentRelay::new(store, Box::new(pi_client(pi_base_url)), policy);
    serve(router(relay)).await
}

pub fn random_payment_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("PAY-{suffix}")
}

pub async fn post_callback(
    client: &reqwest::Client,
    relay_url: &str,
    body: serde_json::Value,
) -> reqwest::StatusCode {
    client
        .post(format!("{relay_url}/api/pi"))
        .json(&body)
        .send()
        .await
        .unwrap()
        .status()
}
