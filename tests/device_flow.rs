mod support;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use trakt_catalogs::trakt::auth::{
    device_flow::{MAX_CODE_LIFETIME, MAX_POLL_INTERVAL},
    AuthorizationStatus, DeviceFlow, Error,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{auth_context, file_store, memory_store, scripted_context, ScriptedApi};

async fn mount_device_code(server: &MockServer, expires_in: u64, interval: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/device/code"))
        .and(body_json(json!({ "client_id": "client-id" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "ABCD1234",
            "verification_url": "https://trakt.tv/activate",
            "expires_in": expires_in,
            "interval": interval,
        })))
        .mount(server)
        .await;
}

async fn token_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.path() == "/oauth/device/token")
        .count()
}

/// Wait on the paused clock; `within` must exceed the last expected tick.
async fn wait_terminal(flow: &DeviceFlow, within: Duration) -> AuthorizationStatus {
    let mut rx = flow.subscribe();
    let status = tokio::time::timeout(within, rx.wait_for(|s| s.is_terminal()))
        .await
        .expect("polling did not finish")
        .expect("status channel closed");
    status.clone()
}

#[tokio::test]
async fn start_returns_url_before_first_poll() {
    let server = MockServer::start().await;
    mount_device_code(&server, 600, 5).await;
    let dir = TempDir::new().unwrap();
    let flow = DeviceFlow::new(auth_context(&server, file_store(&dir)));

    let url = flow.start().await.unwrap();

    assert_eq!(url, "https://trakt.tv/activate/ABCD1234");
    assert_eq!(
        flow.status(),
        AuthorizationStatus::Pending {
            verification_url: url.clone()
        }
    );
    assert_eq!(token_requests(&server).await, 0);

    flow.shutdown().await;
    assert_eq!(flow.status(), AuthorizationStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn approval_persists_token_on_that_tick() {
    let api = ScriptedApi::new(600, 5, Some(3));
    let store = memory_store();
    let flow = DeviceFlow::new(scripted_context(api.clone(), store.clone()));

    flow.start().await.unwrap();

    let status = wait_terminal(&flow, Duration::from_secs(3600)).await;
    assert_eq!(status, AuthorizationStatus::Approved);
    assert_eq!(api.polls(), 3);

    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved.access_token, "access-1");
    assert_eq!(saved.created_at, 1_900_000_000);

    // Polling stopped with the approval.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn polls_wait_one_interval_each() {
    let api = ScriptedApi::new(600, 5, None);
    let flow = DeviceFlow::new(scripted_context(api.clone(), memory_store()));

    flow.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(4900)).await;
    assert_eq!(api.polls(), 0);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(api.polls(), 1);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(api.polls(), 2);

    flow.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unapproved_code_expires() {
    let api = ScriptedApi::new(12, 5, None);
    let store = memory_store();
    let flow = DeviceFlow::new(scripted_context(api.clone(), store.clone()));

    flow.start().await.unwrap();

    let status = wait_terminal(&flow, Duration::from_secs(3600)).await;
    assert_eq!(status, AuthorizationStatus::Expired);
    // Polled at 5 s and 10 s, the 15 s tick is past the deadline.
    assert_eq!(api.polls(), 2);
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn huge_server_timings_are_clamped() {
    let api = ScriptedApi::new(u64::MAX, u64::MAX, Some(1));
    let store = memory_store();
    let flow = DeviceFlow::new(scripted_context(api.clone(), store.clone()));

    flow.start().await.unwrap();

    let status = wait_terminal(&flow, MAX_POLL_INTERVAL * 2).await;
    assert_eq!(status, AuthorizationStatus::Approved);
    assert_eq!(api.polls(), 1);
    assert!(store.load().await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn huge_expiry_still_ends() {
    let api = ScriptedApi::new(u64::MAX, u64::MAX, None);
    let flow = DeviceFlow::new(scripted_context(api.clone(), memory_store()));

    let started = tokio::time::Instant::now();
    flow.start().await.unwrap();

    let status = wait_terminal(&flow, MAX_CODE_LIFETIME * 2).await;
    assert_eq!(status, AuthorizationStatus::Expired);
    assert!(started.elapsed() <= MAX_CODE_LIFETIME + MAX_POLL_INTERVAL);
    let max_polls = MAX_CODE_LIFETIME.as_secs() / MAX_POLL_INTERVAL.as_secs();
    assert!(api.polls() as u64 <= max_polls);
}

#[tokio::test]
async fn rejected_device_code_fails_without_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/device/code"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let flow = DeviceFlow::new(auth_context(&server, file_store(&dir)));

    let err = flow.start().await.unwrap_err();

    assert!(matches!(err, Error::DeviceCodeRequest(_)));
    assert!(matches!(flow.status(), AuthorizationStatus::Failed { .. }));
    flow.shutdown().await;
    assert_eq!(token_requests(&server).await, 0);
}

#[tokio::test]
async fn second_attempt_is_rejected_while_pending() {
    let server = MockServer::start().await;
    mount_device_code(&server, 600, 5).await;
    let dir = TempDir::new().unwrap();
    let flow = DeviceFlow::new(auth_context(&server, file_store(&dir)));

    flow.start().await.unwrap();
    let err = flow.start().await.unwrap_err();
    assert!(matches!(err, Error::AuthorizationInProgress));

    flow.shutdown().await;
    flow.start().await.unwrap();
    flow.shutdown().await;
}
