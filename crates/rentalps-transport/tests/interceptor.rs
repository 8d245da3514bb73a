//! Integration tests for the unauthorized interceptor in `ApiClient`.
//!
//! The transport is a scripted fake: each `send` pops the next canned
//! outcome and records the request it was given, so tests can assert both
//! what the caller saw and exactly what went over the "wire".

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rentalps_transport::{
    ApiClient, ApiError, ApiRequest, ApiResponse, HttpTransport, Method, TransportError,
    UnauthorizedHandler,
};
use serde_json::json;

// =========================================================================
// Fakes
// =========================================================================

#[derive(Clone, Default)]
struct ScriptedTransport {
    outcomes: Arc<Mutex<VecDeque<Result<ApiResponse, TransportError>>>>,
    seen: Arc<Mutex<Vec<ApiRequest>>>,
}

impl ScriptedTransport {
    fn with(outcomes: Vec<Result<ApiResponse, TransportError>>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            seen: Arc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn seen(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more times than scripted")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct RecoveryFailed(String);

/// Counts recoveries; optionally fails them; rotates the token on success.
#[derive(Clone)]
struct CountingHandler {
    calls: Arc<AtomicUsize>,
    fail_with: Option<String>,
    token: Arc<Mutex<Option<String>>>,
}

impl CountingHandler {
    fn succeeding() -> Self {
        Self {
            calls: Arc::default(),
            fail_with: None,
            token: Arc::new(Mutex::new(Some("old".into()))),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::succeeding()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl UnauthorizedHandler for CountingHandler {
    type Error = RecoveryFailed;

    async fn recover(&self) -> Result<(), RecoveryFailed> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(RecoveryFailed(message.clone())),
            None => {
                *self.token.lock().unwrap() = Some("new".into());
                Ok(())
            }
        }
    }

    fn access_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn ok(body: serde_json::Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(200, serde_json::to_vec(&body).unwrap()))
}

fn unauthorized() -> Result<ApiResponse, TransportError> {
    Err(TransportError::Status(
        ApiResponse::new(401, r#"{"message":"token expired"}"#).with_status_text("Unauthorized"),
    ))
}

fn server_error() -> Result<ApiResponse, TransportError> {
    Err(TransportError::Status(
        ApiResponse::new(500, "").with_status_text("Internal Server Error"),
    ))
}

fn client(
    transport: &ScriptedTransport,
    handler: &CountingHandler,
) -> ApiClient<ScriptedTransport, CountingHandler> {
    ApiClient::new(transport.clone()).with_unauthorized_handler(handler.clone())
}

// =========================================================================
// Pass-through
// =========================================================================

#[tokio::test]
async fn test_send_success_passes_through_without_recovery() {
    let transport = ScriptedTransport::with(vec![ok(json!({"id": 1}))]);
    let handler = CountingHandler::succeeding();

    let response = client(&transport, &handler)
        .send(ApiRequest::get("/users"))
        .await
        .expect("should succeed");

    assert_eq!(response.status, 200);
    assert_eq!(transport.calls(), 1);
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_send_non_401_error_propagates_untouched() {
    let transport = ScriptedTransport::with(vec![server_error()]);
    let handler = CountingHandler::succeeding();

    let err = client(&transport, &handler)
        .send(ApiRequest::get("/users"))
        .await
        .expect_err("should fail");

    assert_eq!(err.status(), Some(500));
    assert_eq!(handler.calls(), 0);
    assert_eq!(transport.calls(), 1);
}

// =========================================================================
// Recovery
// =========================================================================

#[tokio::test]
async fn test_send_401_once_recovers_and_retries_once() {
    let transport = ScriptedTransport::with(vec![unauthorized(), ok(json!({"id": 1}))]);
    let handler = CountingHandler::succeeding();

    let response = client(&transport, &handler)
        .send(ApiRequest::get("/users"))
        .await
        .expect("retry should succeed");

    assert_eq!(response.status, 200);
    assert_eq!(handler.calls(), 1);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_send_401_twice_propagates_second_error_without_second_retry() {
    let transport = ScriptedTransport::with(vec![unauthorized(), unauthorized()]);
    let handler = CountingHandler::succeeding();

    let err = client(&transport, &handler)
        .send(ApiRequest::get("/users"))
        .await
        .expect_err("second 401 should propagate");

    assert!(matches!(err, ApiError::Transport(ref e) if e.is_unauthorized()));
    assert_eq!(handler.calls(), 1, "recovery must run only once");
    assert_eq!(transport.calls(), 2, "request must be retried only once");
}

#[tokio::test]
async fn test_send_recovery_failure_replaces_original_error() {
    let transport = ScriptedTransport::with(vec![unauthorized()]);
    let handler = CountingHandler::failing("refresh rejected");

    let err = client(&transport, &handler)
        .send(ApiRequest::get("/users"))
        .await
        .expect_err("should fail");

    assert!(matches!(err, ApiError::Recovery(_)));
    assert_eq!(err.to_string(), "refresh rejected");
    assert!(
        err.recovery_error()
            .and_then(|e| e.downcast_ref::<RecoveryFailed>())
            .is_some()
    );
    assert_eq!(transport.calls(), 1, "no replay after failed recovery");
}

#[tokio::test]
async fn test_send_refresh_endpoint_never_triggers_recovery() {
    let transport = ScriptedTransport::with(vec![unauthorized()]);
    let handler = CountingHandler::succeeding();

    let err = client(&transport, &handler)
        .send(ApiRequest::post("/auth/refresh"))
        .await
        .expect_err("should fail");

    assert!(matches!(err, ApiError::Transport(ref e) if e.is_unauthorized()));
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_send_custom_exempt_path_never_triggers_recovery() {
    let transport = ScriptedTransport::with(vec![unauthorized()]);
    let handler = CountingHandler::succeeding();
    let client = client(&transport, &handler).exempt_path("/auth/login");

    let result = client.send(ApiRequest::post("/auth/login")).await;

    assert!(result.is_err());
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_send_without_handler_propagates_401() {
    let transport = ScriptedTransport::with(vec![unauthorized()]);
    let client = ApiClient::new(transport.clone());

    let err = client
        .send(ApiRequest::get("/users"))
        .await
        .expect_err("should fail");

    assert!(!client.has_unauthorized_handler());
    assert_eq!(err.user_message(), "token expired");
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_send_each_call_gets_its_own_retry_budget() {
    let transport = ScriptedTransport::with(vec![
        unauthorized(),
        ok(json!(1)),
        unauthorized(),
        ok(json!(2)),
    ]);
    let handler = CountingHandler::succeeding();
    let client = client(&transport, &handler);
    let request = ApiRequest::get("/users");

    client.send(request.clone()).await.expect("first call");
    client.send(request).await.expect("second call");

    assert_eq!(handler.calls(), 2);
    assert_eq!(transport.calls(), 4);
}

// =========================================================================
// Bearer credential
// =========================================================================

#[tokio::test]
async fn test_send_replay_carries_rotated_token() {
    let transport = ScriptedTransport::with(vec![unauthorized(), ok(json!(null))]);
    let handler = CountingHandler::succeeding();

    client(&transport, &handler)
        .send(ApiRequest::get("/users"))
        .await
        .expect("should succeed");

    let seen = transport.seen();
    assert_eq!(seen[0].bearer.as_deref(), Some("old"));
    assert_eq!(seen[1].bearer.as_deref(), Some("new"));
}

// =========================================================================
// Typed helpers
// =========================================================================

#[tokio::test]
async fn test_get_decodes_json_body() {
    let transport = ScriptedTransport::with(vec![ok(json!({"name": "PS5 Room"}))]);
    let client = ApiClient::new(transport.clone());

    let value: serde_json::Value = client.get("/rooms/1").await.expect("should decode");

    assert_eq!(value, json!({"name": "PS5 Room"}));
    assert_eq!(transport.seen()[0].method, Method::Get);
}

#[tokio::test]
async fn test_post_encodes_body_and_decodes_response() {
    let transport = ScriptedTransport::with(vec![ok(json!({"id": 7}))]);
    let client = ApiClient::new(transport.clone());

    let value: serde_json::Value = client
        .post("/memberships", &json!({"tier": "gold"}))
        .await
        .expect("should succeed");

    assert_eq!(value["id"], 7);
    let sent = &transport.seen()[0];
    assert_eq!(sent.method, Method::Post);
    let body: serde_json::Value = serde_json::from_slice(sent.body.as_ref().unwrap()).unwrap();
    assert_eq!(body, json!({"tier": "gold"}));
}

#[tokio::test]
async fn test_delete_empty_body_decodes_as_unit() {
    let transport = ScriptedTransport::with(vec![Ok(ApiResponse::new(204, ""))]);
    let client = ApiClient::new(transport);

    let result: Result<(), ApiError> = client.delete("/users/3").await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_get_undecodable_body_returns_protocol_error() {
    let transport = ScriptedTransport::with(vec![Ok(ApiResponse::new(200, "<html>"))]);
    let client = ApiClient::new(transport);

    let result: Result<serde_json::Value, ApiError> = client.get("/users").await;

    assert!(matches!(result, Err(ApiError::Protocol(_))));
}
