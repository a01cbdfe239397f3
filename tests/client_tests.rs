//! HTTP chat client tests against a local mock of the chat service

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use voicebot::client::{ChatEndpoint, ChatRequest, HttpChatClient};
use voicebot::config::EndpointConfig;
use voicebot::VoicebotError;

#[derive(Clone, Default)]
struct MockState {
    messages: Arc<parking_lot::Mutex<Vec<String>>>,
    resets: Arc<AtomicUsize>,
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|c| c.contains("sessionid=interview-1"))
        .unwrap_or(false)
}

async fn handle_chat(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    state.messages.lock().push(request.message.clone());

    match request.message.as_str() {
        "" => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Empty message"})),
        )
            .into_response(),
        "garbage" => (StatusCode::OK, "<html>proxy error</html>").into_response(),
        "crash" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "nothing" => Json(json!({})).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"reply": "too late"})).into_response()
        }
        "do you remember me?" => {
            let reply = if has_session(&headers) { "yes" } else { "no" };
            Json(json!({"reply": reply})).into_response()
        }
        message => (
            [(header::SET_COOKIE, "sessionid=interview-1; Path=/")],
            Json(json!({"reply": format!("You asked: {}", message)})),
        )
            .into_response(),
    }
}

async fn handle_reset(State(state): State<MockState>) -> Json<serde_json::Value> {
    state.resets.fetch_add(1, Ordering::SeqCst);
    Json(json!({"status": "ok"}))
}

async fn spawn_chat_server() -> (String, MockState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let state = MockState::default();
    let app = Router::new()
        .route("/api/chat/", post(handle_chat))
        .route("/api/reset-session/", post(handle_reset))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), state)
}

fn client_for(base_url: &str) -> HttpChatClient {
    let config = EndpointConfig {
        base_url: base_url.to_string(),
        timeout_secs: 1,
        ..Default::default()
    };
    HttpChatClient::new(&config).expect("client")
}

#[tokio::test]
async fn test_send_message_returns_reply() {
    let (url, state) = spawn_chat_server().await;
    let client = client_for(&url);

    let reply = client.send_message("Why should we hire you?").await.unwrap();
    assert_eq!(reply, "You asked: Why should we hire you?");
    assert_eq!(*state.messages.lock(), vec!["Why should we hire you?"]);
}

#[tokio::test]
async fn test_error_body_is_endpoint_error() {
    let (url, _state) = spawn_chat_server().await;
    let client = client_for(&url);

    match client.send_message("").await {
        Err(VoicebotError::EndpointError(msg)) => assert_eq!(msg, "Empty message"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreadable_answers_are_endpoint_errors() {
    let (url, _state) = spawn_chat_server().await;
    let client = client_for(&url);

    for message in ["garbage", "crash", "nothing"] {
        let result = client.send_message(message).await;
        assert!(
            matches!(result, Err(VoicebotError::EndpointError(_))),
            "{} gave {:?}",
            message,
            result
        );
    }
}

#[tokio::test]
async fn test_session_cookie_is_kept() {
    let (url, _state) = spawn_chat_server().await;
    let client = client_for(&url);

    assert_eq!(client.send_message("do you remember me?").await.unwrap(), "no");
    client.send_message("hello").await.unwrap();
    assert_eq!(client.send_message("do you remember me?").await.unwrap(), "yes");
}

#[tokio::test]
async fn test_reset_session() {
    let (url, state) = spawn_chat_server().await;
    let client = client_for(&url);

    client.reset_session().await.unwrap();
    client.reset_session().await.unwrap();
    assert_eq!(state.resets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_reset_on_missing_route_fails() {
    let (url, _state) = spawn_chat_server().await;
    let config = EndpointConfig {
        base_url: url,
        reset_path: "/api/no-such-route/".to_string(),
        ..Default::default()
    };
    let client = HttpChatClient::new(&config).unwrap();

    assert!(matches!(
        client.reset_session().await,
        Err(VoicebotError::EndpointError(_))
    ));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let (url, _state) = spawn_chat_server().await;
    let client = client_for(&url);

    let result = client.send_message("slow").await;
    assert!(matches!(result, Err(VoicebotError::TransportError(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{addr}"));
    let err = client.send_message("hello").await.unwrap_err();
    assert!(matches!(err, VoicebotError::TransportError(_)));
    assert_eq!(err.user_message(), "Sorry, something went wrong.");
}
