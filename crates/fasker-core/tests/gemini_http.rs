//! Drives the real `GeminiClient` through a `ChatSession` against a one-shot
//! HTTP responder on localhost.

use std::sync::Arc;

use fasker_core::{ChatSession, GeminiClient, Sender, SEEDED_GREETING};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct CapturedRequest {
    request_line: String,
    body: String,
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Accept one connection, capture the request, answer with `status` and `body`.
async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&buf) {
                break end;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let wanted = header_end + content_length(&head);
        while buf.len() < wanted {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;

        let _ = tx.send(CapturedRequest {
            request_line: head.lines().next().unwrap_or_default().to_string(),
            body: String::from_utf8_lossy(&buf[header_end..wanted.min(buf.len())]).to_string(),
        });
    });

    (format!("http://{}/v1beta", addr), rx)
}

fn session_for(endpoint: &str) -> ChatSession {
    session_with_key(endpoint, "test-key")
}

fn session_with_key(endpoint: &str, key: &str) -> ChatSession {
    let client = GeminiClient::new(endpoint, "gemini-1.5-flash");
    ChatSession::new(Arc::new(client), Some(key.to_string()))
}

async fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/v1beta", addr)
}

#[tokio::test]
async fn successful_reply_is_appended() {
    let (endpoint, captured) = serve_once(
        "200 OK",
        r#"{"candidates":[{"content":{"parts":[{"text":"4"}],"role":"model"}}]}"#,
    )
    .await;
    let mut session = session_for(&endpoint);

    session.submit("2+2?").await;

    let messages: Vec<(Sender, &str)> = session
        .state()
        .messages()
        .iter()
        .map(|m| (m.sender, m.text.as_str()))
        .collect();
    assert_eq!(
        messages,
        vec![
            (Sender::Bot, SEEDED_GREETING),
            (Sender::User, "2+2?"),
            (Sender::Bot, "4"),
        ]
    );
    assert!(!session.state().is_awaiting_response());

    let request = captured.await.unwrap();
    assert!(
        request
            .request_line
            .starts_with("POST /v1beta/models/gemini-1.5-flash:generateContent?key=test-key "),
        "{}",
        request.request_line
    );
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "contents": [ { "parts": [ { "text": "2+2?" } ] } ] })
    );
}

#[tokio::test]
async fn server_error_message_is_surfaced() {
    let (endpoint, _captured) = serve_once(
        "500 Internal Server Error",
        r#"{"error":{"code":500,"message":"quota exceeded"}}"#,
    )
    .await;
    let mut session = session_for(&endpoint);

    session.submit("hello").await;

    let last = session.state().messages().last().unwrap();
    assert_eq!(last.sender, Sender::Bot);
    assert!(last.text.contains("quota exceeded"), "{}", last.text);
    assert!(!session.state().is_awaiting_response());
}

#[tokio::test]
async fn unexpected_success_body_is_reported() {
    let (endpoint, _captured) = serve_once("200 OK", r#"{"promptFeedback":{}}"#).await;
    let mut session = session_for(&endpoint);

    session.submit("hello").await;

    let last = session.state().messages().last().unwrap();
    assert!(last.text.contains("invalid response format"), "{}", last.text);
}

#[tokio::test]
async fn connection_failure_is_reported() {
    let mut session = session_for(&refused_endpoint().await);

    session.submit("hello").await;

    let last = session.state().messages().last().unwrap();
    assert_eq!(last.sender, Sender::Bot);
    assert!(last.text.contains("network error"), "{}", last.text);
    assert!(!session.state().is_awaiting_response());

    // the session keeps working after a failure
    assert_eq!(session.state().messages().len(), 3);
}

#[tokio::test]
async fn transport_error_does_not_reveal_api_key() {
    let mut session = session_with_key(&refused_endpoint().await, "SECRET-KEY-123");

    session.submit("hello").await;

    let last = session.state().messages().last().unwrap();
    assert!(last.text.contains("network error"), "{}", last.text);
    assert!(!last.text.contains("SECRET-KEY-123"), "{}", last.text);
    assert!(!last.text.contains("key="), "{}", last.text);
}
