//! OpenAI completions client against a loopback HTTP server

use completion_mcp::CompletionError;
use completion_mcp::llm::{CompletionBackend, CompletionParams, OpenAiCompletionClient};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Captured request: head (request line + headers) and body
struct Captured {
    head: String,
    body: String,
}

/// Accept one connection, capture the request, answer with `status` and `body`.
/// With `status == None` the connection is held open without answering.
async fn serve_once(status: Option<&'static str>, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let (head, body_start) = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break (String::from_utf8_lossy(&buf[..pos]).to_string(), pos + 4);
            }
        };

        let content_length = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < body_start + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string();

        match status {
            Some(status) => {
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
            None => tokio::time::sleep(Duration::from_secs(30)).await,
        }

        Captured {
            head,
            body: request_body,
        }
    });

    (format!("http://{}/v1", addr), handle)
}

fn params() -> CompletionParams {
    CompletionParams {
        model: "gpt-3.5-turbo-instruct".into(),
        prompt: "Once upon a time".into(),
        max_tokens: 150u32.into(),
        temperature: 0.7,
        top_p: 1.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
    }
}

#[tokio::test]
async fn test_successful_completion() {
    let (base_url, server) = serve_once(
        Some("200 OK"),
        r#"{"choices":[{"text":" there was a fox","finish_reason":"length"}],"usage":{"prompt_tokens":4,"completion_tokens":16,"total_tokens":20}}"#,
    )
    .await;

    let client = OpenAiCompletionClient::new("sk-test".into(), base_url, reqwest::Client::new());
    let response = client
        .create_completion(params(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.first_text(), " there was a fox");
    assert_eq!(response.first_finish_reason().as_deref(), Some("length"));
    assert_eq!(response.usage.unwrap().total_tokens, 20);

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /v1/completions"));
    assert!(
        captured
            .head
            .to_ascii_lowercase()
            .contains("authorization: bearer sk-test")
    );

    let body: Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(body["model"], "gpt-3.5-turbo-instruct");
    assert_eq!(body["prompt"], "Once upon a time");
    assert_eq!(body["max_tokens"], 150);
    assert_eq!(body["temperature"], 0.7);
    assert_eq!(body["top_p"], 1.0);
    assert_eq!(body["frequency_penalty"], 0.0);
    assert_eq!(body["presence_penalty"], 0.0);
}

#[tokio::test]
async fn test_api_error_message_surfaces() {
    let (base_url, _server) = serve_once(
        Some("401 Unauthorized"),
        r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
    )
    .await;

    let client = OpenAiCompletionClient::new("sk-bad".into(), base_url, reqwest::Client::new());
    let err = client
        .create_completion(params(), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Incorrect API key provided");
    assert_eq!(
        CompletionError::from_upstream(err, false),
        CompletionError::Upstream("Incorrect API key provided".into())
    );
}

#[tokio::test]
async fn test_non_json_error_body() {
    let (base_url, _server) = serve_once(Some("503 Service Unavailable"), "overloaded").await;

    let client = OpenAiCompletionClient::new("sk-test".into(), base_url, reqwest::Client::new());
    let err = client
        .create_completion(params(), CancellationToken::new())
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("503"), "{message}");
    assert!(message.contains("overloaded"), "{message}");
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let (base_url, _server) = serve_once(None, "").await;

    let client = OpenAiCompletionClient::new("sk-test".into(), base_url, reqwest::Client::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        client.create_completion(params(), cancel),
    )
    .await
    .expect("cancellation should end the call")
    .unwrap_err();

    assert_eq!(
        err.downcast::<CompletionError>().unwrap(),
        CompletionError::Cancelled
    );
}
