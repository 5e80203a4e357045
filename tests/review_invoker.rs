//! ReviewInvoker against mock Ollama servers

use httpmock::prelude::*;
use prreview::config::OllamaConfig;
use prreview::errors::AIError;
use prreview::ollama::{ReviewInvoker, ReviewReply};
use prreview::review::{CancellationToken, ProgressSink, ReviewEvent};
use prreview::types::TransferMode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;

const DIFF: &str = "--- a.txt\n+++ a.txt\n@@ -1 +1,2 @@\n hello\n+world";
const MODEL: &str = "codellama";

fn invoker(stream: bool) -> ReviewInvoker {
    let config = OllamaConfig {
        connect_timeout_secs: 2,
        request_timeout_secs: 10,
        stream,
        ..OllamaConfig::default()
    };
    ReviewInvoker::new(&config, "Review this:\n{diff}\n")
}

fn drain(rx: &mut UnboundedReceiver<ReviewEvent>) -> Vec<ReviewEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_streamed_fragments_are_concatenated() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .json_body_partial(r#"{"model": "codellama", "stream": true}"#)
                .body_contains("+world");
            then.status(200)
                .header("content-type", "application/x-ndjson")
                .body(concat!(
                    "{\"model\":\"codellama\",\"response\":\"Looks\",\"done\":false}\n",
                    "{\"model\":\"codellama\",\"response\":\" good\",\"done\":false}\n",
                    "{\"model\":\"codellama\",\"response\":\".\",\"done\":false}\n",
                    "{\"model\":\"codellama\",\"response\":\"\",\"done\":true}\n",
                ));
        })
        .await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let reply = invoker(true)
        .review(
            DIFF,
            &server.url("/api/generate"),
            MODEL,
            &CancellationToken::new(),
            &ProgressSink::new(tx),
        )
        .await
        .unwrap();

    assert_eq!(
        reply,
        ReviewReply::Feedback {
            text: "Looks good.".to_string(),
            transfer: TransferMode::Streaming,
        }
    );
    mock.assert_async().await;

    let events = drain(&mut rx);
    let fragments: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ReviewEvent::Fragment(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(fragments, vec!["Looks", " good", "."]);
    assert!(events
        .iter()
        .any(|e| matches!(e, ReviewEvent::Throughput { chunks: 3, .. })));
}

#[tokio::test]
async fn test_stream_closed_before_done_keeps_received_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200)
                .body("{\"response\":\"No major\",\"done\":false}\n{\"response\":\" issues found.\",\"done\":false}");
        })
        .await;

    let reply = invoker(true)
        .review(
            DIFF,
            &server.url("/api/generate"),
            MODEL,
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();
    assert_eq!(
        reply,
        ReviewReply::Feedback {
            text: "No major issues found.".to_string(),
            transfer: TransferMode::Streaming,
        }
    );
}

#[tokio::test]
async fn test_blocking_only_when_streaming_disabled() {
    let server = MockServer::start_async().await;
    let blocking = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .json_body_partial(r#"{"stream": false}"#);
            then.status(200)
                .json_body(serde_json::json!({"response": "No major issues found.", "done": true}));
        })
        .await;

    let reply = invoker(false)
        .review(
            DIFF,
            &server.url("/api/generate"),
            MODEL,
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();
    assert_eq!(
        reply,
        ReviewReply::Feedback {
            text: "No major issues found.".to_string(),
            transfer: TransferMode::Blocking,
        }
    );
    blocking.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_unknown_model_is_reported() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(404)
                .json_body(serde_json::json!({"error": "model 'codellama' not found, try pulling it first"}));
        })
        .await;

    let err = invoker(true)
        .review(
            DIFF,
            &server.url("/api/generate"),
            MODEL,
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AIError::ModelNotFound { model } if model == MODEL));
    // one streaming attempt, one blocking fallback
    mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_garbage_body_is_malformed_after_fallback() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).body("<html>proxy error</html>\n");
        })
        .await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let err = invoker(true)
        .review(
            DIFF,
            &server.url("/api/generate"),
            MODEL,
            &CancellationToken::new(),
            &ProgressSink::new(tx),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AIError::MalformedResponse(_)));
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, ReviewEvent::FallbackToBlocking(_))));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let url = format!("http://127.0.0.1:{}/api/generate", port);
    let err = invoker(true)
        .review(
            DIFF,
            &url,
            MODEL,
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AIError::ConnectionRefused { url: ref u } if *u == url));
    assert!(err.remediation(&url, MODEL).unwrap().contains("ollama serve"));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200)
                .delay(std::time::Duration::from_secs(3))
                .json_body(serde_json::json!({"response": "too late"}));
        })
        .await;

    let config = OllamaConfig {
        connect_timeout_secs: 1,
        request_timeout_secs: 1,
        ..OllamaConfig::default()
    };
    let url = server.url("/api/generate");
    let err = ReviewInvoker::new(&config, "Review this:\n{diff}\n")
        .review(
            DIFF,
            &url,
            MODEL,
            &CancellationToken::new(),
            &ProgressSink::disabled(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AIError::Timeout { url: ref u } if *u == url));
    assert!(err.remediation(&url, MODEL).is_some());
    // the stream attempt and the blocking fallback both time out
    mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_cancelled_before_start_sends_nothing() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).json_body(serde_json::json!({"response": "unused"}));
        })
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let reply = invoker(true)
        .review(
            DIFF,
            &server.url("/api/generate"),
            MODEL,
            &cancel,
            &ProgressSink::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(reply, ReviewReply::Cancelled);
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_cancel_while_waiting_on_stalled_stream() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200)
                .delay(std::time::Duration::from_secs(5))
                .body("{\"response\":\"late\",\"done\":true}\n");
        })
        .await;

    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        stopper.cancel();
    });

    let started = std::time::Instant::now();
    let result = invoker(true)
        .review(
            DIFF,
            &server.url("/api/generate"),
            MODEL,
            &cancel,
            &ProgressSink::disabled(),
        )
        .await;

    assert_eq!(result.unwrap(), ReviewReply::Cancelled);
    assert!(started.elapsed() < std::time::Duration::from_secs(3));
}

/// Reads one HTTP request and returns its body.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        assert!(n > 0, "client closed the connection early");
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            let body_start = header_end + 4;
            if data.len() >= body_start + content_length {
                return String::from_utf8_lossy(&data[body_start..body_start + content_length])
                    .to_string();
            }
        }
    }
}

#[tokio::test]
async fn test_connection_reset_mid_stream_falls_back_to_blocking() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api/generate", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let mut bodies = Vec::new();

        // First connection: one chunk of a chunked response, then hang up.
        let (mut socket, _) = listener.accept().await.unwrap();
        bodies.push(read_request(&mut socket).await);
        let line = "{\"response\":\"Partial\",\"done\":false}\n";
        let head = "HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ntransfer-encoding: chunked\r\n\r\n";
        let chunk = format!("{:x}\r\n{}\r\n", line.len(), line);
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(chunk.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        drop(socket);

        // Second connection: the blocking request.
        let (mut socket, _) = listener.accept().await.unwrap();
        bodies.push(read_request(&mut socket).await);
        let body = r#"{"response": "No major issues found."}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();

        bodies
    });

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let reply = invoker(true)
        .review(
            DIFF,
            &url,
            MODEL,
            &CancellationToken::new(),
            &ProgressSink::new(tx),
        )
        .await
        .unwrap();

    assert_eq!(
        reply,
        ReviewReply::Feedback {
            text: "No major issues found.".to_string(),
            transfer: TransferMode::Blocking,
        }
    );

    let bodies = server.await.unwrap();
    assert!(bodies[0].contains("\"stream\":true"));
    assert!(bodies[1].contains("\"stream\":false"));
    assert!(bodies[1].contains("Review this:"));

    let events = drain(&mut rx);
    assert!(events.contains(&ReviewEvent::Fragment("Partial".to_string())));
    assert!(events
        .iter()
        .any(|e| matches!(e, ReviewEvent::FallbackToBlocking(_))));
}
