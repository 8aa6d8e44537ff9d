use sage_backend::{BackendConfig, BackendError, HttpBackend, PaperSearchRequest, ResearchBackend};
use sage_tree::RunStatus;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the one-shot server saw
struct Captured {
    request_line: String,
    body: String,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Accept one connection, record the request, answer with a canned body
async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = headers
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                if key.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;

        Captured {
            request_line: headers.lines().next().unwrap_or_default().to_string(),
            body: String::from_utf8_lossy(&buf[header_end..header_end + content_length])
                .to_string(),
        }
    });

    (format!("http://{addr}/api"), task)
}

fn backend(base_url: String) -> HttpBackend {
    HttpBackend::new(&BackendConfig {
        base_url,
        request_timeout_secs: 10,
    })
    .unwrap()
}

#[tokio::test]
async fn search_posts_queries_and_decodes_papers() {
    let (url, server) = serve_once(
        200,
        r#"{"papers":[{"id":"p1","title":"Attention","authors":["Vaswani"],"year":2017}]}"#,
    )
    .await;

    let response = backend(url)
        .search_papers(&PaperSearchRequest {
            queries: vec!["attention".to_string()],
            limit: Some(5),
        })
        .await
        .unwrap();

    assert_eq!(response.papers.len(), 1);
    assert_eq!(response.papers[0].year, Some(2017));

    let seen = server.await.unwrap();
    assert_eq!(seen.request_line, "POST /api/papers/search HTTP/1.1");
    let sent: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
    assert_eq!(sent["queries"][0], "attention");
    assert_eq!(sent["limit"], 5);
}

#[tokio::test]
async fn status_is_fetched_by_run_id() {
    let (url, server) = serve_once(200, r#"{"run_id":"r1","status":"completed"}"#).await;

    let report = backend(url).experiment_status("r1").await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);

    let seen = server.await.unwrap();
    assert_eq!(seen.request_line, "GET /api/experiments/r1 HTTP/1.1");
}

#[tokio::test]
async fn error_status_carries_backend_detail() {
    let (url, server) = serve_once(422, r#"{"detail":"queries must not be empty"}"#).await;

    let err = backend(url)
        .search_papers(&PaperSearchRequest {
            queries: vec![],
            limit: None,
        })
        .await
        .unwrap_err();

    match err {
        BackendError::Status { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "queries must not be empty");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let (url, server) = serve_once(200, r#"{"run_id":"r1"}"#).await;

    let err = backend(url).experiment_status("r1").await.unwrap_err();
    assert!(matches!(err, BackendError::Decode(_)));
    assert!(!err.is_retryable());
    server.await.unwrap();
}
