//! End-to-end session tests over an in-memory duplex pipe.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use htserve::access_log::AccessLog;
use htserve::docroot::DocumentRoot;
use htserve::http::connection::{Connection, MAX_HEAD_BYTES};
use htserve::http::handler::Handler;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio::task::JoinHandle;

struct Session {
    client: DuplexStream,
    server: JoinHandle<anyhow::Result<()>>,
    log_path: PathBuf,
    root: PathBuf,
}

async fn start(tag: &str, idle: Duration) -> Session {
    let root = common::docroot(tag);
    let log_path = common::scratch_dir(&format!("{}-log", tag)).join("log.txt");

    let handler = Arc::new(Handler::new(DocumentRoot::new(&root), Duration::from_secs(60)));
    let access_log = Arc::new(AccessLog::open(&log_path).await.unwrap());

    let (client, server_side) = duplex(64 * 1024);
    let conn = Connection::new(server_side, "127.0.0.1", handler, access_log, idle);
    let server = tokio::spawn(conn.run());

    Session {
        client,
        server,
        log_path,
        root,
    }
}

/// Reads one response: head, then `Content-Length` body bytes unless `head_only`.
async fn read_response(client: &mut DuplexStream, head_only: bool) -> (String, Vec<u8>) {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        let n = client.read(&mut byte).await.unwrap();
        assert_ne!(n, 0, "connection closed mid-head: {:?}", String::from_utf8_lossy(&buf));
        buf.push(byte[0]);
    }
    let head = String::from_utf8(buf).unwrap();

    let length = head
        .lines()
        .find_map(|l| l.strip_prefix("Content-Length: "))
        .map(|v| v.trim().parse::<usize>().unwrap())
        .unwrap_or(0);

    let mut body = Vec::new();
    if !head_only && !head.starts_with("HTTP/1.1 304") {
        body.resize(length, 0);
        client.read_exact(&mut body).await.unwrap();
    }
    (head, body)
}

async fn assert_closed(client: &mut DuplexStream) {
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty(), "unexpected trailing bytes: {:?}", rest);
}

fn log_text(path: &PathBuf) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn keep_alive_get_serves_index_and_stays_open() {
    let mut s = start("c-keepalive", Duration::from_secs(5)).await;

    s.client
        .write_all(b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let (head, body) = read_response(&mut s.client, false).await;

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Connection: keep-alive\r\nTimeout: timeout=60\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", common::INDEX_HTML.len())));
    assert_eq!(body, common::INDEX_HTML);

    // Same socket serves a second request.
    s.client
        .write_all(b"GET /logo.png HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let (head, body) = read_response(&mut s.client, false).await;

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: image/png\r\n"));
    assert_eq!(body, common::PNG_BYTES);

    assert_closed(&mut s.client).await;
    s.server.await.unwrap().unwrap();

    let log = log_text(&s.log_path);
    let batches: Vec<&str> = log.split("\n\n").filter(|b| !b.is_empty()).collect();
    assert_eq!(batches.len(), 2);
    assert!(batches[0].ends_with("'200']\n['/index.html']"));
    assert!(batches[1].ends_with("'200']\n['/logo.png']"));
}

#[tokio::test]
async fn missing_file_gets_404_and_closes() {
    let mut s = start("c-404", Duration::from_secs(5)).await;

    s.client
        .write_all(b"GET /missing.html HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let (head, body) = read_response(&mut s.client, false).await;

    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(head.contains("Connection: close\r\n"));
    assert_eq!(body, common::NOT_FOUND_HTML);

    assert_closed(&mut s.client).await;
    s.server.await.unwrap().unwrap();

    let log = log_text(&s.log_path);
    assert!(log.starts_with("['127.0.0.1', '"));
    assert!(log.ends_with("'404']\n[]\n\n"));
}

#[tokio::test]
async fn single_token_request_line_gets_400_and_closes() {
    let mut s = start("c-foo", Duration::from_secs(5)).await;

    s.client.write_all(b"FOO\r\n\r\n").await.unwrap();
    let (head, body) = read_response(&mut s.client, false).await;

    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body, common::BAD_REQUEST_HTML);

    assert_closed(&mut s.client).await;
    s.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn target_without_slash_gets_400_even_with_keep_alive() {
    let mut s = start("c-noslash", Duration::from_secs(5)).await;

    s.client
        .write_all(b"GET index.html HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let (head, _) = read_response(&mut s.client, false).await;

    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_closed(&mut s.client).await;
    s.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn head_gets_headers_only() {
    let mut s = start("c-head", Duration::from_secs(5)).await;

    s.client
        .write_all(b"HEAD / HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let (head, _) = read_response(&mut s.client, true).await;

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", common::INDEX_HTML.len())));
    assert_closed(&mut s.client).await;
    s.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn conditional_get_then_not_modified() {
    let mut s = start("c-304", Duration::from_secs(5)).await;
    let future = httpdate::fmt_http_date(std::time::SystemTime::now() + Duration::from_secs(3600));

    let req = format!(
        "GET / HTTP/1.1\r\nIf-Modified-Since: {}\r\nConnection: keep-alive\r\n\r\n",
        future
    );
    s.client.write_all(req.as_bytes()).await.unwrap();
    let (head, body) = read_response(&mut s.client, false).await;

    assert!(head.starts_with("HTTP/1.1 304 Not Modified\r\n"));
    assert!(!head.contains("Content-Length"));
    assert!(body.is_empty());

    // Still open: close it politely.
    s.client
        .write_all(b"HEAD / HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let (head, _) = read_response(&mut s.client, true).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));

    assert_closed(&mut s.client).await;
    s.server.await.unwrap().unwrap();

    let log = log_text(&s.log_path);
    assert!(log.contains("'304']\n['/index.html']"));
}

#[tokio::test]
async fn request_split_across_writes_is_reassembled() {
    let mut s = start("c-split", Duration::from_secs(5)).await;

    s.client.write_all(b"GET / HT").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    s.client
        .write_all(b"TP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let (head, body) = read_response(&mut s.client, false).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, common::INDEX_HTML);
    s.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn idle_timeout_closes_silently() {
    let mut s = start("c-idle", Duration::from_millis(100)).await;

    assert_closed(&mut s.client).await;
    s.server.await.unwrap().unwrap();

    assert_eq!(log_text(&s.log_path), "");
}

#[tokio::test]
async fn idle_timeout_after_keep_alive_response() {
    let mut s = start("c-idle-after", Duration::from_millis(150)).await;

    s.client
        .write_all(b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let (head, _) = read_response(&mut s.client, false).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));

    assert_closed(&mut s.client).await;
    s.server.await.unwrap().unwrap();

    let log = log_text(&s.log_path);
    assert_eq!(log.matches("'200'").count(), 1);
}

#[tokio::test]
async fn lf_only_head_gets_400_after_idle_timeout() {
    let mut s = start("c-lf-only", Duration::from_millis(200)).await;

    s.client.write_all(b"GET / HTTP/1.1\n\n").await.unwrap();

    let mut out = Vec::new();
    s.client.read_to_end(&mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"), "got {:?}", out);
    assert!(out.ends_with(std::str::from_utf8(common::BAD_REQUEST_HTML).unwrap()));
    s.server.await.unwrap().unwrap();

    let log = log_text(&s.log_path);
    assert!(log.ends_with("'400']\n[]\n\n"), "log was {:?}", log);
}

#[tokio::test]
async fn request_line_without_blank_line_gets_400_after_idle_timeout() {
    let mut s = start("c-no-blank", Duration::from_millis(200)).await;

    s.client.write_all(b"FOO\r\n").await.unwrap();

    let mut out = Vec::new();
    s.client.read_to_end(&mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"), "got {:?}", out);
    assert!(out.contains("Connection: close\r\n"));
    s.server.await.unwrap().unwrap();

    assert!(log_text(&s.log_path).contains("'400'"));
}

#[tokio::test]
async fn peer_close_without_request_ends_session() {
    let s = start("c-eof", Duration::from_secs(5)).await;

    drop(s.client);
    s.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn oversized_head_gets_400() {
    let mut s = start("c-oversized", Duration::from_secs(5)).await;

    let mut req = b"GET / HTTP/1.1\r\nX-Fill: ".to_vec();
    req.extend(std::iter::repeat_n(b'a', MAX_HEAD_BYTES + 16));
    s.client.write_all(&req).await.unwrap();

    let (head, _) = read_response(&mut s.client, false).await;
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    s.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn missing_error_document_falls_back_to_builtin_body() {
    let mut s = start("c-errdoc-fallback", Duration::from_secs(5)).await;
    std::fs::remove_file(s.root.join("404.html")).unwrap();

    s.client
        .write_all(b"GET /nothing.jpg HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    let (head, body) = read_response(&mut s.client, false).await;

    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(body, b"404 Not Found");
    s.server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_write_whole_batches() {
    const SESSIONS: usize = 8;

    let root = common::docroot("c-concurrent");
    let log_path = common::scratch_dir("c-concurrent-log").join("log.txt");
    let handler = Arc::new(Handler::new(DocumentRoot::new(&root), Duration::from_secs(60)));
    let access_log = Arc::new(AccessLog::open(&log_path).await.unwrap());

    let mut clients = Vec::new();
    for i in 0..SESSIONS {
        let (mut client, server_side) = duplex(64 * 1024);
        let conn = Connection::new(
            server_side,
            format!("10.0.0.{}", i),
            handler.clone(),
            access_log.clone(),
            Duration::from_secs(5),
        );
        let server = tokio::spawn(conn.run());

        clients.push(tokio::spawn(async move {
            client
                .write_all(b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
                .await
                .unwrap();
            let (head, _) = read_response(&mut client, false).await;
            assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));

            client
                .write_all(b"GET /logo.png HTTP/1.1\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let (head, _) = read_response(&mut client, false).await;
            assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));

            assert_closed(&mut client).await;
            server.await.unwrap().unwrap();
        }));
    }
    for client in clients {
        client.await.unwrap();
    }

    let log = log_text(&log_path);
    assert!(log.ends_with("\n\n"));
    let batches: Vec<&str> = log.split("\n\n").filter(|b| !b.is_empty()).collect();
    // One flush after the keep-alive response, one at close.
    assert_eq!(batches.len(), SESSIONS * 2);

    for batch in &batches {
        let lines: Vec<&str> = batch.lines().collect();
        assert_eq!(lines.len(), 2, "torn batch: {:?}", batch);
        assert!(lines[0].starts_with("['10.0.0.") && lines[0].ends_with("', '200']"));
        assert!(lines[1] == "['/index.html']" || lines[1] == "['/logo.png']");
    }

    for i in 0..SESSIONS {
        let opener = format!("['10.0.0.{}', ", i);
        let mine: Vec<&&str> = batches.iter().filter(|b| b.starts_with(&opener)).collect();
        assert_eq!(mine.len(), 2);
        assert!(mine[0].ends_with("['/index.html']"));
        assert!(mine[1].ends_with("['/logo.png']"));
    }
}
