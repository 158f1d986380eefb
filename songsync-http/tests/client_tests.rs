//! `HttpClient` against a scripted local HTTP server.
//!
//! Each scripted response is served to exactly one connection, then the
//! listener closes. Hits are counted so retry bounds can be asserted.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use songsync_http::{client::part_path, HttpClient, HttpError, RetryPolicy, Transport};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn response(status: u16, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn read_request_head(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

/// Serve `script` one response per connection; returns base URL and hit count.
fn serve(script: Vec<String>) -> (String, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);

    thread::spawn(move || {
        for reply in script {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            read_request_head(&mut stream);
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = stream.write_all(reply.as_bytes());
            let _ = stream.flush();
        }
    });

    (base, hits)
}

fn client(max_retries: u32) -> HttpClient {
    HttpClient::new(Duration::from_secs(5), RetryPolicy::immediate(max_retries))
}

// ---------------------------------------------------------------------------
// get_json
// ---------------------------------------------------------------------------

#[test]
fn server_errors_are_retried_until_success() {
    let (base, hits) = serve(vec![
        response(500, "oops"),
        response(502, "bad gateway"),
        response(200, r#"{"code":200,"data":[]}"#),
    ]);

    let value = client(3).get_json(&format!("{base}/search")).expect("get");
    assert_eq!(value["code"], 200);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn malformed_json_is_retried() {
    let (base, hits) = serve(vec![
        response(200, "<html>rate limited</html>"),
        response(200, r#"{"code":200}"#),
    ]);

    let value = client(3).get_json(&format!("{base}/search")).expect("get");
    assert_eq!(value["code"], 200);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn exhausted_budget_reports_attempts_and_stops() {
    let (base, hits) = serve(vec![
        response(503, "busy"),
        response(503, "busy"),
        response(200, r#"{"never":"reached"}"#),
    ]);

    let err = client(1)
        .get_json(&format!("{base}/search"))
        .expect_err("should exhaust");
    assert!(
        matches!(err, HttpError::Exhausted { attempts: 2, .. }),
        "got: {err}"
    );
    assert!(matches!(err.root(), HttpError::Status { status: 503, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn connection_refused_is_a_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };

    let err = client(2)
        .get_json(&format!("http://127.0.0.1:{port}/search"))
        .expect_err("nothing listening");
    assert!(matches!(err, HttpError::Exhausted { attempts: 3, .. }));
    assert!(matches!(err.root(), HttpError::Transport { .. }));
}

// ---------------------------------------------------------------------------
// download
// ---------------------------------------------------------------------------

#[test]
fn download_streams_body_and_cleans_part_file() {
    let body = "a".repeat(20_000);
    let (base, _) = serve(vec![response(200, &body)]);
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("store").join("X - A.mp3");

    let bytes = client(0)
        .download(&format!("{base}/media.mp3"), &dest)
        .expect("download");
    assert_eq!(bytes, 20_000);
    assert_eq!(std::fs::read(&dest).unwrap().len(), 20_000);
    assert!(!part_path(&dest).exists(), "part file must be renamed away");
}

#[test]
fn failed_download_leaves_no_file_behind() {
    let (base, hits) = serve(vec![response(404, "gone"), response(404, "gone")]);
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("X - A.mp3");

    let err = client(1)
        .download(&format!("{base}/media.mp3"), &dest)
        .expect_err("404");
    assert!(matches!(err.root(), HttpError::Status { status: 404, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(!dest.exists());
    assert!(!part_path(&dest).exists());
}

#[test]
fn local_write_failure_is_not_retried() {
    let body = "b".repeat(4096);
    let (base, hits) = serve(vec![response(200, &body), response(200, &body)]);
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("X - A.mp3");
    // A directory squatting on the part path makes the local create fail.
    std::fs::create_dir_all(part_path(&dest)).unwrap();

    let err = client(3)
        .download(&format!("{base}/media.mp3"), &dest)
        .expect_err("write must fail");
    assert!(matches!(err, HttpError::Io { .. }), "got: {err}");
    assert_eq!(hits.load(Ordering::SeqCst), 1, "filesystem errors are final");
    assert!(!dest.exists());
}
