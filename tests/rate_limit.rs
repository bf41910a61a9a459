use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use cricstats::api::{ApiClient, FetchStats};
use cricstats::config::ApiConfig;

const TOO_MANY_REQUESTS: &str =
    "HTTP/1.1 429 Too Many Requests\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
const OK_EMPTY_JSON: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
     Content-Length: 2\r\nConnection: close\r\n\r\n{}";

/// Serve each canned response to one connection, then stop accepting.
/// A request beyond the scripted ones gets connection-refused, which a
/// correct client never triggers.
fn serve_responses(
    responses: Vec<&'static str>,
) -> (String, Arc<AtomicUsize>, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let handle = thread::spawn(move || {
        for response in responses {
            let (mut stream, _) = listener.accept().expect("accept connection");
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            counter.fetch_add(1, Ordering::SeqCst);
            stream
                .write_all(response.as_bytes())
                .expect("write response");
        }
    });
    (format!("http://{addr}"), hits, handle)
}

fn test_config(base_url: String) -> ApiConfig {
    ApiConfig {
        api_key: None,
        api_host: "127.0.0.1".to_string(),
        base_url,
        db_path: PathBuf::from("unused.db"),
        request_delay: Duration::ZERO,
        rate_limit_cooldown: Duration::from_millis(20),
        scorecard_batch: 3,
    }
}

#[test]
fn rate_limited_call_retries_exactly_once_then_succeeds() {
    let (base_url, hits, handle) =
        serve_responses(vec![TOO_MANY_REQUESTS, OK_EMPTY_JSON]);
    let config = test_config(base_url);
    let client = ApiClient::new(&config).expect("build client");
    let mut stats = FetchStats::default();

    let payload = client.recent_matches(&mut stats).expect("retry should succeed");
    handle.join().expect("server thread");

    assert!(payload.is_object());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(stats.api_calls, 2);
    assert_eq!(stats.successful_calls, 1);
    assert_eq!(stats.failed_calls, 1);
}

#[test]
fn second_rate_limit_fails_without_a_third_attempt() {
    let (base_url, hits, handle) =
        serve_responses(vec![TOO_MANY_REQUESTS, TOO_MANY_REQUESTS]);
    let config = test_config(base_url);
    let client = ApiClient::new(&config).expect("build client");
    let mut stats = FetchStats::default();

    let result = client.recent_matches(&mut stats);
    handle.join().expect("server thread");

    assert!(result.is_err(), "second 429 must surface as an error");
    assert_eq!(hits.load(Ordering::SeqCst), 2, "no third request allowed");
    assert_eq!(stats.api_calls, 2);
    assert_eq!(stats.successful_calls, 0);
    assert_eq!(stats.failed_calls, 2);
}
