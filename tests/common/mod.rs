//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use upstream_sentinel::SentinelConfig;

pub const UPSTREAM_CONF: &str = "upstream inventory {\n    least_conn;\n    server svc-1:8000;\n    server svc-2:8000;\n}\n";

/// A scriptable metrics backend. Every request gets the current response.
#[derive(Clone)]
pub struct MockMetrics {
    pub addr: SocketAddr,
    response: Arc<Mutex<(u16, String)>>,
}

#[allow(dead_code)]
impl MockMetrics {
    /// Answer with a successful vector result holding these values.
    pub fn set_values(&self, values: &[(&str, f64)]) {
        self.set_response(200, vector_body(values));
    }

    pub fn set_response(&self, status: u16, body: impl Into<String>) {
        *self.response.lock().unwrap() = (status, body.into());
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start a mock metrics backend on an ephemeral port.
pub async fn start_mock_metrics() -> MockMetrics {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = Arc::new(Mutex::new((200, vector_body(&[]))));

    let shared = response.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let (status, body) = shared.lock().unwrap().clone();
                    tokio::spawn(respond(socket, status, body));
                }
                Err(_) => break,
            }
        }
    });

    MockMetrics { addr, response }
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn respond(mut socket: TcpStream, status: u16, body: String) {
    // Drain the request head so closing the socket does not reset it.
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }

    let status_text = match status {
        200 => "200 OK",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Instant-query envelope for the given instance values.
pub fn vector_body(values: &[(&str, f64)]) -> String {
    let result: Vec<_> = values
        .iter()
        .map(|(instance, value)| {
            serde_json::json!({
                "metric": {
                    "__name__": "inventory_service_state",
                    "instance": instance,
                    "job": "inventory",
                },
                "value": [1718000000.0, value.to_string()],
            })
        })
        .collect();
    serde_json::json!({
        "status": "success",
        "data": { "resultType": "vector", "result": result },
    })
    .to_string()
}

/// Configuration pointing at the mock backend with files under `dir`.
pub fn test_config(backend_url: &str, dir: &Path) -> SentinelConfig {
    let mut config = SentinelConfig::default();
    config.feed.backend_url = backend_url.to_string();
    config.feed.timeout_secs = 1.0;
    config.detection.poll_interval_secs = 0.05;
    config.detection.consecutive = 2;
    config.detection.threshold = 1.0;
    config.upstream.path = dir.join("upstream.conf");
    config.events.path = dir.join("events.json");
    config.reload.command = vec!["true".to_string()];
    config.reload.timeout_secs = 5;
    std::fs::write(&config.upstream.path, UPSTREAM_CONF).unwrap();
    config
}
