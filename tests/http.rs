//! End-to-end tests for the HTTP surface over a real TCP socket

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use telemetry_relay::session::{SessionContext, SessionError, SessionFactory, SessionFuture};
use telemetry_relay::{HubConfig, RelayServer, ServerConfig, TelemetryHub};

/// Sessions accept dotted addresses and publish a counter until stopped
struct TestFactory;

impl SessionFactory for TestFactory {
    fn start(&self, mut ctx: SessionContext) -> Result<SessionFuture, SessionError> {
        if !ctx.address.as_str().contains('.') {
            return Err(SessionError::InvalidAddress(ctx.address.as_str().to_string()));
        }

        Ok(Box::pin(async move {
            let mut n = 0u64;
            loop {
                tokio::select! {
                    _ = ctx.shutdown.wait() => break,
                    _ = tokio::time::sleep(Duration::from_millis(2)) => {
                        n += 1;
                        ctx.publisher.publish(serde_json::json!({ "Throttle": n % 256 }));
                    }
                }
            }
        }))
    }
}

struct TestServer {
    addr: SocketAddr,
    hub: Arc<TelemetryHub>,
    _shutdown: oneshot::Sender<()>,
}

async fn start_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = ServerConfig::with_addr(addr)
        .hub(HubConfig::default().stop_timeout(Duration::from_millis(200)));
    let server = RelayServer::with_factory(config, TestFactory);
    let hub = Arc::clone(server.hub());

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    TestServer {
        addr,
        hub,
        _shutdown: tx,
    }
}

struct RawResponse {
    status: u16,
    head: String,
    body: String,
}

async fn send(addr: SocketAddr, request: String) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut raw))
        .await
        .unwrap()
        .unwrap();
    parse_response(&String::from_utf8_lossy(&raw))
}

fn parse_response(raw: &str) -> RawResponse {
    let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);

    RawResponse {
        status,
        head: head.to_string(),
        body: body.to_string(),
    }
}

async fn post_configure(addr: SocketAddr, body: &str) -> RawResponse {
    let request = format!(
        "POST /configure HTTP/1.1\r\nHost: {addr}\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    send(addr, request).await
}

/// Send a WebSocket handshake and return the stream with the response head
async fn upgrade(addr: SocketAddr) -> (TcpStream, RawResponse) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /ws HTTP/1.1\r\nHost: {addr}\r\n\
         Connection: Upgrade\r\nUpgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    let mut byte = [0u8; 1];
    while !raw.ends_with(b"\r\n\r\n") {
        let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut byte))
            .await
            .unwrap()
            .unwrap();
        if n == 0 {
            break;
        }
        raw.push(byte[0]);
    }

    let response = parse_response(&String::from_utf8_lossy(&raw));
    (stream, response)
}

async fn wait_for_subscribers(hub: &TelemetryHub, expected: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while hub.subscriber_count().await != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("subscriber count never reached {}", expected));
}

#[tokio::test]
async fn ws_rejected_until_configured() {
    let server = start_server().await;

    let (_stream, response) = upgrade(server.addr).await;

    assert_eq!(response.status, 503);
    assert_eq!(server.hub.subscriber_count().await, 0);
    assert_eq!(server.hub.stats().snapshot().subscribers_admitted, 0);
}

#[tokio::test]
async fn configure_then_subscribe_and_disconnect() {
    let server = start_server().await;

    let response = post_configure(server.addr, r#"{"ps5_ip": "10.0.0.5"}"#).await;
    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["status"], "success");

    let (stream, response) = upgrade(server.addr).await;
    assert_eq!(response.status, 101);
    wait_for_subscribers(&server.hub, 1).await;

    drop(stream);
    wait_for_subscribers(&server.hub, 0).await;
}

#[tokio::test]
async fn configure_wrong_type_is_bad_request() {
    let server = start_server().await;

    let response = post_configure(server.addr, r#"{"ps5_ip": 123}"#).await;

    assert_eq!(response.status, 400);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["status"], "error");
    assert!(!server.hub.is_configured().await);
    assert_eq!(server.hub.generation(), 0);
}

#[tokio::test]
async fn configure_malformed_json_is_bad_request() {
    let server = start_server().await;

    let response = post_configure(server.addr, "{not json").await;

    assert_eq!(response.status, 400);
    assert!(!server.hub.is_configured().await);
}

#[tokio::test]
async fn configure_rejected_address_is_bad_request() {
    let server = start_server().await;

    let response = post_configure(server.addr, r#"{"ps5_ip": "console"}"#).await;

    assert_eq!(response.status, 400);
    assert!(!server.hub.is_configured().await);
}

#[tokio::test]
async fn configure_same_address_twice_succeeds() {
    let server = start_server().await;

    assert_eq!(post_configure(server.addr, r#"{"ps5_ip": "10.0.0.5"}"#).await.status, 200);
    assert_eq!(post_configure(server.addr, r#"{"ps5_ip": "10.0.0.5"}"#).await.status, 200);

    assert_eq!(server.hub.generation(), 1);
    assert_eq!(server.hub.stats().snapshot().reconfigurations, 1);
}

#[tokio::test]
async fn configure_requires_post() {
    let server = start_server().await;

    let request = format!(
        "GET /configure HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        server.addr
    );
    let response = send(server.addr, request).await;

    assert_eq!(response.status, 405);
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let server = start_server().await;

    let request = format!(
        "OPTIONS /configure HTTP/1.1\r\nHost: {}\r\n\
         Origin: http://dashboard.local:3000\r\n\
         Access-Control-Request-Method: POST\r\n\
         Access-Control-Request-Headers: content-type\r\n\
         Connection: close\r\n\r\n",
        server.addr
    );
    let response = send(server.addr, request).await;

    assert_eq!(response.status, 204);
    let head = response.head.to_ascii_lowercase();
    assert!(head.contains("access-control-allow-origin: *"));
    assert!(head.contains("access-control-allow-methods: get, post, head"));
}

#[tokio::test]
async fn status_reports_hub_state() {
    let server = start_server().await;
    post_configure(server.addr, r#"{"ps5_ip": "10.0.0.5"}"#).await;

    let request = format!(
        "GET /status HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        server.addr
    );
    let response = send(server.addr, request).await;

    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["configured"], true);
    assert_eq!(body["ps5_ip"], "10.0.0.5");
    assert_eq!(body["generation"], 1);
}
