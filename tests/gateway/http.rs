use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

use remora::{
    config::GatewayConfig,
    gateway::{GatewayErrorKind, HttpGateway, Resource, SnapshotData, SnapshotSource},
};

fn gateway_for(port: u16) -> HttpGateway {
    let mut config = GatewayConfig::default();
    config.base_url = format!("http://127.0.0.1:{port}");
    config.request_timeout_ms = 2_000;
    HttpGateway::new(&config).expect("client should build")
}

/// Answers exactly one request with a canned status line and JSON body.
async fn serve_once(status_line: &'static str, body: &'static str) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port should bind");
    let port = listener.local_addr().expect("listener has an addr").port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("request should arrive");

        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = stream.read(&mut chunk).await.expect("request read");
            request.extend_from_slice(&chunk[..read]);
            if read == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len(),
        );
        stream
            .write_all(response.as_bytes())
            .await
            .expect("response write");
        stream.shutdown().await.expect("stream close");
    });

    (port, server)
}

#[tokio::test]
async fn given_ok_response_when_fetched_then_snapshot_and_timestamp_decode() {
    let body = r#"{"score":0.42,"tier":"supervised","consecutive_approvals":3,"last_updated":"2026-08-20T10:00:00Z"}"#;
    let (port, server) = serve_once("200 OK", body).await;

    let payload = gateway_for(port)
        .fetch(Resource::Trust)
        .await
        .expect("fetch should succeed");

    let SnapshotData::Trust(trust) = payload.data else {
        panic!("expected a trust snapshot");
    };
    assert_eq!(trust.tier, "supervised");
    assert_eq!(trust.consecutive_approvals, 3);

    let expected = OffsetDateTime::parse("2026-08-20T10:00:00Z", &Rfc3339)
        .expect("fixture timestamp parses");
    assert_eq!(payload.observed_at, expected);

    server.await.expect("server task should finish");
}

#[tokio::test]
async fn given_server_error_when_fetched_then_error_carries_the_status() {
    let (port, server) = serve_once("500 Internal Server Error", "{}").await;

    let err = gateway_for(port)
        .fetch(Resource::Agency)
        .await
        .expect_err("5xx must surface as an error");

    assert_eq!(err.kind, GatewayErrorKind::Status);
    assert_eq!(err.http_status, Some(500));
    assert_eq!(err.resource, Some(Resource::Agency));

    server.await.expect("server task should finish");
}

#[tokio::test]
async fn given_garbage_body_when_fetched_then_error_is_a_decode_failure() {
    let (port, server) = serve_once("200 OK", "<html>not json</html>").await;

    let err = gateway_for(port)
        .fetch(Resource::Limbic)
        .await
        .expect_err("non-json body must not decode");

    assert_eq!(err.kind, GatewayErrorKind::Decode);
    server.await.expect("server task should finish");
}

#[tokio::test]
async fn given_nothing_listening_when_fetched_then_error_is_a_network_failure() {
    // Bind then drop to get a port with nothing behind it.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port should bind");
    let port = listener.local_addr().expect("listener has an addr").port();
    drop(listener);

    let err = gateway_for(port)
        .fetch(Resource::Health)
        .await
        .expect_err("refused connection must surface as an error");

    assert_eq!(err.kind, GatewayErrorKind::Network);
}

#[test]
fn given_path_override_when_building_urls_then_only_that_resource_changes() {
    let mut config = GatewayConfig::default();
    config.base_url = "http://backend:8700/".to_string();
    config.paths.trust = Some("/v2/trust".to_string());
    let gateway = HttpGateway::new(&config).expect("client should build");

    assert_eq!(gateway.url_for(Resource::Trust), "http://backend:8700/v2/trust");
    assert_eq!(
        gateway.url_for(Resource::Limbic),
        "http://backend:8700/api/limbic/state"
    );
}
