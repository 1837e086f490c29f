use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use time::OffsetDateTime;
use tokio::{net::TcpListener, sync::oneshot};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use remora::{
    config::Config,
    gateway::{GatewayError, Resource, SnapshotData, SnapshotPayload, SnapshotSource},
    mirror::Mirror,
    store::ChannelState,
};

use crate::wait_for;

/// Backend whose snapshots are always empty; these tests exercise the push
/// channel only.
struct EmptySource;

#[async_trait]
impl SnapshotSource for EmptySource {
    async fn fetch(&self, resource: Resource) -> Result<SnapshotPayload, GatewayError> {
        let observed_at = OffsetDateTime::now_utc();
        let data = match resource {
            Resource::Trust => SnapshotData::Trust(Default::default()),
            Resource::Agency => SnapshotData::Agency(Default::default()),
            Resource::Skills => SnapshotData::Skills(Default::default()),
            Resource::Limbic => SnapshotData::Limbic(Default::default()),
            Resource::Health => SnapshotData::Health(Default::default()),
        };
        Ok(SnapshotPayload { data, observed_at })
    }
}

fn push_config(port: u16) -> Config {
    let mut config = Config::default();
    config.poll.interval_ms = 60_000;
    config.push.url = format!("ws://127.0.0.1:{port}/ws");
    config.push.connect_timeout_ms = 2_000;
    config.push.backoff_base_ms = 50;
    config.push.backoff_max_ms = 200;
    config
}

async fn bind_server() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port should bind");
    let port = listener.local_addr().expect("listener has an addr").port();
    (listener, port)
}

#[tokio::test]
async fn given_malformed_frames_between_valid_ones_then_listener_survives_and_merges() {
    let (listener, port) = bind_server().await;
    let (close_tx, close_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("client should connect");
        let mut ws = accept_async(stream).await.expect("handshake should pass");

        ws.send(Message::text(
            r#"{"type":"tier-changed","tier":"trusted","score":0.9}"#,
        ))
        .await
        .expect("tier frame should send");
        ws.send(Message::text("{definitely not json"))
            .await
            .expect("malformed frame should send");
        ws.send(Message::text(r#"{"type":"voice-waveform","samples":[]}"#))
            .await
            .expect("unknown-tag frame should send");
        ws.send(Message::text(
            r#"{"type":"limbic_update","variables":{"warmth":0.7}}"#,
        ))
        .await
        .expect("limbic frame should send");

        let _ = close_rx.await;
        let _ = ws.close(None).await;
        // Drain until the connection ends so the close completes cleanly.
        while let Some(frame) = ws.next().await {
            if frame.is_err() {
                break;
            }
        }
    });

    let mirror = Mirror::start(Arc::new(EmptySource), &push_config(port)).await;
    let mut states = mirror.subscribe();

    wait_for(&mut states, "limbic merge after malformed frame", |state| {
        state.limbic.variables.get("warmth") == Some(&0.7)
    })
    .await;

    let state = mirror.state();
    assert_eq!(state.trust.tier, "trusted", "frame before the garbage landed");
    assert_eq!(
        state.channel,
        ChannelState::Connected,
        "malformed input must not drop the channel"
    );

    close_tx.send(()).expect("server should still be waiting");
    wait_for(&mut states, "disconnect indicator", |state| {
        state.channel == ChannelState::Disconnected
    })
    .await;

    mirror.shutdown().await;
    server.await.expect("server task should finish");
}

#[tokio::test]
async fn given_server_drop_then_listener_reconnects_and_resumes_merging() {
    let (listener, port) = bind_server().await;

    let server = tokio::spawn(async move {
        // First connection: handshake, then drop straight away.
        let (stream, _) = listener.accept().await.expect("first connect");
        let ws = accept_async(stream).await.expect("first handshake");
        drop(ws);

        // Second connection after the client's backoff.
        let (stream, _) = listener.accept().await.expect("reconnect");
        let mut ws = accept_async(stream).await.expect("second handshake");
        ws.send(Message::text(
            r#"{"type":"thoughts-log-update","entry":"back online"}"#,
        ))
        .await
        .expect("thought frame should send");

        while let Some(frame) = ws.next().await {
            if frame.is_err() {
                break;
            }
        }
    });

    let mirror = Mirror::start(Arc::new(EmptySource), &push_config(port)).await;
    let mut states = mirror.subscribe();

    wait_for(&mut states, "merge after reconnect", |state| {
        state
            .history
            .newest()
            .is_some_and(|entry| entry.detail == "back online")
    })
    .await;

    mirror.shutdown().await;
    server.await.expect("server task should finish");
}
