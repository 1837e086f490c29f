use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use time::OffsetDateTime;
use tokio::{
    net::TcpStream,
    sync::mpsc,
    time::{sleep, timeout},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use crate::{
    config::PushConfig,
    observability::metrics,
    push::{
        backoff::ReconnectPolicy,
        wire::{self, DecodeOutcome},
    },
    store::{ChannelState, StoreWrite},
};

type PushStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum ReadExit {
    /// Shutdown requested or the consumer queue is gone; stop entirely.
    Stop,
    /// Server close or transport error; reconnect after backoff.
    Closed,
}

/// Push channel listener: `disconnected -> connecting -> connected ->
/// disconnected`, reconnecting forever with backoff. Every state transition
/// is forwarded to the store immediately so the connectivity indicator never
/// shows a stale "connected".
pub struct PushListener {
    url: String,
    connect_timeout: Duration,
    policy: ReconnectPolicy,
    writes: mpsc::Sender<StoreWrite>,
}

impl PushListener {
    pub fn new(config: &PushConfig, writes: mpsc::Sender<StoreWrite>) -> Self {
        Self {
            url: config.url.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms.max(1)),
            policy: ReconnectPolicy::from_config(config),
            writes,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut attempt: u32 = 0;

        loop {
            if shutdown.is_cancelled() {
                return;
            }
            if !self.forward(StoreWrite::Channel(ChannelState::Connecting)).await {
                return;
            }

            let stream = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = timeout(self.connect_timeout, connect_async(self.url.as_str())) => {
                    match result {
                        Ok(Ok((stream, _response))) => Some(stream),
                        Ok(Err(err)) => {
                            tracing::warn!(target: "push", url = %self.url, error = %err, "push_connect_failed");
                            None
                        }
                        Err(_elapsed) => {
                            tracing::warn!(target: "push", url = %self.url, "push_connect_timed_out");
                            None
                        }
                    }
                }
            };

            if let Some(stream) = stream {
                attempt = 0;
                if !self.forward(StoreWrite::Channel(ChannelState::Connected)).await {
                    return;
                }
                tracing::info!(target: "push", url = %self.url, "push_channel_connected");

                if matches!(self.read_frames(stream, &shutdown).await, ReadExit::Stop) {
                    return;
                }
            }

            if !self.forward(StoreWrite::Channel(ChannelState::Disconnected)).await {
                return;
            }

            let delay = self.policy.delay(attempt);
            attempt = attempt.saturating_add(1);
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = sleep(delay) => {}
            }
        }
    }

    async fn read_frames(&self, stream: PushStream, shutdown: &CancellationToken) -> ReadExit {
        let (mut sink, mut source) = stream.split();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return ReadExit::Stop;
                }
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !self.handle_frame(text.as_str()).await {
                            return ReadExit::Stop;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            return ReadExit::Closed;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return ReadExit::Closed,
                    Some(Ok(_)) => {
                        // binary and pong frames carry nothing for the mirror
                    }
                    Some(Err(err)) => {
                        tracing::warn!(target: "push", error = %err, "push_read_failed");
                        return ReadExit::Closed;
                    }
                }
            }
        }
    }

    /// Returns false when the consumer queue is closed. Malformed frames and
    /// unknown tags are logged and dropped, never surfaced as errors.
    async fn handle_frame(&self, text: &str) -> bool {
        match wire::decode_frame(text) {
            Ok(DecodeOutcome::Event(event)) => {
                self.forward(StoreWrite::Event {
                    event,
                    received_at: OffsetDateTime::now_utc(),
                })
                .await
            }
            Ok(DecodeOutcome::UnknownTag(tag)) => {
                tracing::debug!(target: "push", tag = %tag, "push_frame_unknown_tag");
                metrics::record_write_ignored("unknown_tag");
                true
            }
            Err(err) => {
                tracing::debug!(target: "push", error = %err, "push_frame_malformed");
                metrics::record_write_ignored("malformed_frame");
                true
            }
        }
    }

    async fn forward(&self, write: StoreWrite) -> bool {
        self.writes.send(write).await.is_ok()
    }
}
