use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    gateway::{Resource, SnapshotSource},
    observability::metrics,
    push::PushListener,
    store::{MirrorState, StoreWrite, ViewModelStore},
};

/// The running mirror: an initial snapshot load, then a push listener and a
/// poll fallback producing into one consumer queue that owns the store.
/// Readers observe the merged view model through `subscribe`.
pub struct Mirror {
    writes: mpsc::Sender<StoreWrite>,
    states: watch::Receiver<MirrorState>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Mirror {
    pub async fn start(source: Arc<dyn SnapshotSource>, config: &Config) -> Mirror {
        let mut store = ViewModelStore::new(config.store.history_capacity);
        let states = store.subscribe();

        // Initial load is soft-failing: a dead backend yields an empty mirror
        // that the poll fallback fills in once the backend comes up.
        for resource in Resource::ALL {
            match source.fetch(resource).await {
                Ok(payload) => store.apply(StoreWrite::Snapshot(payload)),
                Err(err) => {
                    tracing::warn!(
                        target: "mirror",
                        resource = %resource,
                        error = %err,
                        "initial_snapshot_failed"
                    );
                    metrics::record_poll_failure(resource);
                }
            }
        }

        let (writes, writes_rx) = mpsc::channel(config.store.write_queue_capacity.max(1));
        let shutdown = CancellationToken::new();
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(consume_writes(
            store,
            writes_rx,
            shutdown.clone(),
        )));

        let poll_interval = Duration::from_millis(config.poll.interval_ms.max(1));
        tasks.push(tokio::spawn(poll_snapshots(
            Arc::clone(&source),
            writes.clone(),
            poll_interval,
            shutdown.clone(),
        )));

        if config.push.enabled {
            let listener = PushListener::new(&config.push, writes.clone());
            let push_shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                listener.run(push_shutdown).await;
            }));
        }

        Mirror {
            writes,
            states,
            shutdown,
            tasks,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<MirrorState> {
        self.states.clone()
    }

    pub fn state(&self) -> MirrorState {
        self.states.borrow().clone()
    }

    /// Additional producers attach here; their writes merge through the same
    /// consumer queue in arrival order.
    pub fn producer(&self) -> mpsc::Sender<StoreWrite> {
        self.writes.clone()
    }

    /// Deterministic teardown: cancels the socket, the poll timer, and the
    /// consumer, then waits for them. After this returns no write reaches
    /// the store.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        drop(self.writes);
        for task in self.tasks {
            if let Err(err) = task.await
                && !err.is_cancelled()
            {
                tracing::warn!(target: "mirror", error = %err, "mirror_task_join_failed");
            }
        }
    }
}

async fn consume_writes(
    mut store: ViewModelStore,
    mut writes_rx: mpsc::Receiver<StoreWrite>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            write = writes_rx.recv() => match write {
                Some(write) => store.apply(write),
                None => break,
            }
        }
    }
}

/// Fires on a fixed interval whether or not the push channel is healthy, so
/// a broken socket degrades to eventually-consistent instead of frozen.
async fn poll_snapshots(
    source: Arc<dyn SnapshotSource>,
    writes: mpsc::Sender<StoreWrite>,
    poll_interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                for resource in Resource::ALL {
                    match source.fetch(resource).await {
                        Ok(payload) => {
                            if writes.send(StoreWrite::Snapshot(payload)).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(
                                target: "mirror",
                                resource = %resource,
                                error = %err,
                                "poll_fetch_failed"
                            );
                            metrics::record_poll_failure(resource);
                        }
                    }
                }
            }
        }
    }
}
