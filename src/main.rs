use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};

use remora::{
    cli::config_path_from_args,
    config::Config,
    gateway::HttpGateway,
    logging,
    mirror::Mirror,
    observability::metrics,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let logging_guard = logging::init_tracing(&config.logging)?;
    tracing::info!(target: "main", run_id = logging_guard.run_id(), "remora_starting");

    if config.metrics.enabled {
        let listen_addr = config
            .metrics
            .listen_addr
            .parse()
            .with_context(|| format!("invalid metrics.listen_addr {}", config.metrics.listen_addr))?;
        let runtime = metrics::start_prometheus_exporter(listen_addr)
            .context("failed to start prometheus exporter")?;
        tracing::info!(target: "main", addr = %runtime.listen_addr, "metrics_exporter_started");
    }

    let gateway = Arc::new(HttpGateway::new(&config.gateway).context("failed to build gateway")?);
    let mirror = Mirror::start(gateway, &config).await;

    // Log connectivity flips for operators; dashboards read the same watch.
    let mut states = mirror.subscribe();
    let state_logger = tokio::spawn(async move {
        let mut last_channel = states.borrow().channel;
        while states.changed().await.is_ok() {
            let channel = states.borrow().channel;
            if channel != last_channel {
                tracing::info!(target: "main", channel = channel.name(), "push_channel_state");
                last_channel = channel;
            }
        }
    });

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    let signal_name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };

    tracing::info!(target: "main", signal = signal_name, "shutting_down");
    mirror.shutdown().await;
    let _ = state_logger.await;

    tracing::info!(target: "main", signal = signal_name, "remora_stopped");
    Ok(())
}
