use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use platewatch::client::SnapshotClient;
use platewatch::config::Config;
use platewatch::engine::QueueView;
use platewatch::humanize::format_duration;
use platewatch::observability::Metrics;
use platewatch::pump::UpdatePump;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Run the pump and log each published view until shutdown.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), AnyError> {
    let config = match config_path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    info!(base_url = %config.upstream.base_url, "platewatch starting");

    let metrics = Arc::new(Metrics::new());
    let client = SnapshotClient::new(&config.upstream)?;
    let (pump, mut views) = UpdatePump::new(&config, client, metrics.clone());

    let pump_handle = tokio::spawn(pump.run());

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    warn!("update pump stopped");
                    break;
                }
                let view = views.borrow_and_update().clone();
                log_view(&view);
            }
            _ = shutdown_signal() => break,
        }
    }

    pump_handle.abort();
    let snapshot = metrics.snapshot();
    info!(
        refreshes = snapshot.refreshes_completed,
        failures = snapshot.refreshes_failed,
        fallbacks = snapshot.legacy_fallbacks,
        "platewatch stopped"
    );
    Ok(())
}

fn log_view(view: &QueueView) {
    if let Some(error) = &view.last_error {
        warn!(%error, "refresh failed, showing nothing new");
        return;
    }

    for job in &view.live {
        let progress = job
            .metrics
            .progress_pct
            .map(|p| format!("{p}%"))
            .unwrap_or_else(|| "?".to_string());
        let eta = job
            .metrics
            .eta_seconds
            .map(format_duration)
            .unwrap_or_else(|| "—".to_string());
        info!(job = %job.short_label(), %progress, %eta, "recording");
    }

    info!(
        queue = view.queue.len(),
        waiting = view.waiting().len(),
        completed = view.completed.len(),
        ready_os = view.ready_head.total_os,
        ready_plates = view.ready_head.total_plates,
        "queue state"
    );

    for error in &view.upstream_errors {
        warn!(%error, "upstream collection error");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to install signal handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
