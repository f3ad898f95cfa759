use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use parkway::config::EngineConfig;
use parkway::engine::Engine;
use parkway::limits::DEFAULT_SWEEP_INTERVAL_MS;
use parkway::notify::NotifyHub;
use parkway::reaper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("PARKWAY_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    parkway::observability::init(metrics_port)?;

    let sweep_interval_ms: u64 = std::env::var("PARKWAY_SWEEP_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS);

    let config = EngineConfig::from_env()?;
    let notify = Arc::new(NotifyHub::new());
    let engine = Arc::new(Engine::new(config, notify)?);

    info!("parkway started");
    info!("  slots: {}", engine.slot_ids().len());
    info!("  default reservation: {}min", engine.default_reservation_minutes());
    info!("  sweep interval: {sweep_interval_ms}ms");
    info!("  metrics: {}", metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let reaper_task = tokio::spawn(reaper::run_reaper(
        engine.clone(),
        Duration::from_millis(sweep_interval_ms),
    ));

    // Log every state change as it happens.
    let mut changes = engine.subscribe_all();
    let change_log = tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => tracing::debug!("change {json}"),
                    Err(e) => tracing::warn!("cannot encode change: {e}"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("change log lagged, {n} events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Graceful shutdown: stop background work on SIGTERM/ctrl-c
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("cannot register SIGTERM handler: {e}");
                    ctrl_c.await.ok();
                }
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    tokio::pin!(shutdown);

    let mut report = tokio::time::interval(Duration::from_secs(60));
    loop {
        tokio::select! {
            _ = report.tick() => {
                let stats = engine.stats().await;
                info!(
                    "occupancy: {} free, {} reserved, {} occupied of {}",
                    stats.free, stats.reserved, stats.occupied, stats.total
                );
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    reaper_task.abort();
    change_log.abort();
    let stats = engine.stats().await;
    info!(
        "parkway stopped ({} reserved, {} occupied at shutdown)",
        stats.reserved, stats.occupied
    );
    Ok(())
}
