//! Container watchdog agent
//!
//! Watches the containers on the local Docker host: reconciles the set of
//! active stream watchers against the live container list on a fixed
//! cadence and raises debounced alerts when a container's CPU usage stays
//! above its threshold for the configured sustain duration.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use watchdog_lib::alert::{AlertSink, WatchEvent};
use watchdog_lib::detect::HangMonitor;
use watchdog_lib::fleet::FleetReconciler;
use watchdog_lib::health::{components, HealthRegistry};
use watchdog_lib::observability::{StructuredLogger, WatchdogMetrics};
use watchdog_lib::runtime::{DockerRuntimeClient, RuntimeClient};

mod api;
mod config;

const WATCHDOG_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::WatchdogConfig::load()?;
    info!(
        host = %config.host_name,
        version = WATCHDOG_VERSION,
        "Starting container-watchdog"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::RUNTIME).await;
    health_registry.register(components::RECONCILER).await;

    let metrics = WatchdogMetrics::new();
    let sink: Arc<dyn AlertSink> = Arc::new(StructuredLogger::new(&config.host_name));

    let runtime: Arc<dyn RuntimeClient> =
        Arc::new(DockerRuntimeClient::connect(&config.docker_socket)?);
    let reconciler = FleetReconciler::new(
        Arc::clone(&runtime),
        Arc::clone(&sink),
        config.default_watch_config(),
    )
    .with_overrides(config.watch_overrides());
    let mut hang_monitor = HangMonitor::new(
        Arc::clone(&runtime),
        Arc::clone(&sink),
        config.hang_max_age(),
    );

    let app_state = Arc::new(api::AppState::new(health_registry.clone()));
    tokio::spawn(api::serve(config.api_port, app_state));

    health_registry.set_ready(true).await;

    // The cadences live here, not in the library: reconciliation and hang
    // checks are triggered operations driven by plain tokio intervals.
    let mut reconcile_ticker = tokio::time::interval(config.poll_interval());
    let mut hang_ticker = tokio::time::interval(config.hang_check_interval());

    loop {
        tokio::select! {
            _ = reconcile_ticker.tick() => {
                match reconciler.reconcile_once().await {
                    Ok(()) => {
                        health_registry.set_healthy(components::RECONCILER).await;
                    }
                    Err(err) => {
                        metrics.inc_reconcile_errors();
                        sink.emit(&WatchEvent::ReconcileFailed {
                            reason: err.to_string(),
                        });
                        health_registry
                            .set_degraded(components::RECONCILER, err.to_string())
                            .await;
                    }
                }
            }
            _ = hang_ticker.tick() => {
                if let Err(err) = hang_monitor.check_once().await {
                    warn!(error = %err, "Hang check pass failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("SIGINT received, shutting down");
                break;
            }
        }
    }

    reconciler.stop_all();
    Ok(())
}
