//! gridbusd: GridFS chunk bus daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use gridbus_api::ApiState;
use gridbus_core::config::GridbusConfig;
use gridbus_services::{build_bus, open_store};

/// How often store totals are logged.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// How long in-flight API requests get to finish after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = GridbusConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = GridbusConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        GridbusConfig::default()
    });

    let store = open_store(&config.storage).context("failed to open chunk store")?;
    let bus = Arc::new(build_bus(&config, store.clone()));
    tracing::info!(
        address = %config.bus.address,
        default_bucket = %config.bus.default_bucket,
        addresses = ?bus.addresses(),
        "gridbusd starting"
    );

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let stats_printer = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(STATS_INTERVAL);
            loop {
                interval.tick().await;
                match store.stats().await {
                    Ok(stats) => tracing::info!(chunks = stats.chunks, bytes = stats.bytes, "store stats"),
                    Err(e) => tracing::warn!(error = %e, "store stats unavailable"),
                }
            }
        })
    };

    let mut api_task = {
        let state = ApiState::new(&config, bus.clone(), store.clone());
        let port = config.api.port;
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.recv().await;
            };
            if let Err(e) = gridbus_api::serve(state, port, shutdown).await {
                tracing::error!(error = %e, port, "API server failed");
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => {
            tracing::info!("shutting down");
            if !drain(&mut api_task, SHUTDOWN_GRACE).await {
                tracing::warn!(grace = ?SHUTDOWN_GRACE, "API server did not drain in time");
            }
        }
        r = &mut api_task      => tracing::error!("API task exited: {:?}", r),
        r = stats_printer      => tracing::error!("stats printer exited: {:?}", r),
    }

    Ok(())
}

/// Wait up to `grace` for a task to finish. False if it is still running.
async fn drain(task: &mut JoinHandle<()>, grace: Duration) -> bool {
    match tokio::time::timeout(grace, task).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "task failed while draining");
            true
        }
        Err(_) => false,
    }
}
