//! Placement Analyzer - pod displacement chain service
//!
//! Accumulates pod lifecycle records, recomputes displacement chains on an
//! interval and exposes them over HTTP.

use analyzer_lib::{
    health::{components, HealthRegistry},
    observability::{AnalyzerMetrics, StructuredLogger},
    scheduler::{RecomputeConfig, RecomputeLoop},
    PlacementAnalyzer,
};
use anyhow::Result;
use placement_analyzer::{api, config};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ANALYZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::AnalyzerConfig::load()?;
    info!(cluster = %config.cluster_name, port = config.api_port, "Analyzer configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;
    health_registry.register(components::ANALYZER).await;
    health_registry.register(components::API).await;

    let metrics = AnalyzerMetrics::new();
    let logger = StructuredLogger::new(&config.cluster_name);
    logger.log_startup(ANALYZER_VERSION);

    let analyzer = Arc::new(PlacementAnalyzer::new(logger.clone()));

    if let Some(path) = &config.snapshot_path {
        if path.exists() {
            if let Err(e) = analyzer.import_snapshot_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to load snapshot, starting empty");
                health_registry
                    .set_degraded(components::STORE, format!("Snapshot not loaded: {}", e))
                    .await;
            }
        } else {
            info!(path = %path.display(), "No snapshot found, starting empty");
        }
    }

    let recompute_loop = RecomputeLoop::new(
        Arc::clone(&analyzer),
        RecomputeConfig {
            interval: config.recompute_interval(),
        },
    )
    .with_health(health_registry.clone());
    recompute_loop.tick().await;
    health_registry.set_ready(true).await;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let loop_handle = tokio::spawn(recompute_loop.run(shutdown_tx.subscribe()));

    let app_state = Arc::new(
        api::AppState::new(Arc::clone(&analyzer), health_registry.clone(), metrics)
            .with_default_min_chain_length(config.min_chain_length)
            .with_max_body_bytes(config.max_body_bytes),
    );
    let mut api_shutdown = shutdown_tx.subscribe();
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state, async move {
        let _ = api_shutdown.recv().await;
    }));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false).await;
    let _ = shutdown_tx.send(());

    if let Err(e) = loop_handle.await {
        error!(error = %e, "Recompute loop terminated abnormally");
    }
    match api_handle.await {
        Ok(Err(e)) => error!(error = %e, "API server failed"),
        Err(e) => error!(error = %e, "API server task panicked"),
        Ok(Ok(())) => {}
    }

    if config.export_on_shutdown {
        if let Some(path) = &config.snapshot_path {
            analyzer.export_snapshot_file(path)?;
        }
    }

    info!("Shut down");
    Ok(())
}
