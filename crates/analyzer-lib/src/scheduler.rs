//! Periodic recomputation of displacement chains
//!
//! The loop wakes on a fixed interval and recomputes only when the record
//! store changed since the previous pass.

use crate::analyzer::PlacementAnalyzer;
use crate::health::{components, HealthRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the recompute loop
#[derive(Debug, Clone)]
pub struct RecomputeConfig {
    /// Time between staleness checks (default: 30 seconds)
    pub interval: Duration,
}

impl Default for RecomputeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

pub struct RecomputeLoop {
    analyzer: Arc<PlacementAnalyzer>,
    health: Option<HealthRegistry>,
    config: RecomputeConfig,
}

impl RecomputeLoop {
    pub fn new(analyzer: Arc<PlacementAnalyzer>, config: RecomputeConfig) -> Self {
        Self {
            analyzer,
            health: None,
            config,
        }
    }

    /// Report analyzer health after each pass
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Recompute if the store moved on; returns whether a pass ran
    pub async fn tick(&self) -> bool {
        if !self.analyzer.is_stale() {
            return false;
        }

        let analyzer = Arc::clone(&self.analyzer);
        let summary = match tokio::task::spawn_blocking(move || analyzer.recompute()).await {
            Ok(summary) => summary,
            Err(e) => {
                if let Some(health) = &self.health {
                    health
                        .set_unhealthy(components::ANALYZER, format!("Recompute failed: {}", e))
                        .await;
                }
                return false;
            }
        };

        if let Some(health) = &self.health {
            if summary.conflicts > 0 {
                health
                    .set_degraded(
                        components::ANALYZER,
                        format!("{} conflicting observations", summary.conflicts),
                    )
                    .await;
            } else {
                health.set_healthy(components::ANALYZER).await;
            }
        }
        true
    }

    /// Run until a shutdown signal arrives
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting recompute loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().await {
                        passes += 1;
                        debug!(passes, "Recompute pass complete");
                    }
                }
                _ = shutdown.recv() => {
                    info!(passes, "Shutting down recompute loop");
                    break;
                }
            }
        }
    }
}
