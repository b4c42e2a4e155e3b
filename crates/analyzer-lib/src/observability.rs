//! Observability infrastructure for the placement analyzer
//!
//! Provides:
//! - Prometheus metrics (ingestion counts, recompute latency, chain totals)
//! - Structured JSON logging with tracing

use crate::displacement::ObservationConflict;
use crate::models::PodElement;
use crate::RecomputeSummary;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for recompute latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Chains at least this long are logged individually after a recompute
const NOTABLE_CHAIN_LENGTH: usize = 5;

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AnalyzerMetricsInner> = OnceLock::new();

struct AnalyzerMetricsInner {
    records_ingested: IntCounter,
    records_rejected: IntCounter,
    owners_tracked: IntGauge,
    recompute_latency_seconds: Histogram,
    edges_matched: IntGauge,
    chains_found: IntGauge,
    unmatched_deletions: IntGauge,
    observation_conflicts: IntGauge,
    snapshot_errors: IntCounter,
}

impl AnalyzerMetricsInner {
    fn new() -> Self {
        Self {
            records_ingested: register_int_counter!(
                "placement_analyzer_records_ingested_total",
                "Total number of pod lifecycle records accepted"
            )
            .expect("Failed to register records_ingested"),

            records_rejected: register_int_counter!(
                "placement_analyzer_records_rejected_total",
                "Total number of pod lifecycle records rejected by validation"
            )
            .expect("Failed to register records_rejected"),

            owners_tracked: register_int_gauge!(
                "placement_analyzer_owners_tracked",
                "Number of owner groups in the record store"
            )
            .expect("Failed to register owners_tracked"),

            recompute_latency_seconds: register_histogram!(
                "placement_analyzer_recompute_latency_seconds",
                "Time spent recomputing displacement chains",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register recompute_latency_seconds"),

            edges_matched: register_int_gauge!(
                "placement_analyzer_edges_matched",
                "Displacement edges found by the last recompute"
            )
            .expect("Failed to register edges_matched"),

            chains_found: register_int_gauge!(
                "placement_analyzer_chains_found",
                "Displacement chains found by the last recompute"
            )
            .expect("Failed to register chains_found"),

            unmatched_deletions: register_int_gauge!(
                "placement_analyzer_unmatched_deletions",
                "Deleted pods left without a replacement by the last recompute"
            )
            .expect("Failed to register unmatched_deletions"),

            observation_conflicts: register_int_gauge!(
                "placement_analyzer_observation_conflicts",
                "Conflicting observations of the same pod instance found by the last recompute"
            )
            .expect("Failed to register observation_conflicts"),

            snapshot_errors: register_int_counter!(
                "placement_analyzer_snapshot_errors_total",
                "Total number of failed snapshot imports and exports"
            )
            .expect("Failed to register snapshot_errors"),
        }
    }
}

/// Analyzer metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct AnalyzerMetrics {
    _private: (),
}

impl Default for AnalyzerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AnalyzerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AnalyzerMetricsInner {
        GLOBAL_METRICS.get_or_init(AnalyzerMetricsInner::new)
    }

    pub fn inc_records_ingested(&self) {
        self.inner().records_ingested.inc();
    }

    pub fn inc_records_rejected(&self) {
        self.inner().records_rejected.inc();
    }

    pub fn set_owners_tracked(&self, owners: usize) {
        self.inner().owners_tracked.set(owners as i64);
    }

    pub fn inc_snapshot_errors(&self) {
        self.inner().snapshot_errors.inc();
    }

    /// Publish the outcome of a recompute pass
    pub fn observe_recompute(&self, summary: &RecomputeSummary) {
        let inner = self.inner();
        inner
            .recompute_latency_seconds
            .observe(summary.duration.as_secs_f64());
        inner.owners_tracked.set(summary.owners as i64);
        inner.edges_matched.set(summary.edges as i64);
        inner.chains_found.set(summary.chains as i64);
        inner.unmatched_deletions.set(summary.unmatched_deletions as i64);
        inner.observation_conflicts.set(summary.conflicts as i64);
    }
}

/// Structured logger for analyzer events
///
/// Every event carries an `event` tag and the cluster name.
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "analyzer_started",
            cluster = %self.cluster,
            version = %version,
            "Placement analyzer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "analyzer_shutdown",
            cluster = %self.cluster,
            reason = %reason,
            "Placement analyzer shutting down"
        );
    }

    pub fn log_record(&self, element: &PodElement) {
        debug!(
            event = "record_observed",
            cluster = %self.cluster,
            owner = %element.owner_key(),
            pod_name = %element.pod_name,
            node = %element.node,
            deleted = element.is_deleted(),
            "Recorded pod lifecycle observation"
        );
    }

    pub fn log_snapshot_imported(&self, owners: usize, records: usize) {
        info!(
            event = "snapshot_imported",
            cluster = %self.cluster,
            owners = owners,
            records = records,
            "Record store replaced from snapshot"
        );
    }

    pub fn log_snapshot_exported(&self, bytes: usize) {
        info!(
            event = "snapshot_exported",
            cluster = %self.cluster,
            bytes = bytes,
            "Record store exported"
        );
    }

    pub fn log_conflict(&self, conflict: &ObservationConflict) {
        warn!(
            event = "observation_conflict",
            cluster = %self.cluster,
            identity = %conflict.identity,
            field = conflict.kind_label(),
            details = %conflict,
            "Conflicting observations of the same pod instance"
        );
    }

    pub fn log_recompute(&self, summary: &RecomputeSummary) {
        info!(
            event = "recompute_completed",
            cluster = %self.cluster,
            generation = summary.generation,
            owners = summary.owners,
            records = summary.records,
            unique_pods = summary.unique_pods,
            edges = summary.edges,
            chains = summary.chains,
            unmatched_deletions = summary.unmatched_deletions,
            conflicts = summary.conflicts,
            elapsed_ms = summary.duration.as_millis() as u64,
            "Displacement chains recomputed"
        );
    }

    /// Log a chain long enough to suggest a workload is being pushed around
    pub fn log_chain(&self, owner: &str, length: usize, rendered: &str) {
        if length < NOTABLE_CHAIN_LENGTH {
            return;
        }
        info!(
            event = "displacement_chain",
            cluster = %self.cluster,
            owner = %owner,
            length = length,
            chain = %rendered,
            "Long displacement chain"
        );
    }
}
