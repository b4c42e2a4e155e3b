//! Placement analyzer: record store plus the last computed displacements
//!
//! Records are accumulated as they arrive; chains are only rebuilt when
//! `recompute` is called, always from the full store.

use crate::displacement::{analyze_owner, Displacements};
use crate::error::Result;
use crate::models::{OwnerKey, PodElement, Timestamp};
use crate::observability::{AnalyzerMetrics, StructuredLogger};
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Statistics of one recompute pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeSummary {
    /// Store generation the pass started from
    pub generation: u64,
    /// Owner groups analyzed
    pub owners: usize,
    /// Raw observations read
    pub records: usize,
    /// Pod instances left after deduplication
    pub unique_pods: usize,
    pub edges: usize,
    pub chains: usize,
    pub unmatched_deletions: usize,
    pub conflicts: usize,
    pub computed_at: Option<Timestamp>,
    pub duration: Duration,
}

/// Accumulates pod lifecycle records and computes displacement chains on demand
pub struct PlacementAnalyzer {
    store: RecordStore,
    displacements: RwLock<Arc<Displacements>>,
    last_summary: RwLock<Option<RecomputeSummary>>,
    /// Serializes recompute passes so an older pass never overwrites a newer one
    recompute_lock: Mutex<()>,
    metrics: AnalyzerMetrics,
    logger: StructuredLogger,
}

impl PlacementAnalyzer {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            store: RecordStore::new(),
            displacements: RwLock::new(Arc::new(Displacements::new())),
            last_summary: RwLock::new(None),
            recompute_lock: Mutex::new(()),
            metrics: AnalyzerMetrics::new(),
            logger,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Append one observation; safe to call concurrently
    pub fn record(&self, element: PodElement) -> Result<()> {
        self.logger.log_record(&element);
        match self.store.record(element) {
            Ok(()) => {
                self.metrics.inc_records_ingested();
                Ok(())
            }
            Err(e) => {
                self.metrics.inc_records_rejected();
                Err(e)
            }
        }
    }

    /// Rebuild every owner's chains from the current store content
    ///
    /// The previous result is replaced wholesale.
    pub fn recompute(&self) -> RecomputeSummary {
        let _guard = self
            .recompute_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let start = Instant::now();

        let generation = self.store.generation();
        let mut groups = self.store.groups();
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        let mut summary = RecomputeSummary {
            generation,
            owners: groups.len(),
            ..Default::default()
        };
        let mut displacements = Displacements::new();

        for (owner, elements) in groups {
            summary.records += elements.len();
            let analysis = analyze_owner(owner.clone(), &elements);

            summary.unique_pods += analysis.unique_pods;
            summary.edges += analysis.edges;
            summary.unmatched_deletions += analysis.unmatched_deletions;
            summary.conflicts += analysis.conflicts.len();
            for conflict in &analysis.conflicts {
                self.logger.log_conflict(conflict);
            }

            if let Some(owner_displacements) = analysis.displacements {
                summary.chains += owner_displacements.chains().len();
                displacements.insert(owner, owner_displacements);
            }
        }

        for (owner, entry) in &displacements {
            for chain in entry.chains() {
                self.logger
                    .log_chain(&owner.to_string(), chain.len(), &chain.render(entry.pods()));
            }
        }

        *self
            .displacements
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(displacements);

        summary.computed_at = Some(chrono::Utc::now());
        summary.duration = start.elapsed();
        *self
            .last_summary
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(summary.clone());

        self.metrics.observe_recompute(&summary);
        self.logger.log_recompute(&summary);
        summary
    }

    /// The last computed displacements
    pub fn result(&self) -> Arc<Displacements> {
        Arc::clone(&self.displacements.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Chains of a single owner from the last computation
    pub fn owner_result(&self, owner: &OwnerKey) -> Option<crate::displacement::OwnerDisplacements> {
        self.result().get(owner).cloned()
    }

    pub fn last_summary(&self) -> Option<RecomputeSummary> {
        self.last_summary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True when records changed since the last recompute (or none ran yet)
    pub fn is_stale(&self) -> bool {
        match self.last_summary() {
            Some(summary) => summary.generation != self.store.generation(),
            None => true,
        }
    }

    /// Replace the record store from snapshot bytes; all-or-nothing
    pub fn import_snapshot(&self, data: &[u8]) -> Result<()> {
        if let Err(e) = self.store.import_snapshot(data) {
            self.metrics.inc_snapshot_errors();
            return Err(e);
        }
        let owners = self.store.owner_count();
        self.metrics.set_owners_tracked(owners);
        self.logger
            .log_snapshot_imported(owners, self.store.record_count());
        Ok(())
    }

    pub fn export_snapshot(&self) -> Result<Vec<u8>> {
        let bytes = self.store.export_snapshot().inspect_err(|_| {
            self.metrics.inc_snapshot_errors();
        })?;
        self.logger.log_snapshot_exported(bytes.len());
        Ok(bytes)
    }

    pub fn import_snapshot_file(&self, path: &Path) -> Result<()> {
        let data = std::fs::read(path).inspect_err(|_| {
            self.metrics.inc_snapshot_errors();
        })?;
        self.import_snapshot(&data)
    }

    pub fn export_snapshot_file(&self, path: &Path) -> Result<()> {
        self.store.export_snapshot_file(path).inspect_err(|_| {
            self.metrics.inc_snapshot_errors();
        })
    }
}
