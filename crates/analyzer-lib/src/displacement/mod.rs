//! Displacement chain reconstruction
//!
//! For each owning controller this module rebuilds the sequences in which a
//! pod was torn down and replaced by another:
//! - Deduplication of repeated observations of the same pod instance
//! - Greedy temporal matching of deletions to later creations
//! - Assembly of the matched edges into maximal chains
//!
//! Everything here is pure computation over in-memory records.

mod chains;
mod dedup;
mod matcher;


pub use chains::{assemble_chains, Chain};
pub use dedup::{dedup, ConflictKind, DedupOutcome, ObservationConflict};
pub use matcher::{match_displacements, Edge, MatchOutcome};

use crate::models::{OwnerKey, PodElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chains computed for one owner
///
/// Edges and chains refer to pods by index into `pods`, the owner's
/// deduplicated records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerDisplacements {
    pub owner: OwnerKey,
    pods: Vec<PodElement>,
    chains: Vec<Chain>,
    unmatched_deletions: usize,
}

impl OwnerDisplacements {
    pub fn pods(&self) -> &[PodElement] {
        &self.pods
    }

    pub fn pod(&self, index: usize) -> Option<&PodElement> {
        self.pods.get(index)
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// Deletions left without a replacement once creation supply ran out
    pub fn unmatched_deletions(&self) -> usize {
        self.unmatched_deletions
    }

    pub fn edge_count(&self) -> usize {
        self.chains.iter().map(Chain::len).sum()
    }

    /// Resolve the pods visited by a chain
    pub fn chain_pods(&self, chain: &Chain) -> Vec<&PodElement> {
        chain
            .vertices()
            .into_iter()
            .filter_map(|i| self.pods.get(i))
            .collect()
    }

    pub fn longest_chain(&self) -> usize {
        self.chains.iter().map(Chain::len).max().unwrap_or(0)
    }
}

/// Owner key -> chains; owners with neither chains nor unmatched deletions are absent
pub type Displacements = BTreeMap<OwnerKey, OwnerDisplacements>;

/// Output of analyzing a single owner group
#[derive(Debug)]
pub struct OwnerAnalysis {
    /// `None` when the owner produced no chains and left no deletion unmatched
    pub displacements: Option<OwnerDisplacements>,
    pub unique_pods: usize,
    pub edges: usize,
    pub unmatched_deletions: usize,
    pub conflicts: Vec<ObservationConflict>,
}

/// Run dedup, matching and chain assembly for one owner group
pub fn analyze_owner(owner: OwnerKey, elements: &[PodElement]) -> OwnerAnalysis {
    let DedupOutcome { pods, conflicts } = dedup(elements);
    let MatchOutcome {
        edges,
        unmatched_deletions,
    } = match_displacements(&pods);
    let chains = assemble_chains(&edges);

    let unique_pods = pods.len();
    let displacements = (!chains.is_empty() || unmatched_deletions > 0).then(|| OwnerDisplacements {
        owner,
        pods,
        chains,
        unmatched_deletions,
    });

    OwnerAnalysis {
        displacements,
        unique_pods,
        edges: edges.len(),
        unmatched_deletions,
        conflicts,
    }
}
