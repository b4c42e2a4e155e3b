//! Temporal matching of deleted pods to their replacements
//!
//! Within one owner, every deleted pod is paired with the earliest pod
//! created no earlier than the deletion that has not already been claimed.
//! Deletions are visited in ascending order and a single creation cursor is
//! shared across all of them, so candidates are consumed monotonically.
//! Once the creation side is exhausted matching stops for the owner, even if
//! later deletions remain.

use crate::models::PodElement;
use serde::{Deserialize, Serialize};

/// Replacement relation between two pods of one owner
///
/// Both ends are indices into the owner's deduplicated pod list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// The deleted pod
    pub from: usize,
    /// The pod interpreted as its replacement
    pub to: usize,
}

impl Edge {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

/// Edges for one owner, plus the deletions left without a replacement
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub edges: Vec<Edge>,
    pub unmatched_deletions: usize,
}

/// Pair deletions with later creations using a persistent cursor
pub fn match_displacements(pods: &[PodElement]) -> MatchOutcome {
    let mut by_creation: Vec<usize> = (0..pods.len()).collect();
    by_creation.sort_by_key(|&i| pods[i].creation_timestamp);

    // `None` orders before `Some`, which puts never-deleted pods first
    let mut by_deletion: Vec<usize> = (0..pods.len()).collect();
    by_deletion.sort_by_key(|&i| pods[i].deletion_timestamp);

    let mut outcome = MatchOutcome::default();
    let mut cursor = 0;

    for (position, &deleted) in by_deletion.iter().enumerate() {
        let Some(deleted_at) = pods[deleted].deletion_timestamp else {
            continue;
        };

        while let Some(&candidate) = by_creation.get(cursor) {
            if pods[candidate].creation_timestamp >= deleted_at {
                break;
            }
            cursor += 1;
        }

        // A zero-lifetime pod can sit under the cursor; it never replaces
        // itself but stays available to the deletions after it
        let mut pick = cursor;
        if by_creation.get(pick) == Some(&deleted) {
            pick += 1;
        }

        let Some(&replacement) = by_creation.get(pick) else {
            if cursor < by_creation.len() {
                outcome.unmatched_deletions += 1;
                continue;
            }
            outcome.unmatched_deletions += by_deletion.len() - position;
            break;
        };

        by_creation.swap(cursor, pick);
        outcome.edges.push(Edge::new(deleted, replacement));
        cursor += 1;
    }

    outcome
}
