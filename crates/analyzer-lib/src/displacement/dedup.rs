//! Collapses repeated observations of the same pod instance
//!
//! An informer reports a pod once when it appears and again when it is
//! deleted. Both reports share the identity key, and the deletion report
//! carries strictly more information, so it wins.

use crate::models::{IdentityKey, PodElement, Timestamp};
use std::collections::HashMap;
use std::fmt;

/// Two observations of one pod instance that disagree on a settled field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationConflict {
    pub identity: IdentityKey,
    pub kind: ConflictKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both observations name a node and the nodes differ
    Node { kept: String, observed: String },
    /// Both observations carry a deletion time and the times differ
    DeletionTimestamp { kept: Timestamp, observed: Timestamp },
}

impl fmt::Display for ObservationConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConflictKind::Node { kept, observed } => write!(
                f,
                "{}: node {:?} kept, {:?} ignored",
                self.identity, kept, observed
            ),
            ConflictKind::DeletionTimestamp { kept, observed } => write!(
                f,
                "{}: deletion at {} kept, {} ignored",
                self.identity,
                kept.to_rfc3339(),
                observed.to_rfc3339()
            ),
        }
    }
}

impl ObservationConflict {
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ConflictKind::Node { .. } => "node",
            ConflictKind::DeletionTimestamp { .. } => "deletion_timestamp",
        }
    }
}

/// Unique pod instances of one owner, plus any conflicting observations
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Canonical records in first-seen order
    pub pods: Vec<PodElement>,
    pub conflicts: Vec<ObservationConflict>,
}

/// Reduce raw observations to one canonical record per identity key
pub fn dedup(elements: &[PodElement]) -> DedupOutcome {
    let mut index: HashMap<IdentityKey, usize> = HashMap::with_capacity(elements.len());
    let mut outcome = DedupOutcome::default();

    for element in elements {
        let identity = element.identity_key();
        let Some(&slot) = index.get(&identity) else {
            index.insert(identity, outcome.pods.len());
            outcome.pods.push(element.clone());
            continue;
        };

        let canonical = &mut outcome.pods[slot];
        match (canonical.deletion_timestamp, element.deletion_timestamp) {
            (None, Some(_)) => {
                let node = std::mem::take(&mut canonical.node);
                *canonical = element.clone();
                if canonical.node.is_empty() {
                    canonical.node = node;
                } else if !node.is_empty() && node != canonical.node {
                    outcome.conflicts.push(ObservationConflict {
                        identity: identity.clone(),
                        kind: ConflictKind::Node {
                            kept: canonical.node.clone(),
                            observed: node,
                        },
                    });
                }
                continue;
            }
            (Some(kept), Some(observed)) if kept != observed => {
                outcome.conflicts.push(ObservationConflict {
                    identity: identity.clone(),
                    kind: ConflictKind::DeletionTimestamp { kept, observed },
                });
            }
            _ => {}
        }

        if canonical.node.is_empty() {
            canonical.node = element.node.clone();
        } else if !element.node.is_empty() && element.node != canonical.node {
            outcome.conflicts.push(ObservationConflict {
                identity,
                kind: ConflictKind::Node {
                    kept: canonical.node.clone(),
                    observed: element.node.clone(),
                },
            });
        }
    }

    outcome
}
