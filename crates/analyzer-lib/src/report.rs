//! Resolved, serializable view of displacement chains
//!
//! Used by the HTTP API and the CLI. Filtering by chain length happens here
//! and never feeds back into the computation.

use crate::displacement::{Chain, Displacements, OwnerDisplacements};
use crate::models::{OwnerKey, PodElement, Timestamp};
use serde::{Deserialize, Serialize};

/// Which chains make it into a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    /// Minimum number of displacements per chain
    #[serde(default)]
    pub min_chain_length: usize,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub owner: Option<OwnerKey>,
}

impl ReportFilter {
    pub fn with_min_chain_length(mut self, min_chain_length: usize) -> Self {
        self.min_chain_length = min_chain_length;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_owner(mut self, owner: OwnerKey) -> Self {
        self.owner = Some(owner);
        self
    }

    fn accepts_owner(&self, owner: &OwnerKey) -> bool {
        self.namespace
            .as_ref()
            .map_or(true, |ns| &owner.namespace == ns)
            && self.owner.as_ref().map_or(true, |o| o == owner)
    }
}

/// One pod visited by a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodHop {
    pub pod_name: String,
    pub node: String,
    pub creation_timestamp: Timestamp,
    pub deletion_timestamp: Option<Timestamp>,
}

impl From<&PodElement> for PodHop {
    fn from(element: &PodElement) -> Self {
        Self {
            pod_name: element.pod_name.clone(),
            node: element.node.clone(),
            creation_timestamp: element.creation_timestamp,
            deletion_timestamp: element.deletion_timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    /// Number of displacements
    pub length: usize,
    /// Pods in displacement order
    pub hops: Vec<PodHop>,
}

impl ChainReport {
    fn resolve(entry: &OwnerDisplacements, chain: &Chain) -> Self {
        Self {
            length: chain.len(),
            hops: entry.chain_pods(chain).into_iter().map(PodHop::from).collect(),
        }
    }

    /// Distinct nodes the workload slot moved through, in order
    pub fn node_path(&self) -> Vec<&str> {
        let mut path: Vec<&str> = Vec::with_capacity(self.hops.len());
        for hop in &self.hops {
            let node = if hop.node.is_empty() { "<unscheduled>" } else { hop.node.as_str() };
            if path.last() != Some(&node) {
                path.push(node);
            }
        }
        path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReport {
    pub owner: OwnerKey,
    pub unmatched_deletions: usize,
    pub chains: Vec<ChainReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplacementReport {
    pub owners: Vec<OwnerReport>,
    pub total_chains: usize,
    pub total_displacements: usize,
    /// Unmatched deletions of every owner passing the namespace/owner filters,
    /// including owners that have no chain to show
    #[serde(default)]
    pub total_unmatched_deletions: usize,
}

impl DisplacementReport {
    /// Resolve chains that pass `filter`; owners left empty are omitted
    pub fn build(displacements: &Displacements, filter: &ReportFilter) -> Self {
        let mut report = Self::default();

        for (owner, entry) in displacements {
            if !filter.accepts_owner(owner) {
                continue;
            }
            report.total_unmatched_deletions += entry.unmatched_deletions();

            let mut chains: Vec<ChainReport> = entry
                .chains()
                .iter()
                .filter(|chain| chain.len() >= filter.min_chain_length)
                .map(|chain| ChainReport::resolve(entry, chain))
                .collect();
            if chains.is_empty() {
                continue;
            }
            chains.sort_by(|a, b| b.length.cmp(&a.length));

            report.total_chains += chains.len();
            report.total_displacements += chains.iter().map(|c| c.length).sum::<usize>();
            report.owners.push(OwnerReport {
                owner: owner.clone(),
                unmatched_deletions: entry.unmatched_deletions(),
                chains,
            });
        }

        report
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::displacement::analyze_owner;
    use chrono::{TimeZone, Utc};

    fn element(ns: &str, owner: &str, pod: &str, node: &str, created: i64, deleted: Option<i64>) -> PodElement {
        PodElement {
            namespace: ns.to_string(),
            kind: "ReplicaSet".to_string(),
            kind_name: owner.to_string(),
            pod_name: pod.to_string(),
            node: node.to_string(),
            creation_timestamp: Utc.timestamp_opt(created, 0).unwrap(),
            deletion_timestamp: deleted.map(|d| Utc.timestamp_opt(d, 0).unwrap()),
        }
    }

    fn displacements() -> Displacements {
        let groups = vec![
            vec![
                element("shop", "web", "w1", "node-a", 0, Some(10)),
                element("shop", "web", "w2", "node-a", 11, Some(20)),
                element("shop", "web", "w3", "node-b", 21, None),
            ],
            vec![
                element("infra", "dns", "d1", "node-c", 0, Some(10)),
                element("infra", "dns", "d2", "", 12, None),
            ],
        ];

        groups
            .into_iter()
            .filter_map(|elements| {
                let owner = elements[0].owner_key();
                analyze_owner(owner.clone(), &elements)
                    .displacements
                    .map(|d| (owner, d))
            })
            .collect()
    }

    #[test]
    fn test_build_unfiltered() {
        let report = DisplacementReport::build(&displacements(), &ReportFilter::default());
        assert_eq!(report.owners.len(), 2);
        assert_eq!(report.total_chains, 2);
        assert_eq!(report.total_displacements, 3);

        let web = report
            .owners
            .iter()
            .find(|o| o.owner.name == "web")
            .unwrap();
        let hops: Vec<_> = web.chains[0].hops.iter().map(|h| h.pod_name.as_str()).collect();
        assert_eq!(hops, vec!["w1", "w2", "w3"]);
        assert_eq!(web.chains[0].node_path(), vec!["node-a", "node-b"]);
    }

    #[test]
    fn test_unmatched_deletions_of_chainless_owners_are_counted() {
        let mut displacements = displacements();
        let stuck = vec![
            element("batch", "etl", "e1", "node-d", 0, Some(10)),
            element("batch", "etl", "e2", "node-d", 5, None),
        ];
        let owner = stuck[0].owner_key();
        let entry = analyze_owner(owner.clone(), &stuck).displacements.unwrap();
        assert!(entry.chains().is_empty());
        displacements.insert(owner, entry);

        let report = DisplacementReport::build(&displacements, &ReportFilter::default());
        assert_eq!(report.owners.len(), 2);
        assert_eq!(report.total_unmatched_deletions, 1);

        let report = DisplacementReport::build(
            &displacements,
            &ReportFilter::default().with_namespace("shop"),
        );
        assert_eq!(report.total_unmatched_deletions, 0);
    }

    #[test]
    fn test_min_chain_length_filter() {
        let filter = ReportFilter::default().with_min_chain_length(2);
        let report = DisplacementReport::build(&displacements(), &filter);
        assert_eq!(report.owners.len(), 1);
        assert_eq!(report.owners[0].owner.to_string(), "shop/ReplicaSet/web");
    }

    #[test]
    fn test_namespace_and_owner_filters() {
        let report = DisplacementReport::build(
            &displacements(),
            &ReportFilter::default().with_namespace("infra"),
        );
        assert_eq!(report.owners.len(), 1);
        assert_eq!(report.owners[0].chains[0].node_path(), vec!["node-c", "<unscheduled>"]);

        let report = DisplacementReport::build(
            &displacements(),
            &ReportFilter::default().with_owner(OwnerKey::new("shop", "ReplicaSet", "missing")),
        );
        assert!(report.is_empty());
    }
}
