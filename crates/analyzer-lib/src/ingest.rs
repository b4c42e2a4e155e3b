//! Ingestion adapter for Kubernetes pod objects
//!
//! Turns a pod into one lifecycle record per owner reference and pushes the
//! records into a sink. Watching the cluster is left to the caller.

use crate::analyzer::PlacementAnalyzer;
use crate::error::Result;
use crate::models::PodElement;
use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, warn};

/// Anything that accepts lifecycle records
pub trait RecordSink: Send + Sync {
    fn record(&self, element: PodElement) -> Result<()>;
}

impl RecordSink for PlacementAnalyzer {
    fn record(&self, element: PodElement) -> Result<()> {
        PlacementAnalyzer::record(self, element)
    }
}

/// One record per owner reference; empty for unowned pods
pub fn elements_from_pod(pod: &Pod) -> Vec<PodElement> {
    let metadata = &pod.metadata;
    let pod_name = metadata.name.clone().unwrap_or_default();

    let Some(created) = metadata.creation_timestamp.as_ref() else {
        warn!(pod_name = %pod_name, "Pod without creation timestamp, skipping");
        return Vec::new();
    };

    let Some(owners) = metadata.owner_references.as_ref() else {
        debug!(pod_name = %pod_name, "Pod without owner references, skipping");
        return Vec::new();
    };

    let namespace = metadata.namespace.clone().unwrap_or_default();
    let node = pod
        .spec
        .as_ref()
        .and_then(|spec| spec.node_name.clone())
        .unwrap_or_default();
    let deleted = metadata.deletion_timestamp.as_ref().map(|t| t.0);

    owners
        .iter()
        .map(|owner| PodElement {
            namespace: namespace.clone(),
            kind: owner.kind.clone(),
            kind_name: owner.name.clone(),
            pod_name: pod_name.clone(),
            node: node.clone(),
            creation_timestamp: created.0,
            deletion_timestamp: deleted,
        })
        .collect()
}

/// Push every record derived from `pod` into `sink`
///
/// Returns the number of records accepted; rejected ones are logged.
pub fn record_pod<S: RecordSink + ?Sized>(sink: &S, pod: &Pod) -> usize {
    let mut accepted = 0;
    for element in elements_from_pod(pod) {
        let owner = element.owner_key();
        match sink.record(element) {
            Ok(()) => accepted += 1,
            Err(e) => warn!(owner = %owner, error = %e, "Rejected pod record"),
        }
    }
    accepted
}
