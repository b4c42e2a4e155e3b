//! Metrics exposed after recompute passes
//!
//! Kept in its own test binary: the metrics live in the global registry and
//! other tests recomputing in parallel would race on the gauges.

use analyzer_lib::{observability::StructuredLogger, PlacementAnalyzer, PodElement};
use chrono::{TimeZone, Utc};

fn element(pod: &str, node: &str, created: i64, deleted: Option<i64>) -> PodElement {
    PodElement {
        namespace: "ns".to_string(),
        kind: "ReplicaSet".to_string(),
        kind_name: "rs1".to_string(),
        pod_name: pod.to_string(),
        node: node.to_string(),
        creation_timestamp: Utc.timestamp_opt(created, 0).unwrap(),
        deletion_timestamp: deleted.map(|d| Utc.timestamp_opt(d, 0).unwrap()),
    }
}

fn gauge(name: &str) -> i64 {
    prometheus::gather()
        .iter()
        .find(|family| family.get_name() == name)
        .map(|family| family.get_metric()[0].get_gauge().get_value() as i64)
        .unwrap_or_else(|| panic!("metric {} not registered", name))
}

#[test]
fn test_conflicts_gauge_reflects_last_pass() {
    let analyzer = PlacementAnalyzer::new(StructuredLogger::new("test-cluster"));
    analyzer.record(element("p1", "node-a", 0, Some(10))).unwrap();
    analyzer.record(element("p1", "node-b", 0, Some(10))).unwrap();

    let summary = analyzer.recompute();
    assert_eq!(summary.conflicts, 1);
    assert_eq!(gauge("placement_analyzer_observation_conflicts"), 1);

    // The same conflict is found again; it must not be counted twice
    analyzer.record(element("p2", "node-c", 11, None)).unwrap();
    assert!(analyzer.is_stale());
    analyzer.recompute();
    assert_eq!(gauge("placement_analyzer_observation_conflicts"), 1);
    assert_eq!(gauge("placement_analyzer_edges_matched"), 1);

    analyzer.store().reset();
    analyzer.recompute();
    assert_eq!(gauge("placement_analyzer_observation_conflicts"), 0);
}
