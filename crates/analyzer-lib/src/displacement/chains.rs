//! Assembly of matched edges into displacement chains

use super::matcher::Edge;
use crate::models::PodElement;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Consecutive edges where each replacement is the next deleted pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    edges: Vec<Edge>,
}

impl Chain {
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of displacements (edges) in the chain
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The pod the chain starts from, never itself a replacement
    pub fn head(&self) -> Option<usize> {
        self.edges.first().map(|e| e.from)
    }

    /// Pod indices visited by the chain, head first
    pub fn vertices(&self) -> Vec<usize> {
        let mut vertices = Vec::with_capacity(self.edges.len() + 1);
        if let Some(head) = self.head() {
            vertices.push(head);
        }
        vertices.extend(self.edges.iter().map(|e| e.to));
        vertices
    }

    /// `a -> b -> c` using pod unique keys
    pub fn render(&self, pods: &[PodElement]) -> String {
        self.vertices()
            .into_iter()
            .filter_map(|i| pods.get(i))
            .map(PodElement::unique_key)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Walk edges from every vertex without an incoming edge
///
/// Chains come out in the order their first edge was matched.
pub fn assemble_chains(edges: &[Edge]) -> Vec<Chain> {
    let next_of: HashMap<usize, Edge> = edges.iter().map(|e| (e.from, *e)).collect();
    let has_incoming: HashSet<usize> = edges.iter().map(|e| e.to).collect();

    let mut chains = Vec::new();
    for start in edges.iter().filter(|e| !has_incoming.contains(&e.from)) {
        let mut walk = Vec::new();
        let mut visited = HashSet::new();
        let mut vertex = start.from;

        while let Some(edge) = next_of.get(&vertex) {
            if !visited.insert(vertex) {
                break;
            }
            walk.push(*edge);
            vertex = edge.to;
        }

        chains.push(Chain { edges: walk });
    }

    chains
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_edges_no_chains() {
        assert!(assemble_chains(&[]).is_empty());
    }

    #[test]
    fn test_single_edge() {
        let chains = assemble_chains(&[Edge::new(0, 1)]);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 1);
        assert_eq!(chains[0].vertices(), vec![0, 1]);
    }

    #[test]
    fn test_edges_link_into_one_chain() {
        // Matched out of walk order on purpose
        let chains = assemble_chains(&[Edge::new(1, 2), Edge::new(0, 1), Edge::new(2, 3)]);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].vertices(), vec![0, 1, 2, 3]);
        assert_eq!(chains[0].head(), Some(0));
    }

    #[test]
    fn test_disjoint_chains() {
        let edges = [Edge::new(0, 2), Edge::new(1, 3), Edge::new(2, 4)];
        let chains = assemble_chains(&edges);
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].vertices(), vec![0, 2, 4]);
        assert_eq!(chains[1].vertices(), vec![1, 3]);

        let total: usize = chains.iter().map(Chain::len).sum();
        assert_eq!(total, edges.len());
    }

    #[test]
    fn test_cycle_terminates() {
        let chains = assemble_chains(&[Edge::new(0, 1), Edge::new(1, 0)]);
        assert!(chains.is_empty());
    }
}
