//! Simple-cycle enumeration and canonical rotation.

use petgraph::graph::{DiGraph, NodeIndex};
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::product::Currency;

/// Enumerate every simple cycle of the conversion graph, each exactly once,
/// as open currency sequences.
///
/// The graph has at most a handful of nodes (one per currency), so a DFS
/// that roots each cycle at its least currency is plenty; intermediates are
/// restricted to greater currencies, which is what deduplicates rotations.
pub fn simple_cycles(graph: &DiGraph<Currency, Decimal>) -> Vec<Vec<Currency>> {
    let mut cycles = Vec::new();
    for start in graph.node_indices() {
        let mut path = vec![start];
        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        extend_cycles(graph, start, &mut path, &mut visited, &mut cycles);
    }
    cycles
}

fn extend_cycles(
    graph: &DiGraph<Currency, Decimal>,
    current: NodeIndex,
    path: &mut Vec<NodeIndex>,
    visited: &mut HashSet<NodeIndex>,
    cycles: &mut Vec<Vec<Currency>>,
) {
    let start = path[0];
    for neighbor in graph.neighbors(current) {
        if neighbor == start {
            if path.len() >= 2 {
                cycles.push(path.iter().map(|node| graph[*node]).collect());
            }
        } else if graph[neighbor] > graph[start] && !visited.contains(&neighbor) {
            visited.insert(neighbor);
            path.push(neighbor);
            extend_cycles(graph, neighbor, path, visited, cycles);
            path.pop();
            visited.remove(&neighbor);
        }
    }
}

/// Rotate an open cycle so its greatest currency (the reference quote) comes
/// first. Idempotent.
pub fn canonical_rotation(cycle: &[Currency]) -> Vec<Currency> {
    if cycle.is_empty() {
        return Vec::new();
    }
    let mut pivot = 0;
    for (index, currency) in cycle.iter().enumerate() {
        if *currency > cycle[pivot] {
            pivot = index;
        }
    }
    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[pivot..]);
    rotated.extend_from_slice(&cycle[..pivot]);
    rotated
}

/// Canonicalize an open cycle: rotate greatest-first and close it by
/// repeating the head.
pub fn canonicalize(cycle: &[Currency]) -> Vec<Currency> {
    let mut closed = canonical_rotation(cycle);
    if let Some(head) = closed.first().copied() {
        closed.push(head);
    }
    closed
}
