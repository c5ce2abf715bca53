// src/clustering/components.rs - Transitive-closure clusters over the similarity graph

use log::debug;
use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;
use std::collections::{HashSet, VecDeque};

use crate::clustering::graph::SimilarityGraph;

/// Every query reachable from `start` through qualifying links, `start`
/// included. An unknown start yields an empty set.
pub fn find_component(graph: &SimilarityGraph, start: &str) -> HashSet<String> {
    let Some(start_node) = graph.node(start) else {
        return HashSet::new();
    };
    let mut visited = vec![false; graph.node_count()];
    component_from(graph, start_node, &mut visited)
        .into_iter()
        .map(|node| graph.query(node).to_string())
        .collect()
}

fn component_from(graph: &SimilarityGraph, start: NodeIndex, visited: &mut [bool]) -> Vec<NodeIndex> {
    let mut component = Vec::new();
    let mut stack = vec![start];

    while let Some(current) = stack.pop() {
        if visited[current.index()] {
            continue;
        }
        visited[current.index()] = true;
        component.push(current);

        for neighbor in graph.graph.neighbors(current) {
            if !visited[neighbor.index()] {
                stack.push(neighbor);
            }
        }
    }
    component
}

/// Connected components as node index lists. Components appear in the order
/// of their lowest node; members are sorted by node index.
pub fn component_indices(graph: &SimilarityGraph) -> Vec<Vec<usize>> {
    let mut visited = vec![false; graph.node_count()];
    let mut components = Vec::new();

    for node_idx in graph.graph.node_indices() {
        if !visited[node_idx.index()] {
            let mut members: Vec<usize> = component_from(graph, node_idx, &mut visited)
                .into_iter()
                .map(NodeIndex::index)
                .collect();
            members.sort_unstable();
            components.push(members);
        }
    }

    debug!(
        "Resolved {} connected components (petgraph count: {})",
        components.len(),
        connected_components(&graph.graph)
    );
    components
}

/// Partition of all queries into transitive-closure clusters.
pub fn connected_clusters(graph: &SimilarityGraph) -> Vec<Vec<String>> {
    component_indices(graph)
        .into_iter()
        .map(|members| {
            members
                .into_iter()
                .map(|idx| graph.query(NodeIndex::new(idx)).to_string())
                .collect()
        })
        .collect()
}

/// Shortest chain of qualifying links from `from` to `to`, both included.
///
/// Explains why two unrelated-looking queries ended up in one transitive
/// cluster. None when either query is unknown or they are not connected.
pub fn explain_link_path(graph: &SimilarityGraph, from: &str, to: &str) -> Option<Vec<String>> {
    let (start, goal) = (graph.node(from)?, graph.node(to)?);
    let mut previous: Vec<Option<NodeIndex>> = vec![None; graph.node_count()];
    let mut seen = vec![false; graph.node_count()];
    let mut queue = VecDeque::from([start]);
    seen[start.index()] = true;

    while let Some(current) = queue.pop_front() {
        if current == goal {
            let mut path = vec![graph.query(goal).to_string()];
            let mut step = goal;
            while let Some(prev) = previous[step.index()] {
                path.push(graph.query(prev).to_string());
                step = prev;
            }
            path.reverse();
            return Some(path);
        }
        let mut next: Vec<NodeIndex> = graph.graph.neighbors(current).collect();
        next.sort_unstable();
        for neighbor in next {
            if !seen[neighbor.index()] {
                seen[neighbor.index()] = true;
                previous[neighbor.index()] = Some(current);
                queue.push_back(neighbor);
            }
        }
    }
    None
}
