// src/clustering/graph.rs - Query similarity graph built from qualifying SERP overlaps

use indicatif::ProgressBar;
use log::{debug, warn};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashMap;

use crate::matching::candidates::{qualifying_pairs, CandidateMode};
use crate::matching::overlap::OverlapIndex;
use crate::models::QuerySerp;
use crate::utils::cluster_config::{ClusteringConfig, ConfigError};

#[derive(Debug, Clone)]
pub struct QueryNode {
    pub query: String,
    pub url_count: usize,
}

/// Edge metadata only; clustering looks at connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlapEdge {
    pub common_urls: usize,
}

/// Undirected graph over the queries of one group. Node `i` is query `i` of
/// the overlap index it was built from.
#[derive(Debug, Clone)]
pub struct SimilarityGraph {
    pub graph: UnGraph<QueryNode, OverlapEdge>,
    pub query_to_node: HashMap<String, NodeIndex>,
}

impl SimilarityGraph {
    pub fn node(&self, query: &str) -> Option<NodeIndex> {
        self.query_to_node.get(query).copied()
    }

    pub fn query(&self, node: NodeIndex) -> &str {
        &self.graph[node].query
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Overlap on the edge between two queries, if they are linked.
    pub fn link(&self, query_a: &str, query_b: &str) -> Option<usize> {
        let edge = self.graph.find_edge(self.node(query_a)?, self.node(query_b)?)?;
        Some(self.graph[edge].common_urls)
    }

    /// Linked queries with their overlap, strongest first.
    pub fn neighbors(&self, query: &str) -> Vec<(&str, usize)> {
        let Some(node) = self.node(query) else {
            return Vec::new();
        };
        let mut linked: Vec<(NodeIndex, usize)> = self
            .graph
            .edges(node)
            .map(|edge| {
                let other = if edge.source() == node { edge.target() } else { edge.source() };
                (other, edge.weight().common_urls)
            })
            .collect();
        linked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        linked.into_iter().map(|(n, w)| (self.query(n), w)).collect()
    }
}

/// Builds the graph for an already interned group. `config` must already
/// be validated.
///
/// Every query becomes a node, in index order; an edge joins `i < j` iff
/// their top-N overlap reaches `config.min_common_urls`.
pub fn build_from_index(
    index: &OverlapIndex,
    config: &ClusteringConfig,
    progress: Option<&ProgressBar>,
) -> SimilarityGraph {
    if index.len() > config.large_group_warn_threshold {
        warn!(
            "Building similarity graph for {} queries (above {}), expect a long pair evaluation",
            index.len(),
            config.large_group_warn_threshold
        );
    }

    let mut graph = UnGraph::with_capacity(index.len(), 0);
    let mut query_to_node = HashMap::with_capacity(index.len());
    for (i, query) in index.queries().iter().enumerate() {
        let node = graph.add_node(QueryNode {
            query: query.clone(),
            url_count: index.url_ids(i).len(),
        });
        query_to_node.insert(query.clone(), node);
    }

    if let Some(pb) = progress {
        pb.set_length(index.len() as u64);
        pb.set_message("Evaluating query pairs...");
    }

    let pairs = qualifying_pairs(index, config.min_common_urls, config.candidate_mode, None, progress);
    for pair in &pairs {
        graph.add_edge(
            NodeIndex::new(pair.a),
            NodeIndex::new(pair.b),
            OverlapEdge {
                common_urls: pair.overlap,
            },
        );
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Graph built: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        ));
    }
    debug!(
        "Similarity graph: {} nodes, {} edges (threshold {}, {} candidates)",
        graph.node_count(),
        graph.edge_count(),
        config.min_common_urls,
        config.candidate_mode
    );

    SimilarityGraph { graph, query_to_node }
}

/// Builds the similarity graph straight from normalized query URL lists.
///
/// The configuration is validated first; a threshold of zero would link
/// queries that share nothing.
pub fn build_similarity_graph(
    queries: &[QuerySerp],
    config: &ClusteringConfig,
    progress: Option<&ProgressBar>,
) -> Result<SimilarityGraph, ConfigError> {
    config.validate()?;
    let index = OverlapIndex::build(queries, config.top_n);
    Ok(build_from_index(&index, config, progress))
}

/// Convenience form with default settings apart from the threshold.
pub fn build_graph(queries: &[QuerySerp], min_common_urls: usize) -> Result<SimilarityGraph, ConfigError> {
    let config = ClusteringConfig {
        min_common_urls,
        candidate_mode: CandidateMode::InvertedIndex,
        ..Default::default()
    };
    build_similarity_graph(queries, &config, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn query(name: &str, urls: &[&str]) -> QuerySerp {
        QuerySerp::new(name, urls.iter().map(|u| u.to_string()).collect())
    }

    fn random_queries(seed: u64, count: usize) -> Vec<QuerySerp> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|q| {
                let urls = (0..20).map(|_| format!("site{}.ru", rng.gen_range(0..40))).collect();
                QuerySerp::new(format!("query {}", q), urls)
            })
            .collect()
    }

    fn edge_list(graph: &SimilarityGraph) -> Vec<(usize, usize, usize)> {
        let mut edges: Vec<_> = graph
            .graph
            .edge_references()
            .map(|e| {
                let (a, b) = (e.source().index(), e.target().index());
                (a.min(b), a.max(b), e.weight().common_urls)
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    #[test]
    fn test_edges_follow_threshold() {
        let queries = vec![
            query("a", &["1", "2", "3", "4"]),
            query("b", &["1", "2", "3", "x"]),
            query("c", &["9", "8", "7", "4"]),
        ];
        let graph = build_graph(&queries, 3).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.link("a", "b"), Some(3));
        assert_eq!(graph.link("b", "a"), Some(3));
        assert_eq!(graph.link("a", "c"), None);
        assert!(graph.neighbors("c").is_empty());
    }

    #[test]
    fn test_zero_threshold_is_rejected_in_every_mode() {
        let queries = vec![query("a", &["x.ru"]), query("b", &["y.ru"])];
        assert!(matches!(build_graph(&queries, 0), Err(ConfigError::ZeroThreshold { .. })));
        for candidate_mode in [CandidateMode::AllPairs, CandidateMode::InvertedIndex] {
            let config = ClusteringConfig { min_common_urls: 0, candidate_mode, ..Default::default() };
            assert!(build_similarity_graph(&queries, &config, None).is_err());
        }

        // At the smallest legal threshold both modes agree on disjoint queries.
        for candidate_mode in [CandidateMode::AllPairs, CandidateMode::InvertedIndex] {
            let config = ClusteringConfig { min_common_urls: 1, candidate_mode, ..Default::default() };
            assert_eq!(build_similarity_graph(&queries, &config, None).unwrap().edge_count(), 0);
        }
    }

    #[test]
    fn test_no_self_loops_or_duplicates() {
        let queries = random_queries(5, 60);
        let config = ClusteringConfig { min_common_urls: 4, ..Default::default() };
        let graph = build_similarity_graph(&queries, &config, None).unwrap();
        let edges = edge_list(&graph);
        assert!(edges.iter().all(|&(a, b, _)| a != b));
        let mut pairs: Vec<_> = edges.iter().map(|&(a, b, _)| (a, b)).collect();
        pairs.dedup();
        assert_eq!(pairs.len(), edges.len());
    }

    #[test]
    fn test_repeated_query_is_one_node() {
        let queries = vec![
            query("a", &["x", "y"]),
            query("b", &["x", "y"]),
            query("a", &["x", "y"]),
        ];
        let graph = build_graph(&queries, 2).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.link("a", "b"), Some(2));
    }

    #[test]
    fn test_candidate_modes_build_identical_graphs() {
        let queries = random_queries(17, 120);
        let base = ClusteringConfig { min_common_urls: 5, ..Default::default() };
        let all_pairs = ClusteringConfig { candidate_mode: CandidateMode::AllPairs, ..base.clone() };
        let inverted = ClusteringConfig { candidate_mode: CandidateMode::InvertedIndex, ..base };

        let g1 = build_similarity_graph(&queries, &all_pairs, None).unwrap();
        let g2 = build_similarity_graph(&queries, &inverted, None).unwrap();
        assert_eq!(edge_list(&g1), edge_list(&g2));
        assert!(g1.edge_count() > 0);
    }

    #[test]
    fn test_parallel_build_is_deterministic() {
        let queries = random_queries(99, 150);
        let config = ClusteringConfig { min_common_urls: 5, ..Default::default() };
        let first = build_similarity_graph(&queries, &config, None).unwrap();
        for _ in 0..3 {
            let again = build_similarity_graph(&queries, &config, None).unwrap();
            let order_a: Vec<_> = first.graph.edge_references().map(|e| (e.source(), e.target())).collect();
            let order_b: Vec<_> = again.graph.edge_references().map(|e| (e.source(), e.target())).collect();
            assert_eq!(order_a, order_b);
        }
    }

    #[test]
    fn test_neighbors_sorted_by_overlap() {
        let queries = vec![
            query("hub", &["1", "2", "3", "4", "5"]),
            query("weak", &["1", "2", "x", "y", "z"]),
            query("strong", &["1", "2", "3", "4", "q"]),
        ];
        let graph = build_graph(&queries, 2).unwrap();
        assert_eq!(graph.neighbors("hub"), vec![("strong", 4), ("weak", 2)]);
        assert!(graph.neighbors("missing").is_empty());
    }
}
