pub mod admission;
pub mod coherence;
pub mod components;
pub mod graph;
pub mod incremental;
pub mod run_clustering;
pub mod strategy;

pub use admission::{can_add_to_cluster, cluster_max_score, strong_pair_guard};
pub use components::{connected_clusters, explain_link_path, find_component};
pub use graph::{build_graph, build_similarity_graph, SimilarityGraph};
pub use run_clustering::{cluster_group_data, run_group_clustering, GroupClusteringResult};
pub use strategy::{ClusteringStrategy, StrategyKind};
