// src/clustering/coherence.rs - Per-cluster link density and group-level size statistics

use log::info;
use serde::Serialize;

use crate::matching::overlap::OverlapIndex;

/// How tightly a cluster's members are linked at a given threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterCoherence {
    pub size: usize,
    /// Member pairs whose overlap reaches the threshold.
    pub linked_pairs: usize,
    pub total_pairs: usize,
    /// `linked_pairs / total_pairs`; 1.0 means the cluster is a clique.
    pub density: f64,
    pub min_overlap: usize,
    pub avg_overlap: f64,
    pub max_overlap: usize,
    pub is_clique: bool,
}

pub fn calculate_cluster_coherence(members: &[usize], index: &OverlapIndex, threshold: usize) -> ClusterCoherence {
    if members.len() <= 1 {
        return ClusterCoherence {
            size: members.len(),
            density: 1.0,
            is_clique: true,
            ..Default::default()
        };
    }

    let mut linked_pairs = 0;
    let mut total_pairs = 0;
    let mut overlap_sum = 0;
    let mut min_overlap = usize::MAX;
    let mut max_overlap = 0;

    for (i, &a) in members.iter().enumerate() {
        for &b in &members[i + 1..] {
            let overlap = index.overlap(a, b);
            total_pairs += 1;
            overlap_sum += overlap;
            min_overlap = min_overlap.min(overlap);
            max_overlap = max_overlap.max(overlap);
            if overlap >= threshold {
                linked_pairs += 1;
            }
        }
    }

    ClusterCoherence {
        size: members.len(),
        linked_pairs,
        total_pairs,
        density: linked_pairs as f64 / total_pairs as f64,
        min_overlap,
        avg_overlap: overlap_sum as f64 / total_pairs as f64,
        max_overlap,
        is_clique: linked_pairs == total_pairs,
    }
}

/// Summary of a partition: totals, size spread and singletons.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterStats {
    pub total_clusters: usize,
    pub clustered_queries: usize,
    pub avg_cluster_size: f64,
    pub min_cluster_size: usize,
    pub max_cluster_size: usize,
    pub singleton_clusters: usize,
}

pub fn cluster_stats<T>(clusters: &[Vec<T>]) -> ClusterStats {
    if clusters.is_empty() {
        return ClusterStats::default();
    }
    let sizes: Vec<usize> = clusters.iter().map(Vec::len).collect();
    let clustered_queries: usize = sizes.iter().sum();
    ClusterStats {
        total_clusters: clusters.len(),
        clustered_queries,
        avg_cluster_size: clustered_queries as f64 / clusters.len() as f64,
        min_cluster_size: sizes.iter().copied().min().unwrap_or(0),
        max_cluster_size: sizes.iter().copied().max().unwrap_or(0),
        singleton_clusters: sizes.iter().filter(|&&s| s == 1).count(),
    }
}

/// Logs how many multi-query clusters are cliques and the density spread.
pub fn log_coherence_statistics(group_name: &str, coherence: &[ClusterCoherence]) {
    let multi: Vec<&ClusterCoherence> = coherence.iter().filter(|c| c.size > 1).collect();
    if multi.is_empty() {
        info!("[{}] 📐 No multi-query clusters to score", group_name);
        return;
    }

    let cliques = multi.iter().filter(|c| c.is_clique).count();
    let avg_density = multi.iter().map(|c| c.density).sum::<f64>() / multi.len() as f64;
    let min_density = multi.iter().map(|c| c.density).fold(f64::INFINITY, f64::min);

    info!(
        "[{}] 📐 Coherence: {}/{} multi-query clusters are cliques, density avg {:.3}, min {:.3}",
        group_name,
        cliques,
        multi.len(),
        avg_density,
        min_density
    );

    let loose = multi.iter().filter(|c| c.density < 0.5).count();
    if loose > 0 {
        info!(
            "[{}] 🕸️  {} clusters are held together by chains (density < 0.5)",
            group_name, loose
        );
    }
}
