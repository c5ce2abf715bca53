// src/diagnostics.rs - Explaining why queries did or did not end up together

use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;

use crate::clustering::run_clustering::cluster_group_data;
use crate::clustering::strategy::StrategyKind;
use crate::matching::candidates::UrlPostings;
use crate::matching::overlap::{common_urls, overlap_count, OverlapIndex};
use crate::models::GroupSerpData;
use crate::utils::cluster_config::ClusteringConfig;

/// Side-by-side view of two queries' top-N URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairDiagnostics {
    pub query_a: String,
    pub query_b: String,
    pub overlap: usize,
    pub common_urls: Vec<String>,
    /// Top-N URLs of `query_a` missing from `query_b`, in rank order.
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
}

fn only_in(urls: &[String], other: &[String], top_n: usize) -> Vec<String> {
    let other_set: HashSet<&str> = other.iter().take(top_n).map(String::as_str).collect();
    let mut seen = HashSet::new();
    urls.iter()
        .take(top_n)
        .filter(|u| !other_set.contains(u.as_str()) && seen.insert(u.as_str()))
        .cloned()
        .collect()
}

/// None when either query has no SERP data in the group.
pub fn pair_diagnostics(data: &GroupSerpData, query_a: &str, query_b: &str, top_n: usize) -> Option<PairDiagnostics> {
    let find = |query: &str| data.with_urls.iter().find(|q| q.query == query);
    let (a, b) = (find(query_a)?, find(query_b)?);
    Some(PairDiagnostics {
        query_a: a.query.clone(),
        query_b: b.query.clone(),
        overlap: overlap_count(&a.urls, &b.urls, top_n),
        common_urls: common_urls(&a.urls, &b.urls, top_n).into_iter().collect(),
        only_in_a: only_in(&a.urls, &b.urls, top_n),
        only_in_b: only_in(&b.urls, &a.urls, top_n),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    pub query: String,
    pub overlap: usize,
}

/// Queries sharing at least `min_overlap` URLs with `query`, strongest first
/// (ties by index order). Empty for an unknown query.
pub fn neighborhood(index: &OverlapIndex, query: &str, min_overlap: usize) -> Vec<Neighbor> {
    let Some(q) = index.index_of(query) else {
        return Vec::new();
    };
    let postings = UrlPostings::build(index);
    let mut row: Vec<(usize, usize)> = postings
        .overlaps_for(index, q, None)
        .into_iter()
        .filter(|&(_, overlap)| overlap >= min_overlap.max(1))
        .collect();
    row.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    row.into_iter()
        .map(|(other, overlap)| Neighbor {
            query: index.query(other).to_string(),
            overlap,
        })
        .collect()
}

/// Cluster of one query under a given strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyMembership {
    pub strategy: StrategyKind,
    pub cluster_size: usize,
    pub members: Vec<String>,
    pub is_clique: bool,
}

/// Runs every strategy on the group and reports the cluster `query` lands
/// in. Useful to see how far transitive chaining pulled a cluster.
pub fn compare_strategies(
    data: &GroupSerpData,
    base_config: &ClusteringConfig,
    query: &str,
) -> Result<Vec<StrategyMembership>> {
    let mut memberships = Vec::with_capacity(StrategyKind::ALL.len());
    for strategy in StrategyKind::ALL {
        let config = ClusteringConfig {
            strategy,
            ..base_config.clone()
        };
        let result = cluster_group_data(data, &config, None)?;
        if let Some(cluster) = result.assignment.cluster_of(query) {
            memberships.push(StrategyMembership {
                strategy,
                cluster_size: cluster.size(),
                members: cluster.members.clone(),
                is_clique: result.coherence[cluster.id].is_clique,
            });
        }
    }
    Ok(memberships)
}
