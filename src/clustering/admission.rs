// src/clustering/admission.rs - Clique-style admission checks for incremental clustering

use crate::matching::overlap::OverlapIndex;
use crate::utils::cluster_config::ClusteringConfig;

/// True iff `query` overlaps every member by at least `min_common_urls`.
///
/// An empty cluster admits anything. A query or member unknown to the index
/// (no SERP data) is never admitted.
pub fn can_add_to_cluster(
    query: &str,
    cluster_members: &[String],
    index: &OverlapIndex,
    min_common_urls: usize,
) -> bool {
    if cluster_members.is_empty() {
        return true;
    }
    let Some(q) = index.index_of(query) else {
        return false;
    };
    cluster_members.iter().all(|member| {
        index
            .index_of(member)
            .is_some_and(|m| index.overlap(q, m) >= min_common_urls)
    })
}

/// Index form of [`can_add_to_cluster`].
pub fn links_to_all(query: usize, members: &[usize], index: &OverlapIndex, threshold: usize) -> bool {
    members.iter().all(|&m| index.overlap(query, m) >= threshold)
}

/// Keeps a strongly bonded pair from absorbing a weaker third query.
///
/// Applies only to two-member clusters whose mutual overlap reaches
/// `strong_threshold`; the newcomer must then reach it with both members.
pub fn strong_pair_guard(query: usize, members: &[usize], index: &OverlapIndex, strong_threshold: usize) -> bool {
    if let &[first, second] = members {
        if index.overlap(first, second) >= strong_threshold {
            return index.overlap(query, first) >= strong_threshold
                && index.overlap(query, second) >= strong_threshold;
        }
    }
    true
}

/// Full admission decision used by the incremental strategies: capacity,
/// the strong-pair guard (when enabled) and the all-members link test.
pub fn admits(
    query: usize,
    members: &[usize],
    index: &OverlapIndex,
    threshold: usize,
    config: &ClusteringConfig,
) -> bool {
    if members.len() >= config.max_cluster_size {
        return false;
    }
    if config.protect_strong_pairs
        && !strong_pair_guard(query, members, index, config.strong_threshold(threshold))
    {
        return false;
    }
    links_to_all(query, members, index, threshold)
}

/// Best overlap of `query` with any member, 0 for an empty cluster.
pub fn cluster_max_score(query: usize, members: &[usize], index: &OverlapIndex) -> usize {
    members
        .iter()
        .map(|&m| index.overlap(query, m))
        .max()
        .unwrap_or(0)
}
