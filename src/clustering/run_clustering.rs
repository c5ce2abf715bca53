// src/clustering/run_clustering.rs - One group, end to end: load, index, cluster, score

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use std::time::Duration;

use crate::clustering::coherence::{
    calculate_cluster_coherence, cluster_stats, log_coherence_statistics, ClusterCoherence, ClusterStats,
};
use crate::clustering::strategy::StrategyKind;
use crate::matching::overlap::OverlapIndex;
use crate::models::{ClusterAssignment, GroupSerpData};
use crate::storage::SerpSource;
use crate::utils::cluster_config::ClusteringConfig;
use crate::utils::progress_bars::logging::ClusteringLogger;
use crate::utils::progress_bars::progress_config::{add_bar, STEP_BAR_TEMPLATE};

#[derive(Debug, Clone)]
pub struct GroupClusteringResult {
    pub group_name: String,
    pub strategy: StrategyKind,
    pub assignment: ClusterAssignment,
    /// Aligned with `assignment.clusters`.
    pub coherence: Vec<ClusterCoherence>,
    pub stats: ClusterStats,
    pub duration: Duration,
}

/// Threshold a strategy's clusters are expected to be linked at.
fn coherence_threshold(config: &ClusteringConfig) -> usize {
    match config.strategy {
        StrategyKind::Iterative => config.iterative_min_threshold,
        StrategyKind::Transitive | StrategyKind::BestMatch => config.min_common_urls,
    }
}

/// Clusters an already loaded group with `config.strategy`.
///
/// The configuration is validated before any work. Queries without SERP data
/// never enter the clustering and are reported back as `without_serp`.
pub fn cluster_group_data(
    data: &GroupSerpData,
    config: &ClusteringConfig,
    multi_progress: Option<&MultiProgress>,
) -> Result<GroupClusteringResult> {
    config
        .validate()
        .context("Invalid clustering configuration")?;

    let logger = ClusteringLogger::new(&data.group_name, config.strategy);
    logger.log_start(config.min_common_urls, config.top_n);
    logger.log_data_loaded(data.with_urls.len(), data.without_urls.len());

    let index = OverlapIndex::build(&data.with_urls, config.top_n);
    logger.log_index_built(index.len(), index.url_count());
    if index.len() > config.large_group_warn_threshold {
        logger.log_large_group(index.len(), config.large_group_warn_threshold);
    }

    logger.log_phase("Clustering", Some(config.strategy.label()));
    let pb = add_bar(
        multi_progress,
        index.len() as u64,
        STEP_BAR_TEMPLATE,
        &format!("{}: clustering", data.group_name),
    );
    let strategy = config.strategy.strategy();
    let member_indices = strategy.cluster(&index, config, pb.as_ref());
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    logger.log_debug(&format!(
        "{} strategy returned {} clusters",
        strategy.name(),
        member_indices.len()
    ));

    logger.log_phase("Scoring", Some("cluster coherence"));
    let threshold = coherence_threshold(config);
    let coherence: Vec<ClusterCoherence> = member_indices
        .iter()
        .map(|members| calculate_cluster_coherence(members, &index, threshold))
        .collect();
    let stats = cluster_stats(&member_indices);

    if config.strategy.is_clique_preserving() {
        let broken = coherence.iter().filter(|c| !c.is_clique).count();
        if broken > 0 {
            logger.log_warning(&format!("{} clusters are not cliques at threshold {}", broken, threshold));
        }
    }
    log_coherence_statistics(&data.group_name, &coherence);

    let member_lists: Vec<Vec<String>> = member_indices
        .iter()
        .map(|members| members.iter().map(|&q| index.query(q).to_string()).collect())
        .collect();
    let assignment = ClusterAssignment::from_member_lists(member_lists, data.without_urls.clone());

    logger.log_completion(&stats);
    Ok(GroupClusteringResult {
        group_name: data.group_name.clone(),
        strategy: config.strategy,
        assignment,
        coherence,
        stats,
        duration: logger.get_elapsed(),
    })
}

/// Loads `group_name` from `source` and clusters it.
pub fn run_group_clustering(
    source: &dyn SerpSource,
    group_name: &str,
    config: &ClusteringConfig,
    multi_progress: Option<&MultiProgress>,
) -> Result<GroupClusteringResult> {
    config
        .validate()
        .context("Invalid clustering configuration")?;
    let data = source
        .load_group(group_name)
        .with_context(|| format!("Failed to load group '{}'", group_name))?;
    cluster_group_data(&data, config, multi_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemorySerpSource;
    use crate::utils::cluster_config::ConfigError;
    use crate::utils::progress_bars::progress_config::hidden_multi_progress;
    use std::collections::HashMap;

    fn urls(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("https://www.{}{}.ru/", prefix, i)).collect()
    }

    fn payload(parts: &[(&str, std::ops::Range<usize>)]) -> String {
        let list: Vec<String> = parts.iter().flat_map(|(p, r)| urls(p, r.clone())).collect();
        serde_json::to_string(&list).unwrap()
    }

    /// A-B and B-C share 7 URLs, A-C none; D has no SERP data.
    fn abc_source() -> InMemorySerpSource {
        let mut source = InMemorySerpSource::new();
        source.insert("g", "A", Some(&payload(&[("ab", 0..7), ("a", 0..7)])));
        source.insert("g", "B", Some(&payload(&[("ab", 0..7), ("bc", 0..7)])));
        source.insert("g", "C", Some(&payload(&[("bc", 0..7), ("c", 0..7)])));
        source.insert("g", "D", Some("[]"));
        source
    }

    #[test]
    fn test_abc_scenario_per_strategy() {
        let source = abc_source();

        let transitive = ClusteringConfig { strategy: StrategyKind::Transitive, ..Default::default() };
        let result = run_group_clustering(&source, "g", &transitive, None).unwrap();
        assert!(result.assignment.same_cluster("A", "C"));
        assert_eq!(result.assignment.clusters.len(), 1);
        assert_eq!(result.assignment.without_serp, vec!["D"]);
        assert_eq!(result.assignment.cluster_id("D"), None);
        assert!(!result.coherence[0].is_clique);

        let best_match = ClusteringConfig { strategy: StrategyKind::BestMatch, ..Default::default() };
        let result = run_group_clustering(&source, "g", &best_match, None).unwrap();
        assert!(!result.assignment.same_cluster("A", "C"));
        assert!(result.coherence.iter().all(|c| c.is_clique));
        assert_eq!(result.stats.clustered_queries, 3);
    }

    #[test]
    fn test_chain_with_weak_ends() {
        // overlap(A,B)=10, overlap(B,C)=8, overlap(A,C)=2
        let mut source = InMemorySerpSource::new();
        source.insert("g", "A", Some(&payload(&[("ab", 0..10), ("ac", 0..2), ("a", 0..8)])));
        source.insert("g", "B", Some(&payload(&[("ab", 0..10), ("bc", 0..8)])));
        source.insert("g", "C", Some(&payload(&[("bc", 0..8), ("ac", 0..2), ("c", 0..10)])));

        for strategy in StrategyKind::ALL {
            let config = ClusteringConfig { strategy, ..Default::default() };
            let assignment = run_group_clustering(&source, "g", &config, None).unwrap().assignment;
            assert!(assignment.same_cluster("A", "B"), "{}", strategy);
            if strategy.is_clique_preserving() {
                assert!(!assignment.same_cluster("A", "C"), "{}", strategy);
                assert_eq!(assignment.cluster_of("C").map(|c| c.size()), Some(1));
            } else {
                assert!(assignment.same_cluster("A", "C"));
            }
        }
    }

    #[test]
    fn test_progress_bars_do_not_change_results() {
        let source = abc_source();
        let data = source.load_group("g").unwrap();
        let mp = hidden_multi_progress();
        for strategy in StrategyKind::ALL {
            let config = ClusteringConfig { strategy, ..Default::default() };
            let quiet = cluster_group_data(&data, &config, None).unwrap();
            let drawn = cluster_group_data(&data, &config, Some(&mp)).unwrap();
            assert_eq!(quiet.assignment.clusters, drawn.assignment.clusters);
        }
    }

    #[test]
    fn test_invalid_config_fails_before_loading() {
        let source = abc_source();
        let config = ClusteringConfig { min_common_urls: 0, ..Default::default() };
        let err = run_group_clustering(&source, "g", &config, None).unwrap_err();
        assert!(err.to_string().contains("Invalid clustering configuration"));

        let config = ClusteringConfig {
            strategy: StrategyKind::BestMatch,
            max_cluster_size: 1,
            ..Default::default()
        };
        let err = run_group_clustering(&source, "g", &config, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MaxClusterSizeBelowPair(1))
        ));
    }

    #[test]
    fn test_empty_group() {
        let source = InMemorySerpSource::new();
        let result = run_group_clustering(&source, "nothing", &ClusteringConfig::default(), None).unwrap();
        assert!(result.assignment.clusters.is_empty());
        assert_eq!(result.stats, ClusterStats::default());
    }

    #[test]
    fn test_raising_threshold_only_splits_transitive_clusters() {
        let mut source = InMemorySerpSource::new();
        // Overlaps shrink along the chain q0..q7, so higher thresholds cut it.
        for q in 0..8usize {
            let start = q * 2;
            source.insert("g", &format!("q{}", q), Some(&payload(&[("s", start..start + 20)])));
        }
        let data = source.load_group("g").unwrap();

        let mut previous: Option<HashMap<String, usize>> = None;
        for threshold in (1..=20).rev() {
            let config = ClusteringConfig { min_common_urls: threshold, ..Default::default() };
            let result = cluster_group_data(&data, &config, None).unwrap();
            let current = result.assignment.query_to_cluster.clone();
            if let Some(stricter) = &previous {
                // Queries together at the stricter threshold stay together.
                for (a, ca) in stricter {
                    for (b, cb) in stricter {
                        if ca == cb {
                            assert_eq!(current[a], current[b], "{} and {} split at {}", a, b, threshold);
                        }
                    }
                }
            }
            previous = Some(current);
        }
    }
}
