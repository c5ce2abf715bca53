// src/clustering/incremental.rs - Clique-preserving clustering drivers (no transitive closure)

use indicatif::ProgressBar;
use log::debug;
use std::cmp::Reverse;

use crate::clustering::admission::{admits, cluster_max_score};
use crate::matching::candidates::{qualifying_pairs, UrlPostings};
use crate::matching::overlap::OverlapIndex;
use crate::utils::cluster_config::ClusteringConfig;

/// Cluster list plus a query -> cluster lookup, kept in sync.
struct ClusterBook {
    clusters: Vec<Vec<usize>>,
    cluster_of: Vec<Option<usize>>,
}

impl ClusterBook {
    fn new(queries: usize) -> Self {
        Self {
            clusters: Vec::new(),
            cluster_of: vec![None; queries],
        }
    }

    fn open(&mut self, members: Vec<usize>) -> usize {
        let id = self.clusters.len();
        for &q in &members {
            self.cluster_of[q] = Some(id);
        }
        self.clusters.push(members);
        id
    }

    fn join(&mut self, cluster: usize, query: usize) {
        self.clusters[cluster].push(query);
        self.cluster_of[query] = Some(cluster);
    }

    fn detach(&mut self, query: usize) {
        if let Some(cluster) = self.cluster_of[query].take() {
            self.clusters[cluster].retain(|&m| m != query);
        }
    }

    fn is_clustered(&self, query: usize) -> bool {
        self.cluster_of[query].is_some()
    }

    fn into_clusters(self) -> Vec<Vec<usize>> {
        self.clusters.into_iter().filter(|c| !c.is_empty()).collect()
    }
}

/// Strongest partner of `query` among all other queries; ties go to the
/// lowest index. None when the query shares no URL with anybody.
fn best_partner(postings: &UrlPostings, index: &OverlapIndex, query: usize) -> Option<(usize, usize)> {
    postings
        .overlaps_for(index, query, None)
        .into_iter()
        .fold(None, |best, (other, overlap)| match best {
            Some((_, best_overlap)) if best_overlap >= overlap => best,
            _ => Some((other, overlap)),
        })
}

/// Best-match clustering.
///
/// Queries are taken in index order. Each unclustered query looks up its
/// strongest partner. A partner at `min_common_urls * strong_link_multiplier`
/// or more is pulled out of its cluster into a fresh pair with the query.
/// Otherwise the query joins the partner's cluster, or failing that the
/// admitting cluster it overlaps most, or opens a pair with a still free
/// partner. Anything else ends up alone.
pub fn cluster_best_match(
    index: &OverlapIndex,
    config: &ClusteringConfig,
    progress: Option<&ProgressBar>,
) -> Vec<Vec<usize>> {
    let threshold = config.min_common_urls;
    let strong = config.strong_threshold(threshold);
    let postings = UrlPostings::build(index);
    let mut book = ClusterBook::new(index.len());
    let mut strong_splits = 0usize;

    if let Some(pb) = progress {
        pb.set_length(index.len() as u64);
        pb.set_message("Best-match admission...");
    }

    for query in 0..index.len() {
        if let Some(pb) = progress {
            pb.inc(1);
        }
        if book.is_clustered(query) {
            continue;
        }

        let Some((partner, overlap)) =
            best_partner(&postings, index, query).filter(|&(_, overlap)| overlap >= threshold)
        else {
            book.open(vec![query]);
            continue;
        };

        if let Some(partner_cluster) = book.cluster_of[partner] {
            if overlap >= strong {
                book.detach(partner);
                book.open(vec![partner, query]);
                strong_splits += 1;
                continue;
            }
            if admits(query, &book.clusters[partner_cluster], index, threshold, config) {
                book.join(partner_cluster, query);
                continue;
            }
        }

        let mut best_cluster: Option<(usize, usize)> = None;
        for (cluster, members) in book.clusters.iter().enumerate() {
            if members.is_empty() || !admits(query, members, index, threshold, config) {
                continue;
            }
            let score = cluster_max_score(query, members, index);
            if best_cluster.map_or(true, |(_, best_score)| score > best_score) {
                best_cluster = Some((cluster, score));
            }
        }

        match best_cluster {
            Some((cluster, _)) => book.join(cluster, query),
            None if !book.is_clustered(partner) => {
                book.open(vec![partner, query]);
            }
            None => {
                book.open(vec![query]);
            }
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message("Best-match admission done");
    }
    debug!("Best-match clustering: {} strong-pair splits", strong_splits);
    book.into_clusters()
}

/// Iterative threshold descent.
///
/// For each threshold from the strongest down, pairs among the queries still
/// unclustered at the start of the level are walked by decreasing overlap.
/// Two free queries open a cluster; a free query next to a cluster opened in
/// the same level joins it when admitted at that level's threshold. Queries
/// left over at the end are singletons.
pub fn cluster_iterative(
    index: &OverlapIndex,
    config: &ClusteringConfig,
    progress: Option<&ProgressBar>,
) -> Vec<Vec<usize>> {
    let mut book = ClusterBook::new(index.len());
    let levels: Vec<usize> = config.iterative_thresholds().collect();

    if let Some(pb) = progress {
        pb.set_length(levels.len() as u64);
        pb.set_message("Iterative threshold descent...");
    }

    for threshold in levels {
        if let Some(pb) = progress {
            pb.inc(1);
        }
        let active: Vec<bool> = (0..index.len()).map(|q| !book.is_clustered(q)).collect();
        if !active.iter().any(|&free| free) {
            break;
        }

        let mut pairs = qualifying_pairs(index, threshold, config.candidate_mode, Some(&active), None);
        pairs.sort_by_key(|pair| Reverse(pair.overlap));
        let clusters_before = book.clusters.len();

        for pair in &pairs {
            let (a, b) = (pair.a, pair.b);
            match (book.cluster_of[a], book.cluster_of[b]) {
                (Some(_), Some(_)) => {}
                (None, None) => {
                    book.open(vec![a, b]);
                }
                (Some(cluster), None) | (None, Some(cluster)) => {
                    let free = if book.is_clustered(a) { b } else { a };
                    if admits(free, &book.clusters[cluster], index, threshold, config) {
                        book.join(cluster, free);
                    }
                }
            }
        }

        debug!(
            "Iterative level {}: {} qualifying pairs, {} new clusters",
            threshold,
            pairs.len(),
            book.clusters.len() - clusters_before
        );
    }

    for query in 0..index.len() {
        if !book.is_clustered(query) {
            book.open(vec![query]);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message("Iterative descent done");
    }
    book.into_clusters()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuerySerp;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn urls(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("{}{}.ru", prefix, i)).collect()
    }

    fn joined(parts: &[(&str, std::ops::Range<usize>)]) -> Vec<String> {
        parts.iter().flat_map(|(p, r)| urls(p, r.clone())).collect()
    }

    /// Queries drawn from a few topics, each topic a pool of 26 URLs, plus noise.
    fn topical_index(seed: u64, queries: usize) -> OverlapIndex {
        let mut rng = StdRng::seed_from_u64(seed);
        let entries: Vec<QuerySerp> = (0..queries)
            .map(|q| {
                let topic = rng.gen_range(0..5);
                let mut pool = urls(&format!("t{}-", topic), 0..26);
                pool.shuffle(&mut rng);
                let mut list: Vec<String> = pool.into_iter().take(16).collect();
                list.extend((0..4).map(|_| format!("noise{}.ru", rng.gen_range(0..500))));
                list.shuffle(&mut rng);
                QuerySerp::new(format!("q{}", q), list)
            })
            .collect();
        OverlapIndex::build(&entries, 20)
    }

    fn assert_partition(clusters: &[Vec<usize>], n: usize) {
        let mut seen = HashSet::new();
        for cluster in clusters {
            assert!(!cluster.is_empty());
            for &q in cluster {
                assert!(seen.insert(q), "query {} placed twice", q);
            }
        }
        assert_eq!(seen.len(), n);
    }

    fn assert_clique(clusters: &[Vec<usize>], index: &OverlapIndex, threshold: usize) {
        for cluster in clusters {
            for (i, &a) in cluster.iter().enumerate() {
                for &b in &cluster[i + 1..] {
                    assert!(
                        index.overlap(a, b) >= threshold,
                        "{} and {} share only {} URLs in one cluster",
                        index.query(a),
                        index.query(b),
                        index.overlap(a, b)
                    );
                }
            }
        }
    }

    #[test]
    fn test_best_match_chain_does_not_merge() {
        // A-B and B-C share 7 URLs, A-C share none.
        let entries = vec![
            QuerySerp::new("A", joined(&[("ab", 0..7), ("a", 0..7)])),
            QuerySerp::new("B", joined(&[("ab", 0..7), ("bc", 0..7)])),
            QuerySerp::new("C", joined(&[("bc", 0..7), ("c", 0..7)])),
        ];
        let index = OverlapIndex::build(&entries, 20);
        let clusters = cluster_best_match(&index, &ClusteringConfig::default(), None);
        assert_eq!(clusters, vec![vec![1, 0], vec![2]]);
    }

    #[test]
    fn test_best_match_strong_pair_split() {
        // X-P 8, X-Q 8, P-Q 16: X pairs with P first, Q then pulls P away.
        let entries = vec![
            QuerySerp::new("X", joined(&[("s", 0..8), ("x", 0..12)])),
            QuerySerp::new("P", joined(&[("s", 0..16), ("p", 0..4)])),
            QuerySerp::new("Q", joined(&[("s", 0..16), ("q", 0..4)])),
        ];
        let index = OverlapIndex::build(&entries, 20);
        let clusters = cluster_best_match(&index, &ClusteringConfig::default(), None);
        assert_eq!(clusters, vec![vec![0], vec![1, 2]]);
    }

    #[test]
    fn test_best_match_isolated_query_is_singleton() {
        let entries = vec![
            QuerySerp::new("lonely", urls("l", 0..20)),
            QuerySerp::new("other", urls("o", 0..20)),
        ];
        let index = OverlapIndex::build(&entries, 20);
        let clusters = cluster_best_match(&index, &ClusteringConfig::default(), None);
        assert_eq!(clusters, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_best_match_clique_property() {
        for seed in 0..5 {
            let index = topical_index(seed, 120);
            let config = ClusteringConfig::default();
            let clusters = cluster_best_match(&index, &config, None);
            assert_partition(&clusters, index.len());
            assert_clique(&clusters, &index, config.min_common_urls);
            assert!(clusters.iter().any(|c| c.len() > 2));
        }
    }

    #[test]
    fn test_iterative_clique_property() {
        for seed in 10..15 {
            let index = topical_index(seed, 120);
            let config = ClusteringConfig::default();
            let clusters = cluster_iterative(&index, &config, None);
            assert_partition(&clusters, index.len());
            assert_clique(&clusters, &index, config.iterative_min_threshold);
        }
    }

    #[test]
    fn test_best_match_respects_smallest_cluster_cap() {
        let entries: Vec<QuerySerp> = (0..5)
            .map(|q| QuerySerp::new(format!("same {}", q), urls("s", 0..20)))
            .collect();
        let index = OverlapIndex::build(&entries, 20);

        let too_small = ClusteringConfig { max_cluster_size: 1, ..Default::default() };
        assert!(too_small.validate().is_err());

        for protect_strong_pairs in [true, false] {
            let config = ClusteringConfig { max_cluster_size: 2, protect_strong_pairs, ..Default::default() };
            assert!(config.validate().is_ok());
            let clusters = cluster_best_match(&index, &config, None);
            assert_partition(&clusters, index.len());
            assert!(clusters.iter().all(|c| c.len() <= 2), "{:?}", clusters);
        }
    }

    #[test]
    fn test_iterative_respects_max_cluster_size() {
        let entries: Vec<QuerySerp> = (0..6)
            .map(|q| QuerySerp::new(format!("same {}", q), urls("s", 0..20)))
            .collect();
        let index = OverlapIndex::build(&entries, 20);
        let config = ClusteringConfig { max_cluster_size: 3, ..Default::default() };
        let clusters = cluster_iterative(&index, &config, None);
        assert_eq!(clusters, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn test_iterative_strong_links_form_first() {
        // P-Q share 18 URLs, R shares 6 with both; the 18 level closes {P, Q}
        // before R could be considered.
        let entries = vec![
            QuerySerp::new("R", joined(&[("s", 0..6), ("r", 0..14)])),
            QuerySerp::new("P", joined(&[("s", 0..18), ("p", 0..2)])),
            QuerySerp::new("Q", joined(&[("s", 0..18), ("q", 0..2)])),
        ];
        let index = OverlapIndex::build(&entries, 20);
        let clusters = cluster_iterative(&index, &ClusteringConfig::default(), None);
        assert_eq!(clusters, vec![vec![1, 2], vec![0]]);
    }
}
