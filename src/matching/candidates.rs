// src/matching/candidates.rs - Qualifying query pairs, via all-pairs scan or URL inverted index

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::matching::overlap::OverlapIndex;
use crate::utils::cluster_config::ConfigError;

/// How candidate pairs are enumerated before the threshold check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateMode {
    /// Compare every unordered pair.
    AllPairs,
    /// Only pairs sharing at least one URL. Same result, far fewer comparisons.
    #[default]
    InvertedIndex,
}

impl FromStr for CandidateMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all-pairs" | "all_pairs" | "allpairs" => Ok(CandidateMode::AllPairs),
            "inverted-index" | "inverted_index" | "index" => Ok(CandidateMode::InvertedIndex),
            other => Err(ConfigError::UnknownCandidateMode(other.to_string())),
        }
    }
}

impl fmt::Display for CandidateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateMode::AllPairs => write!(f, "all-pairs"),
            CandidateMode::InvertedIndex => write!(f, "inverted-index"),
        }
    }
}

/// A qualifying pair, `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredPair {
    pub a: usize,
    pub b: usize,
    pub overlap: usize,
}

/// URL id -> ascending query indices containing it.
#[derive(Debug, Clone)]
pub struct UrlPostings {
    postings: Vec<Vec<usize>>,
}

impl UrlPostings {
    pub fn build(index: &OverlapIndex) -> Self {
        let mut postings = vec![Vec::new(); index.url_count()];
        for q in 0..index.len() {
            for &id in index.url_ids(q) {
                postings[id as usize].push(q);
            }
        }
        Self { postings }
    }

    /// Overlap of `query` with every other query sharing a URL, ordered by
    /// query index. Only queries above `min_other` are counted.
    pub fn overlaps_for(&self, index: &OverlapIndex, query: usize, min_other: Option<usize>) -> Vec<(usize, usize)> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for &id in index.url_ids(query) {
            let posting = &self.postings[id as usize];
            let start = match min_other {
                Some(floor) => posting.partition_point(|&other| other <= floor),
                None => 0,
            };
            for &other in &posting[start..] {
                if other != query {
                    *counts.entry(other).or_insert(0) += 1;
                }
            }
        }
        let mut row: Vec<(usize, usize)> = counts.into_iter().collect();
        row.sort_unstable_by_key(|&(other, _)| other);
        row
    }
}

/// Pairs `(i, j)`, `i < j`, with overlap at least `threshold`.
///
/// `threshold` must be at least 1: the inverted index never sees pairs with
/// no shared URL. `active`, when given, restricts both endpoints to the
/// flagged queries.
/// Rows are evaluated in parallel and concatenated in row order, so the output
/// is identical across runs and across candidate modes.
pub fn qualifying_pairs(
    index: &OverlapIndex,
    threshold: usize,
    mode: CandidateMode,
    active: Option<&[bool]>,
    progress: Option<&ProgressBar>,
) -> Vec<ScoredPair> {
    debug_assert!(threshold > 0, "a zero threshold links queries sharing no URL");
    let n = index.len();
    let is_active = |q: usize| active.map_or(true, |flags| flags[q]);
    let postings = match mode {
        CandidateMode::InvertedIndex => Some(UrlPostings::build(index)),
        CandidateMode::AllPairs => None,
    };

    let rows: Vec<Vec<ScoredPair>> = (0..n)
        .into_par_iter()
        .map(|a| {
            let row = if !is_active(a) {
                Vec::new()
            } else if let Some(postings) = &postings {
                postings
                    .overlaps_for(index, a, Some(a))
                    .into_iter()
                    .filter(|&(b, overlap)| overlap >= threshold && is_active(b))
                    .map(|(b, overlap)| ScoredPair { a, b, overlap })
                    .collect()
            } else {
                ((a + 1)..n)
                    .filter(|&b| is_active(b))
                    .filter_map(|b| {
                        let overlap = index.overlap(a, b);
                        (overlap >= threshold).then_some(ScoredPair { a, b, overlap })
                    })
                    .collect()
            };
            if let Some(pb) = progress {
                pb.inc(1);
            }
            row
        })
        .collect();

    rows.into_iter().flatten().collect()
}
