// src/clustering/strategy.rs - Named clustering strategies behind one interface

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clustering::components::component_indices;
use crate::clustering::graph::build_from_index;
use crate::clustering::incremental::{cluster_best_match, cluster_iterative};
use crate::matching::overlap::OverlapIndex;
use crate::utils::cluster_config::{ClusteringConfig, ConfigError};

/// Turns an interned group into clusters of query indices. Every index
/// appears in exactly one returned cluster.
pub trait ClusteringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn cluster(
        &self,
        index: &OverlapIndex,
        config: &ClusteringConfig,
        progress: Option<&ProgressBar>,
    ) -> Vec<Vec<usize>>;
}

/// Connected components of the similarity graph. Chains of pairwise links
/// merge, so two members may share no URL at all.
pub struct TransitiveClosure;

impl ClusteringStrategy for TransitiveClosure {
    fn name(&self) -> &'static str {
        "transitive"
    }

    fn cluster(&self, index: &OverlapIndex, config: &ClusteringConfig, progress: Option<&ProgressBar>) -> Vec<Vec<usize>> {
        let graph = build_from_index(index, config, progress);
        component_indices(&graph)
    }
}

pub struct BestMatchClique;

impl ClusteringStrategy for BestMatchClique {
    fn name(&self) -> &'static str {
        "best-match"
    }

    fn cluster(&self, index: &OverlapIndex, config: &ClusteringConfig, progress: Option<&ProgressBar>) -> Vec<Vec<usize>> {
        cluster_best_match(index, config, progress)
    }
}

pub struct IterativeThreshold;

impl ClusteringStrategy for IterativeThreshold {
    fn name(&self) -> &'static str {
        "iterative"
    }

    fn cluster(&self, index: &OverlapIndex, config: &ClusteringConfig, progress: Option<&ProgressBar>) -> Vec<Vec<usize>> {
        cluster_iterative(index, config, progress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    Transitive,
    BestMatch,
    Iterative,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Transitive,
        StrategyKind::BestMatch,
        StrategyKind::Iterative,
    ];

    pub fn strategy(self) -> Box<dyn ClusteringStrategy> {
        match self {
            StrategyKind::Transitive => Box::new(TransitiveClosure),
            StrategyKind::BestMatch => Box::new(BestMatchClique),
            StrategyKind::Iterative => Box::new(IterativeThreshold),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::Transitive => "TRANSITIVE",
            StrategyKind::BestMatch => "BEST-MATCH",
            StrategyKind::Iterative => "ITERATIVE",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            StrategyKind::Transitive => "🕸️",
            StrategyKind::BestMatch => "🎯",
            StrategyKind::Iterative => "🪜",
        }
    }

    /// Whether every cluster is guaranteed to be a clique at its threshold.
    pub fn is_clique_preserving(self) -> bool {
        !matches!(self, StrategyKind::Transitive)
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transitive" | "graph" | "components" => Ok(StrategyKind::Transitive),
            "best-match" | "best_match" | "no-transitive" | "clique" => Ok(StrategyKind::BestMatch),
            "iterative" => Ok(StrategyKind::Iterative),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strategy().name())
    }
}
