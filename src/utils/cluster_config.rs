//! Clustering parameters, loaded from `SERP_CLUSTER_*` environment variables
//! and validated before any group is processed.

use log::{debug, info};
use serde::Serialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::clustering::strategy::StrategyKind;
use crate::matching::candidates::CandidateMode;

pub const DEFAULT_MIN_COMMON_URLS: usize = 7;
pub const DEFAULT_TOP_N: usize = 20;
pub const DEFAULT_STRONG_LINK_MULTIPLIER: usize = 2;
pub const DEFAULT_ITERATIVE_MIN_THRESHOLD: usize = 4;
pub const DEFAULT_ITERATIVE_MAX_THRESHOLD: usize = 20;
pub const DEFAULT_MAX_CLUSTER_SIZE: usize = 100;
pub const DEFAULT_LARGE_GROUP_WARN_THRESHOLD: usize = 5000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("top_n must be positive")]
    ZeroTopN,
    #[error("{name} must be at least 1")]
    ZeroThreshold { name: &'static str },
    #[error("{name} = {threshold} exceeds top_n = {top_n}, no pair could ever qualify")]
    ThresholdAboveTopN {
        name: &'static str,
        threshold: usize,
        top_n: usize,
    },
    #[error("strong_link_multiplier must be at least 1")]
    ZeroMultiplier,
    #[error("iterative range is inverted: min {min} > max {max}")]
    InvertedIterativeRange { min: usize, max: usize },
    #[error("max_cluster_size = {0} cannot hold a pair, it must be at least 2")]
    MaxClusterSizeBelowPair(usize),
    #[error("cannot parse {var}={value:?}")]
    Unparsable { var: String, value: String },
    #[error("unknown clustering strategy {0:?} (expected transitive, best-match or iterative)")]
    UnknownStrategy(String),
    #[error("unknown candidate mode {0:?} (expected all-pairs or inverted-index)")]
    UnknownCandidateMode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusteringConfig {
    /// Overlap a pair needs to be linked (Mode A) or admitted (best-match).
    pub min_common_urls: usize,
    /// Leading SERP positions compared per query.
    pub top_n: usize,
    /// A two-member cluster whose bond reaches `threshold * multiplier` only
    /// admits newcomers at that strength.
    pub strong_link_multiplier: usize,
    pub protect_strong_pairs: bool,
    pub strategy: StrategyKind,
    pub candidate_mode: CandidateMode,
    pub iterative_min_threshold: usize,
    pub iterative_max_threshold: usize,
    /// Cap applied by the incremental strategies only.
    pub max_cluster_size: usize,
    pub large_group_warn_threshold: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_common_urls: DEFAULT_MIN_COMMON_URLS,
            top_n: DEFAULT_TOP_N,
            strong_link_multiplier: DEFAULT_STRONG_LINK_MULTIPLIER,
            protect_strong_pairs: true,
            strategy: StrategyKind::default(),
            candidate_mode: CandidateMode::default(),
            iterative_min_threshold: DEFAULT_ITERATIVE_MIN_THRESHOLD,
            iterative_max_threshold: DEFAULT_ITERATIVE_MAX_THRESHOLD,
            max_cluster_size: DEFAULT_MAX_CLUSTER_SIZE,
            large_group_warn_threshold: DEFAULT_LARGE_GROUP_WARN_THRESHOLD,
        }
    }
}

fn env_or<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| ConfigError::Unparsable {
            var: var.to_string(),
            value: raw,
        }),
        _ => Ok(default),
    }
}

impl ClusteringConfig {
    /// Reads `SERP_CLUSTER_*` variables, falling back to defaults for unset
    /// ones. Call `load_env()` first so `.env` values are visible.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            min_common_urls: env_or("SERP_CLUSTER_MIN_COMMON_URLS", defaults.min_common_urls)?,
            top_n: env_or("SERP_CLUSTER_TOP_N", defaults.top_n)?,
            strong_link_multiplier: env_or(
                "SERP_CLUSTER_STRONG_LINK_MULTIPLIER",
                defaults.strong_link_multiplier,
            )?,
            protect_strong_pairs: env_or(
                "SERP_CLUSTER_PROTECT_STRONG_PAIRS",
                defaults.protect_strong_pairs,
            )?,
            strategy: env_or("SERP_CLUSTER_STRATEGY", defaults.strategy)?,
            candidate_mode: env_or("SERP_CLUSTER_CANDIDATE_MODE", defaults.candidate_mode)?,
            iterative_min_threshold: env_or(
                "SERP_CLUSTER_ITERATIVE_MIN_THRESHOLD",
                defaults.iterative_min_threshold,
            )?,
            iterative_max_threshold: env_or(
                "SERP_CLUSTER_ITERATIVE_MAX_THRESHOLD",
                defaults.iterative_max_threshold,
            )?,
            max_cluster_size: env_or("SERP_CLUSTER_MAX_CLUSTER_SIZE", defaults.max_cluster_size)?,
            large_group_warn_threshold: env_or(
                "SERP_CLUSTER_LARGE_GROUP_WARN",
                defaults.large_group_warn_threshold,
            )?,
        };
        debug!("Clustering config from env: {:?}", config);
        Ok(config)
    }

    /// Rejects parameter combinations that cannot produce a meaningful
    /// partition. An iterative max above `top_n` is allowed and simply starts
    /// the descent at `top_n`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }
        if self.min_common_urls == 0 {
            return Err(ConfigError::ZeroThreshold { name: "min_common_urls" });
        }
        if self.min_common_urls > self.top_n {
            return Err(ConfigError::ThresholdAboveTopN {
                name: "min_common_urls",
                threshold: self.min_common_urls,
                top_n: self.top_n,
            });
        }
        if self.strong_link_multiplier == 0 {
            return Err(ConfigError::ZeroMultiplier);
        }
        if self.iterative_min_threshold == 0 {
            return Err(ConfigError::ZeroThreshold { name: "iterative_min_threshold" });
        }
        if self.iterative_min_threshold > self.iterative_max_threshold {
            return Err(ConfigError::InvertedIterativeRange {
                min: self.iterative_min_threshold,
                max: self.iterative_max_threshold,
            });
        }
        if self.iterative_min_threshold > self.top_n {
            return Err(ConfigError::ThresholdAboveTopN {
                name: "iterative_min_threshold",
                threshold: self.iterative_min_threshold,
                top_n: self.top_n,
            });
        }
        // Best-match opens clusters as pairs.
        if self.max_cluster_size < 2 {
            return Err(ConfigError::MaxClusterSizeBelowPair(self.max_cluster_size));
        }
        Ok(())
    }

    /// Overlap at which a two-member cluster counts as a strong pair.
    pub fn strong_threshold(&self, threshold: usize) -> usize {
        threshold.saturating_mul(self.strong_link_multiplier)
    }

    /// Iterative thresholds, strongest first.
    pub fn iterative_thresholds(&self) -> impl Iterator<Item = usize> {
        let top = self.iterative_max_threshold.min(self.top_n);
        (self.iterative_min_threshold..=top).rev()
    }

    pub fn log_config(&self) {
        info!("⚙️  Clustering configuration:");
        info!("   • Strategy: {} (candidates: {})", self.strategy, self.candidate_mode);
        info!(
            "   • Top-{} URLs compared, link threshold {} common URLs",
            self.top_n, self.min_common_urls
        );
        if self.protect_strong_pairs {
            info!(
                "   • Strong pairs protected at {}x threshold",
                self.strong_link_multiplier
            );
        } else {
            info!("   • Strong pair protection DISABLED");
        }
        if self.strategy != StrategyKind::Transitive {
            info!(
                "   • Iterative range {}..={}, max cluster size {}",
                self.iterative_min_threshold, self.iterative_max_threshold, self.max_cluster_size
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClusteringConfig::default();
        assert_eq!(config.min_common_urls, 7);
        assert_eq!(config.top_n, 20);
        assert_eq!(config.strategy, StrategyKind::Transitive);
        assert_eq!(config.candidate_mode, CandidateMode::InvertedIndex);
        assert!(config.validate().is_ok());
        assert_eq!(config.strong_threshold(7), 14);
    }

    #[test]
    fn test_validation_errors() {
        let base = ClusteringConfig::default();

        let config = ClusteringConfig { top_n: 0, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTopN));

        let config = ClusteringConfig { min_common_urls: 0, ..base.clone() };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroThreshold { .. })));

        let config = ClusteringConfig { min_common_urls: 21, ..base.clone() };
        assert!(matches!(config.validate(), Err(ConfigError::ThresholdAboveTopN { .. })));

        let config = ClusteringConfig { strong_link_multiplier: 0, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMultiplier));

        let config = ClusteringConfig {
            iterative_min_threshold: 9,
            iterative_max_threshold: 5,
            ..base.clone()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedIterativeRange { min: 9, max: 5 })
        );

        let config = ClusteringConfig { max_cluster_size: 0, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::MaxClusterSizeBelowPair(0)));

        let config = ClusteringConfig { max_cluster_size: 1, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::MaxClusterSizeBelowPair(1)));

        let config = ClusteringConfig { max_cluster_size: 2, ..base };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_iterative_thresholds_descend_and_clamp() {
        let config = ClusteringConfig {
            top_n: 10,
            iterative_min_threshold: 4,
            iterative_max_threshold: 20,
            ..Default::default()
        };
        assert_eq!(config.iterative_thresholds().collect::<Vec<_>>(), vec![10, 9, 8, 7, 6, 5, 4]);
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("SERP_CLUSTER_MIN_COMMON_URLS", "5");
        env::set_var("SERP_CLUSTER_TOP_N", "10");
        env::set_var("SERP_CLUSTER_STRATEGY", "best-match");
        env::set_var("SERP_CLUSTER_CANDIDATE_MODE", "all-pairs");
        env::set_var("SERP_CLUSTER_PROTECT_STRONG_PAIRS", "false");

        let config = ClusteringConfig::from_env().unwrap();
        assert_eq!(config.min_common_urls, 5);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.strategy, StrategyKind::BestMatch);
        assert_eq!(config.candidate_mode, CandidateMode::AllPairs);
        assert!(!config.protect_strong_pairs);
        assert_eq!(config.max_cluster_size, DEFAULT_MAX_CLUSTER_SIZE);

        env::set_var("SERP_CLUSTER_MIN_COMMON_URLS", "seven");
        assert!(matches!(
            ClusteringConfig::from_env(),
            Err(ConfigError::Unparsable { .. })
        ));

        // Cleanup
        env::remove_var("SERP_CLUSTER_MIN_COMMON_URLS");
        env::remove_var("SERP_CLUSTER_TOP_N");
        env::remove_var("SERP_CLUSTER_STRATEGY");
        env::remove_var("SERP_CLUSTER_CANDIDATE_MODE");
        env::remove_var("SERP_CLUSTER_PROTECT_STRONG_PAIRS");
    }
}
