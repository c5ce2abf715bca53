// src/utils/progress_bars/logging.rs - Logging helpers for group clustering runs
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};

use crate::clustering::coherence::ClusterStats;
use crate::clustering::strategy::StrategyKind;

/// Per-group logger: every line carries the group, the strategy and the
/// elapsed time since the group started.
#[derive(Clone)]
pub struct ClusteringLogger {
    group_name: String,
    strategy_label: &'static str,
    strategy_emoji: &'static str,
    start_time: Instant,
}

impl ClusteringLogger {
    pub fn new(group_name: &str, strategy: StrategyKind) -> Self {
        Self {
            group_name: group_name.to_string(),
            strategy_label: strategy.label(),
            strategy_emoji: strategy.emoji(),
            start_time: Instant::now(),
        }
    }

    fn prefix(&self) -> String {
        format!("[{}|{}] {}", self.group_name, self.strategy_label, self.strategy_emoji)
    }

    pub fn log_start(&self, min_common_urls: usize, top_n: usize) {
        info!(
            "{} 🚀 Clustering group (threshold {} of top-{} URLs)",
            self.prefix(),
            min_common_urls,
            top_n
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "{} 🔄 Phase: {} - {} [+{:.1}s]",
                self.prefix(),
                phase,
                details,
                elapsed.as_secs_f32()
            ),
            None => info!(
                "{} 🔄 Phase: {} [+{:.1}s]",
                self.prefix(),
                phase,
                elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_data_loaded(&self, with_serp: usize, without_serp: usize) {
        info!(
            "{} 📊 Loaded {} queries with SERP data",
            self.prefix(),
            with_serp
        );
        if without_serp > 0 {
            warn!(
                "{} ⚠️  {} queries have no usable SERP data and are excluded",
                self.prefix(),
                without_serp
            );
        }
    }

    pub fn log_index_built(&self, queries: usize, distinct_urls: usize) {
        debug!(
            "{} 🔍 Overlap index: {} queries, {} distinct top-N URLs",
            self.prefix(),
            queries,
            distinct_urls
        );
    }

    pub fn log_large_group(&self, queries: usize, warn_threshold: usize) {
        warn!(
            "{} ⚠️  Large group: {} queries (warn threshold {}), pair evaluation may take a while",
            self.prefix(),
            queries,
            warn_threshold
        );
    }

    pub fn log_completion(&self, stats: &ClusterStats) {
        let duration = self.start_time.elapsed();
        info!(
            "{} 🎉 COMPLETED: {} clusters from {} queries in {:.2?}",
            self.prefix(),
            stats.total_clusters,
            stats.clustered_queries,
            duration
        );
        info!(
            "{} 📊 Sizes: avg {:.2}, min {}, max {}, {} singletons",
            self.prefix(),
            stats.avg_cluster_size,
            stats.min_cluster_size,
            stats.max_cluster_size,
            stats.singleton_clusters
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!("{} ⚠️  {}", self.prefix(), message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("{} {}", self.prefix(), message);
    }

    pub fn get_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

// Run-level logging functions

pub fn log_run_start(run_id: &str, group_count: usize, max_parallel_groups: usize) {
    info!("🚀 ===== SERP CLUSTERING RUN STARTING =====");
    info!("📅 Run ID: {}", run_id);
    info!("   • {} groups queued", group_count);
    info!("   • Up to {} groups clustered in parallel", max_parallel_groups);
    info!("==========================================");
}

pub fn log_group_completed(group_name: &str, strategy: StrategyKind, clusters: usize, duration: Duration) {
    info!(
        "✅ [{}] {} {} clustering completed in {:.2?}: {} clusters",
        group_name,
        strategy.emoji(),
        strategy.label(),
        duration,
        clusters
    );
}

pub fn log_group_failed(group_name: &str, error: &str) {
    error!("❌ [{}] clustering failed: {}", group_name, error);
}

pub fn log_run_completion(run_id: &str, duration: Duration, succeeded: usize, failed: usize, total_clusters: usize) {
    info!("🎉 ===== SERP CLUSTERING RUN COMPLETED =====");
    info!("📅 Run ID: {}", run_id);
    info!("⏱️  Total Duration: {:.2?}", duration);
    info!("🎯 Groups: {} succeeded, {} failed", succeeded, failed);
    info!("📦 Total clusters written: {}", total_clusters);
    info!("===========================================");
}
