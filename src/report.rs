// src/report.rs - JSON cluster assignment report handed to the export layer

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::clustering::coherence::{ClusterCoherence, ClusterStats};
use crate::clustering::run_clustering::GroupClusteringResult;
use crate::clustering::strategy::StrategyKind;
use crate::utils::cluster_config::ClusteringConfig;
use crate::utils::progress_bars::logging::{log_group_completed, log_group_failed};

#[derive(Debug, Clone, Serialize)]
pub struct ClusterReportEntry {
    pub id: usize,
    pub name: String,
    pub size: usize,
    pub members: Vec<String>,
    pub coherence: ClusterCoherence,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteringReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub group: String,
    pub strategy: StrategyKind,
    pub config: ClusteringConfig,
    pub clusters: Vec<ClusterReportEntry>,
    pub without_serp: Vec<String>,
    pub stats: ClusterStats,
    pub duration_ms: u64,
}

impl ClusteringReport {
    pub fn from_result(run_id: Uuid, result: &GroupClusteringResult, config: &ClusteringConfig) -> Self {
        let clusters = result
            .assignment
            .clusters
            .iter()
            .zip(&result.coherence)
            .map(|(cluster, coherence)| ClusterReportEntry {
                id: cluster.id,
                name: cluster.name.clone(),
                size: cluster.size(),
                members: cluster.members.clone(),
                coherence: coherence.clone(),
            })
            .collect();

        Self {
            run_id,
            generated_at: Utc::now(),
            group: result.group_name.clone(),
            strategy: result.strategy,
            config: config.clone(),
            clusters,
            without_serp: result.assignment.without_serp.clone(),
            stats: result.stats.clone(),
            duration_ms: result.duration.as_millis() as u64,
        }
    }

    /// `<dir>/<group>_<strategy>.json`, with path separators in the group
    /// name replaced.
    pub fn file_path(&self, output_dir: &Path) -> PathBuf {
        let safe_group: String = self
            .group
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') || c.is_control() { '_' } else { c })
            .collect();
        output_dir.join(format!("{}_{}.json", safe_group, self.strategy))
    }

    pub fn write_json(&self, output_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
        let path = self.file_path(output_dir);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize clustering report")?;
        fs::write(&path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("💾 Report for group '{}' written to {}", self.group, path.display());
        Ok(path)
    }
}

/// Per-run outcome counts. A group succeeds once its report is on disk, or
/// right after clustering when reports are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTally {
    pub succeeded: usize,
    pub failed: usize,
    pub total_clusters: usize,
}

impl RunTally {
    /// Records one group. A clustering or write error fails only that group.
    pub fn record(
        &mut self,
        run_id: Uuid,
        group_name: &str,
        outcome: Result<GroupClusteringResult>,
        config: &ClusteringConfig,
        output_dir: Option<&Path>,
    ) {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                self.failed += 1;
                log_group_failed(group_name, &format!("{:#}", e));
                return;
            }
        };
        let clusters = result.assignment.clusters.len();
        log_group_completed(group_name, result.strategy, clusters, result.duration);

        if let Some(dir) = output_dir {
            let report = ClusteringReport::from_result(run_id, &result, config);
            if let Err(e) = report.write_json(dir) {
                self.failed += 1;
                log_group_failed(group_name, &format!("{:#}", e));
                return;
            }
        }
        self.succeeded += 1;
        self.total_clusters += clusters;
    }
}
