// src/main.rs - Cluster keyword groups from the master_queries store and write JSON reports

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::future::join_all;
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use uuid::Uuid;

use serp_cluster_lib::clustering::run_clustering::{run_group_clustering, GroupClusteringResult};
use serp_cluster_lib::clustering::strategy::StrategyKind;
use serp_cluster_lib::matching::candidates::CandidateMode;
use serp_cluster_lib::report::RunTally;
use serp_cluster_lib::storage::{SerpSource, SqliteSerpSource};
use serp_cluster_lib::utils::cluster_config::ClusteringConfig;
use serp_cluster_lib::utils::env::load_env;
use serp_cluster_lib::utils::get_memory_usage;
use serp_cluster_lib::utils::progress_bars::logging::{log_run_completion, log_run_start};
use serp_cluster_lib::utils::progress_bars::progress_config::{add_bar, ProgressConfig, RUN_BAR_TEMPLATE};

const DEFAULT_DB_PATH: &str = "output/master_queries.db";
const DEFAULT_MAX_PARALLEL_GROUPS: usize = 4;

#[derive(Parser)]
#[command(author, version, about = "Cluster search queries by SERP URL overlap", long_about = None)]
struct Args {
    /// SQLite database with the master_queries table (default: $SERP_CLUSTER_DB or output/master_queries.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Group to cluster; repeat for several. All groups when omitted.
    #[arg(long = "group")]
    groups: Vec<String>,

    /// transitive, best-match or iterative
    #[arg(long)]
    strategy: Option<StrategyKind>,

    #[arg(long)]
    min_common_urls: Option<usize>,

    #[arg(long)]
    top_n: Option<usize>,

    #[arg(long)]
    strong_link_multiplier: Option<usize>,

    /// Let strongly bonded pairs absorb weaker queries
    #[arg(long)]
    no_strong_pair_protection: bool,

    /// all-pairs or inverted-index
    #[arg(long)]
    candidate_mode: Option<CandidateMode>,

    #[arg(long)]
    iterative_min_threshold: Option<usize>,

    #[arg(long)]
    iterative_max_threshold: Option<usize>,

    #[arg(long)]
    max_cluster_size: Option<usize>,

    /// Groups clustered at the same time (default: $SERP_CLUSTER_MAX_PARALLEL_GROUPS or 4)
    #[arg(long)]
    max_parallel_groups: Option<usize>,

    #[arg(long, default_value = "output/clusters")]
    output_dir: PathBuf,

    /// Cluster and log, but do not write reports
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    /// CLI flags win over environment values.
    fn apply_overrides(&self, config: &mut ClusteringConfig) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(v) = self.min_common_urls {
            config.min_common_urls = v;
        }
        if let Some(v) = self.top_n {
            config.top_n = v;
        }
        if let Some(v) = self.strong_link_multiplier {
            config.strong_link_multiplier = v;
        }
        if self.no_strong_pair_protection {
            config.protect_strong_pairs = false;
        }
        if let Some(mode) = self.candidate_mode {
            config.candidate_mode = mode;
        }
        if let Some(v) = self.iterative_min_threshold {
            config.iterative_min_threshold = v;
        }
        if let Some(v) = self.iterative_max_threshold {
            config.iterative_max_threshold = v;
        }
        if let Some(v) = self.max_cluster_size {
            config.max_cluster_size = v;
        }
    }

    fn db_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(|| {
            env::var("SERP_CLUSTER_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH))
        })
    }

    fn parallel_groups(&self) -> usize {
        self.max_parallel_groups
            .or_else(|| {
                env::var("SERP_CLUSTER_MAX_PARALLEL_GROUPS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(DEFAULT_MAX_PARALLEL_GROUPS)
            .max(1)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and environment
    env_logger::init();
    load_env();
    let args = Args::parse();
    info!("Starting SERP query clustering");

    let mut config = ClusteringConfig::from_env().context("Invalid SERP_CLUSTER_* environment")?;
    args.apply_overrides(&mut config);
    config.validate().context("Invalid clustering configuration")?;
    config.log_config();

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );
    let multi_progress = progress_config.create_multi_progress();

    let db_path = args.db_path();
    let source = Arc::new(SqliteSerpSource::open(&db_path)?);
    let groups = if args.groups.is_empty() {
        source.list_groups()?
    } else {
        args.groups.clone()
    };
    if groups.is_empty() {
        warn!("No keyword groups found in {}, nothing to do", db_path.display());
        return Ok(());
    }

    let run_id = Uuid::new_v4();
    let run_start = Instant::now();
    let max_parallel = args.parallel_groups();
    log_run_start(&run_id.to_string(), groups.len(), max_parallel);

    let main_pb = add_bar(
        multi_progress.as_ref(),
        groups.len() as u64,
        RUN_BAR_TEMPLATE,
        "Clustering groups...",
    );
    let group_progress = if progress_config.should_show_detailed() {
        multi_progress.clone()
    } else {
        None
    };

    let semaphore = Arc::new(Semaphore::new(max_parallel));
    let config = Arc::new(config);
    let mut tasks = Vec::with_capacity(groups.len());

    for group_name in groups {
        let source = Arc::clone(&source);
        let config = Arc::clone(&config);
        let semaphore = Arc::clone(&semaphore);
        let group_progress = group_progress.clone();
        let main_pb = main_pb.clone();

        tasks.push(tokio::spawn(async move {
            let outcome: Result<GroupClusteringResult> = async {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .context("Group scheduler closed")?;
                let name = group_name.clone();
                tokio::task::spawn_blocking(move || {
                    run_group_clustering(source.as_ref(), &name, &config, group_progress.as_ref())
                })
                .await
                .context("Clustering task panicked")?
            }
            .await;
            if let Some(pb) = &main_pb {
                pb.inc(1);
            }
            (group_name, outcome)
        }));
    }

    let output_dir = (!args.dry_run).then_some(args.output_dir.as_path());
    let mut tally = RunTally::default();
    for joined in join_all(tasks).await {
        let (group_name, outcome) = joined.context("Group task aborted")?;
        tally.record(run_id, &group_name, outcome, &config, output_dir);
    }

    if let Some(pb) = &main_pb {
        let message = if progress_config.should_show_memory() {
            format!("Done ({} MB used)", get_memory_usage())
        } else {
            "Done".to_string()
        };
        pb.finish_with_message(message);
    }

    log_run_completion(
        &run_id.to_string(),
        run_start.elapsed(),
        tally.succeeded,
        tally.failed,
        tally.total_clusters,
    );
    if tally.failed > 0 {
        bail!("{} of {} groups failed", tally.failed, tally.succeeded + tally.failed);
    }
    Ok(())
}
