// src/bin/inspect_overlap.rs - Inspect URL overlap and cluster membership for single queries

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::env;
use std::path::PathBuf;

use serp_cluster_lib::clustering::components::{explain_link_path, find_component};
use serp_cluster_lib::clustering::graph::build_similarity_graph;
use serp_cluster_lib::diagnostics::{compare_strategies, neighborhood, pair_diagnostics};
use serp_cluster_lib::matching::overlap::OverlapIndex;
use serp_cluster_lib::models::GroupSerpData;
use serp_cluster_lib::storage::{SerpSource, SqliteSerpSource};
use serp_cluster_lib::utils::cluster_config::ClusteringConfig;
use serp_cluster_lib::utils::env::load_env;

#[derive(Parser)]
#[command(author, version, about = "Inspect SERP overlap between queries of one group", long_about = None)]
struct Args {
    #[arg(long)]
    db: Option<PathBuf>,

    #[arg(long)]
    group: String,

    /// Overrides SERP_CLUSTER_MIN_COMMON_URLS
    #[arg(long)]
    min_common_urls: Option<usize>,

    #[arg(long)]
    top_n: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Shared and exclusive URLs of two queries
    Pair { query_a: String, query_b: String },
    /// Queries overlapping with one query, strongest first
    Neighbors {
        query: String,
        #[arg(long, default_value_t = 1)]
        min_overlap: usize,
    },
    /// Transitive component of a query; with --to, the chain of links between two queries
    Component {
        query: String,
        #[arg(long)]
        to: Option<String>,
    },
    /// Cluster of a query under every strategy
    Compare { query: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = Args::parse();

    let mut config = ClusteringConfig::from_env().context("Invalid SERP_CLUSTER_* environment")?;
    if let Some(v) = args.min_common_urls {
        config.min_common_urls = v;
    }
    if let Some(v) = args.top_n {
        config.top_n = v;
    }
    config.validate().context("Invalid clustering configuration")?;

    let db_path = args.db.clone().unwrap_or_else(|| {
        PathBuf::from(env::var("SERP_CLUSTER_DB").unwrap_or_else(|_| "output/master_queries.db".to_string()))
    });
    let source = SqliteSerpSource::open(&db_path)?;
    let data: GroupSerpData = source.load_group(&args.group)?;
    if data.total_queries() == 0 {
        bail!("Group '{}' has no queries in {}", args.group, db_path.display());
    }
    info!(
        "🔎 Group '{}': {} queries with SERP, {} without",
        data.group_name,
        data.with_urls.len(),
        data.without_urls.len()
    );

    match &args.command {
        Command::Pair { query_a, query_b } => {
            let Some(diag) = pair_diagnostics(&data, query_a, query_b, config.top_n) else {
                bail!("Both '{}' and '{}' need SERP data in group '{}'", query_a, query_b, args.group);
            };
            print_json(&diag)?;
        }
        Command::Neighbors { query, min_overlap } => {
            let index = OverlapIndex::build(&data.with_urls, config.top_n);
            if index.index_of(query).is_none() {
                bail!("No SERP data for '{}' in group '{}'", query, args.group);
            }
            print_json(&neighborhood(&index, query, *min_overlap))?;
        }
        Command::Component { query, to } => {
            let graph = build_similarity_graph(&data.with_urls, &config, None)?;
            match to {
                Some(target) => match explain_link_path(&graph, query, target) {
                    Some(path) => print_json(&path)?,
                    None => println!("'{}' and '{}' are not linked at {} common URLs", query, target, config.min_common_urls),
                },
                None => {
                    let mut members: Vec<String> = find_component(&graph, query).into_iter().collect();
                    if members.is_empty() {
                        bail!("No SERP data for '{}' in group '{}'", query, args.group);
                    }
                    members.sort();
                    print_json(&members)?;
                }
            }
        }
        Command::Compare { query } => {
            print_json(&compare_strategies(&data, &config, query)?)?;
        }
    }
    Ok(())
}
