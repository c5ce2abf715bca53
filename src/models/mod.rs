// src/models/mod.rs - Core data carried between the storage, matching and clustering layers

use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::serp::extract_urls;

/// A query together with its ordered, normalized SERP URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySerp {
    pub query: String,
    pub urls: Vec<String>,
}

impl QuerySerp {
    pub fn new(query: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            query: query.into(),
            urls,
        }
    }
}

/// All queries of one group, split by whether SERP URLs are available.
#[derive(Debug, Clone, Default)]
pub struct GroupSerpData {
    pub group_name: String,
    pub with_urls: Vec<QuerySerp>,
    /// Queries to hand back to the caller, e.g. for a SERP re-fetch.
    pub without_urls: Vec<String>,
}

impl GroupSerpData {
    /// Builds group data from raw `(query, payload)` rows. Rows keep their
    /// order; a query seen twice keeps its first row.
    pub fn from_payloads<I>(group_name: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut seen = HashSet::new();
        let mut data = GroupSerpData {
            group_name: group_name.to_string(),
            ..Default::default()
        };

        for (query, payload) in rows {
            if !seen.insert(query.clone()) {
                debug!("Group '{}': duplicate query '{}' ignored", group_name, query);
                continue;
            }
            let urls = extract_urls(payload.as_deref());
            if urls.is_empty() {
                data.without_urls.push(query);
            } else {
                data.with_urls.push(QuerySerp { query, urls });
            }
        }
        data
    }

    pub fn total_queries(&self) -> usize {
        self.with_urls.len() + self.without_urls.len()
    }
}

/// A final cluster. `name` is the first member, as shown in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub id: usize,
    pub name: String,
    pub members: Vec<String>,
}

impl Cluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Query -> cluster mapping handed to the export layer.
#[derive(Debug, Clone, Default)]
pub struct ClusterAssignment {
    pub clusters: Vec<Cluster>,
    pub query_to_cluster: HashMap<String, usize>,
    pub without_serp: Vec<String>,
}

impl ClusterAssignment {
    /// Ids are assigned in list order; empty lists are dropped.
    pub fn from_member_lists(member_lists: Vec<Vec<String>>, without_serp: Vec<String>) -> Self {
        let mut assignment = ClusterAssignment {
            without_serp,
            ..Default::default()
        };

        for members in member_lists.into_iter().filter(|m| !m.is_empty()) {
            let id = assignment.clusters.len();
            for query in &members {
                assignment.query_to_cluster.insert(query.clone(), id);
            }
            assignment.clusters.push(Cluster {
                id,
                name: members[0].clone(),
                members,
            });
        }
        assignment
    }

    pub fn cluster_id(&self, query: &str) -> Option<usize> {
        self.query_to_cluster.get(query).copied()
    }

    pub fn cluster_of(&self, query: &str) -> Option<&Cluster> {
        self.cluster_id(query).map(|id| &self.clusters[id])
    }

    pub fn same_cluster(&self, query_a: &str, query_b: &str) -> bool {
        match (self.cluster_id(query_a), self.cluster_id(query_b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn clustered_queries(&self) -> usize {
        self.query_to_cluster.len()
    }
}
