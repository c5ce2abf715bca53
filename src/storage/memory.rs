// src/storage/memory.rs

use anyhow::Result;
use std::collections::BTreeMap;

use crate::storage::SerpSource;

/// Payloads held in memory, grouped and kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemorySerpSource {
    groups: BTreeMap<String, Vec<(String, Option<String>)>>,
}

impl InMemorySerpSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the payload of one query.
    pub fn insert(&mut self, group_name: &str, query: &str, payload: Option<&str>) {
        let rows = self.groups.entry(group_name.to_string()).or_default();
        let payload = payload.map(str::to_string);
        match rows.iter_mut().find(|(q, _)| q == query) {
            Some(row) => row.1 = payload,
            None => rows.push((query.to_string(), payload)),
        }
    }

    /// Builder form of [`insert`](Self::insert) storing a plain URL list.
    pub fn with_urls(mut self, group_name: &str, query: &str, urls: &[&str]) -> Self {
        let payload = serde_json::to_string(urls).unwrap_or_else(|_| "[]".to_string());
        self.insert(group_name, query, Some(&payload));
        self
    }
}

impl SerpSource for InMemorySerpSource {
    fn list_groups(&self) -> Result<Vec<String>> {
        Ok(self.groups.keys().cloned().collect())
    }

    fn list_queries(&self, group_name: &str) -> Result<Vec<String>> {
        Ok(self
            .groups
            .get(group_name)
            .map(|rows| rows.iter().map(|(q, _)| q.clone()).collect())
            .unwrap_or_default())
    }

    fn serp_payload(&self, group_name: &str, query: &str) -> Result<Option<String>> {
        Ok(self
            .groups
            .get(group_name)
            .and_then(|rows| rows.iter().find(|(q, _)| q == query))
            .and_then(|(_, payload)| payload.clone()))
    }
}
