// src/storage/mod.rs - Read access to stored SERP payloads per keyword group

pub mod memory;
pub mod sqlite;

use anyhow::{Context, Result};

use crate::models::GroupSerpData;
use crate::serp::extract_urls;

pub use memory::InMemorySerpSource;
pub use sqlite::SqliteSerpSource;

/// Source of raw SERP payloads. Payloads are the JSON lists stored upstream;
/// decoding and normalization happen here, not in implementations.
pub trait SerpSource: Send + Sync {
    fn list_groups(&self) -> Result<Vec<String>>;

    /// Queries of a group in storage order.
    fn list_queries(&self, group_name: &str) -> Result<Vec<String>>;

    fn serp_payload(&self, group_name: &str, query: &str) -> Result<Option<String>>;

    /// `(query, payload)` rows of a group in storage order. Implementations
    /// backed by a database should override this with a single scan.
    fn group_payloads(&self, group_name: &str) -> Result<Vec<(String, Option<String>)>> {
        self.list_queries(group_name)?
            .into_iter()
            .map(|query| {
                let payload = self.serp_payload(group_name, &query)?;
                Ok((query, payload))
            })
            .collect()
    }

    /// Normalized URLs for one query, empty when nothing usable is stored.
    fn get_urls_for(&self, group_name: &str, query: &str) -> Result<Vec<String>> {
        let payload = self.serp_payload(group_name, query)?;
        Ok(extract_urls(payload.as_deref()))
    }

    /// The whole group, split into queries with and without SERP URLs.
    fn load_group(&self, group_name: &str) -> Result<GroupSerpData> {
        let rows = self
            .group_payloads(group_name)
            .with_context(|| format!("Failed to load SERP payloads for group '{}'", group_name))?;
        Ok(GroupSerpData::from_payloads(group_name, rows))
    }
}
