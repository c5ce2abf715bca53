// src/matching/overlap.rs - Top-N SERP URL overlap between queries

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::QuerySerp;

/// Number of distinct URLs shared by the first `top_n` entries of each list.
///
/// Duplicates inside one list count once. Symmetric, and bounded by
/// `min(top_n, |a|, |b|)`.
pub fn overlap_count<S: AsRef<str>>(urls_a: &[S], urls_b: &[S], top_n: usize) -> usize {
    let set_a: HashSet<&str> = urls_a.iter().take(top_n).map(AsRef::as_ref).collect();
    let set_b: HashSet<&str> = urls_b.iter().take(top_n).map(AsRef::as_ref).collect();
    set_a.intersection(&set_b).count()
}

/// The shared URLs themselves, sorted, for diagnostics.
pub fn common_urls<S: AsRef<str>>(urls_a: &[S], urls_b: &[S], top_n: usize) -> BTreeSet<String> {
    let set_a: HashSet<&str> = urls_a.iter().take(top_n).map(AsRef::as_ref).collect();
    urls_b
        .iter()
        .take(top_n)
        .map(AsRef::as_ref)
        .filter(|u| set_a.contains(u))
        .map(str::to_string)
        .collect()
}

/// Per-group overlap lookup.
///
/// Every top-N URL is interned to a `u32` id and each query keeps a sorted,
/// deduplicated id list, so `overlap(i, j)` is a linear merge with no
/// hashing. Positions follow first appearance in the input slice.
#[derive(Debug, Clone, Default)]
pub struct OverlapIndex {
    top_n: usize,
    queries: Vec<String>,
    position: HashMap<String, usize>,
    url_ids: Vec<Vec<u32>>,
    urls: Vec<String>,
}

impl OverlapIndex {
    /// A query listed twice keeps its first entry; later ones are skipped.
    pub fn build(entries: &[QuerySerp], top_n: usize) -> Self {
        let mut url_to_id: HashMap<&str, u32> = HashMap::new();
        let mut index = OverlapIndex {
            top_n,
            queries: Vec::with_capacity(entries.len()),
            position: HashMap::with_capacity(entries.len()),
            url_ids: Vec::with_capacity(entries.len()),
            urls: Vec::new(),
        };

        for entry in entries {
            if index.position.contains_key(&entry.query) {
                continue;
            }
            let mut ids: Vec<u32> = entry
                .urls
                .iter()
                .take(top_n)
                .map(|url| {
                    *url_to_id.entry(url.as_str()).or_insert_with(|| {
                        index.urls.push(url.clone());
                        (index.urls.len() - 1) as u32
                    })
                })
                .collect();
            ids.sort_unstable();
            ids.dedup();

            index.position.insert(entry.query.clone(), index.queries.len());
            index.queries.push(entry.query.clone());
            index.url_ids.push(ids);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn query(&self, idx: usize) -> &str {
        &self.queries[idx]
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn index_of(&self, query: &str) -> Option<usize> {
        self.position.get(query).copied()
    }

    /// Sorted interned ids of the query's top-N URLs.
    pub fn url_ids(&self, idx: usize) -> &[u32] {
        &self.url_ids[idx]
    }

    pub fn url(&self, id: u32) -> &str {
        &self.urls[id as usize]
    }

    /// Number of distinct URLs interned across the group.
    pub fn url_count(&self) -> usize {
        self.urls.len()
    }

    pub fn overlap(&self, a: usize, b: usize) -> usize {
        sorted_intersection_count(&self.url_ids[a], &self.url_ids[b])
    }

    pub fn overlap_by_query(&self, query_a: &str, query_b: &str) -> Option<usize> {
        Some(self.overlap(self.index_of(query_a)?, self.index_of(query_b)?))
    }

    /// Shared URLs of two queries, in id order.
    pub fn shared_urls(&self, a: usize, b: usize) -> Vec<&str> {
        let (left, right) = (&self.url_ids[a], &self.url_ids[b]);
        let (mut i, mut j) = (0, 0);
        let mut shared = Vec::new();
        while i < left.len() && j < right.len() {
            match left[i].cmp(&right[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared.push(self.url(left[i]));
                    i += 1;
                    j += 1;
                }
            }
        }
        shared
    }
}

fn sorted_intersection_count(left: &[u32], right: &[u32]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}
