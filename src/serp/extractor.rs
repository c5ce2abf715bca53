// src/serp/extractor.rs - Ordered URL lists from stored SERP payloads

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::serp::url_normalizer::{extract_domain, normalize_url};

/// One ranked document returned by the SERP source for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerpEntry {
    pub url: String,
    #[serde(default)]
    pub domain: String,
    /// 1-based rank
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub title: String,
}

/// Pulls the raw URL out of one payload item. Objects carry it in `url`
/// (older payloads used `link`), bare strings are the URL itself.
fn item_url(item: &Value) -> Option<&str> {
    let url = match item {
        Value::Object(map) => map
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .or_else(|| map.get("link").and_then(Value::as_str)),
        Value::String(s) => Some(s.as_str()),
        _ => None,
    };
    url.filter(|u| !u.trim().is_empty())
}

fn payload_items(serp_payload: Option<&str>) -> Vec<Value> {
    let raw = match serp_payload.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Vec::new(),
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            debug!("SERP payload is not a list (got {}), treating as empty", type_name(&other));
            Vec::new()
        }
        Err(e) => {
            debug!("SERP payload is not valid JSON ({}), treating as empty", e);
            Vec::new()
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extracts the ordered, normalized URL list from a JSON-encoded SERP payload.
///
/// Missing, empty, malformed or non-list payloads yield an empty list. Items
/// without a usable URL are skipped; duplicates are kept.
pub fn extract_urls(serp_payload: Option<&str>) -> Vec<String> {
    payload_items(serp_payload)
        .iter()
        .filter_map(item_url)
        .map(normalize_url)
        .collect()
}

/// Full entries for diagnostics. URLs are left as returned upstream; a missing
/// domain is derived from the URL and a missing position from the list order.
pub fn parse_serp_entries(serp_payload: Option<&str>) -> Vec<SerpEntry> {
    payload_items(serp_payload)
        .iter()
        .filter_map(|item| {
            let url = item_url(item)?.to_string();
            let field = |name: &str| {
                item.get(name)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_default()
            };
            let domain = match field("domain") {
                d if d.is_empty() => extract_domain(&url),
                d => d,
            };
            let position = item
                .get("position")
                .and_then(Value::as_u64)
                .map(|p| p as u32)
                .unwrap_or(0);
            Some(SerpEntry {
                url,
                domain,
                position,
                title: field("title"),
            })
        })
        .enumerate()
        .map(|(idx, mut entry)| {
            if entry.position == 0 {
                entry.position = idx as u32 + 1;
            }
            entry
        })
        .collect()
}
