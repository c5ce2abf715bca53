// src/serp/url_normalizer.rs - Canonical comparison keys for SERP URLs

use once_cell::sync::Lazy;
use regex::Regex;

/// Scheme and `www.` prefixes, matched case-insensitively and repeatedly so
/// that `normalize_url` stays idempotent on inputs like `https://www.https://x`.
/// Whitespace between and after the prefixes goes with them.
static LEADING_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:\s*(?:https?://|www\.))*\s*").unwrap());

/// Normalizes a raw SERP URL into a comparison key.
///
/// Strips the protocol and a leading `www.`, drops the query string and the
/// fragment, removes trailing slashes and lower-cases the rest. The transform
/// is lossy and never fails: empty input gives an empty key.
pub fn normalize_url(raw_url: &str) -> String {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let without_prefix = LEADING_NOISE.replace(trimmed, "");
    let without_query = without_prefix
        .split('?')
        .next()
        .unwrap_or_default()
        .split('#')
        .next()
        .unwrap_or_default();

    without_query
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace())
        .to_lowercase()
}

/// Host part of a URL after normalization (`https://www.Site.ru/a/b` -> `site.ru`).
pub fn extract_domain(raw_url: &str) -> String {
    normalize_url(raw_url)
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
