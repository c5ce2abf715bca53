pub mod extractor;
pub mod url_normalizer;

pub use extractor::{extract_urls, parse_serp_entries, SerpEntry};
pub use url_normalizer::{extract_domain, normalize_url};
