pub mod candidates;
pub mod overlap;

pub use candidates::{qualifying_pairs, CandidateMode, ScoredPair, UrlPostings};
pub use overlap::{common_urls, overlap_count, OverlapIndex};
