// src/lib.rs
pub mod clustering;
pub mod diagnostics;
pub mod matching;
pub mod models;
pub mod report;
pub mod serp;
pub mod storage;
pub mod utils;
