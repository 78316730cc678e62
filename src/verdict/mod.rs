//! Verdict classification
//!
//! Derives per-case and compile verdicts as pure functions over run outcomes.

pub mod verdict;
