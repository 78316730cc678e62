//! Persistence seam.
//!
//! The judge never talks to a database directly. [`SubmissionStore`] owns the
//! submission state machine and [`StatsSink`] the problem/user counters;
//! [`memory::MemoryStore`] implements both in process.

pub mod memory;

use crate::config::types::Result;
use crate::core::types::{JudgeReport, Submission};
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;

/// Submission persistence. Implementations enforce
/// `pending -> judging -> terminal` and reject anything else with
/// `JudgeError::InvalidTransition`.
pub trait SubmissionStore: Send + Sync {
    fn insert(&self, submission: Submission) -> Result<()>;

    fn get(&self, id: &str) -> Result<Submission>;

    /// `pending -> judging`; returns the updated record
    fn mark_judging(&self, id: &str) -> Result<Submission>;

    /// `judging -> <report verdict>`; returns the final record
    fn complete(&self, id: &str, report: &JudgeReport) -> Result<Submission>;
}

/// Aggregate counters. Each call is one atomic update.
pub trait StatsSink: Send + Sync {
    /// Record one completed judgement for `problem_id` by `user_id`
    fn record_judged(&self, problem_id: &str, user_id: &str, accepted: bool);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemStats {
    pub total_submissions: u64,
    pub accepted_submissions: u64,
}
