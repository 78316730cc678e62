//! Judging strategies.
//!
//! A strategy turns one submission plus its problem and test cases into a
//! terminal [`JudgeReport`]. Strategies never touch submission status; the
//! orchestrator owns every transition.

pub mod ai;
pub mod traditional;

use crate::config::types::Result;
use crate::core::types::{JudgeReport, Problem, StrategyKind, Submission, TestCase};

pub use ai::AiJudge;
pub use traditional::TraditionalJudge;

/// Everything a strategy may read about one judgement
#[derive(Debug, Clone, Copy)]
pub struct JudgeTask<'a> {
    pub submission: &'a Submission,
    pub problem: &'a Problem,
    pub test_cases: &'a [TestCase],
}

impl JudgeTask<'_> {
    pub fn total_points(&self) -> u32 {
        self.test_cases.iter().map(|case| case.points).sum()
    }
}

pub trait JudgeStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Per-case and compile failures are reported in the returned report.
    /// `Err` means the strategy could not produce a verdict at all.
    fn judge(&self, task: &JudgeTask<'_>) -> Result<JudgeReport>;
}
