//! AI-assisted judging.
//!
//! Substitutes a reasoning service's analysis for execution. Any failure to
//! reach the service or to get a conforming answer is
//! `JudgeError::StrategyUnavailable`; the orchestrator decides what happens
//! next.

pub mod client;
pub mod prompt;
pub mod response;

use crate::config::types::{JudgeError, Result};
use crate::core::types::{JudgeReport, Problem, StrategyKind};
use crate::observability::metrics::get_metrics;
use crate::store::StatsSink;
use crate::strategy::{JudgeStrategy, JudgeTask};
use std::sync::Arc;

pub use client::{GeminiClient, ReasoningClient};
pub use response::{AiVerdict, ErrorExplanation, Hints};

pub struct AiJudge {
    client: Arc<dyn ReasoningClient>,
    stats: Arc<dyn StatsSink>,
}

impl AiJudge {
    pub fn new(client: Arc<dyn ReasoningClient>, stats: Arc<dyn StatsSink>) -> Self {
        Self { client, stats }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    /// Ask the service for a structured verdict, without side effects
    pub fn analyze(&self, task: &JudgeTask<'_>) -> Result<AiVerdict> {
        if !self.client.is_available() {
            return Err(JudgeError::StrategyUnavailable(
                "reasoning client not initialized".to_string(),
            ));
        }

        let prompt = prompt::build_judge_prompt(
            task.problem,
            &task.submission.language,
            &task.submission.code,
            task.test_cases,
        );
        let text = self.client.generate(&prompt)?;
        log::debug!(
            "reasoning service answered {} chars for submission {}",
            text.len(),
            task.submission.id
        );

        response::parse_judge_response(&text, task.test_cases.len()).ok_or_else(|| {
            JudgeError::StrategyUnavailable("response contained no JSON object".to_string())
        })
    }

    /// Plain-language explanation of a compile or runtime error
    pub fn explain_error(&self, code: &str, language: &str, error: &str) -> Option<ErrorExplanation> {
        if !self.client.is_available() {
            return None;
        }
        let prompt = prompt::build_explain_prompt(code, language, error);
        match self.client.generate(&prompt) {
            Ok(text) => response::parse_error_explanation(&text),
            Err(e) => {
                log::warn!("error explanation unavailable: {}", e);
                None
            }
        }
    }

    /// Graded hints for a stuck attempt
    pub fn hints(&self, problem: &Problem, code: &str, language: &str) -> Option<Hints> {
        if !self.client.is_available() {
            return None;
        }
        let prompt = prompt::build_hints_prompt(problem, code, language);
        match self.client.generate(&prompt) {
            Ok(text) => response::parse_hints(&text),
            Err(e) => {
                log::warn!("hints unavailable: {}", e);
                None
            }
        }
    }
}

impl JudgeStrategy for AiJudge {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Ai
    }

    fn judge(&self, task: &JudgeTask<'_>) -> Result<JudgeReport> {
        get_metrics().strategy_ai.inc();
        let ai = self.analyze(task)?;

        // Cases are credited in definition order
        let points_earned = task
            .test_cases
            .iter()
            .take(ai.test_cases_passed)
            .map(|case| case.points)
            .sum();

        let report = JudgeReport {
            verdict: ai.verdict,
            test_cases_passed: ai.test_cases_passed,
            total_test_cases: task.test_cases.len(),
            execution_time_ms: ai.estimated_time_ms,
            memory_kb: None,
            points_earned,
            error_message: None,
            ai_analysis: Some(ai.analysis),
            ai_feedback: Some(ai.feedback),
            ai_suggestions: ai.suggestions,
            case_results: Vec::new(),
            strategy: StrategyKind::Ai,
        };

        self.stats.record_judged(
            &task.submission.problem_id,
            &task.submission.user_id,
            report.is_accepted(),
        );
        Ok(report)
    }
}
