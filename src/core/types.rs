use crate::config::types::{SubmissionStatus, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_points() -> u32 {
    1
}

/// A user's submitted solution and, once judged, its result.
///
/// Created once per submit request. Only the orchestrator (through the store)
/// mutates the judging fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub problem_id: String,
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub test_cases_passed: usize,
    #[serde(default)]
    pub total_test_cases: usize,
    #[serde(default)]
    pub execution_time_ms: u64,
    #[serde(default)]
    pub memory_kb: Option<u64>,
    #[serde(default)]
    pub points_earned: u32,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub ai_analysis: Option<String>,
    #[serde(default)]
    pub ai_feedback: Option<String>,
    #[serde(default)]
    pub ai_suggestions: Vec<String>,
    #[serde(default)]
    pub strategy: Option<StrategyKind>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub judged_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// New pending submission with a generated id
    pub fn new(
        user_id: impl Into<String>,
        problem_id: impl Into<String>,
        language: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            problem_id: problem_id.into(),
            language: language.into(),
            code: code.into(),
            status: SubmissionStatus::Pending,
            test_cases_passed: 0,
            total_test_cases: 0,
            execution_time_ms: 0,
            memory_kb: None,
            points_earned: 0,
            error_message: None,
            ai_analysis: None,
            ai_feedback: None,
            ai_suggestions: Vec::new(),
            strategy: None,
            created_at: Utc::now(),
            judged_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Copy a terminal report onto the record
    pub fn apply_report(&mut self, report: &JudgeReport) {
        self.status = report.verdict.into();
        self.test_cases_passed = report.test_cases_passed;
        self.total_test_cases = report.total_test_cases;
        self.execution_time_ms = report.execution_time_ms;
        self.memory_kb = report.memory_kb;
        self.points_earned = report.points_earned;
        self.error_message = report.error_message.clone();
        self.ai_analysis = report.ai_analysis.clone();
        self.ai_feedback = report.ai_feedback.clone();
        self.ai_suggestions = report.ai_suggestions.clone();
        self.strategy = Some(report.strategy);
        self.judged_at = Some(Utc::now());
    }
}

/// Immutable problem view consumed by the judge
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Problem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_format: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub constraints: Option<String>,
    pub time_limit_ms: u64,
    pub memory_limit_mb: u64,
}

impl Problem {
    /// Per-stream output ceiling for test runs
    pub fn output_limit_bytes(&self) -> usize {
        (self.memory_limit_mb as usize).saturating_mul(1024 * 1024)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default = "default_points")]
    pub points: u32,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            is_hidden: false,
            points: default_points(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }
}

/// Which algorithm produced a report
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Traditional,
    Ai,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Traditional => "traditional",
            StrategyKind::Ai => "ai",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per test case result. Never carries input or output text, so hidden cases
/// can be reported safely.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseResult {
    pub index: usize,
    pub verdict: Verdict,
    pub elapsed_ms: u64,
    pub memory_kb: Option<u64>,
    pub is_hidden: bool,
}

/// Terminal result computed by a strategy
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JudgeReport {
    pub verdict: Verdict,
    pub test_cases_passed: usize,
    pub total_test_cases: usize,
    pub execution_time_ms: u64,
    pub memory_kb: Option<u64>,
    pub points_earned: u32,
    pub error_message: Option<String>,
    pub ai_analysis: Option<String>,
    pub ai_feedback: Option<String>,
    pub ai_suggestions: Vec<String>,
    pub case_results: Vec<CaseResult>,
    pub strategy: StrategyKind,
}

impl JudgeReport {
    /// Report with nothing executed
    pub fn empty(strategy: StrategyKind, verdict: Verdict, total_test_cases: usize) -> Self {
        Self {
            verdict,
            test_cases_passed: 0,
            total_test_cases,
            execution_time_ms: 0,
            memory_kb: None,
            points_earned: 0,
            error_message: None,
            ai_analysis: None,
            ai_feedback: None,
            ai_suggestions: Vec::new(),
            case_results: Vec::new(),
            strategy,
        }
    }

    /// Terminal failure with a message and no executed cases
    pub fn failed(
        strategy: StrategyKind,
        verdict: Verdict,
        total_test_cases: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::empty(strategy, verdict, total_test_cases)
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.verdict.is_accepted()
    }
}
