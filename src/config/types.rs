/// Core types shared across the judging engine
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Submission status - closed set shared with storage collaborators.
///
/// Valid transitions: `pending -> judging -> <terminal>`. Terminal states are
/// final; re-judging creates a new submission.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SubmissionStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "judging")]
    Judging,
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "wrong_answer")]
    WrongAnswer,
    #[serde(rename = "time_limit")]
    TimeLimit,
    #[serde(rename = "memory_limit")]
    MemoryLimit,
    #[serde(rename = "runtime_error")]
    RuntimeError,
    #[serde(rename = "compile_error")]
    CompileError,
}

impl SubmissionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SubmissionStatus::Pending | SubmissionStatus::Judging)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        match self {
            SubmissionStatus::Pending => next == SubmissionStatus::Judging,
            SubmissionStatus::Judging => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Judging => "judging",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::WrongAnswer => "wrong_answer",
            SubmissionStatus::TimeLimit => "time_limit",
            SubmissionStatus::MemoryLimit => "memory_limit",
            SubmissionStatus::RuntimeError => "runtime_error",
            SubmissionStatus::CompileError => "compile_error",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        SubmissionStatus::Pending
    }
}

/// Terminal verdict of a judged submission.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Verdict {
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "wrong_answer")]
    WrongAnswer,
    #[serde(rename = "time_limit")]
    TimeLimit,
    #[serde(rename = "memory_limit")]
    MemoryLimit,
    #[serde(rename = "runtime_error")]
    RuntimeError,
    #[serde(rename = "compile_error")]
    CompileError,
}

impl Verdict {
    /// Verdicts a reasoning service may report. Memory is never enforced, so
    /// `memory_limit` is excluded.
    pub const AI_REPORTABLE: [Verdict; 5] = [
        Verdict::Accepted,
        Verdict::WrongAnswer,
        Verdict::RuntimeError,
        Verdict::CompileError,
        Verdict::TimeLimit,
    ];

    pub fn as_str(self) -> &'static str {
        SubmissionStatus::from(self).as_str()
    }

    /// Parse one of the AI-reportable verdict names.
    pub fn parse_reportable(raw: &str) -> Option<Verdict> {
        Self::AI_REPORTABLE
            .iter()
            .copied()
            .find(|verdict| verdict.as_str() == raw)
    }

    pub fn is_accepted(self) -> bool {
        self == Verdict::Accepted
    }
}

impl From<Verdict> for SubmissionStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accepted => SubmissionStatus::Accepted,
            Verdict::WrongAnswer => SubmissionStatus::WrongAnswer,
            Verdict::TimeLimit => SubmissionStatus::TimeLimit,
            Verdict::MemoryLimit => SubmissionStatus::MemoryLimit,
            Verdict::RuntimeError => SubmissionStatus::RuntimeError,
            Verdict::CompileError => SubmissionStatus::CompileError,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output integrity classification for one captured stream
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputIntegrity {
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "truncated_by_judge_limit")]
    TruncatedByJudgeLimit,
    #[serde(rename = "collection_timeout")]
    CollectionTimeout,
    #[serde(rename = "read_error")]
    ReadError,
}

impl std::fmt::Display for OutputIntegrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputIntegrity::Complete => write!(f, "complete"),
            OutputIntegrity::TruncatedByJudgeLimit => write!(f, "truncated_by_judge_limit"),
            OutputIntegrity::CollectionTimeout => write!(f, "collection_timeout"),
            OutputIntegrity::ReadError => write!(f, "read_error"),
        }
    }
}

impl Default for OutputIntegrity {
    fn default() -> Self {
        OutputIntegrity::Complete
    }
}

/// Outcome of a single process execution. Transient: consumed by the judge
/// and discarded.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Exit code 0, no timeout, no output overflow
    pub exited_normally: bool,
    /// Exit code (if the process exited)
    pub exit_code: Option<i32>,
    /// Terminating signal (if signaled)
    pub signal: Option<i32>,
    /// Captured standard output (lossy UTF-8)
    pub stdout: String,
    /// Captured standard error (lossy UTF-8)
    pub stderr: String,
    /// Wall clock from spawn to reap
    pub elapsed_ms: u64,
    /// Killed by the judge after the wall-clock limit
    pub timed_out: bool,
    /// Killed by the judge after exceeding the output ceiling
    pub output_exceeded: bool,
    /// Peak resident set size, when the platform reports it
    pub memory_kb: Option<u64>,
    /// Combined integrity of stdout/stderr collection
    pub output_integrity: OutputIntegrity,
}

/// Error taxonomy of the judging engine
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Compilation failed: {0}")]
    CompileFailure(String),

    #[error("Time limit exceeded after {elapsed_ms} ms (limit {limit_ms} ms)")]
    ExecutionTimeout { elapsed_ms: u64, limit_ms: u64 },

    #[error("Execution fault: {0}")]
    ExecutionFault(String),

    #[error("Output mismatch on test case {0}")]
    OutputMismatch(usize),

    #[error("Judging strategy unavailable: {0}")]
    StrategyUnavailable(String),

    #[error("Internal judge error: {0}")]
    InternalJudgeError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Submission {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    #[error("Submission not found: {0}")]
    NotFound(String),
}

impl From<nix::errno::Errno> for JudgeError {
    fn from(err: nix::errno::Errno) -> Self {
        JudgeError::Process(err.to_string())
    }
}

/// Result type alias for judging operations
pub type Result<T> = std::result::Result<T, JudgeError>;
