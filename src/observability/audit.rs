/// Judge audit events
///
/// Every submission's lifecycle (start, strategy choice, fallback, terminal
/// verdict) is emitted as one structured JSON line on the `judgebox::audit`
/// log target, and appended to an audit file when one is configured.
/// Correlation is by submission id.
use crate::config::types::{JudgeError, Result, Verdict};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

pub const AUDIT_TARGET: &str = "judgebox::audit";

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Error,
    Warning,
    Info,
}

/// Judge lifecycle event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeEventType {
    JudgeStart,
    StrategySelected,
    AiFallback,
    CompileFailed,
    JudgeEnd,
    InternalError,
    InvalidTransition,
    WorkspaceCleanupFailure,
    StaleWorkspacesSwept,
}

impl JudgeEventType {
    pub fn default_severity(self) -> EventSeverity {
        match self {
            JudgeEventType::JudgeStart
            | JudgeEventType::StrategySelected
            | JudgeEventType::CompileFailed
            | JudgeEventType::JudgeEnd
            | JudgeEventType::StaleWorkspacesSwept => EventSeverity::Info,
            JudgeEventType::AiFallback
            | JudgeEventType::InvalidTransition
            | JudgeEventType::WorkspaceCleanupFailure => EventSeverity::Warning,
            JudgeEventType::InternalError => EventSeverity::Error,
        }
    }
}

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeEvent {
    pub event_type: JudgeEventType,
    pub severity: EventSeverity,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
}

impl JudgeEvent {
    pub fn new(event_type: JudgeEventType, details: impl Into<String>) -> Self {
        Self {
            event_type,
            severity: event_type.default_severity(),
            timestamp: Utc::now(),
            details: details.into(),
            submission_id: None,
            problem_id: None,
            language: None,
            strategy: None,
            verdict: None,
            workspace: None,
        }
    }

    pub fn with_submission(mut self, submission_id: &str) -> Self {
        self.submission_id = Some(submission_id.to_string());
        self
    }

    pub fn with_problem(mut self, problem_id: &str) -> Self {
        self.problem_id = Some(problem_id.to_string());
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_strategy(mut self, strategy: &str) -> Self {
        self.strategy = Some(strategy.to_string());
        self
    }

    pub fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    pub fn with_workspace(mut self, path: &Path) -> Self {
        self.workspace = Some(path.display().to_string());
        self
    }

    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"event_type\":\"{:?}\",\"serialization_error\":\"{}\"}}",
                self.event_type, e
            )
        })
    }
}

/// Audit sink: log target plus optional append-only file
pub struct AuditLogger {
    audit_file: Option<Mutex<File>>,
    audit_path: Option<PathBuf>,
}

impl AuditLogger {
    /// Logger without a file sink
    pub fn log_only() -> Self {
        Self {
            audit_file: None,
            audit_path: None,
        }
    }

    /// Logger appending to `audit_path`
    pub fn with_file(audit_path: PathBuf) -> Result<Self> {
        if let Some(parent) = audit_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                JudgeError::Config(format!("Failed to create audit log directory: {}", e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&audit_path)
            .map_err(|e| JudgeError::Config(format!("Failed to open audit log: {}", e)))?;

        Ok(Self {
            audit_file: Some(Mutex::new(file)),
            audit_path: Some(audit_path),
        })
    }

    pub fn log_event(&self, event: &JudgeEvent) {
        let line = event.to_json_line();
        match event.severity {
            EventSeverity::Error => error!(target: AUDIT_TARGET, "{}", line),
            EventSeverity::Warning => warn!(target: AUDIT_TARGET, "{}", line),
            EventSeverity::Info => info!(target: AUDIT_TARGET, "{}", line),
        }

        if let Some(file) = &self.audit_file {
            match file.lock() {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
                        error!("Failed to write audit log: {}", e);
                    }
                }
                Err(_) => error!("Audit log lock poisoned"),
            }
        }
    }

    pub fn audit_path(&self) -> Option<&Path> {
        self.audit_path.as_deref()
    }
}

static AUDIT_LOGGER: OnceLock<AuditLogger> = OnceLock::new();

/// Initialize the global audit logger. Without a path, events go to the log
/// target only. A failing file path degrades to log-only.
pub fn init_audit_log(audit_path: Option<PathBuf>) {
    let logger = match audit_path {
        Some(path) => match AuditLogger::with_file(path.clone()) {
            Ok(logger) => logger,
            Err(e) => {
                warn!(
                    "Audit file {} unavailable, continuing log-only: {}",
                    path.display(),
                    e
                );
                AuditLogger::log_only()
            }
        },
        None => AuditLogger::log_only(),
    };

    if AUDIT_LOGGER.set(logger).is_err() {
        warn!("Audit logger already initialized");
    }
}

/// Emit an event through the global logger
pub fn log_event(event: JudgeEvent) {
    AUDIT_LOGGER
        .get_or_init(AuditLogger::log_only)
        .log_event(&event);
}

/// Convenience constructors for lifecycle events
pub mod events {
    use super::*;

    pub fn judge_start(submission_id: &str, problem_id: &str, language: &str) {
        log_event(
            JudgeEvent::new(JudgeEventType::JudgeStart, "judging started")
                .with_submission(submission_id)
                .with_problem(problem_id)
                .with_language(language),
        );
    }

    pub fn strategy_selected(submission_id: &str, strategy: &str) {
        log_event(
            JudgeEvent::new(
                JudgeEventType::StrategySelected,
                format!("using {} strategy", strategy),
            )
            .with_submission(submission_id)
            .with_strategy(strategy),
        );
    }

    pub fn ai_fallback(submission_id: &str, reason: &str) {
        log_event(
            JudgeEvent::new(
                JudgeEventType::AiFallback,
                format!("AI judging failed, falling back to traditional: {}", reason),
            )
            .with_submission(submission_id)
            .with_strategy("ai"),
        );
    }

    pub fn compile_failed(submission_id: &str, language: &str) {
        log_event(
            JudgeEvent::new(JudgeEventType::CompileFailed, "compilation failed")
                .with_submission(submission_id)
                .with_language(language),
        );
    }

    pub fn judge_end(submission_id: &str, strategy: &str, verdict: Verdict, details: String) {
        log_event(
            JudgeEvent::new(JudgeEventType::JudgeEnd, details)
                .with_submission(submission_id)
                .with_strategy(strategy)
                .with_verdict(verdict),
        );
    }

    pub fn internal_error(submission_id: &str, error: &str) {
        log_event(
            JudgeEvent::new(JudgeEventType::InternalError, error)
                .with_submission(submission_id)
                .with_verdict(Verdict::RuntimeError),
        );
    }

    pub fn invalid_transition(submission_id: &str, error: &str) {
        log_event(
            JudgeEvent::new(JudgeEventType::InvalidTransition, error).with_submission(submission_id),
        );
    }

    pub fn workspace_cleanup_failure(path: &Path, error: String) {
        log_event(
            JudgeEvent::new(JudgeEventType::WorkspaceCleanupFailure, error).with_workspace(path),
        );
    }

    pub fn stale_workspaces_swept(root: &Path, removed: usize) {
        log_event(
            JudgeEvent::new(
                JudgeEventType::StaleWorkspacesSwept,
                format!("removed {} stale workspaces", removed),
            )
            .with_workspace(root),
        );
    }
}
