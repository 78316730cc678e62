/// Judge configuration loading from a JSON file with environment overlay
use crate::config::types::{JudgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_COMPILE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_COMPILE_OUTPUT_LIMIT: usize = 4 * 1024 * 1024;
pub const DEFAULT_AI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_AI_MODEL: &str = "gemini-1.5-flash";

/// Stop/continue policy once a test case fails
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing test case
    #[serde(rename = "fail_fast")]
    FailFast,
    /// Run every test case; the first failure decides the verdict
    #[serde(rename = "run_all")]
    RunAll,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::FailFast
    }
}

/// Reasoning service configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Select AI-assisted judging when a client is available
    pub enabled: bool,
    /// API credential; absent means Traditional-only operation
    pub api_key: Option<String>,
    /// Service base URL
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Global timeout for one request
    pub request_timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            endpoint: DEFAULT_AI_ENDPOINT.to_string(),
            model: DEFAULT_AI_MODEL.to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl AiConfig {
    /// Credentials are present and non-blank
    pub fn has_credentials(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Full judge configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Parent directory of per-submission workspaces
    pub workspace_root: PathBuf,
    /// Wall-clock ceiling for the compile step
    pub compile_timeout_ms: u64,
    /// Output ceiling for the compile step (per stream)
    pub compile_output_limit_bytes: usize,
    /// Behaviour after the first failing test case
    pub failure_policy: FailurePolicy,
    /// Workspaces older than this are swept at startup
    pub stale_workspace_max_age_secs: u64,
    pub ai: AiConfig,
}

impl JudgeConfig {
    /// Workspace root scoped by effective UID so root and non-root runs never
    /// share a directory.
    pub fn runtime_root_dir() -> PathBuf {
        let euid = unsafe { libc::geteuid() };
        std::env::temp_dir().join(format!("judgebox-uid-{}", euid))
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            JudgeError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| JudgeError::Config(format!("Failed to parse config JSON: {}", e)))
    }

    /// Load from `path` when given, otherwise defaults; then apply the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay environment values. `lookup` is injected so tests never touch
    /// the real process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("JUDGEBOX_AI_ENABLED") {
            self.ai.enabled = parse_bool("JUDGEBOX_AI_ENABLED", &raw)?;
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                self.ai.api_key = Some(key);
            }
        }
        if let Some(endpoint) = lookup("JUDGEBOX_AI_ENDPOINT") {
            self.ai.endpoint = endpoint;
        }
        if let Some(model) = lookup("JUDGEBOX_AI_MODEL") {
            self.ai.model = model;
        }
        if let Some(root) = lookup("JUDGEBOX_WORKSPACE_ROOT") {
            self.workspace_root = PathBuf::from(root);
        }
        Ok(())
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            workspace_root: Self::runtime_root_dir(),
            compile_timeout_ms: DEFAULT_COMPILE_TIMEOUT_MS,
            compile_output_limit_bytes: DEFAULT_COMPILE_OUTPUT_LIMIT,
            failure_policy: FailurePolicy::FailFast,
            stale_workspace_max_age_secs: 3600,
            ai: AiConfig::default(),
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(JudgeError::Config(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}
