// Config Validation
// Startup validation: fail fast with actionable errors, surface soft problems
// as warnings.

use crate::config::settings::JudgeConfig;
use crate::config::types::{JudgeError, Result};

/// Validation result with detailed errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Validate config at startup. Errors are fatal; warnings are logged.
pub fn validate_config(config: &JudgeConfig) -> Result<ValidationResult> {
    let mut result = ValidationResult::new();

    validate_limits(config, &mut result);
    validate_paths(config, &mut result);
    validate_ai(config, &mut result);

    if !result.is_valid() {
        return Err(JudgeError::Config(format!(
            "Config validation failed:\n{}",
            result.errors.join("\n")
        )));
    }

    for warning in &result.warnings {
        log::warn!("config: {}", warning);
    }

    Ok(result)
}

fn validate_limits(config: &JudgeConfig, result: &mut ValidationResult) {
    if config.compile_timeout_ms == 0 {
        result.add_error("compile_timeout_ms cannot be zero".to_string());
    } else if config.compile_timeout_ms > 120_000 {
        result.add_warning(format!(
            "compile_timeout_ms {} is above two minutes; slow compiles will hold a judging thread",
            config.compile_timeout_ms
        ));
    }

    if config.compile_output_limit_bytes == 0 {
        result.add_error("compile_output_limit_bytes cannot be zero".to_string());
    }
}

fn validate_paths(config: &JudgeConfig, result: &mut ValidationResult) {
    if !config.workspace_root.is_absolute() {
        result.add_error(format!(
            "workspace_root must be absolute path: {:?}",
            config.workspace_root
        ));
    }
}

fn validate_ai(config: &JudgeConfig, result: &mut ValidationResult) {
    let ai = &config.ai;

    if ai.enabled && !ai.has_credentials() {
        result.add_warning(
            "ai.enabled is set but no API key is configured; traditional judging only"
                .to_string(),
        );
    }

    if ai.enabled {
        if !(ai.endpoint.starts_with("http://") || ai.endpoint.starts_with("https://")) {
            result.add_error(format!(
                "ai.endpoint must be an http(s) URL: {:?}",
                ai.endpoint
            ));
        }
        if ai.model.trim().is_empty() {
            result.add_error("ai.model cannot be empty".to_string());
        }
        if ai.request_timeout_ms == 0 {
            result.add_error(
                "ai.request_timeout_ms cannot be zero (the reasoning call must be bounded)"
                    .to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let result = validate_config(&JudgeConfig::default()).unwrap();
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_zero_compile_timeout_rejected() {
        let mut config = JudgeConfig::default();
        config.compile_timeout_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("compile_timeout_ms"));
    }

    #[test]
    fn test_relative_workspace_rejected() {
        let mut config = JudgeConfig::default();
        config.workspace_root = "relative/dir".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_ai_without_key_only_warns() {
        let mut config = JudgeConfig::default();
        config.ai.enabled = true;
        let result = validate_config(&config).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("no API key"));
    }

    #[test]
    fn test_ai_unbounded_timeout_rejected() {
        let mut config = JudgeConfig::default();
        config.ai.enabled = true;
        config.ai.api_key = Some("k".to_string());
        config.ai.request_timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }
}
