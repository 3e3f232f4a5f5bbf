//! Configuration management for Coursewright.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. API key for the completion service.
//! - `COMPLETION_BASE_URL` - Optional. OpenAI-compatible base URL. Defaults to `https://openrouter.ai/api/v1`.
//! - `RESEARCHER_MODEL` - Optional. Defaults to `google/gemini-2.5-pro`.
//! - `JUDGE_MODEL` - Optional. Defaults to `google/gemini-2.5-flash`.
//! - `CONTENT_BUILDER_MODEL` - Optional. Defaults to `google/gemini-2.5-pro`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `MAX_ITERATIONS` - Optional. Research/judge rounds per run. Defaults to `3`.
//! - `PER_CALL_TIMEOUT_SECS` - Optional. Timeout for one role call attempt. Defaults to `120`.
//! - `SERVICE_RETRIES` - Optional. Retries per role call on transient failures. Defaults to `2`.
//! - `RETRY_BASE_DELAY_MS` - Optional. First backoff delay. Defaults to `500`.
//! - `RETRY_MAX_DELAY_MS` - Optional. Backoff cap. Defaults to `10000`.
//! - `SEARCH_ENABLED` - Optional. Whether the researcher may search the web. Defaults to `true`.
//! - `SEARCH_MAX_RESULTS` - Optional. Hits kept per search. Defaults to `5`.
//! - `MAX_CONCURRENT_RUNS` - Optional. Runs executing at once. Defaults to `16`.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::error::RoleKind;
use crate::retry::{BackoffConfig, RetryPolicy};

pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Which model each role runs on.
#[derive(Debug, Clone)]
pub struct RoleModels {
    pub researcher: String,
    pub judge: String,
    pub content_builder: String,
}

impl Default for RoleModels {
    fn default() -> Self {
        Self {
            researcher: "google/gemini-2.5-pro".to_string(),
            judge: "google/gemini-2.5-flash".to_string(),
            content_builder: "google/gemini-2.5-pro".to_string(),
        }
    }
}

impl RoleModels {
    pub fn for_role(&self, role: RoleKind) -> &str {
        match role {
            RoleKind::Researcher => &self.researcher,
            RoleKind::Judge => &self.judge,
            RoleKind::ContentBuilder => &self.content_builder,
        }
    }
}

/// Knobs of the research/judge loop itself.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Research/judge rounds before the last findings are force-accepted.
    pub max_iterations: usize,

    /// Timeout for a single role call attempt.
    pub per_call_timeout: Duration,

    /// Retry budget for transient service failures, per role call.
    pub retry: RetryPolicy,

    /// Whether the researcher may use the search tool.
    pub search_enabled: bool,

    /// Hits kept from each search.
    pub search_max_results: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            per_call_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            search_enabled: true,
            search_max_results: 5,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Completion service API key
    pub api_key: String,

    /// OpenAI-compatible completion endpoint base
    pub completion_base_url: String,

    /// Model selection per role
    pub models: RoleModels,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Runs allowed to execute at the same time
    pub max_concurrent_runs: usize,

    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set,
    /// and `ConfigError::InvalidValue` for unparsable or out-of-range values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENROUTER_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let completion_base_url = lookup("COMPLETION_BASE_URL")
            .unwrap_or_else(|| DEFAULT_COMPLETION_BASE_URL.to_string());
        url::Url::parse(&completion_base_url).map_err(|e| {
            ConfigError::InvalidValue("COMPLETION_BASE_URL".to_string(), format!("{}", e))
        })?;

        let defaults = RoleModels::default();
        let models = RoleModels {
            researcher: lookup("RESEARCHER_MODEL").unwrap_or(defaults.researcher),
            judge: lookup("JUDGE_MODEL").unwrap_or(defaults.judge),
            content_builder: lookup("CONTENT_BUILDER_MODEL").unwrap_or(defaults.content_builder),
        };

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_var(&lookup, "PORT", 8000u16)?;

        let max_iterations = parse_var(&lookup, "MAX_ITERATIONS", 3usize)?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let timeout_secs = parse_var(&lookup, "PER_CALL_TIMEOUT_SECS", 120u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "PER_CALL_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let base_delay_ms = parse_var(&lookup, "RETRY_BASE_DELAY_MS", 500u64)?;
        let max_delay_ms = parse_var(&lookup, "RETRY_MAX_DELAY_MS", 10_000u64)?;
        let retry = RetryPolicy {
            max_retries: parse_var(&lookup, "SERVICE_RETRIES", 2u32)?,
            backoff: BackoffConfig {
                base_delay: Duration::from_millis(base_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms.max(base_delay_ms)),
                ..BackoffConfig::default()
            },
        };

        let search_enabled = lookup("SEARCH_ENABLED")
            .map(|v| parse_bool(&v).map_err(|e| ConfigError::InvalidValue("SEARCH_ENABLED".to_string(), e)))
            .transpose()?
            .unwrap_or(true);

        let search_max_results = parse_var(&lookup, "SEARCH_MAX_RESULTS", 5usize)?;
        let max_concurrent_runs = parse_var(&lookup, "MAX_CONCURRENT_RUNS", 16usize)?.max(1);

        Ok(Self {
            api_key,
            completion_base_url,
            models,
            host,
            port,
            max_concurrent_runs,
            pipeline: PipelineConfig {
                max_iterations,
                per_call_timeout: Duration::from_secs(timeout_secs),
                retry,
                search_enabled,
                search_max_results,
            },
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            completion_base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
            models: RoleModels::default(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_concurrent_runs: 16,
            pipeline: PipelineConfig::default(),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), format!("{}", e))),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = Config::from_lookup(lookup_from(&[("OPENROUTER_API_KEY", "sk-test")]))
            .expect("config");
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.completion_base_url, DEFAULT_COMPLETION_BASE_URL);
        assert_eq!(config.port, 8000);
        assert_eq!(config.pipeline.max_iterations, 3);
        assert_eq!(config.pipeline.per_call_timeout, Duration::from_secs(120));
        assert_eq!(config.pipeline.retry.max_retries, 2);
        assert!(config.pipeline.search_enabled);
        assert_eq!(config.models.for_role(RoleKind::Judge), "google/gemini-2.5-flash");
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "OPENROUTER_API_KEY"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("MAX_ITERATIONS", "5"),
            ("SEARCH_ENABLED", "off"),
            ("JUDGE_MODEL", "openai/gpt-4o-mini"),
            ("SERVICE_RETRIES", "0"),
            ("RETRY_BASE_DELAY_MS", "50"),
            ("RETRY_MAX_DELAY_MS", "10"),
        ]))
        .expect("config");
        assert_eq!(config.pipeline.max_iterations, 5);
        assert!(!config.pipeline.search_enabled);
        assert_eq!(config.models.judge, "openai/gpt-4o-mini");
        assert_eq!(config.pipeline.retry.max_retries, 0);
        // cap never drops below the base delay
        assert_eq!(config.pipeline.retry.backoff.max_delay, Duration::from_millis(50));
    }

    #[test]
    fn zero_iterations_is_invalid() {
        let err = Config::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("MAX_ITERATIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "MAX_ITERATIONS"));
    }

    #[test]
    fn garbage_values_are_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("SEARCH_ENABLED", "maybe"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SEARCH_ENABLED"));

        let err = Config::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "PORT"));
    }
}
