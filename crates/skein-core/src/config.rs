use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkeinError};

/// Top-level Skein configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Execution settings shared by every run of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker pool size for `run_parallel` when the caller does not pass one.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Maximum dispatches of a single node per run. Unset means unbounded,
    /// in which case keeping cyclic graphs convergent is the caller's job.
    #[serde(default)]
    pub max_node_visits: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            max_node_visits: None,
        }
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(SkeinError::Config("engine.max_workers must be at least 1".into()));
        }
        if self.max_node_visits == Some(0) {
            return Err(SkeinError::Config(
                "engine.max_node_visits must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).min(32)
}

/// Logging configuration for the `skein` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins when set.
    #[serde(default)]
    pub filter: Option<String>,
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| SkeinError::ConfigNotFound(path.display().to_string()))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text, with env var expansion.
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self =
            toml::from_str(&expanded).map_err(|e| SkeinError::Config(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
pub fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Keep original if env var not set
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_SKEIN_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_SKEIN_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_SKEIN_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_SKEIN_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_SKEIN_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = AppConfig::parse("").unwrap();
        assert!(config.engine.max_workers >= 1);
        assert!(config.engine.max_workers <= 32);
        assert_eq!(config.engine.max_node_visits, None);
        assert!(config.log.filter.is_none());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = AppConfig::parse("[engine]\nmax_workers = 0\n").unwrap_err();
        assert!(matches!(err, SkeinError::Config(_)));
    }

    #[test]
    fn test_zero_visit_limit_rejected() {
        let err = AppConfig::parse("[engine]\nmax_node_visits = 0\n").unwrap_err();
        assert!(matches!(err, SkeinError::Config(_)));
    }
}
