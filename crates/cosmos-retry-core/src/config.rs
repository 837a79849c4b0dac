use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::retry::RetryBudget;

/// Upper bound (exclusive) of the random jitter added to growing backoff delays.
/// Compiled in; not read from the config file.
pub const DEFAULT_JITTER_CEILING_MILLIS: u64 = 2000;

/// Invalid configuration values.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("maxRetryCount must be -1 (unbounded) or >= 0, got {0}")]
    InvalidMaxRetryCount(i32),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Retry policy parameters (`[retry-policy]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum number of retries; -1 retries forever.
    pub max_retry_count: i32,
    /// Delay between retries when `max_retry_count` is -1.
    pub fixed_back_off_time_millis: u64,
    /// Per-attempt delay increment when retries are bounded.
    pub growing_back_off_time_millis: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_count: 10,
            fixed_back_off_time_millis: 1000,
            growing_back_off_time_millis: 100,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.budget().map(|_| ())
    }

    /// Typed form of `max_retry_count`.
    pub fn budget(&self) -> std::result::Result<RetryBudget, ConfigError> {
        RetryBudget::from_raw(self.max_retry_count)
            .ok_or(ConfigError::InvalidMaxRetryCount(self.max_retry_count))
    }
}

/// Client configuration loaded from `~/.config/cosmos-retry/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default, rename = "retry-policy", skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryConfig>,
}

impl ClientConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, ConfigError> {
        let cfg: ClientConfig = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if let Some(retry) = &cfg.retry_policy {
            retry.validate()?;
        }
        Ok(cfg)
    }

    /// Effective retry parameters (section contents or defaults).
    pub fn retry(&self) -> RetryConfig {
        self.retry_policy.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cosmos-retry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ClientConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ClientConfig {
            retry_policy: Some(RetryConfig::default()),
        };
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<ClientConfig> {
    let data = fs::read_to_string(path)?;
    let cfg = ClientConfig::from_toml_str(&data)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_values() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_retry_count, 10);
        assert_eq!(cfg.fixed_back_off_time_millis, 1000);
        assert_eq!(cfg.growing_back_off_time_millis, 100);
        assert_eq!(DEFAULT_JITTER_CEILING_MILLIS, 2000);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ClientConfig {
            retry_policy: Some(RetryConfig::default()),
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        assert!(toml.contains("maxRetryCount"));
        let parsed = ClientConfig::from_toml_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            [retry-policy]
            maxRetryCount = -1
            fixedBackOffTimeMillis = 500
            growingBackOffTimeMillis = 250
        "#;
        let cfg = ClientConfig::from_toml_str(toml).unwrap();
        let retry = cfg.retry();
        assert_eq!(retry.max_retry_count, -1);
        assert_eq!(retry.fixed_back_off_time_millis, 500);
        assert_eq!(retry.growing_back_off_time_millis, 250);
        assert_eq!(retry.budget().unwrap(), RetryBudget::Unbounded);
    }

    #[test]
    fn missing_keys_use_defaults() {
        let toml = r#"
            [retry-policy]
            maxRetryCount = 3
        "#;
        let retry = ClientConfig::from_toml_str(toml).unwrap().retry();
        assert_eq!(retry.max_retry_count, 3);
        assert_eq!(retry.fixed_back_off_time_millis, 1000);
        assert_eq!(retry.growing_back_off_time_millis, 100);
    }

    #[test]
    fn missing_section_uses_defaults() {
        let cfg = ClientConfig::from_toml_str("").unwrap();
        assert!(cfg.retry_policy.is_none());
        assert_eq!(cfg.retry(), RetryConfig::default());
    }

    #[test]
    fn rejects_max_retry_count_below_sentinel() {
        let toml = r#"
            [retry-policy]
            maxRetryCount = -2
        "#;
        assert_eq!(
            ClientConfig::from_toml_str(toml),
            Err(ConfigError::InvalidMaxRetryCount(-2))
        );
    }

    #[test]
    fn rejects_negative_durations() {
        let toml = r#"
            [retry-policy]
            fixedBackOffTimeMillis = -5
        "#;
        assert!(matches!(
            ClientConfig::from_toml_str(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_path_reads_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        fs::write(
            f.path(),
            "[retry-policy]\nmaxRetryCount = 0\ngrowingBackOffTimeMillis = 7\n",
        )
        .unwrap();
        let cfg = load_from_path(f.path()).unwrap();
        assert_eq!(cfg.retry().max_retry_count, 0);
        assert_eq!(cfg.retry().growing_back_off_time_millis, 7);
    }
}
