//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use crate::application::errors::ConfigError;

/// Mediator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub mediator: MediatorConfig,
    pub behaviors: BehaviorsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MediatorConfig {
    pub publish_strategy: PublishStrategy,
}

/// How notification listeners are run during publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishStrategy {
    /// Poll every listener concurrently on the publishing task
    #[default]
    Concurrent,
    /// Spawn one tokio task per listener
    Spawned,
}

impl FromStr for PublishStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concurrent" => Ok(PublishStrategy::Concurrent),
            "spawned" => Ok(PublishStrategy::Spawned),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown publish strategy: {}",
                other
            ))),
        }
    }
}

/// Built-in behaviors registered for every message
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BehaviorsConfig {
    pub logging: bool,
    pub slow_request_threshold_ms: Option<u64>,
    pub reject_cancelled: bool,
}

impl Default for BehaviorsConfig {
    fn default() -> Self {
        Self {
            logging: true,
            slow_request_threshold_ms: Some(500),
            reject_cancelled: false,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// Defaults with environment overrides applied
    pub fn load_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `MEDIATOR_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(strategy) = std::env::var("MEDIATOR_PUBLISH_STRATEGY") {
            self.mediator.publish_strategy = strategy.parse()?;
        }

        if let Ok(threshold) = std::env::var("MEDIATOR_SLOW_REQUEST_MS") {
            let ms = threshold.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(format!("MEDIATOR_SLOW_REQUEST_MS: {}", threshold))
            })?;
            // 0 disables the check
            self.behaviors.slow_request_threshold_ms = (ms > 0).then_some(ms);
        }

        if let Ok(logging) = std::env::var("MEDIATOR_LOGGING") {
            self.behaviors.logging = parse_flag(&logging)
                .ok_or_else(|| ConfigError::InvalidValue(format!("MEDIATOR_LOGGING: {}", logging)))?;
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
