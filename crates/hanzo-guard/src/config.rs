//! Configuration for Hanzo Guard

use crate::assessment::{MAX_SCORE, MIN_SCORE};
use crate::error::{GuardError, Result};
use hanzo_preprocess::PreprocessConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for Guard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Score bands for the final decision
    pub thresholds: ThresholdConfig,
    /// Live-typing hint configuration
    pub realtime: RealtimeConfig,
    /// Evaluation deadline
    pub timeout: TimeoutConfig,
    /// Audit configuration
    pub audit: AuditConfig,
    /// Preprocessing applied by `Guard::evaluate`
    pub preprocess: PreprocessConfig,
}

impl GuardConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Reject threshold bands that cannot be ordered.
    pub fn validate(&self) -> Result<()> {
        let ThresholdConfig { warn_at, block_at } = self.thresholds;
        let in_range = |s: u8| (MIN_SCORE..=MAX_SCORE).contains(&s);
        if !in_range(warn_at) || !in_range(block_at) {
            return Err(GuardError::ConfigError(format!(
                "thresholds must lie in {}..={} (warn_at={}, block_at={})",
                MIN_SCORE, MAX_SCORE, warn_at, block_at
            )));
        }
        if warn_at > block_at {
            return Err(GuardError::ConfigError(format!(
                "warn_at ({}) must not exceed block_at ({})",
                warn_at, block_at
            )));
        }
        if self.realtime.min_char_delta == 0 {
            return Err(GuardError::ConfigError(
                "realtime.min_char_delta must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_thresholds(mut self, warn_at: u8, block_at: u8) -> Self {
        self.thresholds = ThresholdConfig { warn_at, block_at };
        self
    }

    pub fn with_min_char_delta(mut self, delta: usize) -> Self {
        self.realtime.min_char_delta = delta;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout.evaluate_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }
}

/// Score bands: `score >= block_at` blocks, `score >= warn_at` warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub warn_at: u8,
    pub block_at: u8,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            warn_at: 5,
            block_at: 7,
        }
    }
}

/// Realtime session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Minimum change in character count before re-classifying
    pub min_char_delta: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self { min_char_delta: 12 }
    }
}

/// Deadline for `Guard::evaluate_with_timeout` when none is passed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub evaluate_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { evaluate_ms: 30_000 }
    }
}

impl TimeoutConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.evaluate_ms)
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit logging
    pub enabled: bool,
    /// Include a truncated copy of the text (privacy concern!)
    pub log_content: bool,
    /// Append JSON lines to this file
    pub log_file: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_content: false,
            log_file: None,
        }
    }
}
