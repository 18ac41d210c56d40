//! Engine configuration
//!
//! Loaded from TOML. Unknown keys are rejected and missing keys take
//! their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Document is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// File could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Pipeline tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Budget for running a plan, validation included
    pub execution_timeout_secs: u64,
    /// Budget for a standalone plan validation
    pub validation_timeout_secs: u64,
    /// Budget for one call to the suggestion generator
    pub analysis_timeout_secs: u64,
    /// How long stored error patterns live
    pub pattern_ttl_secs: u64,
    /// Maximum cached validation results
    pub validation_cache_capacity: u64,
    /// Finished executions kept for later rollback
    pub execution_history_limit: usize,
    /// Plans riskier than this fail validation
    pub max_plan_risk: f64,
    /// Plans estimated to run longer than this fail validation
    pub max_plan_duration_secs: u64,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            execution_timeout_secs: 300,
            validation_timeout_secs: 30,
            analysis_timeout_secs: 60,
            pattern_ttl_secs: 86_400,
            validation_cache_capacity: 10_000,
            execution_history_limit: 1_000,
            max_plan_risk: 0.8,
            max_plan_duration_secs: 600,
            log_filter: "info".to_string(),
            json_logs: false,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed documents or unknown keys,
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("execution_timeout_secs", self.execution_timeout_secs),
            ("validation_timeout_secs", self.validation_timeout_secs),
            ("analysis_timeout_secs", self.analysis_timeout_secs),
            ("pattern_ttl_secs", self.pattern_ttl_secs),
            ("max_plan_duration_secs", self.max_plan_duration_secs),
        ];
        if let Some((key, _)) = timeouts.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{key} must be greater than 0")));
        }
        if self.validation_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "validation_cache_capacity must be greater than 0".to_string(),
            ));
        }
        if self.execution_history_limit == 0 {
            return Err(ConfigError::Invalid(
                "execution_history_limit must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_plan_risk) {
            return Err(ConfigError::Invalid(format!(
                "max_plan_risk must be within [0, 1], got {}",
                self.max_plan_risk
            )));
        }
        Ok(())
    }

    /// Set execution budget
    #[inline]
    #[must_use]
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout_secs = timeout.as_secs();
        self
    }

    /// Set how many finished executions are kept
    #[inline]
    #[must_use]
    pub fn with_execution_history_limit(mut self, limit: usize) -> Self {
        self.execution_history_limit = limit;
        self
    }

    /// Set standalone validation budget
    #[inline]
    #[must_use]
    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout_secs = timeout.as_secs();
        self
    }

    /// Set generator call budget
    #[inline]
    #[must_use]
    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout_secs = timeout.as_secs();
        self
    }

    /// Set pattern lifetime
    #[inline]
    #[must_use]
    pub fn with_pattern_ttl(mut self, ttl: Duration) -> Self {
        self.pattern_ttl_secs = ttl.as_secs();
        self
    }

    /// Set plan risk ceiling
    #[inline]
    #[must_use]
    pub fn with_max_plan_risk(mut self, risk: f64) -> Self {
        self.max_plan_risk = risk;
        self
    }

    /// Set plan duration ceiling
    #[inline]
    #[must_use]
    pub fn with_max_plan_duration(mut self, duration: Duration) -> Self {
        self.max_plan_duration_secs = duration.as_secs();
        self
    }

    /// Set default log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Execution budget as a duration
    #[inline]
    #[must_use]
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    /// Standalone validation budget as a duration
    #[inline]
    #[must_use]
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    /// Generator call budget as a duration
    #[inline]
    #[must_use]
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    /// Pattern lifetime as a duration
    #[inline]
    #[must_use]
    pub fn pattern_ttl(&self) -> Duration {
        Duration::from_secs(self.pattern_ttl_secs)
    }

    /// Plan duration ceiling as a duration
    #[inline]
    #[must_use]
    pub fn max_plan_duration(&self) -> Duration {
        Duration::from_secs(self.max_plan_duration_secs)
    }
}
