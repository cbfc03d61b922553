use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SchemaMarkupError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum nesting depth of entities before a subtree is cut off
    pub max_depth: usize,
    /// Entity nodes built from a single block before expansion stops
    pub max_entities: usize,
    /// Inputs larger than this are rejected as malformed
    pub max_input_bytes: usize,
    /// Promote missing recommended properties to errors
    pub strict: bool,
    pub include_info: bool,
    pub include_suggestions: bool,
    pub max_concurrent_analyses: usize,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_entities: 50_000,
            max_input_bytes: 5 * 1024 * 1024,
            strict: false,
            include_info: true,
            include_suggestions: true,
            max_concurrent_analyses: num_cpus::get() * 2,
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("schema-markup/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

impl AnalyzerConfig {
    /// Recommended properties become errors.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    /// Issues and verdicts only: no info-level issues, no suggested documents.
    pub fn minimal() -> Self {
        Self {
            include_info: false,
            include_suggestions: false,
            ..Default::default()
        }
    }

    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(SchemaMarkupError::configuration(
                "max_depth must be at least 1",
            ));
        }
        if self.max_entities == 0 {
            return Err(SchemaMarkupError::configuration(
                "max_entities must be at least 1",
            ));
        }
        if self.max_input_bytes == 0 {
            return Err(SchemaMarkupError::configuration(
                "max_input_bytes must be greater than zero",
            ));
        }
        if self.max_concurrent_analyses == 0 {
            return Err(SchemaMarkupError::configuration(
                "max_concurrent_analyses must be at least 1",
            ));
        }
        if self.fetch.timeout.is_zero() {
            return Err(SchemaMarkupError::configuration(
                "fetch.timeout must be non-zero",
            ));
        }
        Ok(())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_entities(mut self, max_entities: usize) -> Self {
        self.max_entities = max_entities;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_suggestions(mut self, enabled: bool) -> Self {
        self.include_suggestions = enabled;
        self
    }

    pub fn with_info(mut self, enabled: bool) -> Self {
        self.include_info = enabled;
        self
    }

    pub fn with_fetch_config(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_max_concurrent_analyses(mut self, limit: usize) -> Self {
        self.max_concurrent_analyses = limit;
        self
    }
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
