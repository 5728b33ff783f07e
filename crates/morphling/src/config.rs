//! Render configuration

use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration for render and rerender passes.
///
/// Held by the [`Environment`](crate::Environment) and consulted by every
/// pass it drives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Maximum nesting of blocks and components (runaway recursion protection)
    pub max_depth: usize,

    /// Text placed inside placeholder comments (`<!--marker_text-->`)
    pub marker_text: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            marker_text: String::new(),
        }
    }
}

impl RenderConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration with a custom depth limit.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON document.
    ///
    /// Missing fields take their default values.
    ///
    /// ```
    /// use morphling::RenderConfig;
    ///
    /// let config = RenderConfig::from_json(r#"{ "max_depth": 8 }"#).unwrap();
    /// assert_eq!(config.max_depth, 8);
    /// assert_eq!(config.marker_text, "");
    /// ```
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.marker_text.contains("--") {
            return Err(ConfigError::Invalid(
                "marker_text cannot contain `--`".to_string(),
            ));
        }
        Ok(())
    }
}
