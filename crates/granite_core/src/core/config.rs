//! # Context Configuration
//!
//! Immutable options handed to a [`SharedContext`](crate::engine::SharedContext)
//! at construction, plus the top-level [`GraniteConfig`] that bundles them with
//! logging settings so a whole setup can be loaded from TOML or RON.

use serde::{Serialize, Deserialize};

use crate::config::{Config, ConfigError};

/// Default budget for the global resource cache (256 MiB)
pub const DEFAULT_RESOURCE_BUDGET: u64 = 256 * 1024 * 1024;

/// # Context Options
///
/// Fixed for the lifetime of a shared context. Every recording context derived
/// from the same shared context observes the same options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Bytes of budgeted GPU memory the global resource cache may retain
    pub resource_budget: u64,
    /// Largest width or height accepted for a surface
    pub max_texture_size: u32,
    /// Sample count used for internal multisampled attachments
    pub internal_sample_count: u32,
    /// Soft limit on entries kept by the cross-thread cache
    pub thread_safe_cache_capacity: usize,
    /// Whether to enable backend validation (`None` = auto-detect)
    pub enable_validation: Option<bool>,
}

impl ContextOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self {
            resource_budget: DEFAULT_RESOURCE_BUDGET,
            max_texture_size: 8192,
            internal_sample_count: 4,
            thread_safe_cache_capacity: 1024,
            enable_validation: None,
        }
    }

    /// Set the global resource cache budget in bytes
    pub fn with_resource_budget(mut self, bytes: u64) -> Self {
        self.resource_budget = bytes;
        self
    }

    /// Set the maximum surface dimension
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size;
        self
    }

    /// Set the internal MSAA sample count
    pub fn with_internal_sample_count(mut self, samples: u32) -> Self {
        self.internal_sample_count = samples;
        self
    }

    /// Set the cross-thread cache capacity
    pub fn with_thread_safe_cache_capacity(mut self, capacity: usize) -> Self {
        self.thread_safe_cache_capacity = capacity;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Enables validation in debug builds and disables it in release builds
    pub fn with_auto_validation(mut self) -> Self {
        self.enable_validation = Some(cfg!(debug_assertions));
        self
    }

    /// Whether validation ends up enabled once auto-detection is applied
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_texture_size == 0 {
            return Err(ConfigError::Invalid("max_texture_size must be at least 1".to_string()));
        }
        if !self.internal_sample_count.is_power_of_two() || self.internal_sample_count > 64 {
            return Err(ConfigError::Invalid(format!(
                "internal_sample_count must be a power of two in 1..=64, got {}",
                self.internal_sample_count
            )));
        }
        if self.thread_safe_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "thread_safe_cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// # Granite Configuration
///
/// Top-level configuration file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraniteConfig {
    /// Log level filter passed to the logger (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
    /// Options for the shared context
    pub context: ContextOptions,
}

impl GraniteConfig {
    /// Validate the whole configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.to_ascii_lowercase().as_str() {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => {}
            other => return Err(ConfigError::Invalid(format!("unknown log level '{other}'"))),
        }
        self.context.validate()
    }
}

impl Default for GraniteConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            context: ContextOptions::default(),
        }
    }
}

impl Config for GraniteConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_options_are_valid() {
        let options = ContextOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.resource_budget, DEFAULT_RESOURCE_BUDGET);
    }

    #[test]
    fn test_invalid_sample_count_rejected() {
        let options = ContextOptions::new().with_internal_sample_count(3);
        assert!(matches!(options.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let config = GraniteConfig {
            log_level: "chatty".to_string(),
            ..GraniteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "log_level = \"debug\"\n\n[context]\nresource_budget = 1024\n").unwrap();

        let config = GraniteConfig::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.context.resource_budget, 1024);
        assert_eq!(config.context.max_texture_size, 8192);
    }

    #[test]
    fn test_ron_save_and_load() {
        let file = Builder::new().suffix(".ron").tempfile().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = GraniteConfig {
            log_level: "warn".to_string(),
            context: ContextOptions::new().with_validation(false).with_max_texture_size(4096),
        };
        config.save_to_file(&path).unwrap();

        let loaded = GraniteConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = GraniteConfig::default().save_to_file("granite.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
