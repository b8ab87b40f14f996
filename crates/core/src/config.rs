use std::path::Path;

use serde::Deserialize;

use crate::error::{CampaignError, CampaignResult};
use crate::types::ControlGroupType;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_CONSOLE__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub control_group: ControlGroupConfig,
    #[serde(default)]
    pub segments: SegmentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_json")]
    pub json: bool,
}

/// Bounds and defaults for the campaign wizard's control-group step.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlGroupConfig {
    #[serde(default = "default_control_percentage")]
    pub default_percentage: u8,
    #[serde(default = "default_min_percentage")]
    pub min_percentage: u8,
    #[serde(default = "default_max_percentage")]
    pub max_percentage: u8,
    #[serde(default)]
    pub default_type: ControlGroupType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentConfig {
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
    /// Priority given to a freshly created offer-segment mapping.
    #[serde(default = "default_mapping_priority")]
    pub default_priority: u32,
}

// Default functions
fn default_log_filter() -> String {
    "campaign_console=info".to_string()
}
fn default_log_json() -> bool {
    true
}
fn default_control_percentage() -> u8 {
    10
}
fn default_min_percentage() -> u8 {
    1
}
fn default_max_percentage() -> u8 {
    20
}
fn default_max_tags() -> usize {
    20
}
fn default_mapping_priority() -> u32 {
    1
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: default_log_json(),
        }
    }
}

impl Default for ControlGroupConfig {
    fn default() -> Self {
        Self {
            default_percentage: default_control_percentage(),
            min_percentage: default_min_percentage(),
            max_percentage: default_max_percentage(),
            default_type: ControlGroupType::default(),
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_tags: default_max_tags(),
            default_priority: default_mapping_priority(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            control_group: ControlGroupConfig::default(),
            segments: SegmentConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then environment variables.
    /// Environment values take precedence over the file.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_CONSOLE")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Control group bounds must satisfy `1 <= min <= default <= max <= 100`.
    pub fn validate(&self) -> CampaignResult<()> {
        let cg = &self.control_group;
        let ordered = 1 <= cg.min_percentage
            && cg.min_percentage <= cg.default_percentage
            && cg.default_percentage <= cg.max_percentage
            && cg.max_percentage <= 100;
        if !ordered {
            return Err(CampaignError::Config(format!(
                "control_group percentages out of order: min {}, default {}, max {}",
                cg.min_percentage, cg.default_percentage, cg.max_percentage
            )));
        }
        Ok(())
    }
}
