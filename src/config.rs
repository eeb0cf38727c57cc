//! Instrument scale configuration and engine settings.
//!
//! Scale entries are validated where they enter the crate: a full-scale
//! value must be positive and an accuracy class must lie in `(0, 100]`.

use std::collections::BTreeMap;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised at the configuration boundary.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("scale for {group}/{channel} must be positive, got {value}")]
    InvalidScale {
        group: String,
        channel: String,
        value: f64,
    },

    #[error("accuracy class for {group}/{channel} must be in (0, 100], got {value}")]
    InvalidAccuracyClass {
        group: String,
        channel: String,
        value: f64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// ChannelScale
// ---------------------------------------------------------------------------

/// Full-scale value and accuracy class of one analyzer channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelScale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Permitted reduced error, percent of full scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_class: Option<f64>,
}

impl ChannelScale {
    pub fn new(scale: Option<f64>, accuracy_class: Option<f64>) -> Self {
        ChannelScale {
            scale,
            accuracy_class,
        }
    }

    fn validate(&self, group: &str, channel: &str) -> Result<(), ConfigError> {
        if let Some(value) = self.scale {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidScale {
                    group: group.to_string(),
                    channel: channel.to_string(),
                    value,
                });
            }
        }
        if let Some(value) = self.accuracy_class {
            if !(value > 0.0 && value <= 100.0) {
                return Err(ConfigError::InvalidAccuracyClass {
                    group: group.to_string(),
                    channel: channel.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScaleConfig – group → channel → ChannelScale
// ---------------------------------------------------------------------------

/// Scale entries for every group, e.g.
/// `{ "H2S": { "Ametek": { "scale": 50.0, "accuracy_class": 1.5 } } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaleConfig {
    groups: BTreeMap<String, BTreeMap<String, ChannelScale>>,
}

impl ScaleConfig {
    /// Add or replace one entry, refusing out-of-range values.
    pub fn insert(
        &mut self,
        group: &str,
        channel: &str,
        entry: ChannelScale,
    ) -> Result<(), ConfigError> {
        entry.validate(group, channel)?;
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(channel.to_string(), entry);
        Ok(())
    }

    pub fn get(&self, group: &str, channel: &str) -> Option<&ChannelScale> {
        self.groups.get(group)?.get(channel)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Configured full scale, if present and valid.
    pub fn scale(&self, group: &str, channel: &str) -> Option<f64> {
        self.get(group, channel)?
            .scale
            .filter(|s| s.is_finite() && *s > 0.0)
    }

    /// Configured accuracy class, if present and valid.
    pub fn accuracy_class(&self, group: &str, channel: &str) -> Option<f64> {
        self.get(group, channel)?
            .accuracy_class
            .filter(|c| *c > 0.0 && *c <= 100.0)
    }

    /// Strict parse: the first invalid entry fails the whole document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ScaleConfig = serde_json::from_str(text)?;
        for (group, channels) in &config.groups {
            for (channel, entry) in channels {
                entry.validate(group, channel)?;
            }
        }
        Ok(config)
    }

    /// Drop invalid entries instead of failing.
    pub fn sanitized(self) -> Self {
        let mut clean = ScaleConfig::default();
        for (group, channels) in self.groups {
            for (channel, entry) in channels {
                if let Err(e) = clean.insert(&group, &channel, entry) {
                    warn!("ignoring scale entry: {e}");
                }
            }
        }
        clean
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Deployment settings of the comparison engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Substrings (case-insensitive) that mark the reference analyzer.
    #[serde(default = "default_reference_markers")]
    pub reference_markers: Vec<String>,

    /// Replace 0/1 dropout readings with the last genuine reading.
    #[serde(default = "default_outlier_filter")]
    pub outlier_filter: bool,
}

fn default_reference_markers() -> Vec<String> {
    // Second marker mixes Cyrillic "ам" with Latin "etek", as found in exports.
    vec!["ametek".to_string(), "амetek".to_string()]
}

fn default_outlier_filter() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_markers: default_reference_markers(),
            outlier_filter: default_outlier_filter(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
