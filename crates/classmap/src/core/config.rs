//! Workspace configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! naming = "global"
//! quiescence_ms = 150
//! report_unresolved = true
//!
//! [layout]
//! columns = 6
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{NamingScheme, SyncError};

/// Configuration for one synchronized workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub naming: NamingScheme,
    /// Idle time after the last edit before a run starts
    pub quiescence_ms: u64,
    /// Upper bound on how long a steady stream of edits can postpone a run
    pub max_batch_wait_ms: u64,
    /// Parse changed files on the rayon pool
    pub parallel_parse: bool,
    /// Emit a diagnostic for every reference that resolves to nothing
    pub report_unresolved: bool,
    pub layout: LayoutConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            naming: NamingScheme::FileScoped,
            quiescence_ms: 300,
            max_batch_wait_ms: 2_000,
            parallel_parse: true,
            report_unresolved: false,
            layout: LayoutConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, SyncError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| SyncError::config_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.max_batch_wait_ms < self.quiescence_ms {
            return Err(SyncError::config_error(format!(
                "max_batch_wait_ms ({}) must not be shorter than quiescence_ms ({})",
                self.max_batch_wait_ms, self.quiescence_ms
            )));
        }
        self.layout.validate()
    }

    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    pub fn max_batch_wait(&self) -> Duration {
        Duration::from_millis(self.max_batch_wait_ms)
    }
}

/// Placement grid and node sizing, in diagram units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Slots per grid row
    pub columns: usize,
    pub slot_width: f64,
    pub slot_height: f64,
    /// Top-left corner of the first slot
    pub origin_x: f64,
    pub origin_y: f64,
    /// Width of one terminal column of text
    pub char_width: f64,
    pub line_height: f64,
    pub padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: 4,
            slot_width: 240.0,
            slot_height: 180.0,
            origin_x: 40.0,
            origin_y: 40.0,
            char_width: 8.0,
            line_height: 18.0,
            padding: 12.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.columns == 0 {
            return Err(SyncError::config_error(
                "layout.columns must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("slot_width", self.slot_width),
            ("slot_height", self.slot_height),
            ("char_width", self.char_width),
            ("line_height", self.line_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SyncError::config_error(format!(
                    "layout.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if !(self.padding.is_finite() && self.padding >= 0.0) {
            return Err(SyncError::config_error(format!(
                "layout.padding must not be negative, got {}",
                self.padding
            )));
        }
        Ok(())
    }
}
