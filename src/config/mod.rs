//! Compile pass configuration.
//!
//! Loaded from JSON (every field optional) and validated once before a
//! compile task is created.

use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompileConfig validation failed: {}", self.message)
    }
}

impl Error for ConfigError {}

impl From<ConfigError> for CompileError {
    fn from(err: ConfigError) -> Self {
        CompileError::Config(err.message)
    }
}

/// Tunables for one tile compile pass.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompileConfig {
    /// Features processed per bundle before the time budget is checked.
    pub bundle_size: usize,
    /// Maximum wall time spent inside one `step` call, in milliseconds.
    pub time_budget_ms: u64,
    /// Minimum spacing between repeated line placements, in tile pixels.
    pub default_repeat_distance: f32,
    /// Number of failed loads tolerated before a resource is skipped for good.
    pub max_resource_retries: u32,
    /// Edge length of a tile in pixels.
    pub tile_size: u32,
    /// Scale line widths with the fractional zoom of the tile.
    pub line_width_zoom_scale: bool,
    /// Quantization steps for opacity in group signatures.
    pub opacity_steps: u32,
    /// Default for the per-declaration `checkLineSpace` attribute.
    pub check_line_space: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            bundle_size: 32,
            time_budget_ms: 8,
            default_repeat_distance: 256.0,
            max_resource_retries: 3,
            tile_size: 256,
            line_width_zoom_scale: true,
            opacity_steps: 100,
            check_line_space: true,
        }
    }
}

impl CompileConfig {
    /// Parse from a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CompileError> {
        let cfg: CompileConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bundle_size == 0 {
            return Err(ConfigError::new("bundle_size must be greater than zero"));
        }
        if self.max_resource_retries == 0 {
            return Err(ConfigError::new(
                "max_resource_retries must be at least 1",
            ));
        }
        if !self.tile_size.is_power_of_two() || self.tile_size < 64 {
            return Err(ConfigError::new(
                "tile_size must be a power of two and at least 64",
            ));
        }
        if !self.default_repeat_distance.is_finite() || self.default_repeat_distance < 0.0 {
            return Err(ConfigError::new(
                "default_repeat_distance must be finite and non-negative",
            ));
        }
        if self.opacity_steps == 0 || self.opacity_steps > 1000 {
            return Err(ConfigError::new("opacity_steps must be within [1, 1000]"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
