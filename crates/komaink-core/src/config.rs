//! Editor configuration.

use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunable constants for the editor core.
///
/// Every field has a default, so a partial JSON file only needs the keys it
/// wants to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Logical document width.
    pub document_width: f64,
    /// Logical document height.
    pub document_height: f64,
    /// Minimum element width and height in logical units.
    pub min_element_size: f64,
    /// Maximum number of undo snapshots.
    pub history_limit: usize,
    /// Lowest zoom scale.
    pub min_zoom: f64,
    /// Highest zoom scale.
    pub max_zoom: f64,
    /// Multiplicative step used by the zoom tool and zoom shortcuts.
    pub zoom_step: f64,
    /// Size of a panel created by a click without drag.
    pub default_panel_width: f64,
    pub default_panel_height: f64,
    /// Size of a freshly placed dialogue bubble.
    pub default_bubble_width: f64,
    pub default_bubble_height: f64,
    /// Size of a freshly placed text box.
    pub default_text_width: f64,
    pub default_text_height: f64,
    /// Offset applied to duplicated elements.
    pub duplicate_offset: f64,
    /// Coverage percentage above which an image counts as under a panel.
    pub coverage_threshold: f64,
    /// Fill opacity given to a panel once it hosts an image.
    pub hosted_fill_opacity: f64,
    /// Restore the pre-hosting fill opacity when a panel loses its image.
    pub restore_fill_on_unhost: bool,
    /// Hit radius for resize handles, in logical units at 100% zoom.
    pub handle_tolerance: f64,
    /// Seed for jittered panel outlines. `None` derives one per editor.
    pub rng_seed: Option<u64>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            document_width: 1200.0,
            document_height: 1600.0,
            min_element_size: 20.0,
            history_limit: 50,
            min_zoom: 0.25,
            max_zoom: 4.0,
            zoom_step: 1.25,
            default_panel_width: 200.0,
            default_panel_height: 150.0,
            default_bubble_width: 160.0,
            default_bubble_height: 100.0,
            default_text_width: 140.0,
            default_text_height: 40.0,
            duplicate_offset: 20.0,
            coverage_threshold: 10.0,
            hosted_fill_opacity: 0.05,
            restore_fill_on_unhost: true,
            handle_tolerance: 8.0,
            rng_seed: None,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded editor config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Logical document size.
    pub fn document_size(&self) -> Size {
        Size::new(self.document_width, self.document_height)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.document_width <= 0.0 || self.document_height <= 0.0 {
            return Err(ConfigError::Invalid("document size must be positive".into()));
        }
        if self.min_element_size <= 0.0 {
            return Err(ConfigError::Invalid("min_element_size must be positive".into()));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid("history_limit must be at least 1".into()));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom && self.max_zoom.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "zoom bounds out of order: {} > {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.zoom_step <= 1.0 {
            return Err(ConfigError::Invalid("zoom_step must be greater than 1".into()));
        }
        if !(0.0..=100.0).contains(&self.coverage_threshold) {
            return Err(ConfigError::Invalid("coverage_threshold must be a percentage".into()));
        }
        if !(0.0..=1.0).contains(&self.hosted_fill_opacity) {
            return Err(ConfigError::Invalid("hosted_fill_opacity must be in [0, 1]".into()));
        }
        Ok(())
    }
}
