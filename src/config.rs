//! Runtime tuning for the grid.

use serde::Deserialize;

use crate::autoscroll::AutoScrollConfig;
use crate::error::{GridError, Result};

/// Options accepted from the host. Every field is optional; missing fields
/// take the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Distance (px) from a container edge at which drag auto-scroll kicks in.
    pub edge_threshold: f64,
    /// Auto-scroll pixels per frame at 1x speed.
    pub scroll_step: f64,
    /// Auto-scroll speed multiplier at and beyond the edge.
    pub max_scroll_multiplier: f64,
    /// Margin kept around the focused cell after keyboard navigation.
    pub keyboard_scroll_margin: f64,
    /// Delay before a blurred editor confirms. 0 confirms on the next tick.
    pub blur_confirm_delay_ms: u32,
    /// How long the copied-cells marker stays up after a copy.
    pub copied_flash_ms: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            edge_threshold: 50.0,
            scroll_step: 20.0,
            max_scroll_multiplier: 2.0,
            keyboard_scroll_margin: 60.0,
            blur_confirm_delay_ms: 0,
            copied_flash_ms: 600,
        }
    }
}

impl GridConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make auto-scroll misbehave.
    pub fn validate(&self) -> Result<()> {
        if !self.edge_threshold.is_finite() || self.edge_threshold < 0.0 {
            return Err(GridError::Config(format!(
                "edgeThreshold must be a non-negative number, got {}",
                self.edge_threshold
            )));
        }
        if !self.scroll_step.is_finite() || self.scroll_step < 0.0 {
            return Err(GridError::Config(format!(
                "scrollStep must be a non-negative number, got {}",
                self.scroll_step
            )));
        }
        if !self.max_scroll_multiplier.is_finite() || self.max_scroll_multiplier < 1.0 {
            return Err(GridError::Config(format!(
                "maxScrollMultiplier must be at least 1, got {}",
                self.max_scroll_multiplier
            )));
        }
        if !self.keyboard_scroll_margin.is_finite() || self.keyboard_scroll_margin < 0.0 {
            return Err(GridError::Config(format!(
                "keyboardScrollMargin must be a non-negative number, got {}",
                self.keyboard_scroll_margin
            )));
        }
        Ok(())
    }

    pub fn auto_scroll(&self) -> AutoScrollConfig {
        AutoScrollConfig {
            edge_threshold: self.edge_threshold,
            base_step: self.scroll_step,
            max_multiplier: self.max_scroll_multiplier,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridConfig::default();
        assert_eq!(config.edge_threshold, 50.0);
        assert_eq!(config.keyboard_scroll_margin, 60.0);
        assert_eq!(config.auto_scroll(), AutoScrollConfig::default());
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config = GridConfig::from_json(r#"{"scrollStep": 30, "copiedFlashMs": 1000}"#).unwrap();
        assert_eq!(config.scroll_step, 30.0);
        assert_eq!(config.copied_flash_ms, 1000);
        assert_eq!(config.edge_threshold, 50.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = GridConfig::from_json(r#"{"maxScrollMultiplier": 0.5}"#).unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
        let err = GridConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
    }
}
