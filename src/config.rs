// SPDX-License-Identifier: PMPL-1.0-or-later
//! Configuration handling for a11yaudit
//!
//! Every field has a default, so an empty TOML file (or no file at all)
//! yields the WCAG-derived thresholds.

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Measurement thresholds
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Orchestration settings
    #[serde(default)]
    pub scan: ScanSettings,

    /// Name/text classification patterns
    #[serde(default)]
    pub patterns: PatternConfig,
}

impl AuditConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: AuditConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the orchestrator cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.scan.min_batch_size == 0 {
            return Err(AuditError::Config("scan.min_batch_size must be at least 1".into()));
        }
        if self.scan.min_batch_size > self.scan.max_batch_size {
            return Err(AuditError::Config(format!(
                "scan.min_batch_size ({}) exceeds scan.max_batch_size ({})",
                self.scan.min_batch_size, self.scan.max_batch_size
            )));
        }
        if self.scan.batch_divisor == 0 {
            return Err(AuditError::Config("scan.batch_divisor must be at least 1".into()));
        }
        Ok(())
    }
}

/// WCAG and heuristic thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum body font size in px (1.4.4)
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f64,

    /// All-caps text longer than this many characters is flagged
    #[serde(default = "default_all_caps_min_length")]
    pub all_caps_min_length: usize,

    /// Minimum touch target edge in px (2.5.5)
    #[serde(default = "default_min_touch_target")]
    pub min_touch_target: f64,

    /// Minimum gap between adjacent touch targets in px
    #[serde(default = "default_min_touch_spacing")]
    pub min_touch_spacing: f64,

    /// Images smaller than this in either dimension look decorative
    #[serde(default = "default_small_image")]
    pub small_image: f64,

    /// Euclidean RGB distance considered distinguishable
    #[serde(default = "default_color_difference")]
    pub color_difference: f64,

    /// Largest frame edge treated as a color-only indicator
    #[serde(default = "default_indicator_size")]
    pub indicator_size: f64,

    /// Font size at which text counts as large
    #[serde(default = "default_large_text_size")]
    pub large_text_size: f64,

    /// Font size at which bold text counts as large
    #[serde(default = "default_large_bold_text_size")]
    pub large_bold_text_size: f64,

    /// Font weight at or above which text is bold
    #[serde(default = "default_bold_weight")]
    pub bold_weight: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_font_size: default_min_font_size(),
            all_caps_min_length: default_all_caps_min_length(),
            min_touch_target: default_min_touch_target(),
            min_touch_spacing: default_min_touch_spacing(),
            small_image: default_small_image(),
            color_difference: default_color_difference(),
            indicator_size: default_indicator_size(),
            large_text_size: default_large_text_size(),
            large_bold_text_size: default_large_bold_text_size(),
            bold_weight: default_bold_weight(),
        }
    }
}

fn default_min_font_size() -> f64 {
    12.0
}

fn default_all_caps_min_length() -> usize {
    20
}

fn default_min_touch_target() -> f64 {
    44.0
}

fn default_min_touch_spacing() -> f64 {
    8.0
}

fn default_small_image() -> f64 {
    24.0
}

fn default_color_difference() -> f64 {
    30.0
}

fn default_indicator_size() -> f64 {
    24.0
}

fn default_large_text_size() -> f64 {
    18.0
}

fn default_large_bold_text_size() -> f64 {
    14.0
}

fn default_bold_weight() -> u16 {
    700
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Run the color-blindness analyzer
    #[serde(default = "default_true")]
    pub include_color_blindness: bool,

    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Batch size is `len / batch_divisor`, clamped to the bounds above
    #[serde(default = "default_batch_divisor")]
    pub batch_divisor: usize,

    /// Pause between batches
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl ScanSettings {
    /// `clamp(min, floor(len / divisor), max)`
    pub fn batch_size(&self, len: usize) -> usize {
        (len / self.batch_divisor.max(1))
            .max(self.min_batch_size)
            .min(self.max_batch_size)
            .max(1)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            include_color_blindness: true,
            min_batch_size: default_min_batch_size(),
            max_batch_size: default_max_batch_size(),
            batch_divisor: default_batch_divisor(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_batch_size() -> usize {
    50
}

fn default_max_batch_size() -> usize {
    500
}

fn default_batch_divisor() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    10
}

/// Regex tables for name-based classification (case-insensitive unless
/// the pattern says otherwise)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Frames checked for touch target size and spacing
    #[serde(default = "default_touch_target")]
    pub touch_target: String,

    /// Nodes of any kind that need a keyboard focus state
    #[serde(default = "default_interactive")]
    pub interactive: String,

    /// Names that indicate a focus/selected state variant
    #[serde(default = "default_focus_state")]
    pub focus_state: String,

    /// Frames analyzed for reading order and heading levels
    #[serde(default = "default_container")]
    pub container: String,

    /// Text nodes treated as headings
    #[serde(default = "default_heading")]
    pub heading: String,

    /// Heading level extraction; capture group 1 is the level
    #[serde(default = "default_heading_level")]
    pub heading_level: String,

    /// Image frames that are probably decorative
    #[serde(default = "default_decorative")]
    pub decorative: String,

    /// Text content that reads like a status
    #[serde(default = "default_status_word")]
    pub status_word: String,

    /// Frame names that suggest a colored indicator
    #[serde(default = "default_indicator")]
    pub indicator: String,

    #[serde(default = "default_landmark_header")]
    pub landmark_header: String,

    #[serde(default = "default_landmark_navigation")]
    pub landmark_navigation: String,

    #[serde(default = "default_landmark_main")]
    pub landmark_main: String,

    #[serde(default = "default_landmark_footer")]
    pub landmark_footer: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            touch_target: default_touch_target(),
            interactive: default_interactive(),
            focus_state: default_focus_state(),
            container: default_container(),
            heading: default_heading(),
            heading_level: default_heading_level(),
            decorative: default_decorative(),
            status_word: default_status_word(),
            indicator: default_indicator(),
            landmark_header: default_landmark_header(),
            landmark_navigation: default_landmark_navigation(),
            landmark_main: default_landmark_main(),
            landmark_footer: default_landmark_footer(),
        }
    }
}

fn default_touch_target() -> String {
    "button|btn|link|tab|toggle|switch|menu|dropdown|select|checkbox|radio|slider".into()
}

fn default_interactive() -> String {
    "button|link|input|checkbox|radio|tab|dropdown|menu|select".into()
}

fn default_focus_state() -> String {
    "focus|focused|selected|active".into()
}

fn default_container() -> String {
    "container|section|layout|view|page|screen|panel|group".into()
}

fn default_heading() -> String {
    "heading|h[1-6]".into()
}

fn default_heading_level() -> String {
    "h([1-6])".into()
}

fn default_decorative() -> String {
    "icon|decoration|divider|separator|ornament".into()
}

fn default_status_word() -> String {
    "status|state|success|error|warning|info|active|inactive|enabled|disabled|on|off|yes|no|completed|pending|progress".into()
}

fn default_indicator() -> String {
    "indicator|status|state|dot|circle|badge".into()
}

fn default_landmark_header() -> String {
    "header|banner".into()
}

fn default_landmark_navigation() -> String {
    "nav|navigation|menu".into()
}

fn default_landmark_main() -> String {
    "main|content".into()
}

fn default_landmark_footer() -> String {
    "footer".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert_eq!(config.thresholds.min_touch_target, 44.0);
        assert_eq!(config.thresholds.color_difference, 30.0);
        assert!(config.scan.include_color_blindness);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_clamp() {
        let scan = ScanSettings::default();
        assert_eq!(scan.batch_size(0), 50);
        assert_eq!(scan.batch_size(30), 50);
        assert_eq!(scan.batch_size(1_000), 100);
        assert_eq!(scan.batch_size(4_321), 432);
        assert_eq!(scan.batch_size(100_000), 500);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AuditConfig = toml::from_str(
            r#"
            [thresholds]
            min_font_size = 14.0

            [scan]
            include_color_blindness = false
            "#,
        )
        .expect("valid toml");
        assert_eq!(config.thresholds.min_font_size, 14.0);
        assert_eq!(config.thresholds.min_touch_target, 44.0);
        assert!(!config.scan.include_color_blindness);
        assert_eq!(config.scan.max_batch_size, 500);
        assert_eq!(config.patterns.landmark_footer, "footer");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[scan]\nmin_batch_size = 10\nmax_batch_size = 20").expect("write");
        let config = AuditConfig::load(file.path()).expect("loads");
        assert_eq!(config.scan.batch_size(1_000), 20);
    }

    #[test]
    fn test_invalid_batch_bounds_rejected() {
        let mut config = AuditConfig::default();
        config.scan.min_batch_size = 600;
        assert!(matches!(config.validate(), Err(AuditError::Config(_))));
    }
}
