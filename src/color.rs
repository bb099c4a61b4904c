// SPDX-License-Identifier: PMPL-1.0-or-later
//! Color math - WCAG luminance, contrast and color-vision simulation
//!
//! All functions are pure and total. Unparseable colors silently degrade
//! to black, so callers get a defined (if pessimistic) answer instead of
//! an error.
//! - Relative luminance: <https://www.w3.org/TR/WCAG21/#dfn-relative-luminance>
//! - Contrast ratio: (Lmax + 0.05) / (Lmin + 0.05), range 1..=21

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// An sRGB color with channels normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    /// Build from 8-bit channels
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    /// Channels as 0-255 floats (no rounding)
    fn scaled(&self) -> [f64; 3] {
        [self.r * 255.0, self.g * 255.0, self.b * 255.0]
    }
}

/// Parse a hex color (#rgb, #rrggbb, #rrggbbaa; leading # optional)
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some(Rgb::from_u8(r, g, b))
        }
        // Alpha in the 8-digit form is ignored
        6 | 8 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgb::from_u8(r, g, b))
        }
        _ => None,
    }
}

fn rgb_function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^rgba?\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)").expect("valid regex")
    })
}

/// Parse an rgb() or rgba() color; alpha is ignored
pub fn parse_rgb_color(value: &str) -> Option<Rgb> {
    let caps = rgb_function_re().captures(value.trim())?;
    let r: u8 = caps[1].parse().ok()?;
    let g: u8 = caps[2].parse().ok()?;
    let b: u8 = caps[3].parse().ok()?;
    Some(Rgb::from_u8(r, g, b))
}

/// Parse any supported color notation
pub fn parse_color(value: &str) -> Option<Rgb> {
    let trimmed = value.trim();
    if trimmed.to_ascii_lowercase().starts_with("rgb") {
        parse_rgb_color(trimmed)
    } else {
        parse_hex_color(trimmed)
    }
}

/// Convert a color string to normalized RGB, defaulting to black on malformed input
pub fn hex_to_linear_rgb(hex: &str) -> Rgb {
    parse_color(hex).unwrap_or(Rgb::BLACK)
}

/// Convert normalized RGB back to `#rrggbb`, clamping and rounding each channel
pub fn rgb_to_hex(rgb: Rgb) -> String {
    let [r, g, b] = [rgb.r, rgb.g, rgb.b].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Relative luminance per WCAG 2.x
pub fn relative_luminance(rgb: Rgb) -> f64 {
    let [r, g, b] = [rgb.r, rgb.g, rgb.b].map(|v| {
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    });
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

/// Contrast ratio between two normalized colors, always lighter over darker
pub fn contrast_ratio_rgb(a: Rgb, b: Rgb) -> f64 {
    let l1 = relative_luminance(a);
    let l2 = relative_luminance(b);
    let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Contrast ratio between two color strings
/// Returns a ratio in [1, 21] (e.g., 4.5, 7.0, 21.0)
pub fn contrast_ratio(a: &str, b: &str) -> f64 {
    contrast_ratio_rgb(hex_to_linear_rgb(a), hex_to_linear_rgb(b))
}

/// Color-vision deficiencies that can be simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deficiency {
    Protanopia,
    Deuteranopia,
    Tritanopia,
}

impl Deficiency {
    /// Iteration order also breaks ties when ranking impact
    pub const ALL: [Deficiency; 3] = [
        Deficiency::Protanopia,
        Deficiency::Deuteranopia,
        Deficiency::Tritanopia,
    ];

    /// Row-major simulation matrix applied to normalized RGB
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        match self {
            Deficiency::Protanopia => [
                [0.567, 0.433, 0.0],
                [0.558, 0.442, 0.0],
                [0.0, 0.242, 0.758],
            ],
            Deficiency::Deuteranopia => [
                [0.625, 0.375, 0.0],
                [0.7, 0.3, 0.0],
                [0.0, 0.3, 0.7],
            ],
            Deficiency::Tritanopia => [
                [0.95, 0.05, 0.0],
                [0.0, 0.433, 0.567],
                [0.0, 0.475, 0.525],
            ],
        }
    }

    /// Human-readable label used in finding descriptions
    pub fn label(&self) -> &'static str {
        match self {
            Deficiency::Protanopia => "protanopia (red-blind)",
            Deficiency::Deuteranopia => "deuteranopia (green-blind)",
            Deficiency::Tritanopia => "tritanopia (blue-blind)",
        }
    }

    /// Apply the simulation matrix to a normalized color
    pub fn apply(&self, rgb: Rgb) -> Rgb {
        let m = self.matrix();
        let v = [rgb.r, rgb.g, rgb.b];
        let row = |i: usize| m[i][0] * v[0] + m[i][1] * v[1] + m[i][2] * v[2];
        Rgb { r: row(0), g: row(1), b: row(2) }
    }
}

impl std::fmt::Display for Deficiency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Simulate how a color appears under a deficiency, returned as hex
pub fn simulate(color: &str, deficiency: Deficiency) -> String {
    rgb_to_hex(deficiency.apply(hex_to_linear_rgb(color)))
}

pub fn simulate_protanopia(color: &str) -> String {
    simulate(color, Deficiency::Protanopia)
}

pub fn simulate_deuteranopia(color: &str) -> String {
    simulate(color, Deficiency::Deuteranopia)
}

pub fn simulate_tritanopia(color: &str) -> String {
    simulate(color, Deficiency::Tritanopia)
}

/// Euclidean distance in 0-255 RGB space, range [0, ~441.7]
pub fn color_distance(a: &str, b: &str) -> f64 {
    let a = hex_to_linear_rgb(a).scaled();
    let b = hex_to_linear_rgb(b).scaled();
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (y - x).powi(2))
        .sum::<f64>()
        .sqrt()
}
