// SPDX-License-Identifier: PMPL-1.0-or-later
//! Bounding-box helpers for adjacency and spacing checks.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Start and end of the extent along an axis
    fn span(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::Horizontal => (self.x, self.right()),
            Axis::Vertical => (self.y, self.bottom()),
        }
    }
}

/// Measurement axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn other(&self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "horizontal"),
            Axis::Vertical => write!(f, "vertical"),
        }
    }
}

/// Signed gap between two extents along an axis; zero or negative means
/// the extents touch or overlap.
pub fn axis_gap(a: &Rect, b: &Rect, axis: Axis) -> f64 {
    let (a0, a1) = a.span(axis);
    let (b0, b1) = b.span(axis);
    a0.max(b0) - a1.min(b1)
}

/// True when the extents overlap (or touch) along the axis
pub fn ranges_overlap(a: &Rect, b: &Rect, axis: Axis) -> bool {
    axis_gap(a, b, axis) <= 0.0
}

/// Permissive "might be visually related" test: horizontal ranges overlap
/// OR vertical ranges overlap.
pub fn rects_overlap_or_adjacent(a: &Rect, b: &Rect) -> bool {
    ranges_overlap(a, b, Axis::Horizontal) || ranges_overlap(a, b, Axis::Vertical)
}

/// Gap between two rectangles along `axis`, defined only when they are
/// aligned along the other axis (e.g. horizontal gap of two items in a row).
pub fn edge_distance(a: &Rect, b: &Rect, axis: Axis) -> Option<f64> {
    if !ranges_overlap(a, b, axis.other()) {
        return None;
    }
    Some(axis_gap(a, b, axis))
}

/// Gap along `axis` when it is non-negative and below `minimum`
pub fn spacing_violation(a: &Rect, b: &Rect, axis: Axis, minimum: f64) -> Option<f64> {
    edge_distance(a, b, axis).filter(|gap| *gap >= 0.0 && *gap < minimum)
}
