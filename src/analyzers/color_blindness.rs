// SPDX-License-Identifier: PMPL-1.0-or-later
//! Color blindness analyzer - WCAG 1.4.1 Use of Color
//!
//! Two checks over pairs of related elements:
//! - colored frames that are distinct normally but collapse under a
//!   simulated color vision deficiency (warning)
//! - small colored indicators next to status text, where color alone
//!   carries the meaning (critical)

use async_trait::async_trait;
use tracing::warn;

use crate::analyzers::{locate, patch_remediation, px, AnalysisContext, Analyzer};
use crate::color::{color_distance, simulate, Deficiency};
use crate::error::Result;
use crate::finding::{Category, Finding, Remediation, Severity};
use crate::geometry::{rects_overlap_or_adjacent, Rect};
use crate::node::{AttributePatch, NodeKind, NodeRef};

const GUIDELINE_LINK: &str = "https://www.w3.org/WAI/WCAG21/Understanding/use-of-color.html";

/// A node with the data needed for adjacency tests
struct Placed<'a> {
    node: &'a NodeRef,
    parent: Option<String>,
    rect: Option<Rect>,
}

impl Placed<'_> {
    fn id(&self) -> &str {
        self.node.id()
    }

    /// Parent/child, siblings, or bounding boxes related on either axis
    fn adjacent_to(&self, other: &Placed<'_>) -> bool {
        if self.parent.as_deref() == Some(other.id()) || other.parent.as_deref() == Some(self.id())
        {
            return true;
        }
        if self.parent.is_some() && self.parent == other.parent {
            return true;
        }
        match (&self.rect, &other.rect) {
            (Some(a), Some(b)) => rects_overlap_or_adjacent(a, b),
            _ => false,
        }
    }
}

async fn place(node: &NodeRef) -> Result<Placed<'_>> {
    let parent = node.parent().await?.map(|p| p.id().to_string());
    let rect = node.rect().await?;
    Ok(Placed { node, parent, rect })
}

/// Frames with a background color and text nodes with content, placed
async fn collect(node: &NodeRef) -> Result<Option<(Placed<'_>, String)>> {
    let attrs = node.attributes().await?;
    let value = match node.kind() {
        NodeKind::Frame => attrs.background_color,
        _ => attrs.text,
    };
    match value {
        Some(value) => Ok(Some((place(node).await?, value))),
        None => Ok(None),
    }
}

/// Distance under the deficiency that shrinks it the most; ties go to
/// the earlier entry of [`Deficiency::ALL`]
pub fn worst_deficiency(a: &str, b: &str) -> (Deficiency, f64) {
    let mut worst = (Deficiency::ALL[0], f64::INFINITY);
    for deficiency in Deficiency::ALL {
        let distance = color_distance(&simulate(a, deficiency), &simulate(b, deficiency));
        if distance < worst.1 {
            worst = (deficiency, distance);
        }
    }
    worst
}

/// Color blindness analyzer
pub struct ColorBlindnessAnalyzer;

#[async_trait]
impl Analyzer for ColorBlindnessAnalyzer {
    fn name(&self) -> &str {
        "colorBlindness"
    }

    fn description(&self) -> &str {
        "Checks related colors stay distinguishable under color vision deficiencies (1.4.1)"
    }

    async fn analyze(&self, nodes: &[NodeRef], ctx: &AnalysisContext) -> Result<Vec<Finding>> {
        let mut colored: Vec<(Placed<'_>, String)> = Vec::new();
        let mut texts: Vec<(Placed<'_>, String)> = Vec::new();

        for node in nodes {
            if ctx.cancel.is_cancelled() {
                return Ok(Vec::new());
            }
            let kind = node.kind();
            if kind != NodeKind::Frame && kind != NodeKind::Text {
                continue;
            }
            match collect(node).await {
                Ok(Some(entry)) if kind == NodeKind::Frame => colored.push(entry),
                Ok(Some(entry)) => texts.push(entry),
                Ok(None) => {}
                Err(e) => warn!("Error analyzing color blindness for node {}: {}", node.id(), e),
            }
        }

        let mut findings = Vec::new();
        for (i, (first, color1)) in colored.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                break;
            }
            for (second, color2) in &colored[i + 1..] {
                if !first.adjacent_to(second) {
                    continue;
                }
                if let Some(finding) = check_distinction(first, color1, color2, ctx) {
                    findings.push(finding);
                }
            }
            if let Some(finding) = check_status_indicator(first, &texts, ctx) {
                findings.push(finding);
            }
        }
        Ok(findings)
    }
}

fn check_distinction(
    first: &Placed<'_>,
    color1: &str,
    color2: &str,
    ctx: &AnalysisContext,
) -> Option<Finding> {
    let threshold = ctx.thresholds.color_difference;
    let normal = color_distance(color1, color2);
    if normal <= threshold {
        return None;
    }
    let (deficiency, simulated) = worst_deficiency(color1, color2);
    if simulated >= threshold {
        return None;
    }
    let loss = normal - simulated;
    Some(
        ctx.finding(
            Category::ColorBlindness,
            Severity::Warning,
            "Color Distinction Issues for Color Blind Users",
            format!(
                "These elements use colors ({} and {}) that may be difficult to distinguish for users with {}. The color difference is reduced by {:.1} under this simulation.",
                color1,
                color2,
                deficiency.label(),
                loss
            ),
            locate(first.node.as_ref(), "Element"),
        )
        .with_guideline("WCAG 2.1 AA - 1.4.1 Use of Color", Some(GUIDELINE_LINK))
        .with_values(
            format!("{:.1} color difference under {}", simulated, deficiency.label()),
            format!("{} minimum color difference", px(threshold)),
        )
        .with_remediation(Remediation::manual(
            "Add a non-color indicator (pattern, icon, or text)",
            "This fix requires adding non-color indicators",
        ))
        .with_remediation(patch_remediation(
            "Increase color contrast for better distinction",
            first.node.clone(),
            AttributePatch::new().background_color("#000000"),
        )),
    )
}

/// One finding per small colored frame sitting next to status wording
fn check_status_indicator(
    frame: &Placed<'_>,
    texts: &[(Placed<'_>, String)],
    ctx: &AnalysisContext,
) -> Option<Finding> {
    let limit = ctx.thresholds.indicator_size;
    let rect = frame.rect?;
    if rect.width > limit || rect.height > limit {
        return None;
    }
    let indicator_name = ctx.classifier.is_indicator(frame.node.name().as_deref());
    let (_, text) = texts.iter().find(|(text, content)| {
        frame.adjacent_to(text) && (indicator_name || ctx.classifier.is_status_text(Some(content.as_str())))
    })?;

    Some(
        ctx.finding(
            Category::ColorBlindness,
            Severity::Critical,
            "Color Alone Used to Convey Information",
            format!(
                "This {}x{}px element next to \"{}\" appears to be a status indicator that relies solely on color to convey information, which may not be perceivable by users with color blindness.",
                px(rect.width),
                px(rect.height),
                text
            ),
            locate(frame.node.as_ref(), "Status Indicator"),
        )
        .with_guideline("WCAG 2.1 A - 1.4.1 Use of Color", Some(GUIDELINE_LINK))
        .with_remediation(Remediation::manual(
            "Add a pattern, icon, or text label to convey the same information",
            "This fix requires adding non-color indicators",
        )),
    )
}
