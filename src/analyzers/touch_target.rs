// SPDX-License-Identifier: PMPL-1.0-or-later
//! Touch target analyzer - WCAG 2.5.5 Target Size
//!
//! Interactive frames (recognized by name) must be at least 44x44px and
//! sit at least 8px away from neighbouring targets in the same row or
//! column.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::analyzers::{locate, patch_remediation, px, AnalysisContext, Analyzer};
use crate::error::Result;
use crate::finding::{Category, Finding, Remediation, Severity};
use crate::geometry::{spacing_violation, Axis, Rect};
use crate::node::{AttributePatch, NodeKind, NodeRef};

const GUIDELINE: &str = "WCAG 2.1 AAA - 2.5.5 Target Size";
const GUIDELINE_LINK: &str = "https://www.w3.org/WAI/WCAG21/Understanding/target-size.html";

/// Touch target size and spacing analyzer
pub struct TouchTargetAnalyzer;

#[async_trait]
impl Analyzer for TouchTargetAnalyzer {
    fn name(&self) -> &str {
        "touchTargets"
    }

    fn description(&self) -> &str {
        "Checks interactive target size and spacing (2.5.5)"
    }

    async fn analyze(&self, nodes: &[NodeRef], ctx: &AnalysisContext) -> Result<Vec<Finding>> {
        let targets: Vec<&NodeRef> = nodes
            .iter()
            .filter(|n| n.kind() == NodeKind::Frame)
            .filter(|n| ctx.classifier.is_touch_target(n.name().as_deref()))
            .collect();

        // Geometry is fetched once per target; targets without one are skipped
        let mut placed: Vec<(&NodeRef, Rect)> = Vec::with_capacity(targets.len());
        for node in targets {
            if ctx.cancel.is_cancelled() {
                return Ok(Vec::new());
            }
            match node.rect().await {
                Ok(Some(rect)) => placed.push((node, rect)),
                Ok(None) => debug!("Touch target {} has no geometry", node.id()),
                Err(e) => warn!("Error analyzing touch target for node {}: {}", node.id(), e),
            }
        }

        let mut findings = Vec::new();
        for (i, (node, rect)) in placed.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                break;
            }
            if let Some(finding) = check_size(node, rect, ctx) {
                findings.push(finding);
            }
            // Each unordered pair is checked once, reported at the earlier target
            for (_, other) in &placed[i + 1..] {
                if let Some(gap) = pair_spacing(rect, other, ctx.thresholds.min_touch_spacing) {
                    findings.push(spacing_finding(node, gap, ctx));
                }
            }
        }
        Ok(findings)
    }
}

fn check_size(node: &NodeRef, rect: &Rect, ctx: &AnalysisContext) -> Option<Finding> {
    let min = ctx.thresholds.min_touch_target;
    if rect.width >= min && rect.height >= min {
        return None;
    }
    let (w, h) = (px(rect.width), px(rect.height));
    let m = px(min);
    Some(
        ctx.finding(
            Category::TouchTarget,
            Severity::Critical,
            "Touch Target Too Small",
            format!(
                "This interactive element is {w}x{h}px, which is smaller than the recommended minimum size of {m}x{m}px."
            ),
            locate(node.as_ref(), "Interactive Element"),
        )
        .with_guideline(GUIDELINE, Some(GUIDELINE_LINK))
        .with_values(format!("{w}x{h}px"), format!("{m}x{m}px minimum"))
        .with_remediation(patch_remediation(
            format!("Increase element size to at least {m}x{m}px"),
            (*node).clone(),
            AttributePatch::new().size(rect.width.max(min), rect.height.max(min)),
        )),
    )
}

/// Gap between two targets in the same row, else the same column, when
/// it is below `minimum`
pub fn pair_spacing(a: &Rect, b: &Rect, minimum: f64) -> Option<f64> {
    spacing_violation(a, b, Axis::Horizontal, minimum)
        .or_else(|| spacing_violation(a, b, Axis::Vertical, minimum))
}

fn spacing_finding(node: &NodeRef, gap: f64, ctx: &AnalysisContext) -> Finding {
    let min = px(ctx.thresholds.min_touch_spacing);
    ctx.finding(
        Category::TouchTarget,
        Severity::Warning,
        "Touch Targets Too Close",
        format!(
            "This interactive element is only {gap:.1}px away from another interactive element. The recommended minimum spacing is {min}px."
        ),
        locate(node.as_ref(), "Interactive Element"),
    )
    .with_guideline("WCAG 2.1 AAA - 2.5.5 Target Size (Enhanced)", Some(GUIDELINE_LINK))
    .with_values(format!("{gap:.1}px spacing"), format!("{min}px minimum spacing"))
    .with_remediation(Remediation::manual(
        "Increase spacing between interactive elements",
        "This fix requires manual adjustment of element positions",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{ctx, doc};
    use crate::document::NodeSpec;

    async fn run(nodes: Vec<NodeSpec>) -> Vec<Finding> {
        let doc = doc(nodes);
        TouchTargetAnalyzer
            .analyze(&doc.all_nodes(), &ctx())
            .await
            .expect("ok")
    }

    #[tokio::test]
    async fn test_small_button_is_critical() {
        let findings = run(vec![NodeSpec::frame("b", "Button").at(0.0, 0.0, 40.0, 40.0)]).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].current_value.as_deref(), Some("40x40px"));
        assert_eq!(findings[0].required_value.as_deref(), Some("44x44px minimum"));
    }

    #[tokio::test]
    async fn test_non_interactive_frames_ignored() {
        let findings = run(vec![NodeSpec::frame("c", "Card").at(0.0, 0.0, 10.0, 10.0)]).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_close_pair_reported_once() {
        let findings = run(vec![
            NodeSpec::frame("a", "Tab One").at(0.0, 0.0, 48.0, 48.0),
            NodeSpec::frame("b", "Tab Two").at(52.0, 0.0, 48.0, 48.0),
        ])
        .await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].current_value.as_deref(), Some("4.0px spacing"));
        assert_eq!(findings[0].location.node_id, "a");
    }

    #[tokio::test]
    async fn test_well_spaced_pair_passes() {
        let findings = run(vec![
            NodeSpec::frame("a", "Link").at(0.0, 0.0, 48.0, 48.0),
            NodeSpec::frame("b", "Link").at(0.0, 60.0, 48.0, 48.0),
            NodeSpec::frame("c", "Link").at(200.0, 200.0, 48.0, 48.0),
        ])
        .await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_resize_remediation() {
        let doc = doc(vec![NodeSpec::frame("b", "Toggle").at(0.0, 0.0, 60.0, 30.0)]);
        let nodes = doc.all_nodes();
        let findings = TouchTargetAnalyzer.analyze(&nodes, &ctx()).await.expect("ok");
        assert_eq!(findings[0].current_value.as_deref(), Some("60x30px"));
        findings[0].remediations[0].apply().await;
        let rect = doc.node("b").expect("exists").rect().await.expect("rect");
        assert_eq!(rect, Some(Rect::new(0.0, 0.0, 60.0, 44.0)));
    }

    #[test]
    fn test_pair_spacing_prefers_row() {
        let a = Rect::new(0.0, 0.0, 44.0, 44.0);
        let b = Rect::new(46.0, 0.0, 44.0, 44.0);
        assert_eq!(pair_spacing(&a, &b, 8.0), Some(2.0));
        let below = Rect::new(0.0, 50.0, 44.0, 44.0);
        assert_eq!(pair_spacing(&a, &below, 8.0), Some(6.0));
    }
}
