// SPDX-License-Identifier: PMPL-1.0-or-later
//! Navigation analyzer - WCAG 1.3.1, 1.3.2 and 2.4.7
//!
//! Structural checks inferred from layer names:
//! - reading order inside containers (1.3.2 Meaningful Sequence)
//! - skipped heading levels (1.3.1 Info and Relationships)
//! - missing landmark regions (1.3.1)
//! - interactive elements without any focus state (2.4.7 Focus Visible)

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::warn;

use crate::analyzers::{locate, patch_remediation, AnalysisContext, Analyzer};
use crate::classify::Landmark;
use crate::error::Result;
use crate::finding::{Category, Finding, Location, Remediation, Severity};
use crate::geometry::Rect;
use crate::node::{AttributePatch, NodeKind, NodeRef};

const RELATIONSHIPS: &str = "WCAG 2.1 A - 1.3.1 Info and Relationships";
const RELATIONSHIPS_LINK: &str =
    "https://www.w3.org/WAI/WCAG21/Understanding/info-and-relationships.html";

/// Level given to headings without a recognizable level, so they sort last
const UNKNOWN_LEVEL: u32 = 999;

/// Navigation and structure analyzer
pub struct NavigationAnalyzer;

#[async_trait]
impl Analyzer for NavigationAnalyzer {
    fn name(&self) -> &str {
        "navigation"
    }

    fn description(&self) -> &str {
        "Checks reading order, heading levels, landmarks and focus states (1.3.1/1.3.2/2.4.7)"
    }

    async fn analyze(&self, nodes: &[NodeRef], ctx: &AnalysisContext) -> Result<Vec<Finding>> {
        let containers: Vec<&NodeRef> = nodes
            .iter()
            .filter(|n| n.kind() == NodeKind::Frame)
            .filter(|n| ctx.classifier.is_container(n.name().as_deref()))
            .collect();

        let mut findings = Vec::new();
        for container in &containers {
            if ctx.cancel.is_cancelled() {
                return Ok(findings);
            }
            match check_container(container, ctx).await {
                Ok(mut found) => findings.append(&mut found),
                Err(e) => warn!(
                    "Error analyzing navigation for container {}: {}",
                    container.id(),
                    e
                ),
            }
        }

        findings.extend(check_landmarks(nodes, containers.first().copied(), ctx));
        findings.extend(check_focus_states(nodes, ctx));
        Ok(findings)
    }
}

async fn check_container(container: &NodeRef, ctx: &AnalysisContext) -> Result<Vec<Finding>> {
    let children = container.children().await?;
    if children.len() < 2 {
        return Ok(Vec::new());
    }

    let mut placed: Vec<(&NodeRef, Rect)> = Vec::with_capacity(children.len());
    for child in &children {
        if let Some(rect) = child.rect().await? {
            placed.push((child, rect));
        }
    }

    let mut findings = Vec::new();
    if let Some(displacement) = reading_order_displacement(&placed) {
        findings.push(
            ctx.finding(
                Category::Navigation,
                Severity::Warning,
                "Potentially Confusing Reading Order",
                format!(
                    "The visual arrangement of the {} elements in this container may not match the expected reading order (an element is {} positions away from its layer order), which can be confusing for screen reader users.",
                    placed.len(),
                    displacement
                ),
                locate(container.as_ref(), "Container"),
            )
            .with_guideline(
                "WCAG 2.1 A - 1.3.2 Meaningful Sequence",
                Some("https://www.w3.org/WAI/WCAG21/Understanding/meaningful-sequence.html"),
            )
            .with_remediation(Remediation::manual(
                "Reorder elements to match visual reading order",
                "This fix requires manual reordering of elements",
            )),
        );
    }

    findings.extend(check_headings(&children, ctx));
    Ok(findings)
}

/// Largest distance between an element's top-to-bottom position and its
/// layer position, when that exceeds one place
pub fn reading_order_displacement(placed: &[(&NodeRef, Rect)]) -> Option<usize> {
    let mut visual: Vec<usize> = (0..placed.len()).collect();
    visual.sort_by(|a, b| placed[*a].1.y.total_cmp(&placed[*b].1.y));
    visual
        .iter()
        .enumerate()
        .map(|(position, dom_index)| position.abs_diff(*dom_index))
        .max()
        .filter(|d| *d > 1)
}

fn check_headings(children: &[NodeRef], ctx: &AnalysisContext) -> Vec<Finding> {
    let mut headings: Vec<(&NodeRef, Option<u32>)> = children
        .iter()
        .filter(|c| c.kind() == NodeKind::Text)
        .map(|c| (c, c.name()))
        .filter(|(_, name)| ctx.classifier.is_heading(name.as_deref()))
        .map(|(c, name)| (c, ctx.classifier.heading_level(name.as_deref())))
        .collect();
    if headings.len() < 2 {
        return Vec::new();
    }
    headings.sort_by_key(|(_, level)| level.unwrap_or(UNKNOWN_LEVEL));

    let mut findings = Vec::new();
    for pair in headings.windows(2) {
        let ((_, Some(current)), (next, Some(level))) = (pair[0], pair[1]) else {
            continue;
        };
        if level - current <= 1 {
            continue;
        }
        let expected = current + 1;
        let mut finding = ctx
            .finding(
                Category::Navigation,
                Severity::Info,
                "Heading Levels May Be Skipped",
                format!(
                    "There appears to be a gap between heading levels ({} to {}). This can be confusing for screen reader users navigating by headings.",
                    current, level
                ),
                locate(next.as_ref(), "Heading"),
            )
            .with_guideline(RELATIONSHIPS, Some(RELATIONSHIPS_LINK))
            .with_values(
                format!("Heading level: h{} (after h{})", level, current),
                format!(
                    "Sequential heading levels (h{} should be followed by h{})",
                    current, expected
                ),
            );
        let description = format!("Rename heading to h{} or adjust heading hierarchy", expected);
        let renamed = next
            .name()
            .and_then(|name| ctx.classifier.with_heading_level(&name, expected));
        finding = match renamed {
            Some(name) => finding.with_remediation(patch_remediation(
                description,
                next.clone(),
                AttributePatch::new().name(&name),
            )),
            None => finding.with_remediation(Remediation::manual(
                description,
                "This fix requires renaming the heading manually",
            )),
        };
        findings.push(finding);
    }
    findings
}

/// Landmark groups with no matching node name
pub fn missing_landmarks(nodes: &[NodeRef], ctx: &AnalysisContext) -> Vec<Landmark> {
    let mut found = HashSet::new();
    for name in nodes.iter().filter_map(|n| n.name()) {
        found.extend(ctx.classifier.landmarks(&name));
    }
    Landmark::ALL
        .into_iter()
        .filter(|l| !found.contains(l))
        .collect()
}

fn check_landmarks(
    nodes: &[NodeRef],
    first_container: Option<&NodeRef>,
    ctx: &AnalysisContext,
) -> Option<Finding> {
    let missing = missing_landmarks(nodes, ctx);
    if missing.is_empty() {
        return None;
    }
    let labels: Vec<&str> = missing.iter().map(|l| l.label()).collect();
    let location = Location {
        node_id: first_container
            .map(|c| c.id().to_string())
            .unwrap_or_else(|| "root".to_string()),
        node_name: "Page Structure".to_string(),
        node_path: "root".to_string(),
    };
    Some(
        ctx.finding(
            Category::Navigation,
            Severity::Info,
            "Missing Landmark Regions",
            format!(
                "This design appears to be missing some standard landmark regions: {}. Landmarks help screen reader users navigate content.",
                labels.join(", ")
            ),
            location,
        )
        .with_guideline(RELATIONSHIPS, Some(RELATIONSHIPS_LINK))
        .with_remediation(Remediation::manual(
            "Add missing landmark regions with appropriate names",
            "This fix requires manually adding landmark regions",
        )),
    )
}

fn check_focus_states(nodes: &[NodeRef], ctx: &AnalysisContext) -> Option<Finding> {
    let interactive: Vec<&NodeRef> = nodes
        .iter()
        .filter(|n| ctx.classifier.is_interactive(n.name().as_deref()))
        .collect();
    let first = *interactive.first()?;
    if interactive
        .iter()
        .any(|n| ctx.classifier.has_focus_state(n.name().as_deref()))
    {
        return None;
    }
    Some(
        ctx.finding(
            Category::Navigation,
            Severity::Critical,
            "Missing Keyboard Focus Indicators",
            format!(
                "None of the {} interactive elements appear to have visible focus states defined. Focus indicators are essential for keyboard navigation.",
                interactive.len()
            ),
            locate(first.as_ref(), "Interactive Element"),
        )
        .with_guideline(
            "WCAG 2.1 AA - 2.4.7 Focus Visible",
            Some("https://www.w3.org/WAI/WCAG21/Understanding/focus-visible.html"),
        )
        .with_remediation(Remediation::manual(
            "Add focus states to all interactive elements",
            "This fix requires manually adding focus states to components",
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{ctx, doc};
    use crate::document::NodeSpec;

    fn landmarks() -> Vec<NodeSpec> {
        vec![
            NodeSpec::frame("hdr", "Header"),
            NodeSpec::frame("nav", "Nav"),
            NodeSpec::frame("main", "Main"),
            NodeSpec::frame("ftr", "Footer"),
        ]
    }

    async fn run(nodes: Vec<NodeSpec>) -> Vec<Finding> {
        let doc = doc(nodes);
        NavigationAnalyzer
            .analyze(&doc.all_nodes(), &ctx())
            .await
            .expect("ok")
    }

    #[tokio::test]
    async fn test_missing_landmarks_listed_once() {
        let findings = run(vec![NodeSpec::frame("s", "Section")
            .child(NodeSpec::frame("h", "Top Banner"))])
        .await;
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.severity, Severity::Info);
        assert!(f
            .description
            .contains("navigation, main content area, footer"));
        assert_eq!(f.location.node_id, "s");
        assert_eq!(f.location.node_path, "root");
    }

    #[tokio::test]
    async fn test_landmark_location_defaults_to_root() {
        let findings = run(vec![NodeSpec::frame("x", "Card")]).await;
        assert_eq!(findings[0].location.node_id, "root");
    }

    #[tokio::test]
    async fn test_reading_order_warning() {
        let mut nodes = landmarks();
        nodes.push(
            NodeSpec::frame("c", "Content Panel")
                .child(NodeSpec::frame("a", "A").at(0.0, 300.0, 10.0, 10.0))
                .child(NodeSpec::frame("b", "B").at(0.0, 100.0, 10.0, 10.0))
                .child(NodeSpec::frame("d", "D").at(0.0, 0.0, 10.0, 10.0)),
        );
        let findings = run(nodes).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].location.node_id, "c");
    }

    #[tokio::test]
    async fn test_adjacent_swap_is_tolerated() {
        let mut nodes = landmarks();
        nodes.push(
            NodeSpec::frame("c", "Layout")
                .child(NodeSpec::frame("a", "A").at(0.0, 100.0, 10.0, 10.0))
                .child(NodeSpec::frame("b", "B").at(0.0, 0.0, 10.0, 10.0))
                .child(NodeSpec::frame("d", "D").at(0.0, 200.0, 10.0, 10.0)),
        );
        assert!(run(nodes).await.is_empty());
    }

    #[tokio::test]
    async fn test_skipped_heading_level() {
        let mut nodes = landmarks();
        nodes.push(
            NodeSpec::frame("c", "Section")
                .child(NodeSpec::text("t3", "Subtitle / H4", "Details"))
                .child(NodeSpec::text("t1", "Title / H1", "Welcome"))
                .child(NodeSpec::text("t2", "Intro / H2", "About")),
        );
        let findings = run(nodes).await;
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.location.node_id, "t3");
        assert_eq!(
            f.current_value.as_deref(),
            Some("Heading level: h4 (after h2)")
        );
    }

    #[tokio::test]
    async fn test_rename_heading_remediation() {
        let mut nodes = landmarks();
        nodes.push(
            NodeSpec::frame("c", "Section")
                .child(NodeSpec::text("t1", "H1", "Welcome"))
                .child(NodeSpec::text("t3", "H3", "Details")),
        );
        let doc = doc(nodes);
        let all = doc.all_nodes();
        let findings = NavigationAnalyzer.analyze(&all, &ctx()).await.expect("ok");
        findings[0].remediations[0].apply().await;
        assert_eq!(doc.node("t3").and_then(|n| n.name()).as_deref(), Some("H2"));
        assert!(NavigationAnalyzer.analyze(&all, &ctx()).await.expect("ok").is_empty());
    }

    #[tokio::test]
    async fn test_focus_states() {
        let mut nodes = landmarks();
        nodes.push(NodeSpec::frame("b1", "Submit Button"));
        nodes.push(NodeSpec::new("l1", NodeKind::Instance).named("Help link"));
        let findings = run(nodes.clone()).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].location.node_id, "b1");

        nodes.push(NodeSpec::frame("b2", "Submit Button / Focused"));
        assert!(run(nodes).await.is_empty());
    }
}
