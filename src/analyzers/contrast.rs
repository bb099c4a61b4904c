// SPDX-License-Identifier: PMPL-1.0-or-later
//! Color contrast analyzer - WCAG 1.4.3 Contrast (Minimum) / 1.4.6 Contrast (Enhanced)
//!
//! Compares each text node's color against the background of its
//! containing frame using the WCAG luminance algorithm.
//! - AA: 4.5:1 for normal text, 3:1 for large text
//! - AAA: 7:1 for normal text, 4.5:1 for large text

use async_trait::async_trait;
use tracing::warn;

use crate::analyzers::{locate, patch_remediation, AnalysisContext, Analyzer};
use crate::color::contrast_ratio;
use crate::config::Thresholds;
use crate::error::Result;
use crate::finding::{Category, Finding, Severity};
use crate::node::{is_frame, AttributePatch, NodeKind, NodeRef};

const DEFAULT_TEXT_COLOR: &str = "#000000";
const DEFAULT_BACKGROUND: &str = "#FFFFFF";
const DEFAULT_FONT_SIZE: f64 = 16.0;
const DEFAULT_FONT_WEIGHT: u16 = 400;

/// Required contrast ratios for one text size class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastRequirement {
    pub large_text: bool,
    /// AA minimum
    pub minimum: f64,
    /// AAA enhanced
    pub enhanced: f64,
}

impl ContrastRequirement {
    pub fn for_text(font_size: f64, font_weight: u16, thresholds: &Thresholds) -> Self {
        let bold = font_weight >= thresholds.bold_weight;
        let large_text = font_size >= thresholds.large_text_size
            || (font_size >= thresholds.large_bold_text_size && bold);
        if large_text {
            Self {
                large_text,
                minimum: 3.0,
                enhanced: 4.5,
            }
        } else {
            Self {
                large_text,
                minimum: 4.5,
                enhanced: 7.0,
            }
        }
    }

    fn size_label(&self) -> &'static str {
        if self.large_text {
            "large"
        } else {
            "normal"
        }
    }
}

/// Contrast analyzer for text over frame backgrounds
pub struct ContrastAnalyzer;

#[async_trait]
impl Analyzer for ContrastAnalyzer {
    fn name(&self) -> &str {
        "contrast"
    }

    fn description(&self) -> &str {
        "Checks text contrast ratios meet WCAG requirements (1.4.3/1.4.6)"
    }

    async fn analyze(&self, nodes: &[NodeRef], ctx: &AnalysisContext) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for node in nodes.iter().filter(|n| n.kind() == NodeKind::Text) {
            if ctx.cancel.is_cancelled() {
                break;
            }
            match check_text(node, ctx).await {
                Ok(Some(finding)) => findings.push(finding),
                Ok(None) => {}
                Err(e) => warn!("Error analyzing contrast for node {}: {}", node.id(), e),
            }
        }
        Ok(findings)
    }
}

async fn check_text(node: &NodeRef, ctx: &AnalysisContext) -> Result<Option<Finding>> {
    // Only text sitting directly on a frame has a known background
    let Some(parent) = node.parent().await? else {
        return Ok(None);
    };
    if !is_frame(parent.as_ref()) {
        return Ok(None);
    }

    let attrs = node.attributes().await?;
    let background = match parent.attributes().await {
        Ok(parent_attrs) => parent_attrs.background_color,
        Err(e) => {
            warn!("No background for frame {}, assuming white: {}", parent.id(), e);
            None
        }
    }
    .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string());
    let text_color = attrs
        .text_color
        .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string());

    let ratio = contrast_ratio(&text_color, &background);
    let req = ContrastRequirement::for_text(
        attrs.font_size.unwrap_or(DEFAULT_FONT_SIZE),
        attrs.font_weight.unwrap_or(DEFAULT_FONT_WEIGHT),
        &ctx.thresholds,
    );

    let finding = if ratio < req.minimum {
        ctx.finding(
            Category::Contrast,
            Severity::Critical,
            "Insufficient Text Contrast",
            format!(
                "This text has a contrast ratio of {:.2}:1, which is below the minimum required ratio of {}:1 for {} text.",
                ratio,
                req.minimum,
                req.size_label()
            ),
            locate(node.as_ref(), "Text Element"),
        )
        .with_guideline(
            "WCAG 2.1 AA - 1.4.3 Contrast (Minimum)",
            Some("https://www.w3.org/WAI/WCAG21/Understanding/contrast-minimum.html"),
        )
        .with_values(format!("{:.2}:1", ratio), format!("{}:1", req.minimum))
        .with_remediation(patch_remediation(
            "Darken text color for better contrast",
            node.clone(),
            AttributePatch::new().text_color(DEFAULT_TEXT_COLOR),
        ))
        .with_remediation(patch_remediation(
            "Lighten background for better contrast",
            parent,
            AttributePatch::new().background_color(DEFAULT_BACKGROUND),
        ))
    } else if ratio < req.enhanced {
        ctx.finding(
            Category::Contrast,
            Severity::Warning,
            "Moderate Text Contrast",
            format!(
                "This text has a contrast ratio of {:.2}:1, which meets the minimum requirement but not the enhanced requirement of {}:1 for {} text.",
                ratio,
                req.enhanced,
                req.size_label()
            ),
            locate(node.as_ref(), "Text Element"),
        )
        .with_guideline(
            "WCAG 2.1 AAA - 1.4.6 Contrast (Enhanced)",
            Some("https://www.w3.org/WAI/WCAG21/Understanding/contrast-enhanced.html"),
        )
        .with_values(format!("{:.2}:1", ratio), format!("{}:1", req.enhanced))
        .with_remediation(patch_remediation(
            "Increase text contrast to meet enhanced requirements",
            node.clone(),
            AttributePatch::new().text_color(DEFAULT_TEXT_COLOR),
        ))
    } else {
        return Ok(None);
    };
    Ok(Some(finding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{ctx, doc};
    use crate::document::NodeSpec;

    async fn run(spec: NodeSpec) -> Vec<Finding> {
        let doc = doc(vec![spec]);
        let nodes = doc.all_nodes();
        ContrastAnalyzer
            .analyze(&nodes, &ctx())
            .await
            .expect("analyzer never fails")
    }

    #[test]
    fn test_large_text_classification() {
        let t = Thresholds::default();
        assert!(!ContrastRequirement::for_text(16.0, 400, &t).large_text);
        assert!(ContrastRequirement::for_text(18.0, 400, &t).large_text);
        assert!(ContrastRequirement::for_text(14.0, 700, &t).large_text);
        assert!(!ContrastRequirement::for_text(14.0, 600, &t).large_text);
        assert_eq!(ContrastRequirement::for_text(24.0, 400, &t).minimum, 3.0);
    }

    #[tokio::test]
    async fn test_black_on_white_passes() {
        let findings = run(NodeSpec::frame("f", "Card")
            .background("#FFFFFF")
            .child(NodeSpec::text("t", "Label", "Hello").color("#000000")))
        .await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_grey_on_white_is_critical() {
        let findings = run(NodeSpec::frame("f", "Card")
            .background("#FFFFFF")
            .child(NodeSpec::text("t", "Label", "Hello").color("#777777")))
        .await;
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(f.current_value.as_deref(), Some("4.48:1"));
        assert_eq!(f.required_value.as_deref(), Some("4.5:1"));
        assert_eq!(f.location.node_id, "t");
        assert_eq!(f.remediations.len(), 2);
    }

    #[tokio::test]
    async fn test_large_text_gets_warning_only() {
        let findings = run(NodeSpec::frame("f", "Card")
            .background("#FFFFFF")
            .child(
                NodeSpec::text("t", "Title", "Big")
                    .color("#777777")
                    .font(24.0, 400),
            ))
        .await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].required_value.as_deref(), Some("4.5:1"));
    }

    #[tokio::test]
    async fn test_text_without_frame_parent_is_skipped() {
        let findings = run(NodeSpec::new("c", NodeKind::Component)
            .child(NodeSpec::text("t", "Label", "x").color("#EEEEEE")))
        .await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_remediation_fixes_contrast() {
        let doc = doc(vec![NodeSpec::frame("f", "Card")
            .background("#FFFFFF")
            .child(NodeSpec::text("t", "Label", "Hello").color("#999999"))]);
        let nodes = doc.all_nodes();
        let findings = ContrastAnalyzer.analyze(&nodes, &ctx()).await.expect("ok");
        findings[0].remediations[0].apply().await;
        let again = ContrastAnalyzer.analyze(&nodes, &ctx()).await.expect("ok");
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_skips_node() {
        let doc = doc(vec![NodeSpec::frame("f", "Card")
            .background("#FFFFFF")
            .child(NodeSpec::text("t", "Label", "Hello").color("#777777"))
            .child(NodeSpec::text("u", "Other", "Hi").color("#777777"))]);
        doc.fail_lookups_for("t");
        let findings = ContrastAnalyzer
            .analyze(&doc.all_nodes(), &ctx())
            .await
            .expect("ok");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location.node_id, "u");
    }

    #[tokio::test]
    async fn test_unreadable_frame_uses_white_background() {
        let doc = doc(vec![NodeSpec::frame("f", "Card")
            .background("#000000")
            .child(NodeSpec::text("t", "Label", "Hello").color("#777777"))]);
        doc.fail_lookups_for("f");
        let findings = ContrastAnalyzer
            .analyze(&doc.all_nodes(), &ctx())
            .await
            .expect("ok");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].current_value.as_deref(), Some("4.48:1"));
    }
}
