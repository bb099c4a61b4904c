// SPDX-License-Identifier: PMPL-1.0-or-later
//! Image accessibility analyzer - WCAG 1.1.1 Non-text Content
//!
//! Checks frames carrying an image fill for:
//! - Missing alt text (critical)
//! - Generic alt text such as "image" (warning)
//! - Alt text on images that look decorative (info)

use async_trait::async_trait;
use tracing::warn;

use crate::analyzers::{locate, patch_remediation, AnalysisContext, Analyzer};
use crate::error::Result;
use crate::finding::{Category, Finding, Severity};
use crate::node::{AttributePatch, NodeKind, NodeRef};

const GUIDELINE: &str = "WCAG 2.1 A - 1.1.1 Non-text Content";
const GUIDELINE_LINK: &str = "https://www.w3.org/WAI/WCAG21/Understanding/non-text-content.html";

/// Alt text that says nothing about the image
const GENERIC_ALT: &str = "image";

/// Alt text accessibility analyzer for image fills
pub struct ImageAnalyzer;

#[async_trait]
impl Analyzer for ImageAnalyzer {
    fn name(&self) -> &str {
        "imageAccessibility"
    }

    fn description(&self) -> &str {
        "Checks image fills have meaningful alternative text (1.1.1)"
    }

    async fn analyze(&self, nodes: &[NodeRef], ctx: &AnalysisContext) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for node in nodes.iter().filter(|n| n.kind() == NodeKind::Frame) {
            if ctx.cancel.is_cancelled() {
                break;
            }
            match check_image(node, ctx).await {
                Ok(mut found) => findings.append(&mut found),
                Err(e) => warn!(
                    "Error analyzing image accessibility for node {}: {}",
                    node.id(),
                    e
                ),
            }
        }
        Ok(findings)
    }
}

async fn check_image(node: &NodeRef, ctx: &AnalysisContext) -> Result<Vec<Finding>> {
    let attrs = node.attributes().await?;
    let Some(image) = attrs.background_image else {
        return Ok(Vec::new());
    };
    let mut findings = Vec::new();

    let Some(alt) = image.trimmed_alt() else {
        findings.push(
            ctx.finding(
                Category::AltText,
                Severity::Critical,
                "Missing Alt Text",
                "This image does not have alternative text, which is required for screen reader users to understand the content.".to_string(),
                locate(node.as_ref(), "Image Element"),
            )
            .with_guideline(GUIDELINE, Some(GUIDELINE_LINK))
            .with_remediation(patch_remediation(
                "Add descriptive alt text to the image",
                node.clone(),
                AttributePatch::new().alt_text("Description of image"),
            )),
        );
        return Ok(findings);
    };
    let raw_alt = image.alt_text.as_deref().unwrap_or(alt);

    if alt.eq_ignore_ascii_case(GENERIC_ALT) {
        findings.push(
            ctx.finding(
                Category::AltText,
                Severity::Warning,
                "Non-descriptive Alt Text",
                format!(
                    "This image has generic alt text (\"{}\") which is not descriptive enough for screen reader users.",
                    alt
                ),
                locate(node.as_ref(), "Image Element"),
            )
            .with_guideline(GUIDELINE, Some(GUIDELINE_LINK))
            .with_values(format!("Alt text: \"{}\"", raw_alt), "Descriptive alternative text")
            .with_remediation(patch_remediation(
                "Add more descriptive alt text",
                node.clone(),
                AttributePatch::new().alt_text("Descriptive text about this image"),
            )),
        );
    }

    // Independent of the generic-text check above
    let small = match node.rect().await {
        Ok(Some(rect)) => {
            rect.width < ctx.thresholds.small_image || rect.height < ctx.thresholds.small_image
        }
        Ok(None) => false,
        Err(e) => {
            warn!("No geometry for image {}: {}", node.id(), e);
            false
        }
    };
    if small || ctx.classifier.is_decorative(node.name().as_deref()) {
        findings.push(
            ctx.finding(
                Category::AltText,
                Severity::Info,
                "Possibly Decorative Image with Alt Text",
                format!(
                    "This appears to be a decorative image but has alt text \"{}\". Decorative images should have empty alt text (alt=\"\") rather than descriptive text.",
                    alt
                ),
                locate(node.as_ref(), "Image Element"),
            )
            .with_guideline(GUIDELINE, Some(GUIDELINE_LINK))
            .with_values(format!("Alt text: \"{}\"", raw_alt), "Empty alt text (alt=\"\")")
            .with_remediation(patch_remediation(
                "Set empty alt text for decorative image",
                node.clone(),
                AttributePatch::new().alt_text(""),
            )),
        );
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{ctx, doc};
    use crate::document::NodeSpec;

    async fn run(spec: NodeSpec) -> Vec<Finding> {
        let doc = doc(vec![spec]);
        ImageAnalyzer
            .analyze(&doc.all_nodes(), &ctx())
            .await
            .expect("ok")
    }

    fn photo(alt: Option<&str>) -> NodeSpec {
        NodeSpec::frame("img", "Hero Photo")
            .at(0.0, 0.0, 400.0, 300.0)
            .image(alt)
    }

    #[tokio::test]
    async fn test_missing_alt_is_single_critical() {
        let findings = run(photo(None)).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].category, Category::AltText);
    }

    #[tokio::test]
    async fn test_whitespace_alt_counts_as_missing() {
        let findings = run(photo(Some("   "))).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_descriptive_alt_passes() {
        assert!(run(photo(Some("A sunset over mountains"))).await.is_empty());
    }

    #[tokio::test]
    async fn test_generic_alt_warning() {
        let findings = run(photo(Some(" Image "))).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].current_value.as_deref(), Some("Alt text: \" Image \""));
    }

    #[tokio::test]
    async fn test_decorative_cooccurs_with_generic() {
        let findings = run(NodeSpec::frame("i", "Divider")
            .at(0.0, 0.0, 400.0, 2.0)
            .image(Some("image")))
        .await;
        let severities: Vec<_> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Info]);
    }

    #[tokio::test]
    async fn test_small_icon_with_alt_is_info() {
        let findings = run(NodeSpec::frame("i", "Logo")
            .at(0.0, 0.0, 16.0, 16.0)
            .image(Some("Company logo")))
        .await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_frames_without_image_ignored() {
        assert!(run(NodeSpec::frame("f", "Card").at(0.0, 0.0, 10.0, 10.0)).await.is_empty());
    }

    #[tokio::test]
    async fn test_add_alt_remediation() {
        let doc = doc(vec![photo(None)]);
        let nodes = doc.all_nodes();
        let findings = ImageAnalyzer.analyze(&nodes, &ctx()).await.expect("ok");
        findings[0].remediations[0].apply().await;
        assert!(ImageAnalyzer.analyze(&nodes, &ctx()).await.expect("ok").is_empty());
    }
}
