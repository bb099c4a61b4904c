// SPDX-License-Identifier: PMPL-1.0-or-later
//! Text size analyzer - WCAG 1.4.4 Resize Text
//!
//! Flags body text below the minimum font size, and long runs of all-caps
//! text which are harder to read. The two checks are independent.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::analyzers::{locate, patch_remediation, px, AnalysisContext, Analyzer};
use crate::error::Result;
use crate::finding::{Category, Finding, Remediation, Severity};
use crate::node::{AttributePatch, NodeKind, NodeRef};

const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Text size analyzer
pub struct TextSizeAnalyzer;

#[async_trait]
impl Analyzer for TextSizeAnalyzer {
    fn name(&self) -> &str {
        "textSize"
    }

    fn description(&self) -> &str {
        "Checks minimum font size and all-caps readability (1.4.4)"
    }

    async fn analyze(&self, nodes: &[NodeRef], ctx: &AnalysisContext) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for node in nodes.iter().filter(|n| n.kind() == NodeKind::Text) {
            if ctx.cancel.is_cancelled() {
                break;
            }
            match check_text(node, ctx).await {
                Ok(mut found) => findings.append(&mut found),
                Err(e) => warn!("Error analyzing text size for node {}: {}", node.id(), e),
            }
        }
        Ok(findings)
    }
}

async fn check_text(node: &NodeRef, ctx: &AnalysisContext) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();
    let attrs = node.attributes().await?;
    let min = ctx.thresholds.min_font_size;
    let font_size = attrs.font_size.unwrap_or(DEFAULT_FONT_SIZE);

    if font_size < min {
        findings.push(
            ctx.finding(
                Category::TextSize,
                Severity::Warning,
                "Text Too Small",
                format!(
                    "This text has a font size of {}px, which is below the recommended minimum of {}px for body text.",
                    px(font_size),
                    px(min)
                ),
                locate(node.as_ref(), "Text Element"),
            )
            .with_guideline(
                "WCAG 2.1 AA - 1.4.4 Resize Text",
                Some("https://www.w3.org/WAI/WCAG21/Understanding/resize-text.html"),
            )
            .with_values(format!("{}px", px(font_size)), format!("{}px minimum", px(min)))
            .with_remediation(patch_remediation(
                format!("Increase font size to at least {}px", px(min)),
                node.clone(),
                AttributePatch::new().font_size(min),
            )),
        );
    }

    if let Some(text) = attrs.text {
        if is_shouting(&text, ctx.thresholds.all_caps_min_length) {
            findings.push(
                ctx.finding(
                    Category::TextSize,
                    Severity::Info,
                    "All Uppercase Text",
                    format!(
                        "This text is {} characters of uppercase letters. Long sections of text in all uppercase letters are more difficult to read.",
                        text.chars().count()
                    ),
                    locate(node.as_ref(), "Text Element"),
                )
                .with_guideline("Readability Best Practice", None)
                .with_remediation(sentence_case_remediation(node.clone(), &text)),
            );
        }
    }

    Ok(findings)
}

/// Text that is entirely uppercase and longer than `min_length` characters
pub fn is_shouting(text: &str, min_length: usize) -> bool {
    text.chars().count() > min_length && text == text.to_uppercase()
}

/// First character uppercase, the rest lowercase
pub fn sentence_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn sentence_case_remediation(node: NodeRef, text: &str) -> Remediation {
    let replacement: Arc<str> = sentence_case(text).into();
    Remediation::new("Convert text to sentence or title case", move || {
        let node = Arc::clone(&node);
        let replacement = Arc::clone(&replacement);
        async move {
            if let Err(e) = node.set_text(&replacement).await {
                warn!("Error setting text on {}: {}", node.id(), e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{ctx, doc};
    use crate::document::NodeSpec;

    #[test]
    fn test_shouting_detection() {
        assert!(is_shouting("THIS IS A VERY LONG HEADING", 20));
        assert!(!is_shouting("SHORT CAPS", 20));
        assert!(!is_shouting("This Is A Very Long Heading", 20));
        // Exactly the limit is not flagged
        assert!(!is_shouting("ABCDEFGHIJKLMNOPQRST", 20));
    }

    #[test]
    fn test_sentence_case() {
        assert_eq!(sentence_case("HELLO WORLD"), "Hello world");
        assert_eq!(sentence_case(""), "");
    }

    #[tokio::test]
    async fn test_small_text_warning() {
        let doc = doc(vec![NodeSpec::frame("f", "Card")
            .child(NodeSpec::text("t", "Caption", "fine print").font(10.0, 400))]);
        let findings = TextSizeAnalyzer
            .analyze(&doc.all_nodes(), &ctx())
            .await
            .expect("ok");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].current_value.as_deref(), Some("10px"));
        assert_eq!(findings[0].required_value.as_deref(), Some("12px minimum"));
    }

    #[tokio::test]
    async fn test_small_caps_fires_both_checks() {
        let doc = doc(vec![NodeSpec::text(
            "t",
            "Banner",
            "LIMITED TIME OFFER ENDS SOON",
        )
        .font(9.0, 400)]);
        let findings = TextSizeAnalyzer
            .analyze(&doc.all_nodes(), &ctx())
            .await
            .expect("ok");
        let severities: Vec<_> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Info]);
    }

    #[tokio::test]
    async fn test_remediations_apply() {
        let doc = doc(vec![NodeSpec::text("t", "Banner", "LIMITED TIME OFFER ENDS SOON")
            .font(9.0, 400)]);
        let nodes = doc.all_nodes();
        let findings = TextSizeAnalyzer.analyze(&nodes, &ctx()).await.expect("ok");
        for finding in &findings {
            finding.remediations[0].apply().await;
        }
        let node = doc.node("t").expect("exists");
        let attrs = node.attributes().await.expect("attrs");
        assert_eq!(attrs.font_size, Some(12.0));
        assert_eq!(attrs.text.as_deref(), Some("Limited time offer ends soon"));
        assert!(TextSizeAnalyzer.analyze(&nodes, &ctx()).await.expect("ok").is_empty());
    }

    #[tokio::test]
    async fn test_default_size_passes() {
        let doc = doc(vec![NodeSpec::text("t", "Body", "Regular text")]);
        let findings = TextSizeAnalyzer
            .analyze(&doc.all_nodes(), &ctx())
            .await
            .expect("ok");
        assert!(findings.is_empty());
    }
}
