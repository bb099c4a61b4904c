// SPDX-License-Identifier: PMPL-1.0-or-later
//! Accessibility analyzers implementing WCAG 2.1 checks.
//!
//! Each analyzer module focuses on one concern. Analyzers read node
//! attributes and geometry through the host traits and produce findings;
//! a failed lookup excludes that node from the check and never aborts
//! the batch.

pub mod color_blindness;
pub mod contrast;
pub mod image;
pub mod navigation;
pub mod text_size;
pub mod touch_target;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::cancel::CancelToken;
use crate::classify::Classifier;
use crate::config::{AuditConfig, Thresholds};
use crate::error::Result;
use crate::finding::{Category, Finding, IdGenerator, Location, Remediation, Severity, UuidIds};
use crate::node::{display_name, AttributePatch, DesignNode, NodeRef};

/// Trait implemented by all analyzers
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Short identifier used in logs and configuration
    fn name(&self) -> &str;

    /// Short description of what this analyzer checks
    fn description(&self) -> &str;

    /// Analyze a node collection and return findings
    async fn analyze(&self, nodes: &[NodeRef], ctx: &AnalysisContext) -> Result<Vec<Finding>>;
}

/// Shared, read-only inputs for one scan
#[derive(Clone)]
pub struct AnalysisContext {
    pub ids: Arc<dyn IdGenerator>,
    pub classifier: Arc<Classifier>,
    pub thresholds: Thresholds,
    pub cancel: CancelToken,
}

impl AnalysisContext {
    /// Context with compiled patterns from `config`
    pub fn new(config: &AuditConfig) -> Result<Self> {
        Ok(Self {
            ids: Arc::new(UuidIds),
            classifier: Arc::new(Classifier::from_config(&config.patterns)?),
            thresholds: config.thresholds.clone(),
            cancel: CancelToken::new(),
        })
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Start a finding with a fresh id
    pub fn finding(
        &self,
        category: Category,
        severity: Severity,
        title: &str,
        description: String,
        location: Location,
    ) -> Finding {
        Finding::new(self.ids.next_id(), category, severity, title, description, location)
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self {
            ids: Arc::new(UuidIds),
            classifier: Arc::new(Classifier::default()),
            thresholds: Thresholds::default(),
            cancel: CancelToken::new(),
        }
    }
}

impl std::fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("thresholds", &self.thresholds)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// An analyzer slot for one scan
#[derive(Clone)]
pub struct AnalyzerConfig {
    pub name: String,
    pub enabled: bool,
    pub analyzer: Arc<dyn Analyzer>,
}

impl AnalyzerConfig {
    pub fn new(analyzer: Arc<dyn Analyzer>, enabled: bool) -> Self {
        Self {
            name: analyzer.name().to_string(),
            enabled,
            analyzer,
        }
    }
}

impl std::fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// The six analyzers in reporting order; color blindness is optional
pub fn default_analyzers(include_color_blindness: bool) -> Vec<AnalyzerConfig> {
    vec![
        AnalyzerConfig::new(Arc::new(contrast::ContrastAnalyzer), true),
        AnalyzerConfig::new(Arc::new(text_size::TextSizeAnalyzer), true),
        AnalyzerConfig::new(Arc::new(touch_target::TouchTargetAnalyzer), true),
        AnalyzerConfig::new(Arc::new(image::ImageAnalyzer), true),
        AnalyzerConfig::new(
            Arc::new(color_blindness::ColorBlindnessAnalyzer),
            include_color_blindness,
        ),
        AnalyzerConfig::new(Arc::new(navigation::NavigationAnalyzer), true),
    ]
}

/// Location pointing at `node`
pub(crate) fn locate(node: &dyn DesignNode, fallback: &str) -> Location {
    Location::node(node.id(), &display_name(node, fallback))
}

/// Remediation that writes `patch` to `node`, logging any failure
pub(crate) fn patch_remediation(
    description: impl Into<String>,
    node: NodeRef,
    patch: AttributePatch,
) -> Remediation {
    Remediation::new(description, move || {
        let node = Arc::clone(&node);
        let patch = patch.clone();
        async move {
            if let Err(e) = node.set_attributes(patch).await {
                warn!("Remediation on {} failed: {}", node.id(), e);
            }
        }
    })
}

/// Format a measurement the way it was given: `40` not `40.0`
pub(crate) fn px(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::document::{DocumentSpec, MemoryDocument, NodeSpec};
    use crate::finding::SequentialIds;

    pub fn doc(nodes: Vec<NodeSpec>) -> MemoryDocument {
        MemoryDocument::from_spec(DocumentSpec { name: None, nodes }).expect("valid document")
    }

    pub fn ctx() -> AnalysisContext {
        AnalysisContext::default().with_ids(Arc::new(SequentialIds::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_analyzer_order() {
        let names: Vec<_> = default_analyzers(true)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "contrast",
                "textSize",
                "touchTargets",
                "imageAccessibility",
                "colorBlindness",
                "navigation"
            ]
        );
    }

    #[test]
    fn test_color_blindness_gate() {
        let configs = default_analyzers(false);
        let disabled: Vec<_> = configs.iter().filter(|a| !a.enabled).collect();
        assert_eq!(disabled.len(), 1);
        assert_eq!(disabled[0].name, "colorBlindness");
    }

    #[test]
    fn test_px_formatting() {
        assert_eq!(px(40.0), "40");
        assert_eq!(px(40.5), "40.5");
    }
}
