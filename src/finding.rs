// SPDX-License-Identifier: PMPL-1.0-or-later
//! Finding types produced by the analyzers.
//!
//! A finding copies the location data it needs (node id and name) instead
//! of holding on to the node, so it stays valid after the document changes.
//! Only remediation callbacks keep a node handle, to apply their fix.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Severity levels for findings, ordered critical < warning < info
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails a WCAG minimum
    Critical,
    /// Fails an enhanced requirement or a spacing/structure guideline
    Warning,
    /// Readability or structure hint
    Info,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Warning, Severity::Info];

    /// Sort rank (critical=0, warning=1, info=2)
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Accessibility concern a finding belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Contrast,
    TextSize,
    TouchTarget,
    AltText,
    ColorBlindness,
    Navigation,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Contrast,
        Category::TextSize,
        Category::TouchTarget,
        Category::AltText,
        Category::ColorBlindness,
        Category::Navigation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Contrast => "contrast",
            Category::TextSize => "textSize",
            Category::TouchTarget => "touchTarget",
            Category::AltText => "altText",
            Category::ColorBlindness => "colorBlindness",
            Category::Navigation => "navigation",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WCAG reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guideline {
    /// e.g. "WCAG 2.1 AA - 1.4.3 Contrast (Minimum)"
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Where a finding originated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub node_id: String,
    pub node_name: String,
    pub node_path: String,
}

impl Location {
    /// Minimal location: the path is the node id
    pub fn node(id: &str, name: &str) -> Self {
        Self {
            node_id: id.to_string(),
            node_name: name.to_string(),
            node_path: id.to_string(),
        }
    }
}

type RemediationFn = dyn Fn() -> BoxFuture<'static, ()> + Send + Sync;

/// A suggested correction with an executable callback.
///
/// Callbacks are best-effort: they log and swallow their own failures and
/// may be invoked any number of times.
#[derive(Clone)]
pub struct Remediation {
    pub description: String,
    action: Arc<RemediationFn>,
}

impl Remediation {
    /// Remediation backed by an async callback
    pub fn new<F, Fut>(description: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            description: description.into(),
            action: Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(action()) }),
        }
    }

    /// Remediation that needs a human; invoking it only logs
    pub fn manual(description: impl Into<String>, note: &'static str) -> Self {
        Self::new(description, move || async move {
            info!("{}", note);
        })
    }

    /// Run the correction
    pub async fn apply(&self) {
        (self.action)().await
    }
}

impl std::fmt::Debug for Remediation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remediation")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Serialize for Remediation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Remediation", 1)?;
        s.serialize_field("description", &self.description)?;
        s.end()
    }
}

/// One detected accessibility issue
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Unique per finding, never reused
    pub id: String,
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    /// Templated with the measured values
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guideline: Option<Guideline>,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_value: Option<String>,
    pub remediations: Vec<Remediation>,
}

impl Finding {
    /// Create a new finding
    pub fn new(
        id: String,
        category: Category,
        severity: Severity,
        title: &str,
        description: String,
        location: Location,
    ) -> Self {
        Self {
            id,
            category,
            severity,
            title: title.to_string(),
            description,
            guideline: None,
            location,
            current_value: None,
            required_value: None,
            remediations: Vec::new(),
        }
    }

    /// Set the WCAG reference
    pub fn with_guideline(mut self, text: &str, link: Option<&str>) -> Self {
        self.guideline = Some(Guideline {
            text: text.to_string(),
            link: link.map(str::to_string),
        });
        self
    }

    /// Set measured and required values
    pub fn with_values(mut self, current: impl Into<String>, required: impl Into<String>) -> Self {
        self.current_value = Some(current.into());
        self.required_value = Some(required.into());
        self
    }

    /// Append a remediation
    pub fn with_remediation(mut self, remediation: Remediation) -> Self {
        self.remediations.push(remediation);
        self
    }

    /// Location string for display
    pub fn location_string(&self) -> String {
        if self.location.node_name.is_empty() {
            self.location.node_id.clone()
        } else {
            format!("{} ({})", self.location.node_name, self.location.node_id)
        }
    }
}

/// A collection of findings with aggregation methods
#[derive(Debug, Clone, Default, Serialize)]
pub struct FindingSet {
    pub findings: Vec<Finding>,
}

impl FindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    /// Stable sort by severity rank; ties keep discovery order
    pub fn sort_by_severity(&mut self) {
        self.findings.sort_by_key(|f| f.severity.rank());
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.severity == severity).collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.category == category).collect()
    }

    pub fn critical(&self) -> Vec<&Finding> {
        self.by_severity(Severity::Critical)
    }

    pub fn warnings(&self) -> Vec<&Finding> {
        self.by_severity(Severity::Warning)
    }

    pub fn has_critical(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Critical)
    }

    pub fn count_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for f in &self.findings {
            *counts.entry(f.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_by_category(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for f in &self.findings {
            *counts.entry(f.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn get(&self, id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.findings.iter()
    }
}

impl IntoIterator for FindingSet {
    type Item = Finding;
    type IntoIter = std::vec::IntoIter<Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.into_iter()
    }
}

impl FromIterator<Finding> for FindingSet {
    fn from_iter<I: IntoIterator<Item = Finding>>(iter: I) -> Self {
        Self {
            findings: iter.into_iter().collect(),
        }
    }
}

/// Source of finding identifiers, shared by all analyzers of a scan
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Monotonic `prefix-N` identifiers, deterministic for tests
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("finding")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}
