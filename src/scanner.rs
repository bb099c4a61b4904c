// SPDX-License-Identifier: PMPL-1.0-or-later
//! Scan orchestration.
//!
//! Splits the node collection into batches, runs the enabled analyzers
//! concurrently on each batch, and merges the findings by severity. A
//! [`Scanner`] owns the scan session: one scan at a time, observable
//! through a watch channel, cancellable at every suspension point.

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::analyzers::{default_analyzers, AnalysisContext, AnalyzerConfig};
use crate::cancel::CancelToken;
use crate::classify::Classifier;
use crate::config::{AuditConfig, ScanSettings};
use crate::error::{AuditError, Result};
use crate::finding::{Finding, FindingSet, IdGenerator, UuidIds};
use crate::node::{DocumentHost, NodeKind, NodeRef};

/// Progress callback: `(completed, total)`
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// How analyzers are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Per batch, all enabled analyzers concurrently
    #[default]
    Batched,
    /// One analyzer at a time over the whole collection
    Sequential,
}

/// Options for a single scan
#[derive(Clone)]
pub struct ScanOptions {
    pub include_color_blindness: bool,
    pub mode: ExecutionMode,
    pub on_progress: Option<ProgressFn>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_color_blindness: true,
            mode: ExecutionMode::Batched,
            on_progress: None,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_color_blindness(mut self, include: bool) -> Self {
        self.include_color_blindness = include;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.mode = ExecutionMode::Sequential;
        self
    }

    pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOptions")
            .field("include_color_blindness", &self.include_color_blindness)
            .field("mode", &self.mode)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Result of a scan that was not aborted by an error
#[derive(Debug)]
pub enum ScanOutcome {
    Completed(FindingSet),
    /// Cancelled before completion; partial findings are discarded
    Cancelled,
}

impl ScanOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanOutcome::Cancelled)
    }

    /// Findings of a completed scan, empty when cancelled
    pub fn into_findings(self) -> FindingSet {
        match self {
            ScanOutcome::Completed(findings) => findings,
            ScanOutcome::Cancelled => FindingSet::new(),
        }
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Counters for the current or last scan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanStats {
    pub pages_scanned: usize,
    pub total_pages: usize,
    pub nodes_scanned: usize,
    pub findings_found: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Snapshot published to observers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanStatus {
    pub state: ScanState,
    /// Fraction of analyzer tasks done, 0.0 to 1.0
    pub progress: f64,
    pub stats: ScanStats,
}

/// Run one analyzer, turning errors and panics into an empty result
async fn run_analyzer(
    config: &AnalyzerConfig,
    nodes: &[NodeRef],
    ctx: &AnalysisContext,
) -> Vec<Finding> {
    debug!("Running {} analyzer on {} nodes", config.name, nodes.len());
    match AssertUnwindSafe(config.analyzer.analyze(nodes, ctx))
        .catch_unwind()
        .await
    {
        Ok(Ok(findings)) => findings,
        Ok(Err(e)) => {
            warn!("Error in {} analyzer: {}", config.name, e);
            Vec::new()
        }
        Err(_) => {
            warn!("{} analyzer panicked", config.name);
            Vec::new()
        }
    }
}

/// Batched execution: concurrent analyzers per batch, pause between batches
async fn run_batched(
    nodes: &[NodeRef],
    analyzers: &[AnalyzerConfig],
    ctx: &AnalysisContext,
    settings: &ScanSettings,
    progress: &(dyn Fn(usize, usize) + Send + Sync),
) -> ScanOutcome {
    if nodes.is_empty() {
        return ScanOutcome::Completed(FindingSet::new());
    }
    let enabled: Vec<&AnalyzerConfig> = analyzers.iter().filter(|a| a.enabled).collect();
    let batch_size = settings.batch_size(nodes.len());
    let batches: Vec<&[NodeRef]> = nodes.chunks(batch_size).collect();
    let total = batches.len() * enabled.len();
    info!(
        "Running {} analyzers on {} nodes in {} batches of ~{} nodes",
        enabled.len(),
        nodes.len(),
        batches.len(),
        batch_size
    );

    let mut completed = 0;
    let mut findings = FindingSet::new();
    for (index, batch) in batches.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            return ScanOutcome::Cancelled;
        }
        debug!(
            "Processing batch {}/{} ({} nodes)",
            index + 1,
            batches.len(),
            batch.len()
        );

        let mut pending: FuturesUnordered<_> = enabled
            .iter()
            .enumerate()
            .map(|(slot, config)| async move { (slot, run_analyzer(config, batch, ctx).await) })
            .collect();
        // Results land in analyzer order regardless of completion order
        let mut results: Vec<Vec<Finding>> = (0..enabled.len()).map(|_| Vec::new()).collect();
        loop {
            match ctx.cancel.run(pending.next()).await {
                None => return ScanOutcome::Cancelled,
                Some(None) => break,
                Some(Some((slot, found))) => {
                    results[slot] = found;
                    completed += 1;
                    progress(completed, total);
                }
            }
        }
        for found in results {
            findings.extend(found);
        }

        if index + 1 < batches.len()
            && ctx
                .cancel
                .run(tokio::time::sleep(settings.batch_delay()))
                .await
                .is_none()
        {
            return ScanOutcome::Cancelled;
        }
    }

    if ctx.cancel.is_cancelled() {
        return ScanOutcome::Cancelled;
    }
    findings.sort_by_severity();
    info!("All analyzers completed. Found {} total issues", findings.len());
    ScanOutcome::Completed(findings)
}

/// Sequential execution: each analyzer sees the whole collection
async fn run_sequential(
    nodes: &[NodeRef],
    analyzers: &[AnalyzerConfig],
    ctx: &AnalysisContext,
    progress: &(dyn Fn(usize, usize) + Send + Sync),
) -> ScanOutcome {
    if nodes.is_empty() {
        return ScanOutcome::Completed(FindingSet::new());
    }
    let enabled: Vec<&AnalyzerConfig> = analyzers.iter().filter(|a| a.enabled).collect();
    let mut findings = FindingSet::new();
    for (i, config) in enabled.iter().enumerate() {
        debug!("Running {} analyzer ({}/{})", config.name, i + 1, enabled.len());
        match ctx.cancel.run(run_analyzer(config, nodes, ctx)).await {
            Some(found) => findings.extend(found),
            None => return ScanOutcome::Cancelled,
        }
        progress(i + 1, enabled.len());
    }
    if ctx.cancel.is_cancelled() {
        return ScanOutcome::Cancelled;
    }
    findings.sort_by_severity();
    ScanOutcome::Completed(findings)
}

async fn execute(
    nodes: &[NodeRef],
    options: &ScanOptions,
    ctx: &AnalysisContext,
    settings: &ScanSettings,
    progress: &(dyn Fn(usize, usize) + Send + Sync),
) -> ScanOutcome {
    let analyzers = default_analyzers(options.include_color_blindness);
    let report = |completed: usize, total: usize| {
        if let Some(callback) = &options.on_progress {
            callback(completed, total);
        }
        progress(completed, total);
    };
    match options.mode {
        ExecutionMode::Batched => run_batched(nodes, &analyzers, ctx, settings, &report).await,
        ExecutionMode::Sequential => run_sequential(nodes, &analyzers, ctx, &report).await,
    }
}

/// Check `nodes` with the default configuration, analyzers batched and
/// concurrent
pub async fn run_accessibility_check(nodes: &[NodeRef], options: ScanOptions) -> FindingSet {
    let ctx = AnalysisContext::default();
    let settings = ScanSettings::default();
    execute(nodes, &options, &ctx, &settings, &|_, _| {})
        .await
        .into_findings()
}

/// Like [`run_accessibility_check`], one analyzer at a time
pub async fn run_accessibility_check_sequential(
    nodes: &[NodeRef],
    options: ScanOptions,
) -> FindingSet {
    run_accessibility_check(nodes, options.sequential()).await
}

#[derive(Debug, Default)]
struct Session {
    cancel: CancelToken,
    generation: u64,
}

/// Owner of the scan session
pub struct Scanner {
    config: AuditConfig,
    classifier: Arc<Classifier>,
    ids: Arc<dyn IdGenerator>,
    session: Mutex<Session>,
    status: watch::Sender<ScanStatus>,
}

impl Scanner {
    pub fn new(config: AuditConfig) -> Result<Self> {
        config.validate()?;
        let classifier = Arc::new(Classifier::from_config(&config.patterns)?);
        let (status, _) = watch::channel(ScanStatus::default());
        Ok(Self {
            config,
            classifier,
            ids: Arc::new(UuidIds),
            session: Mutex::new(Session::default()),
            status,
        })
    }

    /// Replace the finding id source
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Options seeded from the `[scan]` configuration
    pub fn default_options(&self) -> ScanOptions {
        ScanOptions::new().include_color_blindness(self.config.scan.include_color_blindness)
    }

    /// Observe status changes
    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> ScanStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> ScanState {
        self.status.borrow().state
    }

    /// Cancel the in-flight scan, if any
    pub fn cancel(&self) {
        let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if !session.cancel.is_cancelled() {
            info!("Cancelling scan");
            session.cancel.cancel();
        }
    }

    /// Return a finished session to Idle
    pub fn reset(&self) {
        self.status.send_if_modified(|status| {
            if status.state == ScanState::Running {
                return false;
            }
            *status = ScanStatus::default();
            true
        });
    }

    /// Scan a node collection
    pub async fn run_scan(&self, nodes: &[NodeRef], options: ScanOptions) -> ScanOutcome {
        let (ctx, generation) = self.begin();
        self.update(generation, |s| {
            s.stats.total_pages = 1;
            s.stats.pages_scanned = 1;
        });
        let progress = |completed: usize, total: usize| {
            self.update(generation, |s| {
                s.progress = fraction(completed, total);
                s.stats.nodes_scanned = nodes.len() * completed / total.max(1);
            });
        };
        let outcome = execute(nodes, &options, &ctx, &self.config.scan, &progress).await;
        self.finish(generation, &outcome, nodes.len());
        outcome
    }

    /// Scan a whole document page by page.
    ///
    /// Each top-level frame is a page scanned with its descendant frames and
    /// texts. Without pages the whole document is one pass.
    pub async fn scan_document(
        &self,
        host: &dyn DocumentHost,
        options: ScanOptions,
    ) -> Result<ScanOutcome> {
        let (ctx, generation) = self.begin();

        let Some(pages) = ctx.cancel.run(host.top_level_frames()).await else {
            return Ok(self.finish_cancelled(generation));
        };
        let Some(everything) = ctx.cancel.run(whole_document(host)).await else {
            return Ok(self.finish_cancelled(generation));
        };
        let (pages, all_nodes) = match (pages, everything) {
            (Err(pages_err), Err(nodes_err)) => {
                let err = AuditError::Host(format!(
                    "cannot enumerate document: {}; {}",
                    pages_err, nodes_err
                ));
                warn!("Accessibility scan failed: {}", err);
                self.update(generation, |s| {
                    s.state = ScanState::Failed;
                    s.progress = 0.0;
                    s.stats.finished_at = Some(Utc::now());
                });
                return Err(err);
            }
            (pages, nodes) => (
                pages.unwrap_or_else(|e| {
                    warn!("Error getting top-level frames: {}", e);
                    Vec::new()
                }),
                nodes.unwrap_or_default(),
            ),
        };

        if all_nodes.is_empty() {
            warn!("No nodes found to scan; the document appears to be empty");
            let outcome = ScanOutcome::Completed(FindingSet::new());
            self.finish(generation, &outcome, 0);
            return Ok(outcome);
        }

        let total_pages = pages.len().max(1);
        info!(
            "Starting analysis of {} nodes across {} pages",
            all_nodes.len(),
            total_pages
        );
        self.update(generation, |s| s.stats.total_pages = total_pages);

        let mut findings = FindingSet::new();
        let mut nodes_scanned = 0;
        if pages.is_empty() {
            self.update(generation, |s| s.stats.pages_scanned = 1);
            let progress = |completed: usize, total: usize| {
                self.update(generation, |s| {
                    s.progress = fraction(completed, total);
                    s.stats.nodes_scanned = all_nodes.len() * completed / total.max(1);
                });
            };
            match execute(&all_nodes, &options, &ctx, &self.config.scan, &progress).await {
                ScanOutcome::Completed(found) => findings = found,
                ScanOutcome::Cancelled => return Ok(self.finish_cancelled(generation)),
            }
            nodes_scanned = all_nodes.len();
        } else {
            for (i, page) in pages.iter().enumerate() {
                if ctx.cancel.is_cancelled() {
                    return Ok(self.finish_cancelled(generation));
                }
                self.update(generation, |s| s.stats.pages_scanned = i + 1);
                let Some(page_nodes) = ctx.cancel.run(page_nodes(host, page)).await else {
                    return Ok(self.finish_cancelled(generation));
                };
                debug!("Page {} has {} nodes", i + 1, page_nodes.len());

                let base = nodes_scanned;
                let progress = |completed: usize, total: usize| {
                    let page_fraction = fraction(completed, total);
                    self.update(generation, |s| {
                        s.progress = (i as f64 + page_fraction) / total_pages as f64;
                        s.stats.nodes_scanned =
                            base + page_nodes.len() * completed / total.max(1);
                    });
                };
                match execute(&page_nodes, &options, &ctx, &self.config.scan, &progress).await {
                    ScanOutcome::Completed(found) => findings.extend(found),
                    ScanOutcome::Cancelled => return Ok(self.finish_cancelled(generation)),
                }
                nodes_scanned += page_nodes.len();
                let found = findings.len();
                self.update(generation, |s| s.stats.findings_found = found);
            }
            findings.sort_by_severity();
        }

        let outcome = ScanOutcome::Completed(findings);
        self.finish(generation, &outcome, nodes_scanned);
        Ok(outcome)
    }

    /// Cancel any prior scan and open a new session
    fn begin(&self) -> (AnalysisContext, u64) {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        session.cancel.cancel();
        session.cancel = CancelToken::new();
        session.generation += 1;
        let generation = session.generation;
        let ctx = AnalysisContext {
            ids: Arc::clone(&self.ids),
            classifier: Arc::clone(&self.classifier),
            thresholds: self.config.thresholds.clone(),
            cancel: session.cancel.clone(),
        };
        drop(session);

        info!("Starting accessibility scan");
        self.status.send_replace(ScanStatus {
            state: ScanState::Running,
            progress: 0.0,
            stats: ScanStats {
                started_at: Some(Utc::now()),
                ..ScanStats::default()
            },
        });
        (ctx, generation)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session
            .lock()
            .map(|s| s.generation == generation)
            .unwrap_or(false)
    }

    /// Publish a change unless a newer scan owns the session
    fn update(&self, generation: u64, f: impl FnOnce(&mut ScanStatus)) {
        if self.is_current(generation) {
            self.status.send_modify(f);
        }
    }

    fn finish(&self, generation: u64, outcome: &ScanOutcome, nodes_scanned: usize) {
        match outcome {
            ScanOutcome::Completed(findings) => {
                info!("Scan completed: {} accessibility issues", findings.len());
                let found = findings.len();
                self.update(generation, |s| {
                    s.state = ScanState::Completed;
                    s.progress = 1.0;
                    s.stats.pages_scanned = s.stats.total_pages;
                    s.stats.nodes_scanned = nodes_scanned;
                    s.stats.findings_found = found;
                    s.stats.finished_at = Some(Utc::now());
                });
            }
            ScanOutcome::Cancelled => {
                self.finish_cancelled(generation);
            }
        }
    }

    fn finish_cancelled(&self, generation: u64) -> ScanOutcome {
        info!("Scan was cancelled");
        self.update(generation, |s| {
            s.state = ScanState::Cancelled;
            s.progress = 0.0;
            s.stats.findings_found = 0;
            s.stats.finished_at = Some(Utc::now());
        });
        ScanOutcome::Cancelled
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(AuditConfig::default()).expect("built-in configuration is valid")
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

fn fraction(completed: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        completed as f64 / total as f64
    }
}

/// All frames then all texts; fails only when both enumerations fail
async fn whole_document(host: &dyn DocumentHost) -> Result<Vec<NodeRef>> {
    let frames = host.nodes_of_kind(NodeKind::Frame).await;
    let texts = host.nodes_of_kind(NodeKind::Text).await;
    match (frames, texts) {
        (Err(frames_err), Err(texts_err)) => Err(AuditError::Host(format!(
            "frames: {}; texts: {}",
            frames_err, texts_err
        ))),
        (frames, texts) => {
            let mut nodes = frames.unwrap_or_else(|e| {
                warn!("Error getting frame nodes: {}", e);
                Vec::new()
            });
            nodes.extend(texts.unwrap_or_else(|e| {
                warn!("Error getting text nodes: {}", e);
                Vec::new()
            }));
            Ok(nodes)
        }
    }
}

/// The page itself, then its frames, then its texts
async fn page_nodes(host: &dyn DocumentHost, page: &NodeRef) -> Vec<NodeRef> {
    let mut nodes = vec![Arc::clone(page)];
    for kind in [NodeKind::Frame, NodeKind::Text] {
        match host.nodes_of_kind_in(page, kind).await {
            Ok(found) => nodes.extend(found),
            Err(e) => warn!("Error getting {} nodes for page {}: {}", kind, page.id(), e),
        }
    }
    nodes
}
