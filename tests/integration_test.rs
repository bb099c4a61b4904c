// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests for a11yaudit

use a11yaudit::config::AuditConfig;
use a11yaudit::document::MemoryDocument;
use a11yaudit::report::{generate_report, OutputFormat};
use a11yaudit::scanner::ScanState;
use a11yaudit::{
    run_accessibility_check, run_accessibility_check_sequential, Category, FindingSet,
    ScanOptions, Scanner, Severity,
};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn load(name: &str) -> MemoryDocument {
    MemoryDocument::load(&Path::new("tests/fixtures").join(name)).expect("fixture should load")
}

async fn scan(doc: &MemoryDocument) -> FindingSet {
    Scanner::default()
        .scan_document(doc, ScanOptions::new())
        .await
        .expect("scan should succeed")
        .into_findings()
}

#[tokio::test]
async fn test_scan_accessible_fixture() {
    let findings = scan(&load("accessible.json")).await;

    assert!(
        findings.critical().is_empty() && findings.warnings().is_empty(),
        "Accessible fixture should be clean, got: {:?}",
        findings.iter().map(|f| &f.title).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_scan_inaccessible_fixture() {
    let findings = scan(&load("inaccessible.json")).await;

    let counts = findings.count_by_category();
    for category in Category::ALL {
        assert!(
            counts.get(&category).copied().unwrap_or(0) > 0,
            "expected a {} finding",
            category
        );
    }

    let contrast = findings.by_category(Category::Contrast);
    assert_eq!(contrast.len(), 1);
    assert_eq!(contrast[0].severity, Severity::Critical);
    assert_eq!(contrast[0].current_value.as_deref(), Some("2.85:1"));

    let pay = findings
        .iter()
        .find(|f| f.category == Category::TouchTarget && f.location.node_id == "pay"
            && f.severity == Severity::Critical)
        .expect("undersized pay button");
    assert_eq!(pay.current_value.as_deref(), Some("40x40px"));

    let alt: Vec<_> = findings.by_category(Category::AltText);
    assert_eq!(alt.len(), 1);
    assert_eq!(alt[0].severity, Severity::Critical);

    assert_eq!(findings.critical().len(), 6);
}

#[tokio::test]
async fn test_findings_ordered_by_severity() {
    let findings = scan(&load("inaccessible.json")).await;
    let severities: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
    let mut sorted = severities.clone();
    sorted.sort();
    assert_eq!(severities, sorted);
}

#[tokio::test]
async fn test_batched_and_sequential_agree() {
    let doc = load("inaccessible.json");
    let nodes = doc.all_nodes();
    let batched = run_accessibility_check(&nodes, ScanOptions::new()).await;
    let sequential = run_accessibility_check_sequential(&nodes, ScanOptions::new()).await;
    assert_eq!(batched.count_by_severity(), sequential.count_by_severity());
    assert_eq!(batched.count_by_category(), sequential.count_by_category());
}

#[tokio::test]
async fn test_progress_reaches_total() {
    let doc = load("inaccessible.json");
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let options = ScanOptions::new().on_progress(move |completed, total| {
        seen.lock().expect("lock").push((completed, total));
    });
    Scanner::default()
        .scan_document(&doc, options)
        .await
        .expect("scan should succeed");

    let calls = calls.lock().expect("lock");
    assert_eq!(calls.len(), 6);
    assert_eq!(calls.last(), Some(&(6, 6)));
}

#[tokio::test]
async fn test_fix_then_rescan() {
    let doc = load("inaccessible.json");
    let before = scan(&doc).await;
    for finding in before.iter() {
        if let Some(fix) = finding.remediations.first() {
            fix.apply().await;
        }
    }

    // Persisted edits survive a save/load cycle
    let reloaded = MemoryDocument::from_json(&doc.to_json().expect("serialize")).expect("reload");
    let after = scan(&reloaded).await;

    assert!(after.by_category(Category::Contrast).is_empty());
    assert!(after.by_category(Category::AltText).is_empty());
    assert!(after.by_category(Category::TextSize).is_empty());
    assert!(after
        .by_category(Category::TouchTarget)
        .iter()
        .all(|f| f.severity == Severity::Warning));
    // Focus states and the status dot need a designer
    assert_eq!(after.critical().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_then_scan_again() {
    let doc = load("inaccessible.json");
    doc.set_latency(Some(Duration::from_millis(50)));
    let scanner = Arc::new(Scanner::default());

    let task = {
        let scanner = Arc::clone(&scanner);
        let doc = doc.clone();
        tokio::spawn(async move { scanner.scan_document(&doc, ScanOptions::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    scanner.cancel();

    let outcome = task.await.expect("join").expect("scan");
    assert!(outcome.is_cancelled());
    assert!(outcome.into_findings().is_empty());
    assert_eq!(scanner.state(), ScanState::Cancelled);

    doc.set_latency(None);
    let findings = scanner
        .scan_document(&doc, ScanOptions::new())
        .await
        .expect("scan")
        .into_findings();
    assert_eq!(findings.critical().len(), 6);
    assert_eq!(scanner.state(), ScanState::Completed);
}

#[tokio::test]
async fn test_config_overrides_thresholds() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[thresholds]\nmin_touch_target = 50.0").expect("write");

    let config = AuditConfig::load(file.path()).expect("config");
    let scanner = Scanner::new(config).expect("scanner");
    let findings = scanner
        .scan_document(&load("accessible.json"), ScanOptions::new())
        .await
        .expect("scan")
        .into_findings();

    let touch = findings.by_category(Category::TouchTarget);
    assert_eq!(touch.len(), 1);
    assert_eq!(touch[0].location.node_id, "buy");
    assert_eq!(touch[0].current_value.as_deref(), Some("120x48px"));
    assert_eq!(touch[0].required_value.as_deref(), Some("50x50px minimum"));
}

#[tokio::test]
async fn test_markdown_report_for_fixture() {
    let findings = scan(&load("inaccessible.json")).await;
    let report = generate_report(&findings, OutputFormat::Markdown);
    assert!(report.contains("# Accessibility Report"));
    assert!(report.contains(&format!("Total issues found: {}", findings.len())));
    assert!(report.contains("### contrast Issues"));
    assert!(report.contains("#### Missing Alt Text"));
}
