// SPDX-License-Identifier: PMPL-1.0-or-later
//! Report generation for accessibility findings.
//!
//! Supports multiple output formats:
//! - Text: human-readable findings grouped by severity
//! - JSON: structured findings for programmatic consumption
//! - Markdown: summary counts plus detailed findings grouped by category

use crate::finding::{Category, Finding, FindingSet, Severity};
use chrono::{DateTime, Utc};

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// Shareable Markdown document
    Markdown,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Generate a report from findings
pub fn generate_report(findings: &FindingSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => generate_text_report(findings),
        OutputFormat::Json => generate_json_report(findings),
        OutputFormat::Markdown => generate_markdown_report(findings, Utc::now()),
    }
}

/// Generate human-readable text report
fn generate_text_report(findings: &FindingSet) -> String {
    let mut output = String::new();

    output.push_str("=== Accessibility Audit Report ===\n\n");

    if findings.is_empty() {
        output.push_str("No accessibility issues found. All checks passed.\n");
        return output;
    }

    let critical = findings.critical().len();
    let warnings = findings.warnings().len();
    let total = findings.len();

    output.push_str(&format!(
        "Found {} issue(s): {} critical, {} warning(s), {} info\n\n",
        total,
        critical,
        warnings,
        total - critical - warnings
    ));

    for severity in Severity::ALL {
        let sev_findings = findings.by_severity(severity);
        if sev_findings.is_empty() {
            continue;
        }

        output.push_str(&format!("--- {} ({}) ---\n", severity, sev_findings.len()));

        for finding in sev_findings {
            output.push_str(&format!("[{}] {}\n", finding.category, finding.title));
            output.push_str(&format!("  Element: {}\n", finding.location_string()));
            output.push_str(&format!("  {}\n", finding.description));

            if let Some(ref guideline) = finding.guideline {
                output.push_str(&format!("  WCAG: {}\n", guideline.text));
            }

            if let (Some(current), Some(required)) =
                (&finding.current_value, &finding.required_value)
            {
                output.push_str(&format!("  Measured: {} (required: {})\n", current, required));
            }

            if let Some(fix) = finding.remediations.first() {
                output.push_str(&format!("  Fix: {}\n", fix.description));
            }

            output.push('\n');
        }
    }

    if critical > 0 {
        output.push_str("RESULT: FAIL (critical issues found)\n");
    } else if warnings > 0 {
        output.push_str("RESULT: PASS WITH WARNINGS\n");
    } else {
        output.push_str("RESULT: PASS\n");
    }

    output
}

/// Generate JSON report
fn generate_json_report(findings: &FindingSet) -> String {
    serde_json::to_string_pretty(findings)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize findings: {}\"}}", e))
}

fn markdown_finding(output: &mut String, finding: &Finding) {
    output.push_str(&format!("#### {}\n\n", finding.title));
    output.push_str(&format!("- **Severity**: {}\n", finding.severity.as_str()));
    output.push_str(&format!("- **Element**: {}\n", finding.location.node_name));
    output.push_str(&format!("- **Description**: {}\n", finding.description));
    if let Some(ref guideline) = finding.guideline {
        match guideline.link {
            Some(ref link) => {
                output.push_str(&format!("- **WCAG Guideline**: [{}]({})\n", guideline.text, link))
            }
            None => output.push_str(&format!("- **WCAG Guideline**: {}\n", guideline.text)),
        }
    }
    if let Some(ref current) = finding.current_value {
        output.push_str(&format!("- **Current Value**: {}\n", current));
    }
    if let Some(ref required) = finding.required_value {
        output.push_str(&format!("- **Required Value**: {}\n", required));
    }
    if !finding.remediations.is_empty() {
        output.push_str("\n**Suggested Fixes**:\n");
        for fix in &finding.remediations {
            output.push_str(&format!("- {}\n", fix.description));
        }
    }
    output.push('\n');
}

/// Generate Markdown report stamped with `generated_at`
fn generate_markdown_report(findings: &FindingSet, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();
    output.push_str("# Accessibility Report\n\n");
    output.push_str(&format!(
        "Generated on: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str("## Summary\n\n");
    output.push_str(&format!("Total issues found: {}\n\n", findings.len()));

    output.push_str("### Issues by Severity\n\n");
    for (severity, count) in findings.count_by_severity() {
        output.push_str(&format!("- {}: {}\n", severity.as_str(), count));
    }

    output.push_str("\n### Issues by Category\n\n");
    let by_category = findings.count_by_category();
    for (category, count) in &by_category {
        output.push_str(&format!("- {}: {}\n", category, count));
    }

    if findings.is_empty() {
        return output;
    }

    output.push_str("\n## Detailed Findings\n\n");
    for category in Category::ALL {
        let in_category = findings.by_category(category);
        if in_category.is_empty() {
            continue;
        }
        output.push_str(&format!("### {} Issues\n\n", category));
        for finding in in_category {
            markdown_finding(&mut output, finding);
        }
    }
    output
}
