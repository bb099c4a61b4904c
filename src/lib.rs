// SPDX-License-Identifier: PMPL-1.0-or-later
//! a11yaudit - WCAG accessibility auditing for design documents
//!
//! Inspects a tree of design-document nodes (frames, text, images) supplied
//! by a host application and reports WCAG violations with severity,
//! rationale and suggested remediation.
//!
//! ## Analyzers
//!
//! - **Contrast** (1.4.3/1.4.6): Text contrast against the containing frame
//! - **Text Size** (1.4.4): Minimum font size and all-caps readability
//! - **Touch Target** (2.5.5): Interactive target size and spacing
//! - **Image** (1.1.1): Alternative text on image fills
//! - **Color Blindness** (1.4.1): Color pairs that collapse under simulated CVD
//! - **Navigation** (1.3.1/1.3.2/2.4.7): Reading order, headings, landmarks, focus
//!
//! The [`scanner`] module batches the node collection, runs the enabled
//! analyzers concurrently per batch and merges the findings by severity.

pub mod analyzers;
pub mod cancel;
pub mod classify;
pub mod color;
pub mod config;
pub mod document;
pub mod error;
pub mod finding;
pub mod geometry;
pub mod node;
pub mod report;
pub mod scanner;

pub use error::{AuditError, Result};
pub use finding::{Category, Finding, FindingSet, Severity};
pub use scanner::{
    run_accessibility_check, run_accessibility_check_sequential, ScanOptions, ScanOutcome,
    Scanner,
};
