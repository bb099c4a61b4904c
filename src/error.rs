// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for a11yaudit

use thiserror::Error;

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, AuditError>;

/// Main error type for a11yaudit
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Host error: {0}")]
    Host(String),

    #[error("Node {id} unavailable: {what}")]
    NodeUnavailable { id: String, what: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Analyzer {name} failed: {reason}")]
    Analyzer { name: String, reason: String },
}

impl AuditError {
    /// Shorthand for a failed node lookup
    pub fn unavailable(id: &str, what: &str) -> Self {
        AuditError::NodeUnavailable {
            id: id.to_string(),
            what: what.to_string(),
        }
    }
}
