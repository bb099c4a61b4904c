// SPDX-License-Identifier: PMPL-1.0-or-later
//! Host node model.
//!
//! The auditing core never owns the design document. It sees nodes through
//! the [`DesignNode`] trait, whose lookups may suspend (host round-trips)
//! and may fail. Identity (`id`, `kind`, `name`) is cheap and synchronous.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
pub use crate::geometry::Rect;

/// Structural kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Frame,
    Text,
    Image,
    Component,
    Instance,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Frame => write!(f, "frame"),
            NodeKind::Text => write!(f, "text"),
            NodeKind::Image => write!(f, "image"),
            NodeKind::Component => write!(f, "component"),
            NodeKind::Instance => write!(f, "instance"),
        }
    }
}

/// Image fill attached to a frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ImageFill {
    /// Alt text with surrounding whitespace removed, if non-empty
    pub fn trimmed_alt(&self) -> Option<&str> {
        self.alt_text
            .as_deref()
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
    }
}

/// Style attributes read from a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<ImageFill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

/// Writable attribute subset, used only by remediation callbacks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributePatch {
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub font_size: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub alt_text: Option<String>,
    pub name: Option<String>,
}

impl AttributePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background_color(mut self, color: &str) -> Self {
        self.background_color = Some(color.to_string());
        self
    }

    pub fn text_color(mut self, color: &str) -> Self {
        self.text_color = Some(color.to_string());
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn alt_text(mut self, alt: &str) -> Self {
        self.alt_text = Some(alt.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// A node handle supplied by the host document
#[async_trait]
pub trait DesignNode: Send + Sync {
    /// Stable identifier
    fn id(&self) -> &str;

    /// Structural kind
    fn kind(&self) -> NodeKind;

    /// Optional human label
    fn name(&self) -> Option<String>;

    /// Containing node, `None` at the document root
    async fn parent(&self) -> Result<Option<NodeRef>>;

    /// Direct children in document order
    async fn children(&self) -> Result<Vec<NodeRef>>;

    /// Bounding box, `None` when the host has no geometry for the node
    async fn rect(&self) -> Result<Option<Rect>>;

    /// Style attributes
    async fn attributes(&self) -> Result<NodeAttributes>;

    /// Text content for text nodes
    async fn text(&self) -> Result<Option<String>> {
        Ok(self.attributes().await?.text)
    }

    /// Apply an attribute patch
    async fn set_attributes(&self, patch: AttributePatch) -> Result<()>;

    /// Replace text content
    async fn set_text(&self, text: &str) -> Result<()>;
}

/// Shared node handle
pub type NodeRef = Arc<dyn DesignNode>;

/// Enumeration capabilities of the host document
#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// All nodes of a kind across the whole document
    async fn nodes_of_kind(&self, kind: NodeKind) -> Result<Vec<NodeRef>>;

    /// All nodes of a kind below `page`
    async fn nodes_of_kind_in(&self, page: &NodeRef, kind: NodeKind) -> Result<Vec<NodeRef>>;

    /// Top-level frames, treated as logical pages
    async fn top_level_frames(&self) -> Result<Vec<NodeRef>>;
}

/// Display name with a fallback label
pub fn display_name(node: &dyn DesignNode, fallback: &str) -> String {
    node.name()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn is_frame(node: &dyn DesignNode) -> bool {
    node.kind() == NodeKind::Frame
}

pub fn is_text(node: &dyn DesignNode) -> bool {
    node.kind() == NodeKind::Text
}
