// SPDX-License-Identifier: PMPL-1.0-or-later
//! In-memory design document.
//!
//! Loads a node tree from JSON and serves it through [`DocumentHost`] and
//! [`DesignNode`]. Used by the CLI and by tests, which can inject lookup
//! failures and per-lookup latency to mimic a slow or flaky host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

use crate::error::{AuditError, Result};
use crate::node::{
    AttributePatch, DesignNode, DocumentHost, ImageFill, NodeAttributes, NodeKind, NodeRef, Rect,
};

/// Serialized form of a document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

/// Serialized form of one node and its subtree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(flatten)]
    pub attributes: NodeAttributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    name: Option<String>,
    rect: Option<Rect>,
    attributes: NodeAttributes,
    parent: Option<String>,
    children: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    name: Option<String>,
    nodes: RwLock<HashMap<String, NodeData>>,
    /// Pre-order document order
    order: Vec<String>,
    roots: Vec<String>,
    failing: RwLock<HashSet<String>>,
    latency: RwLock<Option<Duration>>,
}

impl Inner {
    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, NodeData>>> {
        self.nodes
            .read()
            .map_err(|_| AuditError::Host("document lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, NodeData>>> {
        self.nodes
            .write()
            .map_err(|_| AuditError::Host("document lock poisoned".into()))
    }

    /// Simulated host round-trip for a node lookup
    async fn round_trip(&self, id: &str, what: &str) -> Result<()> {
        let latency = self.latency.read().ok().and_then(|l| *l);
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .failing
            .read()
            .map(|f| f.contains(id))
            .unwrap_or(false);
        if failing {
            return Err(AuditError::unavailable(id, what));
        }
        Ok(())
    }

    fn with_node<T>(&self, id: &str, f: impl FnOnce(&NodeData) -> T) -> Result<T> {
        let nodes = self.read()?;
        nodes
            .get(id)
            .map(f)
            .ok_or_else(|| AuditError::unavailable(id, "node removed"))
    }
}

/// A JSON-backed document host
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    inner: Arc<Inner>,
}

impl MemoryDocument {
    /// Build a document from its serialized form
    pub fn from_spec(spec: DocumentSpec) -> Result<Self> {
        let mut nodes = HashMap::new();
        let mut order = Vec::new();
        let mut roots = Vec::new();
        for node in spec.nodes {
            roots.push(node.id.clone());
            flatten(node, None, &mut nodes, &mut order)?;
        }
        debug!("Loaded document with {} nodes ({} top-level)", order.len(), roots.len());
        Ok(Self {
            inner: Arc::new(Inner {
                name: spec.name,
                nodes: RwLock::new(nodes),
                order,
                roots,
                failing: RwLock::new(HashSet::new()),
                latency: RwLock::new(None),
            }),
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_spec(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.inner.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.order.is_empty()
    }

    /// Handle for a node by id
    pub fn node(&self, id: &str) -> Option<NodeRef> {
        let kind = self.inner.read().ok()?.get(id)?.kind;
        Some(self.handle(id, kind))
    }

    /// Every node in document order
    pub fn all_nodes(&self) -> Vec<NodeRef> {
        self.collect(|_| true)
    }

    /// Make every lookup on `id` fail from now on
    pub fn fail_lookups_for(&self, id: &str) {
        if let Ok(mut failing) = self.inner.failing.write() {
            failing.insert(id.to_string());
        }
    }

    /// Delay every node lookup by `delay`
    pub fn set_latency(&self, delay: Option<Duration>) {
        if let Ok(mut latency) = self.inner.latency.write() {
            *latency = delay;
        }
    }

    /// Current state, including remediation writes
    pub fn to_spec(&self) -> Result<DocumentSpec> {
        let nodes = self.inner.read()?;
        let roots = self
            .inner
            .roots
            .iter()
            .filter_map(|id| rebuild(id, &nodes))
            .collect();
        Ok(DocumentSpec {
            name: self.inner.name.clone(),
            nodes: roots,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_spec()?)?)
    }

    fn handle(&self, id: &str, kind: NodeKind) -> NodeRef {
        Arc::new(MemoryNode {
            doc: Arc::clone(&self.inner),
            id: id.to_string(),
            kind,
        })
    }

    fn collect(&self, keep: impl Fn(&NodeData) -> bool) -> Vec<NodeRef> {
        let Ok(nodes) = self.inner.read() else {
            return Vec::new();
        };
        self.inner
            .order
            .iter()
            .filter_map(|id| nodes.get(id).filter(|n| keep(n)).map(|n| (id, n.kind)))
            .map(|(id, kind)| self.handle(id, kind))
            .collect()
    }
}

fn flatten(
    spec: NodeSpec,
    parent: Option<&str>,
    nodes: &mut HashMap<String, NodeData>,
    order: &mut Vec<String>,
) -> Result<()> {
    if nodes.contains_key(&spec.id) {
        return Err(AuditError::Host(format!("duplicate node id: {}", spec.id)));
    }
    let id = spec.id.clone();
    order.push(id.clone());
    nodes.insert(
        id.clone(),
        NodeData {
            kind: spec.kind,
            name: spec.name,
            rect: spec.rect,
            attributes: spec.attributes,
            parent: parent.map(str::to_string),
            children: spec.children.iter().map(|c| c.id.clone()).collect(),
        },
    );
    for child in spec.children {
        flatten(child, Some(&id), nodes, order)?;
    }
    Ok(())
}

fn rebuild(id: &str, nodes: &HashMap<String, NodeData>) -> Option<NodeSpec> {
    let data = nodes.get(id)?;
    Some(NodeSpec {
        id: id.to_string(),
        kind: data.kind,
        name: data.name.clone(),
        rect: data.rect,
        attributes: data.attributes.clone(),
        children: data
            .children
            .iter()
            .filter_map(|c| rebuild(c, nodes))
            .collect(),
    })
}

fn is_descendant(nodes: &HashMap<String, NodeData>, id: &str, ancestor: &str) -> bool {
    let mut current = nodes.get(id).and_then(|n| n.parent.as_deref());
    while let Some(p) = current {
        if p == ancestor {
            return true;
        }
        current = nodes.get(p).and_then(|n| n.parent.as_deref());
    }
    false
}

#[async_trait]
impl DocumentHost for MemoryDocument {
    async fn nodes_of_kind(&self, kind: NodeKind) -> Result<Vec<NodeRef>> {
        Ok(self.collect(|n| n.kind == kind))
    }

    async fn nodes_of_kind_in(&self, page: &NodeRef, kind: NodeKind) -> Result<Vec<NodeRef>> {
        self.inner.round_trip(page.id(), "descendants").await?;
        let nodes = self.inner.read()?;
        Ok(self
            .inner
            .order
            .iter()
            .filter(|id| {
                nodes.get(*id).is_some_and(|n| n.kind == kind)
                    && is_descendant(&nodes, id, page.id())
            })
            .map(|id| self.handle(id, kind))
            .collect())
    }

    async fn top_level_frames(&self) -> Result<Vec<NodeRef>> {
        let nodes = self.inner.read()?;
        Ok(self
            .inner
            .roots
            .iter()
            .filter_map(|id| nodes.get(id).map(|n| (id, n.kind)))
            .filter(|(_, kind)| *kind == NodeKind::Frame)
            .map(|(id, kind)| self.handle(id, kind))
            .collect())
    }
}

/// Node handle into a [`MemoryDocument`]
#[derive(Debug)]
pub struct MemoryNode {
    doc: Arc<Inner>,
    id: String,
    kind: NodeKind,
}

impl MemoryNode {
    fn sibling(&self, id: &str) -> Result<NodeRef> {
        let kind = self.doc.with_node(id, |n| n.kind)?;
        Ok(Arc::new(MemoryNode {
            doc: Arc::clone(&self.doc),
            id: id.to_string(),
            kind,
        }))
    }
}

#[async_trait]
impl DesignNode for MemoryNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn name(&self) -> Option<String> {
        self.doc.with_node(&self.id, |n| n.name.clone()).ok().flatten()
    }

    async fn parent(&self) -> Result<Option<NodeRef>> {
        self.doc.round_trip(&self.id, "parent").await?;
        let parent = self.doc.with_node(&self.id, |n| n.parent.clone())?;
        parent.map(|p| self.sibling(&p)).transpose()
    }

    async fn children(&self) -> Result<Vec<NodeRef>> {
        self.doc.round_trip(&self.id, "children").await?;
        let children = self.doc.with_node(&self.id, |n| n.children.clone())?;
        children.iter().map(|c| self.sibling(c)).collect()
    }

    async fn rect(&self) -> Result<Option<Rect>> {
        self.doc.round_trip(&self.id, "rect").await?;
        self.doc.with_node(&self.id, |n| n.rect)
    }

    async fn attributes(&self) -> Result<NodeAttributes> {
        self.doc.round_trip(&self.id, "attributes").await?;
        self.doc.with_node(&self.id, |n| n.attributes.clone())
    }

    async fn set_attributes(&self, patch: AttributePatch) -> Result<()> {
        self.doc.round_trip(&self.id, "set_attributes").await?;
        let mut nodes = self.doc.write()?;
        let node = nodes
            .get_mut(&self.id)
            .ok_or_else(|| AuditError::unavailable(&self.id, "node removed"))?;
        if let Some(color) = patch.background_color {
            node.attributes.background_color = Some(color);
        }
        if let Some(color) = patch.text_color {
            node.attributes.text_color = Some(color);
        }
        if let Some(size) = patch.font_size {
            node.attributes.font_size = Some(size);
        }
        if patch.width.is_some() || patch.height.is_some() {
            let rect = node.rect.get_or_insert_with(Rect::default);
            if let Some(w) = patch.width {
                rect.width = w;
            }
            if let Some(h) = patch.height {
                rect.height = h;
            }
        }
        if let Some(alt) = patch.alt_text {
            // Alt text lives on the image fill; nothing to annotate without one
            if let Some(image) = node.attributes.background_image.as_mut() {
                image.alt_text = Some(alt);
            }
        }
        if let Some(name) = patch.name {
            node.name = Some(name);
        }
        Ok(())
    }

    async fn set_text(&self, text: &str) -> Result<()> {
        self.doc.round_trip(&self.id, "set_text").await?;
        let mut nodes = self.doc.write()?;
        let node = nodes
            .get_mut(&self.id)
            .ok_or_else(|| AuditError::unavailable(&self.id, "node removed"))?;
        node.attributes.text = Some(text.to_string());
        Ok(())
    }
}

/// Convenience constructors for building documents in code
impl NodeSpec {
    pub fn new(id: &str, kind: NodeKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            name: None,
            rect: None,
            attributes: NodeAttributes::default(),
            children: Vec::new(),
        }
    }

    pub fn frame(id: &str, name: &str) -> Self {
        Self::new(id, NodeKind::Frame).named(name)
    }

    pub fn text(id: &str, name: &str, content: &str) -> Self {
        let mut spec = Self::new(id, NodeKind::Text).named(name);
        spec.attributes.text = Some(content.to_string());
        spec
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn at(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Some(Rect::new(x, y, width, height));
        self
    }

    pub fn background(mut self, color: &str) -> Self {
        self.attributes.background_color = Some(color.to_string());
        self
    }

    pub fn image(mut self, alt_text: Option<&str>) -> Self {
        self.attributes.background_image = Some(ImageFill {
            alt_text: alt_text.map(str::to_string),
            url: None,
        });
        self
    }

    pub fn font(mut self, size: f64, weight: u16) -> Self {
        self.attributes.font_size = Some(size);
        self.attributes.font_weight = Some(weight);
        self
    }

    pub fn color(mut self, color: &str) -> Self {
        self.attributes.text_color = Some(color.to_string());
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryDocument {
        MemoryDocument::from_spec(DocumentSpec {
            name: Some("Sample".into()),
            nodes: vec![
                NodeSpec::frame("page", "Home Page")
                    .at(0.0, 0.0, 400.0, 800.0)
                    .child(NodeSpec::text("title", "H1 Title", "Welcome"))
                    .child(
                        NodeSpec::frame("card", "Card")
                            .child(NodeSpec::text("body", "Body", "Hello")),
                    ),
                NodeSpec::text("loose", "Loose text", "orphan"),
            ],
        })
        .expect("valid document")
    }

    #[test]
    fn test_json_shape() {
        let doc = MemoryDocument::from_json(
            r##"{"nodes":[{"id":"a","type":"frame","name":"Button","backgroundColor":"#fff",
                "rect":{"x":0,"y":0,"width":40,"height":40},
                "backgroundImage":{"altText":"logo"},
                "children":[{"id":"b","type":"text","text":"OK","fontSize":11}]}]}"##,
        )
        .expect("parses");
        assert_eq!(doc.len(), 2);
        let spec = doc.to_spec().expect("spec");
        assert_eq!(spec.nodes[0].attributes.background_color.as_deref(), Some("#fff"));
        assert_eq!(spec.nodes[0].children[0].attributes.font_size, Some(11.0));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = MemoryDocument::from_spec(DocumentSpec {
            name: None,
            nodes: vec![NodeSpec::frame("a", "A"), NodeSpec::frame("a", "B")],
        });
        assert!(matches!(result, Err(AuditError::Host(_))));
    }

    #[tokio::test]
    async fn test_enumeration() {
        let doc = sample();
        let pages = doc.top_level_frames().await.expect("pages");
        assert_eq!(pages.len(), 1);
        let texts = doc.nodes_of_kind(NodeKind::Text).await.expect("texts");
        assert_eq!(texts.len(), 3);
        let page_texts = doc
            .nodes_of_kind_in(&pages[0], NodeKind::Text)
            .await
            .expect("page texts");
        let ids: Vec<_> = page_texts.iter().map(|n| n.id().to_string()).collect();
        assert_eq!(ids, vec!["title", "body"]);
    }

    #[tokio::test]
    async fn test_parent_and_children() {
        let doc = sample();
        let body = doc.node("body").expect("exists");
        let parent = body.parent().await.expect("lookup").expect("has parent");
        assert_eq!(parent.id(), "card");
        let page = doc.node("page").expect("exists");
        assert!(page.parent().await.expect("lookup").is_none());
        assert_eq!(page.children().await.expect("children").len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let doc = sample();
        doc.fail_lookups_for("card");
        let card = doc.node("card").expect("exists");
        assert!(matches!(
            card.rect().await,
            Err(AuditError::NodeUnavailable { .. })
        ));
        assert_eq!(card.name().as_deref(), Some("Card"));
    }

    #[tokio::test]
    async fn test_writes_are_visible() {
        let doc = sample();
        let card = doc.node("card").expect("exists");
        card.set_attributes(AttributePatch::new().size(44.0, 44.0).name("Card h2"))
            .await
            .expect("write");
        assert_eq!(card.rect().await.expect("rect"), Some(Rect::new(0.0, 0.0, 44.0, 44.0)));
        assert_eq!(card.name().as_deref(), Some("Card h2"));
        let body = doc.node("body").expect("exists");
        body.set_text("Changed").await.expect("write");
        assert_eq!(body.text().await.expect("text").as_deref(), Some("Changed"));
        assert!(doc.to_json().expect("json").contains("Changed"));
    }
}
