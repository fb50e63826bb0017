//! In-memory document.
//!
//! An arena DOM shared behind `Arc<RwLock<..>>`, so a bridge and the code
//! driving it can hold cheap clones of the same document. Node indices are
//! never reused: a removed node keeps its slot and simply stops being
//! connected, which is what makes [`NodeId`] safe as a weak handle.
//!
//! Layout is explicit. Tests (or an embedding layout engine) assign border
//! boxes with [`MemoryDocument::set_layout`]. Fixed-position elements without
//! an assigned box take their geometry from inline `top/left/width/height`
//! pixel values, which is how the bridge's own overlays become hit-testable.
//! Hit testing ignores `pointer-events`, so callers filter what they own.
//!
//! # Example
//!
//! ```
//! use visual_edit_bridge::dom::{Document, MemoryDocument, Rect};
//!
//! let doc = MemoryDocument::new();
//! let body = doc.body().unwrap();
//! let button = doc.append_element(body, "button", &[("id", "buy")]).unwrap();
//! doc.append_text(button, "Buy now").unwrap();
//! doc.set_layout(button, Rect::new(0.0, 0.0, 120.0, 40.0));
//!
//! assert_eq!(doc.query_selector("#buy").unwrap(), Some(button));
//! assert_eq!(doc.elements_from_point(10.0, 10.0)[0], button);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::identifiers::NodeId;

use super::css::{MatchContext, SelectorList};
use super::{Document, Rect};

// ============================================================================
// Node Storage
// ============================================================================

#[derive(Debug, Clone)]
struct StyleDeclaration {
    name: String,
    value: String,
    important: bool,
}

#[derive(Debug, Clone, Default)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    style: Vec<StyleDeclaration>,
    computed: FxHashMap<String, String>,
    layout: Option<Rect>,
}

impl ElementData {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn inline(&self, property: &str) -> Option<&StyleDeclaration> {
        self.style.iter().find(|decl| decl.name == property)
    }

    fn style_or_computed(&self, property: &str) -> Option<&str> {
        self.inline(property)
            .map(|decl| decl.value.as_str())
            .or_else(|| self.computed.get(property).map(String::as_str))
    }

    /// Geometry derived from inline `position: fixed` declarations.
    fn fixed_geometry(&self) -> Option<Rect> {
        if self.inline("position").map(|decl| decl.value.as_str()) != Some("fixed") {
            return None;
        }
        let px = |name: &str| {
            self.inline(name)
                .and_then(|decl| decl.value.trim().strip_suffix("px"))
                .and_then(|value| value.trim().parse::<f64>().ok())
        };
        Some(Rect::new(px("left")?, px("top")?, px("width")?, px("height")?))
    }

    fn is_hidden(&self) -> bool {
        self.style_or_computed("display") == Some("none")
    }

    fn z_index(&self) -> i64 {
        self.style_or_computed("z-index")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(Box<ElementData>),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    kind: NodeKind,
}

// ============================================================================
// DomTree
// ============================================================================

#[derive(Debug)]
struct DomTree {
    nodes: Vec<Node>,
    html: usize,
    body: usize,
}

impl DomTree {
    fn new() -> Self {
        let mut tree = Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            html: 0,
            body: 0,
        };
        tree.html = tree.push_element(0, "html", Vec::new());
        tree.push_element(tree.html, "head", Vec::new());
        tree.body = tree.push_element(tree.html, "body", Vec::new());
        tree
    }

    fn push_node(&mut self, parent: Option<usize>, kind: NodeKind) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(index);
        }
        index
    }

    fn push_element(&mut self, parent: usize, tag: &str, attrs: Vec<(String, String)>) -> usize {
        let mut data = ElementData {
            tag: tag.to_ascii_lowercase(),
            ..ElementData::default()
        };
        for (name, value) in attrs {
            data.set_attr(&name, &value);
        }
        self.push_node(Some(parent), NodeKind::Element(Box::new(data)))
    }

    fn index(&self, node: NodeId) -> Option<usize> {
        usize::try_from(node.as_u64())
            .ok()
            .filter(|&index| index < self.nodes.len())
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.nodes[self.index(node)?].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        let index = self.index(node)?;
        match &mut self.nodes[index].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn is_connected(&self, index: usize) -> bool {
        let mut cursor = Some(index);
        while let Some(current) = cursor {
            if current == 0 {
                return true;
            }
            cursor = self.nodes[current].parent;
        }
        false
    }

    fn detach(&mut self, index: usize) {
        if let Some(parent) = self.nodes[index].parent.take() {
            self.nodes[parent].children.retain(|&child| child != index);
        }
    }

    fn collect_elements(&self, index: usize, out: &mut Vec<usize>) {
        if matches!(self.nodes[index].kind, NodeKind::Element(_)) {
            out.push(index);
        }
        for &child in &self.nodes[index].children {
            self.collect_elements(child, out);
        }
    }

    fn text_content(&self, index: usize, out: &mut String) {
        match &self.nodes[index].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Document | NodeKind::Element(_) => {
                for &child in &self.nodes[index].children {
                    self.text_content(child, out);
                }
            }
        }
    }

    fn layout_rect(&self, index: usize) -> Option<Rect> {
        match &self.nodes[index].kind {
            NodeKind::Element(data) => data.layout.or_else(|| data.fixed_geometry()),
            _ => None,
        }
    }
}

impl ElementData {
    fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if name == "style" {
            self.style = parse_style_declarations(value);
            return;
        }
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value.to_string();
        } else {
            self.attrs.push((name, value.to_string()));
        }
    }
}

impl MatchContext for DomTree {
    fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|data| data.tag.as_str())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attr(name)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[self.index(node)?].parent?;
        match self.nodes[parent].kind {
            NodeKind::Element(_) => Some(node_id(parent)),
            _ => None,
        }
    }

    fn nth_of_type(&self, node: NodeId) -> usize {
        let Some(index) = self.index(node) else {
            return 0;
        };
        let Some(tag) = self.tag(node) else {
            return 0;
        };
        let Some(parent) = self.nodes[index].parent else {
            return 1;
        };

        let mut position = 0;
        for &sibling in &self.nodes[parent].children {
            if self.tag(node_id(sibling)) == Some(tag) {
                position += 1;
            }
            if sibling == index {
                break;
            }
        }
        position
    }
}

fn node_id(index: usize) -> NodeId {
    NodeId::new(index as u64)
}

// ============================================================================
// MemoryDocument
// ============================================================================

/// Shared handle to an in-memory document.
///
/// Cloning is cheap; all clones see the same tree.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    inner: Arc<RwLock<DomTree>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Creates a document containing `<html><head></head><body></body></html>`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(DomTree::new())),
        }
    }

    /// Creates an element and appends it to `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`] if `parent` is not an element.
    pub fn append_element(
        &self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<NodeId> {
        let mut tree = self.inner.write();
        let parent = element_index(&tree, parent)?;
        let attrs = attrs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        Ok(node_id(tree.push_element(parent, tag, attrs)))
    }

    /// Appends a text node to `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`] if `parent` is not an element.
    pub fn append_text(&self, parent: NodeId, text: &str) -> Result<NodeId> {
        let mut tree = self.inner.write();
        let parent = element_index(&tree, parent)?;
        Ok(node_id(
            tree.push_node(Some(parent), NodeKind::Text(text.to_string())),
        ))
    }

    /// Sets (or replaces) an attribute. `style` is parsed into declarations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`] if `node` is not an element.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let mut tree = self.inner.write();
        let data = tree
            .element_mut(node)
            .ok_or_else(|| Error::dom(format!("{node} is not an element")))?;
        data.set_attr(name, value);
        Ok(())
    }

    /// Removes an attribute.
    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        let mut tree = self.inner.write();
        if let Some(data) = tree.element_mut(node) {
            let name = name.to_ascii_lowercase();
            if name == "style" {
                data.style.clear();
            } else {
                data.attrs.retain(|(key, _)| *key != name);
            }
        }
    }

    /// Assigns the element's border box.
    pub fn set_layout(&self, node: NodeId, rect: Rect) {
        if let Some(data) = self.inner.write().element_mut(node) {
            data.layout = Some(rect);
        }
    }

    /// Sets a computed (stylesheet-resolved) style value.
    pub fn set_computed_style(&self, node: NodeId, property: &str, value: &str) {
        if let Some(data) = self.inner.write().element_mut(node) {
            data.computed
                .insert(property.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Moves an element (and its subtree) under a new parent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`] if either node is not an element or the move
    /// would create a cycle.
    pub fn move_element(&self, node: NodeId, new_parent: NodeId) -> Result<()> {
        let mut tree = self.inner.write();
        let index = element_index(&tree, node)?;
        let parent = element_index(&tree, new_parent)?;

        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == index {
                return Err(Error::dom("cannot move an element into its own subtree"));
            }
            cursor = tree.nodes[current].parent;
        }

        tree.detach(index);
        tree.nodes[index].parent = Some(parent);
        tree.nodes[parent].children.push(index);
        Ok(())
    }

    /// Serialized inline style (`style` attribute text).
    #[must_use]
    pub fn style_text(&self, node: NodeId) -> String {
        let tree = self.inner.read();
        tree.element(node)
            .map(|data| serialize_style_declarations(&data.style))
            .unwrap_or_default()
    }

    /// Number of element nodes currently connected.
    #[must_use]
    pub fn element_count(&self) -> usize {
        let tree = self.inner.read();
        let mut out = Vec::new();
        tree.collect_elements(0, &mut out);
        out.len()
    }
}

fn element_index(tree: &DomTree, node: NodeId) -> Result<usize> {
    tree.element(node)
        .and_then(|_| tree.index(node))
        .ok_or_else(|| Error::dom(format!("{node} is not an element")))
}

// ============================================================================
// Document Implementation
// ============================================================================

impl Document for MemoryDocument {
    fn document_element(&self) -> Option<NodeId> {
        Some(node_id(self.inner.read().html))
    }

    fn body(&self) -> Option<NodeId> {
        Some(node_id(self.inner.read().body))
    }

    fn contains(&self, node: NodeId) -> bool {
        let tree = self.inner.read();
        tree.index(node).is_some_and(|index| tree.is_connected(index))
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        let tree = self.inner.read();

        let mut candidates = Vec::new();
        tree.collect_elements(0, &mut candidates);

        if let Some(id) = list.id_only() {
            return Ok(candidates
                .into_iter()
                .map(node_id)
                .filter(|&node| tree.attr(node, "id") == Some(id))
                .collect());
        }

        Ok(candidates
            .into_iter()
            .map(node_id)
            .filter(|&node| list.matches(&*tree, node))
            .collect())
    }

    fn elements_from_point(&self, x: f64, y: f64) -> Vec<NodeId> {
        let tree = self.inner.read();
        let mut elements = Vec::new();
        tree.collect_elements(0, &mut elements);

        // (z-index, document order) for every element whose box holds the point
        let mut hits: Vec<(i64, usize, usize)> = elements
            .iter()
            .enumerate()
            .filter_map(|(order, &index)| {
                let NodeKind::Element(data) = &tree.nodes[index].kind else {
                    return None;
                };
                if data.is_hidden() || index == tree.html || index == tree.body {
                    return None;
                }
                let rect = tree.layout_rect(index)?;
                rect.contains(x, y).then_some((data.z_index(), order, index))
            })
            .collect();

        hits.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        let mut out: Vec<NodeId> = hits.into_iter().map(|(_, _, index)| node_id(index)).collect();
        if x >= 0.0 && y >= 0.0 {
            out.push(node_id(tree.body));
            out.push(node_id(tree.html));
        }
        out
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.inner.read().tag(node).map(str::to_string)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let tree = self.inner.read();
        let data = tree.element(node)?;
        let name = name.to_ascii_lowercase();
        if name == "style" {
            return (!data.style.is_empty()).then(|| serialize_style_declarations(&data.style));
        }
        data.attr(&name).map(str::to_string)
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.inner
            .read()
            .element(node)
            .map(|data| data.attrs.clone())
            .unwrap_or_default()
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        MatchContext::parent_element(&*self.inner.read(), node)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let tree = self.inner.read();
        let Some(index) = tree.index(node) else {
            return Vec::new();
        };
        tree.nodes[index]
            .children
            .iter()
            .filter(|&&child| matches!(tree.nodes[child].kind, NodeKind::Element(_)))
            .map(|&child| node_id(child))
            .collect()
    }

    fn text_nodes(&self, node: NodeId) -> Vec<String> {
        let tree = self.inner.read();
        let Some(index) = tree.index(node) else {
            return Vec::new();
        };
        tree.nodes[index]
            .children
            .iter()
            .filter_map(|&child| match &tree.nodes[child].kind {
                NodeKind::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn text_content(&self, node: NodeId) -> String {
        let tree = self.inner.read();
        let mut out = String::new();
        if let Some(index) = tree.index(node) {
            tree.text_content(index, &mut out);
        }
        out
    }

    fn set_text_content(&self, node: NodeId, text: &str) -> Result<()> {
        let mut tree = self.inner.write();
        let index = element_index(&tree, node)?;

        let old_children = std::mem::take(&mut tree.nodes[index].children);
        for child in old_children {
            tree.nodes[child].parent = None;
        }
        if !text.is_empty() {
            tree.push_node(Some(index), NodeKind::Text(text.to_string()));
        }
        Ok(())
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let tree = self.inner.read();
        tree.index(node)
            .and_then(|index| tree.layout_rect(index))
            .unwrap_or_default()
    }

    fn computed_style(&self, node: NodeId, property: &str) -> String {
        self.inner
            .read()
            .element(node)
            .and_then(|data| data.style_or_computed(property))
            .unwrap_or_default()
            .to_string()
    }

    fn style_property(&self, node: NodeId, property: &str) -> String {
        self.inner
            .read()
            .element(node)
            .and_then(|data| data.inline(property))
            .map(|decl| decl.value.clone())
            .unwrap_or_default()
    }

    fn style_priority(&self, node: NodeId, property: &str) -> bool {
        self.inner
            .read()
            .element(node)
            .and_then(|data| data.inline(property))
            .is_some_and(|decl| decl.important)
    }

    fn set_style_property(
        &self,
        node: NodeId,
        property: &str,
        value: &str,
        important: bool,
    ) -> Result<()> {
        let mut tree = self.inner.write();
        let data = tree
            .element_mut(node)
            .ok_or_else(|| Error::dom(format!("{node} is not an element")))?;

        let name = property.to_ascii_lowercase();
        if value.is_empty() {
            data.style.retain(|decl| decl.name != name);
            return Ok(());
        }
        match data.style.iter_mut().find(|decl| decl.name == name) {
            Some(decl) => {
                decl.value = value.to_string();
                decl.important = important;
            }
            None => data.style.push(StyleDeclaration {
                name,
                value: value.to_string(),
                important,
            }),
        }
        Ok(())
    }

    fn remove_style_property(&self, node: NodeId, property: &str) {
        if let Some(data) = self.inner.write().element_mut(node) {
            let name = property.to_ascii_lowercase();
            data.style.retain(|decl| decl.name != name);
        }
    }

    fn append_to_body(&self, tag: &str, id: &str) -> Result<NodeId> {
        let mut tree = self.inner.write();
        let body = tree.body;
        let attrs = vec![("id".to_string(), id.to_string())];
        Ok(node_id(tree.push_element(body, tag, attrs)))
    }

    fn remove_element(&self, node: NodeId) {
        let mut tree = self.inner.write();
        if let Some(index) = tree.index(node)
            && index != 0
        {
            tree.detach(index);
        }
    }

    fn add_class(&self, node: NodeId, class: &str) {
        let mut tree = self.inner.write();
        if let Some(data) = tree.element_mut(node) {
            let mut classes: Vec<String> = data
                .attr("class")
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if !classes.iter().any(|existing| existing == class) {
                classes.push(class.to_string());
                data.set_attr("class", &classes.join(" "));
            }
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        let mut tree = self.inner.write();
        if let Some(data) = tree.element_mut(node) {
            let classes: Vec<&str> = data
                .attr("class")
                .unwrap_or_default()
                .split_whitespace()
                .filter(|existing| *existing != class)
                .collect();
            let joined = classes.join(" ");
            data.set_attr("class", &joined);
        }
    }
}

// ============================================================================
// Style Declarations
// ============================================================================

fn parse_style_declarations(text: &str) -> Vec<StyleDeclaration> {
    let mut out: Vec<StyleDeclaration> = Vec::new();
    for raw in text.split(';') {
        let Some((name, value)) = raw.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let mut value = value.trim();
        let mut important = false;
        if let Some(stripped) = value.strip_suffix("!important") {
            value = stripped.trim_end();
            important = true;
        }
        let decl = StyleDeclaration {
            name,
            value: value.to_string(),
            important,
        };
        match out.iter_mut().find(|existing| existing.name == decl.name) {
            Some(existing) => *existing = decl,
            None => out.push(decl),
        }
    }
    out
}

fn serialize_style_declarations(decls: &[StyleDeclaration]) -> String {
    decls
        .iter()
        .map(|decl| {
            if decl.important {
                format!("{}: {} !important;", decl.name, decl.value)
            } else {
                format!("{}: {};", decl.name, decl.value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tests
// ============================================================================
