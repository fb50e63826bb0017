//! DOM access layer.
//!
//! The bridge never talks to a concrete browser API. Everything it needs from
//! the embedded page goes through the [`Document`] trait, which mirrors the
//! handful of DOM primitives an injected page script relies on.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Document`] | Platform seam: queries, geometry, inline style, text |
//! | [`Rect`] | Viewport-relative border box |
//! | [`MemoryDocument`] | Arena-backed implementation with a CSS selector engine |
//!
//! # Ownership
//!
//! The document owns its nodes. [`NodeId`] handles are non-owning and may
//! outlive the node they name; callers check [`Document::contains`] before
//! mutating a node they looked up earlier.

// ============================================================================
// Submodules
// ============================================================================

/// CSS selector parsing and matching.
pub mod css;

/// In-memory document implementation.
pub mod memory;

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::NodeId;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::MemoryDocument;

// ============================================================================
// Rect
// ============================================================================

/// Border box in viewport coordinates, as returned by `getBoundingClientRect`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Distance from the viewport top edge.
    pub top: f64,
    /// Distance from the viewport left edge.
    pub left: f64,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
}

impl Rect {
    /// Creates a rect from its left/top corner and size.
    #[inline]
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Right edge.
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Returns `true` if the point lies inside the box (edges inclusive).
    #[inline]
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }
}

// ============================================================================
// Document
// ============================================================================

/// The DOM primitives the bridge relies on.
///
/// All methods take `&self`; implementations provide interior mutability.
/// Tag names are reported lowercase. Style property names are kebab-case.
pub trait Document {
    /// The `<html>` element.
    fn document_element(&self) -> Option<NodeId>;

    /// The `<body>` element.
    fn body(&self) -> Option<NodeId>;

    /// Returns `true` while the node is connected to this document.
    fn contains(&self, node: NodeId) -> bool;

    /// All elements matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`](crate::Error::InvalidSelector) if the
    /// selector cannot be parsed.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>>;

    /// First element matching `selector`.
    ///
    /// # Errors
    ///
    /// Same as [`Document::query_selector_all`].
    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// Every element under the point, topmost first (`elementsFromPoint`).
    fn elements_from_point(&self, x: f64, y: f64) -> Vec<NodeId>;

    /// Lowercase tag name, `None` for non-elements.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    /// Attribute value.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// All attributes in declaration order.
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    /// Returns `true` if the attribute is present (even if empty).
    fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Class tokens from the `class` attribute.
    fn class_list(&self, node: NodeId) -> Vec<String> {
        self.attribute(node, "class")
            .map(|classes| classes.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Parent element (`None` for `<html>` and detached nodes).
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;

    /// Element children in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Data of the node's direct text-node children.
    fn text_nodes(&self, node: NodeId) -> Vec<String>;

    /// Concatenated text of all descendants (`textContent`).
    fn text_content(&self, node: NodeId) -> String;

    /// Replaces all children with a single text node (`textContent = ..`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`](crate::Error::Dom) if the node is not an element.
    fn set_text_content(&self, node: NodeId, text: &str) -> Result<()>;

    /// Border box in viewport coordinates.
    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// Resolved value of a computed style property, empty if unknown.
    fn computed_style(&self, node: NodeId, property: &str) -> String;

    /// Inline style value (`style.getPropertyValue`), empty if unset.
    fn style_property(&self, node: NodeId, property: &str) -> String;

    /// Returns `true` if the inline declaration carries `!important`.
    fn style_priority(&self, node: NodeId, property: &str) -> bool;

    /// Sets an inline style declaration (`style.setProperty`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`](crate::Error::Dom) if the node is not an element.
    fn set_style_property(
        &self,
        node: NodeId,
        property: &str,
        value: &str,
        important: bool,
    ) -> Result<()>;

    /// Removes an inline style declaration (`style.removeProperty`).
    fn remove_style_property(&self, node: NodeId, property: &str);

    /// Creates an element with the given id and appends it to `<body>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`](crate::Error::Dom) if there is no body.
    fn append_to_body(&self, tag: &str, id: &str) -> Result<NodeId>;

    /// Detaches an element from its parent.
    fn remove_element(&self, node: NodeId);

    /// Adds a class token.
    fn add_class(&self, node: NodeId, class: &str);

    /// Removes a class token.
    fn remove_class(&self, node: NodeId, class: &str);
}

// ============================================================================
// Helpers
// ============================================================================

/// Converts a camelCase style key to its kebab-case CSS property name.
///
/// Keys already in kebab-case pass through unchanged.
#[must_use]
pub fn to_kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for ch in property.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
