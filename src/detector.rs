//! Element detection under a point.
//!
//! The topmost element under the cursor is often a gradient layer, a blur
//! backdrop or a positioning wrapper rather than what the user means to
//! touch. Detection therefore inspects the whole z-stack and picks, in order:
//!
//! 1. the first *significant* candidate that is not *decorative*
//! 2. the first candidate that is not *decorative*
//! 3. the first candidate
//!
//! The bridge's own overlays, `<html>` and `<body>` are never candidates.
//!
//! A decorative wrapper with element children still counts as decorative
//! even when those children carry text; it is only returned by the last
//! pass.

// ============================================================================
// Imports
// ============================================================================

use tracing::trace;

use crate::classify::ClassificationPolicy;
use crate::dom::Document;
use crate::host::HostWindow;
use crate::identifiers::NodeId;

// ============================================================================
// Constants
// ============================================================================

/// Tags that are always significant.
const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "label", "video", "audio", "img",
];

/// Child tags that keep a decorative-looking wrapper meaningful.
const INTERACTIVE_CHILD_TAGS: &[&str] = &["a", "button", "input"];

/// Inline first-child tags that make a text-bearing container significant.
const INLINE_TEXT_TAGS: &[&str] = &["span", "strong", "em", "b", "i", "p"];

/// Attributes that make any element significant.
const SEMANTIC_ATTRIBUTES: &[&str] = &["aria-label", "title", "role"];

/// Text longer than this (in characters) counts as substantial.
const SUBSTANTIAL_TEXT_LEN: usize = 5;

// ============================================================================
// Coordinate Translation
// ============================================================================

/// Converts parent-window coordinates into the embedded viewport.
///
/// Subtracts the hosting frame's offset and the embedded scroll offset. When
/// there is no accessible frame element the point passes through unchanged.
#[must_use]
pub fn translate_coordinates(window: &impl HostWindow, x: f64, y: f64) -> (f64, f64) {
    match window.frame_element_rect() {
        Some(frame) => {
            let (scroll_x, scroll_y) = window.scroll_offset();
            (x - frame.left - scroll_x, y - frame.top - scroll_y)
        }
        None => (x, y),
    }
}

// ============================================================================
// ElementDetector
// ============================================================================

/// Picks the most meaningful element at a point.
#[derive(Debug, Clone, Copy)]
pub struct ElementDetector<'a> {
    policy: &'a ClassificationPolicy,
    debug: bool,
}

impl<'a> ElementDetector<'a> {
    /// Creates a detector. `debug` enables per-candidate trace events.
    #[must_use]
    pub fn new(policy: &'a ClassificationPolicy, debug: bool) -> Self {
        Self { policy, debug }
    }

    /// Returns the best candidate at viewport point `(x, y)`.
    ///
    /// `excluded` lists nodes that must never be returned (the overlays).
    pub fn detect_at(
        &self,
        doc: &impl Document,
        excluded: &[NodeId],
        x: f64,
        y: f64,
    ) -> Option<NodeId> {
        let html = doc.document_element();
        let body = doc.body();

        let candidates: Vec<NodeId> = doc
            .elements_from_point(x, y)
            .into_iter()
            .filter(|node| !excluded.contains(node))
            .filter(|&node| Some(node) != html && Some(node) != body)
            .collect();

        if self.debug {
            trace!(x, y, count = candidates.len(), "Elements at point");
        }

        let verdicts: Vec<(NodeId, bool)> = candidates
            .iter()
            .map(|&node| (node, self.is_decorative(doc, node)))
            .collect();

        for &(node, decorative) in &verdicts {
            let significant = self.is_significant(doc, node);
            if self.debug {
                trace!(%node, significant, decorative, "Checking candidate");
            }
            if significant && !decorative {
                return Some(node);
            }
        }

        if let Some(&(node, _)) = verdicts.iter().find(|(_, decorative)| !decorative) {
            if self.debug {
                trace!(%node, "Selected non-decorative candidate");
            }
            return Some(node);
        }

        let first = candidates.first().copied();
        if self.debug {
            trace!(node = ?first, "Falling back to first candidate");
        }
        first
    }

    /// Returns `true` for elements that carry content or interactivity.
    #[must_use]
    pub fn is_significant(&self, doc: &impl Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };

        if INTERACTIVE_TAGS.contains(&tag.as_str()) || is_heading(&tag) {
            return true;
        }

        if SEMANTIC_ATTRIBUTES
            .iter()
            .any(|attr| doc.has_attribute(node, attr))
        {
            return true;
        }

        if doc.text_nodes(node).iter().any(|text| !text.trim().is_empty()) {
            return true;
        }

        let text = doc.text_content(node);
        if text.trim().chars().count() > SUBSTANTIAL_TEXT_LEN
            && let Some(first_child) = doc.children(node).first()
            && doc
                .tag_name(*first_child)
                .is_some_and(|child| INLINE_TEXT_TAGS.contains(&child.as_str()))
        {
            return true;
        }

        doc.class_list(node)
            .iter()
            .any(|class| !self.policy.is_layout_class(class))
    }

    /// Returns `true` for cosmetic layers and wrappers.
    #[must_use]
    pub fn is_decorative(&self, doc: &impl Document, node: NodeId) -> bool {
        let has_decorative_class = doc
            .class_list(node)
            .iter()
            .any(|class| self.policy.is_decorative_class(class));
        if !has_decorative_class {
            return false;
        }

        let children = doc.children(node);
        let has_interactive_children = children.iter().any(|&child| {
            doc.tag_name(child)
                .is_some_and(|tag| INTERACTIVE_CHILD_TAGS.contains(&tag.as_str()))
        });
        if has_interactive_children {
            return false;
        }

        !children.is_empty() || doc.text_content(node).trim().is_empty()
    }
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, Rect};
    use crate::host::MemoryWindow;

    const FULL: Rect = Rect::new(0.0, 0.0, 400.0, 300.0);

    fn doc() -> (MemoryDocument, NodeId) {
        let doc = MemoryDocument::new();
        let body = doc.body().expect("body");
        (doc, body)
    }

    #[test]
    fn test_translate_coordinates() {
        let (window, _rx) = MemoryWindow::new("http://localhost:5173/").expect("window");
        assert_eq!(translate_coordinates(&window, 150.0, 80.0), (150.0, 80.0));

        let window = window.with_frame_rect(Rect::new(100.0, 50.0, 800.0, 600.0));
        window.set_scroll(0.0, 20.0);
        assert_eq!(translate_coordinates(&window, 150.0, 80.0), (50.0, 10.0));
    }

    #[test]
    fn test_significance_rules() {
        let policy = ClassificationPolicy::new();
        let detector = ElementDetector::new(&policy, false);
        let (doc, body) = doc();

        let button = doc.append_element(body, "button", &[]).expect("button");
        let heading = doc.append_element(body, "h3", &[]).expect("h3");
        let labelled = doc.append_element(body, "div", &[("role", "tab")]).expect("div");
        let text = doc.append_element(body, "div", &[]).expect("div");
        doc.append_text(text, "Hello").expect("text");
        let wrapper = doc.append_element(body, "div", &[]).expect("div");
        let span = doc.append_element(wrapper, "span", &[]).expect("span");
        doc.append_text(span, "Free shipping").expect("text");
        let layout_only = doc
            .append_element(body, "div", &[("class", "flex p-4 relative")])
            .expect("div");
        let named = doc
            .append_element(body, "div", &[("class", "flex product-grid")])
            .expect("div");

        assert!(detector.is_significant(&doc, button));
        assert!(detector.is_significant(&doc, heading));
        assert!(detector.is_significant(&doc, labelled));
        assert!(detector.is_significant(&doc, text));
        assert!(detector.is_significant(&doc, wrapper));
        assert!(!detector.is_significant(&doc, layout_only));
        assert!(detector.is_significant(&doc, named));
    }

    #[test]
    fn test_short_text_wrapper_is_not_significant() {
        let policy = ClassificationPolicy::new();
        let detector = ElementDetector::new(&policy, false);
        let (doc, body) = doc();
        let wrapper = doc.append_element(body, "div", &[]).expect("div");
        let span = doc.append_element(wrapper, "span", &[]).expect("span");
        doc.append_text(span, "Hi").expect("text");
        assert!(!detector.is_significant(&doc, wrapper));
    }

    #[test]
    fn test_decorative_rules() {
        let policy = ClassificationPolicy::new();
        let detector = ElementDetector::new(&policy, false);
        let (doc, body) = doc();

        let empty_gradient = doc
            .append_element(body, "div", &[("class", "bg-gradient-to-r")])
            .expect("div");
        let wrapper = doc
            .append_element(body, "div", &[("class", "backdrop-blur")])
            .expect("div");
        let inner = doc.append_element(wrapper, "p", &[]).expect("p");
        doc.append_text(inner, "Inside").expect("text");
        let with_button = doc
            .append_element(body, "div", &[("class", "shadow-xl")])
            .expect("div");
        doc.append_element(with_button, "button", &[]).expect("button");
        let text_leaf = doc
            .append_element(body, "span", &[("class", "drop-shadow")])
            .expect("span");
        doc.append_text(text_leaf, "Sale").expect("text");
        let plain = doc.append_element(body, "div", &[("class", "card")]).expect("div");

        assert!(detector.is_decorative(&doc, empty_gradient));
        assert!(detector.is_decorative(&doc, wrapper));
        assert!(!detector.is_decorative(&doc, with_button));
        assert!(!detector.is_decorative(&doc, text_leaf));
        assert!(!detector.is_decorative(&doc, plain));
    }

    #[test]
    fn test_skips_decorative_layer_on_top() {
        let policy = ClassificationPolicy::new();
        let detector = ElementDetector::new(&policy, false);
        let (doc, body) = doc();

        let button = doc.append_element(body, "button", &[("id", "buy")]).expect("button");
        doc.set_layout(button, Rect::new(0.0, 0.0, 100.0, 40.0));
        let gradient = doc
            .append_element(body, "div", &[("class", "bg-gradient-to-b from-black")])
            .expect("gradient");
        doc.set_layout(gradient, FULL);

        assert_eq!(doc.elements_from_point(10.0, 10.0)[0], gradient);
        assert_eq!(detector.detect_at(&doc, &[], 10.0, 10.0), Some(button));
    }

    #[test]
    fn test_second_pass_returns_non_decorative() {
        let policy = ClassificationPolicy::new();
        let detector = ElementDetector::new(&policy, false);
        let (doc, body) = doc();

        let plain = doc.append_element(body, "div", &[("class", "flex")]).expect("div");
        doc.set_layout(plain, FULL);
        let blur = doc.append_element(body, "div", &[("class", "blur-sm")]).expect("div");
        doc.set_layout(blur, FULL);

        assert_eq!(detector.detect_at(&doc, &[], 5.0, 5.0), Some(plain));
    }

    #[test]
    fn test_fallback_returns_decorative() {
        let policy = ClassificationPolicy::new();
        let detector = ElementDetector::new(&policy, false);
        let (doc, body) = doc();

        let blur = doc.append_element(body, "div", &[("class", "blur-sm")]).expect("div");
        doc.set_layout(blur, FULL);

        assert_eq!(detector.detect_at(&doc, &[], 5.0, 5.0), Some(blur));
    }

    #[test]
    fn test_excluded_overlays_and_root_elements() {
        let policy = ClassificationPolicy::new();
        let detector = ElementDetector::new(&policy, true);
        let (doc, body) = doc();

        let overlay = doc.append_element(body, "div", &[("title", "overlay")]).expect("div");
        doc.set_layout(overlay, FULL);

        assert_eq!(detector.detect_at(&doc, &[overlay], 5.0, 5.0), None);
        assert_eq!(detector.detect_at(&doc, &[], 5.0, 5.0), Some(overlay));
    }
}
