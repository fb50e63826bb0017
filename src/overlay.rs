//! Highlight, selection and tooltip overlays.
//!
//! Three fixed-position, pointer-transparent nodes are created lazily on
//! first use, appended to `<body>`, and reused afterwards. Positions come
//! from the target's bounding rect; the manager remembers which element each
//! box tracks so a resize can re-sync them.
//!
//! | Overlay | Id | Stacking |
//! |---------|----|----------|
//! | Hover | `lovivo-visual-edit-hover` | 2147483646 |
//! | Selection | `lovivo-visual-edit-selected` | 2147483645 |
//! | Tooltip | `lovivo-visual-edit-tooltip` | 2147483647 |

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, warn};

use crate::dom::{Document, Rect};
use crate::error::Result;
use crate::identifiers::NodeId;

// ============================================================================
// Constants
// ============================================================================

/// Estimated rendered tooltip height.
const TOOLTIP_HEIGHT: f64 = 30.0;

/// Gap between tooltip and element.
const TOOLTIP_SPACING: f64 = 8.0;

/// Tooltip max width plus margin.
const TOOLTIP_RESERVED_WIDTH: f64 = 310.0;

const HOVER_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("pointer-events", "none"),
    ("border", "2px solid #3b82f6"),
    ("background", "rgba(59, 130, 246, 0.1)"),
    ("z-index", "2147483646"),
    ("transition", "all 150ms ease"),
    ("display", "none"),
    ("box-sizing", "border-box"),
];

const SELECTION_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("pointer-events", "none"),
    ("border", "2px solid #10b981"),
    ("background", "rgba(16, 185, 129, 0.15)"),
    ("z-index", "2147483645"),
    ("display", "none"),
    ("box-sizing", "border-box"),
];

const TOOLTIP_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("pointer-events", "none"),
    ("background", "rgba(0, 0, 0, 0.9)"),
    ("color", "white"),
    ("padding", "6px 10px"),
    ("border-radius", "4px"),
    ("font-family", "'Monaco', 'Menlo', monospace"),
    ("font-size", "11px"),
    ("z-index", "2147483647"),
    ("display", "none"),
    ("max-width", "300px"),
    ("word-break", "break-word"),
    ("line-height", "1.4"),
];

// ============================================================================
// OverlayKind
// ============================================================================

/// The three overlay boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    /// Blue hover box.
    Hover,
    /// Green selection box.
    Selection,
    /// Label box.
    Tooltip,
}

impl OverlayKind {
    /// DOM id of the overlay node.
    #[must_use]
    pub const fn element_id(self) -> &'static str {
        match self {
            Self::Hover => "lovivo-visual-edit-hover",
            Self::Selection => "lovivo-visual-edit-selected",
            Self::Tooltip => "lovivo-visual-edit-tooltip",
        }
    }

    fn base_style(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Hover => HOVER_STYLE,
            Self::Selection => SELECTION_STYLE,
            Self::Tooltip => TOOLTIP_STYLE,
        }
    }
}

// ============================================================================
// OverlayManager
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    node: Option<NodeId>,
    target: Option<NodeId>,
}

/// Owns the overlay nodes and the elements they track.
#[derive(Debug, Clone, Default)]
pub struct OverlayManager {
    hover: Slot,
    selection: Slot,
    tooltip: Slot,
}

impl OverlayManager {
    /// Creates a manager with no overlay nodes yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: OverlayKind) -> &Slot {
        match kind {
            OverlayKind::Hover => &self.hover,
            OverlayKind::Selection => &self.selection,
            OverlayKind::Tooltip => &self.tooltip,
        }
    }

    fn slot_mut(&mut self, kind: OverlayKind) -> &mut Slot {
        match kind {
            OverlayKind::Hover => &mut self.hover,
            OverlayKind::Selection => &mut self.selection,
            OverlayKind::Tooltip => &mut self.tooltip,
        }
    }

    /// Returns the overlay node, creating it if missing or detached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`](crate::Error::Dom) if the node cannot be created.
    pub fn ensure(&mut self, doc: &impl Document, kind: OverlayKind) -> Result<NodeId> {
        if let Some(node) = self.slot(kind).node
            && doc.contains(node)
        {
            return Ok(node);
        }

        let node = doc.append_to_body("div", kind.element_id())?;
        for (property, value) in kind.base_style() {
            doc.set_style_property(node, property, value, false)?;
        }
        self.slot_mut(kind).node = Some(node);
        debug!(overlay = kind.element_id(), %node, "Overlay created");
        Ok(node)
    }

    /// Overlay node if it was created.
    #[must_use]
    pub fn node(&self, kind: OverlayKind) -> Option<NodeId> {
        self.slot(kind).node
    }

    /// Every overlay node created so far.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeId> {
        [self.hover.node, self.selection.node, self.tooltip.node]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Element the overlay currently tracks.
    #[must_use]
    pub fn target(&self, kind: OverlayKind) -> Option<NodeId> {
        self.slot(kind).target
    }

    /// Covers `target` with the overlay and shows it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`](crate::Error::Dom) if the overlay cannot be
    /// created or styled.
    pub fn show(&mut self, doc: &impl Document, kind: OverlayKind, target: NodeId) -> Result<()> {
        let node = self.ensure(doc, kind)?;
        cover(doc, node, doc.bounding_rect(target))?;
        self.slot_mut(kind).target = Some(target);
        Ok(())
    }

    /// Hides the overlay and forgets its target.
    pub fn hide(&mut self, doc: &impl Document, kind: OverlayKind) {
        let slot = self.slot_mut(kind);
        slot.target = None;
        if let Some(node) = slot.node
            && let Err(e) = doc.set_style_property(node, "display", "none", false)
        {
            warn!(overlay = kind.element_id(), error = %e, "Could not hide overlay");
        }
    }

    /// Returns `true` while the overlay is displayed.
    #[must_use]
    pub fn is_visible(&self, doc: &impl Document, kind: OverlayKind) -> bool {
        self.slot(kind)
            .node
            .is_some_and(|node| doc.contains(node) && doc.style_property(node, "display") == "block")
    }

    /// Re-syncs visible hover and selection boxes to their targets.
    ///
    /// Targets that left the document hide their overlay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`](crate::Error::Dom) if an overlay cannot be styled.
    pub fn reposition(&mut self, doc: &impl Document) -> Result<()> {
        for kind in [OverlayKind::Hover, OverlayKind::Selection] {
            let Slot { node, target } = *self.slot(kind);
            match (node, target) {
                (Some(node), Some(target)) if doc.contains(target) => {
                    cover(doc, node, doc.bounding_rect(target))?;
                }
                (_, Some(_)) => self.hide(doc, kind),
                _ => {}
            }
        }
        Ok(())
    }

    /// Shows a label next to `target`, above it when there is room.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`](crate::Error::Dom) if the tooltip cannot be
    /// created or styled.
    pub fn show_tooltip(
        &mut self,
        doc: &impl Document,
        viewport_width: f64,
        target: NodeId,
        label: &str,
    ) -> Result<()> {
        let node = self.ensure(doc, OverlayKind::Tooltip)?;
        let (left, top) = tooltip_position(doc.bounding_rect(target), viewport_width);

        doc.set_text_content(node, label)?;
        doc.set_style_property(node, "top", &px(top), false)?;
        doc.set_style_property(node, "left", &px(left), false)?;
        doc.set_style_property(node, "display", "block", false)?;
        self.tooltip.target = Some(target);
        Ok(())
    }

    /// Removes every overlay node from the document.
    pub fn remove_all(&mut self, doc: &impl Document) {
        for node in self.nodes() {
            doc.remove_element(node);
        }
        *self = Self::default();
    }
}

// ============================================================================
// Geometry
// ============================================================================

fn px(value: f64) -> String {
    format!("{value}px")
}

fn cover(doc: &impl Document, overlay: NodeId, rect: Rect) -> Result<()> {
    doc.set_style_property(overlay, "top", &px(rect.top), false)?;
    doc.set_style_property(overlay, "left", &px(rect.left), false)?;
    doc.set_style_property(overlay, "width", &px(rect.width), false)?;
    doc.set_style_property(overlay, "height", &px(rect.height), false)?;
    doc.set_style_property(overlay, "display", "block", false)
}

/// `(left, top)` for a tooltip anchored to `rect`.
#[must_use]
pub fn tooltip_position(rect: Rect, viewport_width: f64) -> (f64, f64) {
    let mut top = rect.top - TOOLTIP_HEIGHT - TOOLTIP_SPACING;
    if top < 0.0 {
        top = rect.bottom() + TOOLTIP_SPACING;
    }
    let max_left = viewport_width - TOOLTIP_RESERVED_WIDTH;
    let left = rect.left.min(max_left).max(0.0);
    (left, top)
}

/// Tooltip text: tag, id, first two semantic classes and the selector.
#[must_use]
pub fn tooltip_label(tag: &str, id: Option<&str>, classes: &[String], selector: Option<&str>) -> String {
    let mut label = tag.to_string();
    if let Some(id) = id {
        label.push_str(" #");
        label.push_str(id);
    }
    if !classes.is_empty() {
        let shown: Vec<&str> = classes.iter().take(2).map(String::as_str).collect();
        label.push_str(" .");
        label.push_str(&shown.join("."));
    }
    if let Some(selector) = selector {
        label.push('\n');
        label.push_str(selector);
    }
    label
}

// ============================================================================
// Tests
// ============================================================================
