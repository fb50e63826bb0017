//! Bridge to host messages.
//!
//! Every outbound message is wrapped in an [`Envelope`] that flattens the
//! payload next to the routing fields:
//!
//! ```json
//! {
//!   "source": "lovivo-visual-edit-bridge",
//!   "type": "ELEMENT_CLICKED",
//!   "timestamp": 1718000000000,
//!   "selector": "#buy",
//!   ...
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::classify::ComponentAnalysis;
use crate::dom::Rect;
use crate::error::Result;

use super::inbound::DetectAction;

// ============================================================================
// Constants
// ============================================================================

/// `source` of every outbound message.
pub const BRIDGE_SOURCE: &str = "lovivo-visual-edit-bridge";

/// Protocol version announced in `VISUAL_EDIT_READY`.
pub const BRIDGE_VERSION: &str = "2.0.0";

/// Capabilities announced in `VISUAL_EDIT_READY`.
pub const BRIDGE_FEATURES: [&str; 7] = [
    "optimal-selectors",
    "tailwind-filtering",
    "data-attributes",
    "precise-detection",
    "professional-overlays",
    "performance-optimized",
    "origin-validation",
];

// ============================================================================
// Payload Types
// ============================================================================

/// Element geometry as reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BoundingRect {
    /// Top edge in viewport pixels.
    pub top: f64,
    /// Left edge in viewport pixels.
    pub left: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl From<Rect> for BoundingRect {
    fn from(rect: Rect) -> Self {
        Self {
            top: rect.top,
            left: rect.left,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// `ELEMENT_INFO` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    /// Selector the host asked about.
    pub selector: String,
    /// `data-lov-id` or `data-component-id`.
    pub component_id: Option<String>,
    /// Whether edits affect every instance.
    pub is_shared_component: bool,
    /// Component name, `unique`, or `None` without a component id.
    pub shared_component_type: Option<String>,
    /// Warning for shared components.
    pub shared_component_warning: Option<String>,
    /// Uppercase tag name.
    pub tag_name: String,
    /// Raw `class` attribute.
    pub class_name: String,
    /// Classes that survive utility filtering.
    pub semantic_classes: Vec<String>,
    /// Direct text, truncated.
    pub text_content: String,
    /// Whether the element has element children.
    pub has_children: bool,
    /// Whitelisted computed styles, camelCase keys in whitelist order.
    pub computed_styles: serde_json::Map<String, Value>,
    /// Viewport geometry.
    pub bounding_rect: BoundingRect,
}

// ============================================================================
// BridgeMessage
// ============================================================================

/// A message to the host editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum BridgeMessage {
    /// Sent once on install.
    #[serde(rename = "VISUAL_EDIT_READY")]
    Ready {
        /// Protocol version.
        version: String,
        /// Capability names.
        features: Vec<String>,
    },

    /// Sent on entering edit mode.
    #[serde(rename = "VISUAL_EDIT_READY")]
    Activated {
        /// Always `true`.
        active: bool,
    },

    /// Pointer moved onto a new element.
    #[serde(rename = "ELEMENT_HOVERED")]
    ElementHovered {
        /// Selector of the element.
        selector: String,
        /// `data-lov-id` or `data-component-id`.
        component_id: Option<String>,
        /// Whether edits affect every instance.
        is_shared_component: bool,
        /// Component name, `unique`, or `None` without a component id.
        shared_component_type: Option<String>,
    },

    /// Pointer clicked an element.
    #[serde(rename = "ELEMENT_CLICKED")]
    ElementClicked {
        /// Selector of the element.
        selector: String,
        /// `data-lov-id` or `data-component-id`.
        component_id: Option<String>,
        /// Whether edits affect every instance.
        is_shared_component: bool,
        /// Component name, `unique`, or `None` without a component id.
        shared_component_type: Option<String>,
        /// Warning for shared components.
        shared_component_warning: Option<String>,
    },

    /// Element description.
    #[serde(rename = "ELEMENT_INFO")]
    ElementInfo(Box<ElementInfo>),

    /// Nothing usable under the pointer.
    #[serde(rename = "NO_ELEMENT_DETECTED")]
    NoElement {
        /// Hover or click.
        action: DetectAction,
    },

    /// A request failed.
    #[serde(rename = "VISUAL_EDIT_ERROR")]
    Error {
        /// Human-readable description.
        error: String,
        /// Selector of the failed request.
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        /// Inbound type that failed at the dispatch boundary.
        #[serde(skip_serializing_if = "Option::is_none")]
        message_type: Option<String>,
        /// Detection action that failed.
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<DetectAction>,
    },

    /// Style overrides applied.
    #[serde(rename = "VISUAL_EDIT_PREVIEW_APPLIED")]
    PreviewApplied {
        /// Target selector.
        selector: String,
        /// Keys of the applied style map.
        applied_styles: Vec<String>,
    },

    /// Style overrides reverted.
    #[serde(rename = "VISUAL_EDIT_PREVIEW_REVERTED")]
    PreviewReverted {
        /// Target selector, or `all`.
        selector: String,
    },

    /// Text replaced.
    #[serde(rename = "VISUAL_EDIT_TEXT_PREVIEW_APPLIED")]
    TextPreviewApplied {
        /// Target selector.
        selector: String,
        /// New text.
        text: String,
        /// Text before the first replacement.
        original_text: String,
    },

    /// Text restored.
    #[serde(rename = "VISUAL_EDIT_TEXT_PREVIEW_REVERTED")]
    TextPreviewReverted {
        /// Target selector, or `all`.
        selector: String,
        /// Restored text for a single selector.
        #[serde(skip_serializing_if = "Option::is_none")]
        restored_text: Option<String>,
    },

    /// The page scrolled; overlays were cleared.
    #[serde(rename = "SCROLL_DETECTED")]
    ScrollDetected,
}

impl BridgeMessage {
    /// Install-time `VISUAL_EDIT_READY`.
    #[must_use]
    pub fn ready() -> Self {
        Self::Ready {
            version: BRIDGE_VERSION.to_string(),
            features: BRIDGE_FEATURES.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    /// `ELEMENT_HOVERED` for a detected element.
    #[must_use]
    pub fn hovered(
        selector: impl Into<String>,
        component_id: Option<String>,
        analysis: ComponentAnalysis,
    ) -> Self {
        Self::ElementHovered {
            selector: selector.into(),
            component_id,
            is_shared_component: analysis.is_shared,
            shared_component_type: analysis.component_type,
        }
    }

    /// `ELEMENT_CLICKED` for a detected element.
    #[must_use]
    pub fn clicked(
        selector: impl Into<String>,
        component_id: Option<String>,
        analysis: ComponentAnalysis,
    ) -> Self {
        Self::ElementClicked {
            selector: selector.into(),
            component_id,
            is_shared_component: analysis.is_shared,
            shared_component_type: analysis.component_type,
            shared_component_warning: analysis.warning_message,
        }
    }

    /// `VISUAL_EDIT_ERROR` with only a description.
    #[inline]
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            selector: None,
            message_type: None,
            action: None,
        }
    }

    /// `VISUAL_EDIT_ERROR` naming the selector of the failed request.
    #[inline]
    #[must_use]
    pub fn selector_error(error: impl Into<String>, selector: Option<&str>) -> Self {
        Self::Error {
            error: error.into(),
            selector: selector.map(str::to_string),
            message_type: None,
            action: None,
        }
    }

    /// Wire type.
    #[must_use]
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Ready { .. } | Self::Activated { .. } => "VISUAL_EDIT_READY",
            Self::ElementHovered { .. } => "ELEMENT_HOVERED",
            Self::ElementClicked { .. } => "ELEMENT_CLICKED",
            Self::ElementInfo(_) => "ELEMENT_INFO",
            Self::NoElement { .. } => "NO_ELEMENT_DETECTED",
            Self::Error { .. } => "VISUAL_EDIT_ERROR",
            Self::PreviewApplied { .. } => "VISUAL_EDIT_PREVIEW_APPLIED",
            Self::PreviewReverted { .. } => "VISUAL_EDIT_PREVIEW_REVERTED",
            Self::TextPreviewApplied { .. } => "VISUAL_EDIT_TEXT_PREVIEW_APPLIED",
            Self::TextPreviewReverted { .. } => "VISUAL_EDIT_TEXT_PREVIEW_REVERTED",
            Self::ScrollDetected => "SCROLL_DETECTED",
        }
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Routing wrapper around a [`BridgeMessage`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Always [`BRIDGE_SOURCE`].
    pub source: &'static str,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Payload, flattened next to `source` and `timestamp`.
    #[serde(flatten)]
    pub message: BridgeMessage,
}

impl Envelope {
    /// Wraps a message.
    #[inline]
    #[must_use]
    pub fn new(message: BridgeMessage, timestamp: u64) -> Self {
        Self {
            source: BRIDGE_SOURCE,
            timestamp,
            message,
        }
    }

    /// Serializes to a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
