//! Host to bridge messages.
//!
//! Every inbound message is a JSON object with a string `type`. Anything else
//! is not ours and is ignored, as are unknown types. A known type with a
//! malformed body is an [`Error::InvalidMessage`].
//!
//! # Format
//!
//! ```json
//! { "type": "VISUAL_EDIT_DETECT_ELEMENT", "x": 120, "y": 48, "action": "hover" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConfigureOptions;
use crate::error::{Error, Result};

// ============================================================================
// DetectAction
// ============================================================================

/// What the pointer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectAction {
    /// Pointer moved over the page.
    Hover,
    /// Pointer clicked.
    Click,
}

impl DetectAction {
    /// Wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hover => "hover",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for DetectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// HostMessage
// ============================================================================

/// A message from the host editor.
///
/// Preview messages keep their payload loose so the bridge can answer a
/// malformed request with a targeted error naming the selector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    /// Enter edit mode.
    #[serde(rename = "VISUAL_EDIT_MODE_ACTIVATE")]
    Activate,

    /// Leave edit mode.
    #[serde(rename = "VISUAL_EDIT_MODE_DEACTIVATE")]
    Deactivate,

    /// Detect the element under a parent-window point.
    #[serde(rename = "VISUAL_EDIT_DETECT_ELEMENT")]
    DetectElement {
        /// Parent-window x.
        x: f64,
        /// Parent-window y.
        y: f64,
        /// Hover or click.
        action: DetectAction,
    },

    /// Show the hover box over a selector.
    #[serde(rename = "VISUAL_EDIT_HIGHLIGHT")]
    Highlight {
        /// Target selector; ignored when absent.
        #[serde(default)]
        selector: Option<String>,
    },

    /// Hide the hover box.
    #[serde(rename = "VISUAL_EDIT_CLEAR_HIGHLIGHT")]
    ClearHighlight,

    /// Describe an element.
    #[serde(rename = "VISUAL_EDIT_REQUEST_INFO")]
    RequestInfo {
        /// Target selector.
        selector: String,
    },

    /// Apply inline style overrides.
    #[serde(rename = "VISUAL_EDIT_APPLY_PREVIEW")]
    ApplyPreview {
        /// Target selector.
        #[serde(default)]
        selector: Option<String>,
        /// Style map, camelCase or kebab-case keys.
        #[serde(default)]
        styles: Option<Value>,
    },

    /// Revert style overrides for one selector, or all previews.
    #[serde(rename = "VISUAL_EDIT_REVERT_PREVIEW")]
    RevertPreview {
        /// Target selector; every preview when absent.
        #[serde(default)]
        selector: Option<String>,
    },

    /// Replace an element's text.
    #[serde(rename = "VISUAL_EDIT_APPLY_TEXT_PREVIEW")]
    ApplyTextPreview {
        /// Target selector.
        #[serde(default)]
        selector: Option<String>,
        /// Replacement text.
        #[serde(default)]
        text: Option<Value>,
    },

    /// Restore one selector's text, or every text preview.
    #[serde(rename = "VISUAL_EDIT_REVERT_TEXT_PREVIEW")]
    RevertTextPreview {
        /// Target selector; every text preview when absent.
        #[serde(default)]
        selector: Option<String>,
    },

    /// Update configuration.
    #[serde(rename = "VISUAL_EDIT_CONFIGURE")]
    Configure(ConfigureOptions),
}

impl HostMessage {
    /// Every wire type the bridge understands.
    pub const TYPES: [&'static str; 11] = [
        "VISUAL_EDIT_MODE_ACTIVATE",
        "VISUAL_EDIT_MODE_DEACTIVATE",
        "VISUAL_EDIT_DETECT_ELEMENT",
        "VISUAL_EDIT_HIGHLIGHT",
        "VISUAL_EDIT_CLEAR_HIGHLIGHT",
        "VISUAL_EDIT_REQUEST_INFO",
        "VISUAL_EDIT_APPLY_PREVIEW",
        "VISUAL_EDIT_REVERT_PREVIEW",
        "VISUAL_EDIT_APPLY_TEXT_PREVIEW",
        "VISUAL_EDIT_REVERT_TEXT_PREVIEW",
        "VISUAL_EDIT_CONFIGURE",
    ];

    /// Parses a known message.
    ///
    /// Returns `Ok(None)` for unknown types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] if a known type has a malformed body.
    pub fn parse(message_type: &str, data: Value) -> Result<Option<Self>> {
        if !Self::TYPES.contains(&message_type) {
            return Ok(None);
        }
        serde_json::from_value(data)
            .map(Some)
            .map_err(|e| Error::invalid_message(message_type, e.to_string()))
    }

    /// Wire type.
    #[must_use]
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Activate => Self::TYPES[0],
            Self::Deactivate => Self::TYPES[1],
            Self::DetectElement { .. } => Self::TYPES[2],
            Self::Highlight { .. } => Self::TYPES[3],
            Self::ClearHighlight => Self::TYPES[4],
            Self::RequestInfo { .. } => Self::TYPES[5],
            Self::ApplyPreview { .. } => Self::TYPES[6],
            Self::RevertPreview { .. } => Self::TYPES[7],
            Self::ApplyTextPreview { .. } => Self::TYPES[8],
            Self::RevertTextPreview { .. } => Self::TYPES[9],
            Self::Configure(_) => Self::TYPES[10],
        }
    }
}

/// Returns the `type` of a candidate message.
///
/// `None` means the value is not addressed to the bridge: not an object, or
/// no string `type`.
#[must_use]
pub fn message_type(data: &Value) -> Option<&str> {
    data.as_object()?.get("type")?.as_str()
}

/// Treats an empty selector like a missing one.
#[inline]
#[must_use]
pub fn non_empty(selector: Option<&str>) -> Option<&str> {
    selector.filter(|s| !s.is_empty())
}

// ============================================================================
// Tests
// ============================================================================
