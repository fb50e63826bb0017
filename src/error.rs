//! Error types for the visual edit bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use visual_edit_bridge::{Document, Result};
//!
//! fn first_card(doc: &impl Document) -> Result<()> {
//!     let card = doc.query_selector(".card")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Environment | [`Error::NotEmbedded`], [`Error::Config`] |
//! | Selector | [`Error::InvalidSelector`] |
//! | Element | [`Error::ElementNotFound`], [`Error::StaleElement`] |
//! | Protocol | [`Error::InvalidMessage`], [`Error::InvalidOriginPattern`] |
//! | Platform | [`Error::Dom`], [`Error::ChannelClosed`] |
//! | External | [`Error::Json`], [`Error::Url`] |
//!
//! Nothing here is fatal to the bridge: the message dispatch boundary turns
//! every error into a single `VISUAL_EDIT_ERROR` message for the host.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::NodeId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Environment Errors
    // ========================================================================
    /// The bridge was installed in a top-level window.
    ///
    /// The bridge only makes sense inside an embedded frame.
    #[error("Not running inside an embedded frame")]
    NotEmbedded,

    /// Configuration error.
    ///
    /// Returned when a configuration value is out of range.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Selector Errors
    // ========================================================================
    /// Selector could not be parsed.
    #[error("Invalid selector: {selector}")]
    InvalidSelector {
        /// The rejected selector text.
        selector: String,
    },

    // ========================================================================
    // Element Errors
    // ========================================================================
    /// No element matched the selector.
    ///
    /// Usually means the selector went stale between host calls.
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// CSS selector used.
        selector: String,
    },

    /// Element is no longer connected to the document.
    #[error("Stale element: {node}")]
    StaleElement {
        /// The detached node.
        node: NodeId,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound message is missing required fields or has the wrong shape.
    #[error("Invalid {message_type} message: {message}")]
    InvalidMessage {
        /// Wire type of the offending message.
        message_type: String,
        /// Description of what is wrong.
        message: String,
    },

    /// Allow-list entry is neither an exact origin nor a single-wildcard pattern.
    #[error("Invalid origin pattern: {pattern}")]
    InvalidOriginPattern {
        /// The rejected pattern.
        pattern: String,
    },

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// The document refused an operation.
    #[error("DOM error: {message}")]
    Dom {
        /// Description of the failure.
        message: String,
    },

    /// The parent-window message channel is closed.
    #[error("Message channel closed")]
    ChannelClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid selector error.
    #[inline]
    pub fn invalid_selector(selector: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
        }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Creates a stale element error.
    #[inline]
    pub fn stale_element(node: NodeId) -> Self {
        Self::StaleElement { node }
    }

    /// Creates an invalid message error.
    #[inline]
    pub fn invalid_message(message_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message_type: message_type.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid origin pattern error.
    #[inline]
    pub fn invalid_origin_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidOriginPattern {
            pattern: pattern.into(),
        }
    }

    /// Creates a DOM error.
    #[inline]
    pub fn dom(message: impl Into<String>) -> Self {
        Self::Dom {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is an element error.
    #[inline]
    #[must_use]
    pub fn is_element_error(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::StaleElement { .. }
        )
    }

    /// Returns `true` if this is a protocol error.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMessage { .. } | Self::InvalidOriginPattern { .. } | Self::Json(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors leave bridge state untouched and may succeed once
    /// the host re-resolves its target.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. }
                | Self::StaleElement { .. }
                | Self::InvalidSelector { .. }
                | Self::InvalidMessage { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::element_not_found(".card");
        assert_eq!(err.to_string(), "Element not found: .card");
    }

    #[test]
    fn test_invalid_message_display() {
        let err = Error::invalid_message("VISUAL_EDIT_APPLY_PREVIEW", "selector and styles required");
        assert_eq!(
            err.to_string(),
            "Invalid VISUAL_EDIT_APPLY_PREVIEW message: selector and styles required"
        );
    }

    #[test]
    fn test_is_element_error() {
        assert!(Error::element_not_found("#x").is_element_error());
        assert!(Error::stale_element(NodeId::new(4)).is_element_error());
        assert!(!Error::NotEmbedded.is_element_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::invalid_selector("##").is_recoverable());
        assert!(!Error::NotEmbedded.is_recoverable());
        assert!(!Error::config("bad").is_recoverable());
    }

    #[test]
    fn test_channel_closed_is_not_recoverable() {
        assert_eq!(Error::ChannelClosed.to_string(), "Message channel closed");
        assert!(!Error::ChannelClosed.is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
