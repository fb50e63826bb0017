//! Type-safe identifiers for bridge entities.
//!
//! Newtype wrappers prevent mixing a DOM node handle with a listener or
//! animation-frame handle at compile time.
//!
//! | Type | Identifies |
//! |------|------------|
//! | [`NodeId`] | A DOM node owned by the document (non-owning reference) |
//! | [`ListenerId`] | A registered event listener |
//! | [`FrameRequestId`] | A scheduled animation-frame callback |

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// NodeId
// ============================================================================

/// Non-owning reference to a DOM node.
///
/// The document owns its nodes; holding a `NodeId` never keeps a node
/// alive. Use [`Document::contains`](crate::dom::Document::contains) to check
/// that the node is still connected before mutating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw node index.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Handle for an event listener registered on the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wraps a raw listener handle.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

// ============================================================================
// FrameRequestId
// ============================================================================

/// Handle returned by `requestAnimationFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(u64);

impl FrameRequestId {
    /// Wraps a raw frame handle.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::new(7).to_string(), "node#7");
    }

    #[test]
    fn test_node_id_serializes_transparently() {
        let json = serde_json::to_string(&NodeId::new(3)).expect("serialize");
        assert_eq!(json, "3");
    }

    #[test]
    fn test_handles_are_distinct_types() {
        let listener = ListenerId::new(1);
        let frame = FrameRequestId::new(1);
        assert_eq!(listener.as_u64(), frame.as_u64());
        assert_eq!(listener.to_string(), "listener#1");
        assert_eq!(frame.to_string(), "frame#1");
    }
}
