//! Host window seam.
//!
//! Everything the bridge needs from the embedding browsing context that is
//! not the document tree itself: frame geometry, origins, listener
//! registration, animation frames, a clock and the parent message channel.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Clock`] | Monotonic milliseconds (`performance.now`) |
//! | [`HostWindow`] | Window-level primitives the bridge calls |
//! | [`EventKind`] | DOM event types the bridge listens for |
//! | [`NativeEvent`] | A dispatched interaction event that can be suppressed |
//! | [`MessageEvent`] | An inbound cross-document message |
//! | [`MemoryWindow`] | Recording implementation backed by a tokio channel |

// ============================================================================
// Submodules
// ============================================================================

/// In-memory window implementation.
pub mod memory;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;

use crate::dom::Rect;
use crate::error::Result;
use crate::identifiers::{FrameRequestId, ListenerId, NodeId};

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryWindow, PostedMessage};

// ============================================================================
// Clock
// ============================================================================

/// Monotonic time source in milliseconds.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> f64;
}

// ============================================================================
// EventKind
// ============================================================================

/// DOM event types the bridge registers listeners for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `click`
    Click,
    /// `mousedown`
    MouseDown,
    /// `mouseup`
    MouseUp,
    /// `dblclick`
    DoubleClick,
    /// `contextmenu`
    ContextMenu,
    /// `submit`
    Submit,
    /// `dragstart`
    DragStart,
    /// `touchstart`
    TouchStart,
    /// `touchmove`
    TouchMove,
    /// `touchend`
    TouchEnd,
    /// `scroll`
    Scroll,
    /// `resize`
    Resize,
    /// `beforeunload`
    BeforeUnload,
    /// `message`
    Message,
}

impl EventKind {
    /// Interaction events swallowed while edit mode is active.
    pub const BLOCKED: [Self; 10] = [
        Self::Click,
        Self::MouseDown,
        Self::MouseUp,
        Self::DoubleClick,
        Self::ContextMenu,
        Self::Submit,
        Self::DragStart,
        Self::TouchStart,
        Self::TouchMove,
        Self::TouchEnd,
    ];

    /// DOM event type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::MouseDown => "mousedown",
            Self::MouseUp => "mouseup",
            Self::DoubleClick => "dblclick",
            Self::ContextMenu => "contextmenu",
            Self::Submit => "submit",
            Self::DragStart => "dragstart",
            Self::TouchStart => "touchstart",
            Self::TouchMove => "touchmove",
            Self::TouchEnd => "touchend",
            Self::Scroll => "scroll",
            Self::Resize => "resize",
            Self::BeforeUnload => "beforeunload",
            Self::Message => "message",
        }
    }

    /// Returns `true` for interaction events suppressed in edit mode.
    #[inline]
    #[must_use]
    pub fn is_blocked(self) -> bool {
        Self::BLOCKED.contains(&self)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Listener Registration
// ============================================================================

/// Object a listener is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    /// The window object.
    Window,
    /// The document object.
    Document,
}

/// `addEventListener` options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Register for the capture phase.
    pub capture: bool,
    /// Listener promises not to call `preventDefault`.
    pub passive: bool,
}

impl ListenerOptions {
    /// Capture phase, allowed to cancel the event.
    pub const CAPTURE_ACTIVE: Self = Self {
        capture: true,
        passive: false,
    };

    /// Bubble phase, passive.
    pub const PASSIVE: Self = Self {
        capture: false,
        passive: true,
    };
}

// ============================================================================
// NativeEvent
// ============================================================================

/// A native interaction event as seen by a capture-phase listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEvent {
    /// Event type.
    pub kind: EventKind,
    /// Event target, if any.
    pub target: Option<NodeId>,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl NativeEvent {
    /// Creates an uncancelled event.
    #[must_use]
    pub fn new(kind: EventKind, target: Option<NodeId>) -> Self {
        Self {
            kind,
            target,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    /// `preventDefault()`
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// `stopPropagation()`
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// `stopImmediatePropagation()`
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// Returns `true` once `preventDefault` was called.
    #[inline]
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Returns `true` once propagation was stopped.
    #[inline]
    #[must_use]
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Returns `true` once immediate propagation was stopped.
    #[inline]
    #[must_use]
    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}

// ============================================================================
// MessageEvent
// ============================================================================

/// An inbound `message` event.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Sender origin (`event.origin`).
    pub origin: String,
    /// Whether `event.source === window.parent`.
    pub from_parent: bool,
    /// Structured-clone payload (`event.data`).
    pub data: Value,
}

impl MessageEvent {
    /// Message posted by the parent window.
    #[must_use]
    pub fn from_parent(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            from_parent: true,
            data,
        }
    }

    /// Message posted by any other window.
    #[must_use]
    pub fn from_other(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            from_parent: false,
            data,
        }
    }
}

// ============================================================================
// HostWindow
// ============================================================================

/// Window-level primitives of the embedded browsing context.
pub trait HostWindow: Clock {
    /// Returns `true` when `window.self === window.top`.
    fn is_top_level(&self) -> bool;

    /// Bounding rect of the hosting `<iframe>` in parent coordinates.
    ///
    /// `None` when not framed or when the frame element is inaccessible.
    fn frame_element_rect(&self) -> Option<Rect>;

    /// `(scrollX, scrollY)`
    fn scroll_offset(&self) -> (f64, f64);

    /// `(innerWidth, innerHeight)`
    fn viewport_size(&self) -> (f64, f64);

    /// `document.referrer`, `None` when empty.
    fn referrer(&self) -> Option<String>;

    /// `location.origin` of the embedded document.
    fn location_origin(&self) -> String;

    /// `location.hostname` of the embedded document.
    fn hostname(&self) -> String;

    /// Registers a listener and returns its handle.
    fn add_listener(
        &self,
        target: ListenerTarget,
        kind: EventKind,
        options: ListenerOptions,
    ) -> ListenerId;

    /// Unregisters a listener. Unknown handles are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Schedules one animation-frame callback.
    fn request_animation_frame(&self) -> FrameRequestId;

    /// Cancels a scheduled animation-frame callback.
    fn cancel_animation_frame(&self, id: FrameRequestId);

    /// `window.parent.postMessage(message, target_origin)`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// parent can no longer receive messages.
    fn post_to_parent(&self, message: Value, target_origin: &str) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_kinds() {
        assert_eq!(EventKind::BLOCKED.len(), 10);
        assert!(EventKind::Click.is_blocked());
        assert!(EventKind::TouchEnd.is_blocked());
        assert!(!EventKind::Scroll.is_blocked());
        assert!(!EventKind::Message.is_blocked());
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::DoubleClick.to_string(), "dblclick");
        assert_eq!(EventKind::ContextMenu.as_str(), "contextmenu");
    }

    #[test]
    fn test_native_event_suppression() {
        let mut event = NativeEvent::new(EventKind::Click, Some(NodeId::new(5)));
        assert!(!event.default_prevented());

        event.prevent_default();
        event.stop_immediate_propagation();
        assert!(event.default_prevented());
        assert!(event.propagation_stopped());
        assert!(event.immediate_propagation_stopped());
    }

    #[test]
    fn test_message_event_constructors() {
        let parent = MessageEvent::from_parent("https://a.lovable.app", Value::Null);
        let other = MessageEvent::from_other("https://evil.example", Value::Null);
        assert!(parent.from_parent);
        assert!(!other.from_parent);
    }
}
