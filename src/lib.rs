//! Visual Edit Bridge - in-page agent for a visual website editor.
//!
//! The bridge runs inside a web page embedded in an editor's iframe. The
//! editor (the parent window) drives it over `postMessage`: it turns the
//! page into an inspectable canvas, maps pointer coordinates to elements,
//! synthesizes stable CSS selectors for them, and applies reversible style
//! and text previews.
//!
//! # Architecture
//!
//! The bridge is written against two host traits, so it runs unchanged over
//! a real browser binding or the in-memory implementations shipped here:
//!
//! - [`Document`]: the embedded DOM (queries, attributes, layout, styles)
//! - [`HostWindow`]: the embedding window (frames, listeners, `postMessage`)
//!
//! Key design principles:
//!
//! - One [`Bridge`] context object owns all mutable state
//! - Every inbound message passes an origin check before dispatch
//! - Detections are coalesced per animation frame and hovers throttled
//! - Every preview is recorded and fully reversible
//!
//! # Quick Start
//!
//! ```
//! use serde_json::json;
//! use visual_edit_bridge::{
//!     Bridge, BridgeConfig, Document, MemoryDocument, MemoryWindow, MessageEvent, Rect,
//! };
//!
//! # fn main() -> visual_edit_bridge::Result<()> {
//! let doc = MemoryDocument::new();
//! let body = doc.body().expect("body");
//! let buy = doc.append_element(body, "button", &[("id", "buy")])?;
//! doc.append_text(buy, "Buy")?;
//! doc.set_layout(buy, Rect::new(10.0, 10.0, 100.0, 40.0));
//!
//! let (window, mut parent) = MemoryWindow::new("https://shop.example/")?;
//! let mut bridge = Bridge::install_with_config(doc, window, BridgeConfig::new())?;
//! let editor = "https://editor.example";
//!
//! bridge.handle_message(MessageEvent::from_parent(
//!     editor,
//!     json!({ "type": "VISUAL_EDIT_DETECT_ELEMENT", "x": 20, "y": 20, "action": "click" }),
//! ));
//! if let Some(frame) = bridge.scheduled_frame() {
//!     bridge.run_animation_frame(frame);
//! }
//!
//! let _ready = parent.try_recv().expect("ready");
//! let clicked = parent.try_recv().expect("clicked");
//! assert_eq!(clicked.payload["selector"], "#buy");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | The [`Bridge`] context object and its entry points |
//! | [`classify`] | Class, id and component classification rules |
//! | [`config`] | [`BridgeConfig`] and `CONFIGURE` payloads |
//! | [`detector`] | Pointer-to-element detection |
//! | [`dom`] | [`Document`] trait, CSS subset, in-memory DOM |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | [`HostWindow`] trait, events, in-memory window |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`overlay`] | Hover, selection and tooltip boxes |
//! | [`preview`] | Reversible style and text previews |
//! | [`protocol`] | Wire messages and the origin guard |
//! | [`scheduler`] | Frame coalescing and hover throttling |
//! | [`selector`] | Selector synthesis and caching |
//! | [`transport`] | Async page-event loop |

// ============================================================================
// Modules
// ============================================================================

/// The bridge context object.
pub mod bridge;

/// Class, id and component classification.
pub mod classify;

/// Bridge configuration.
pub mod config;

/// Pointer-to-element detection.
pub mod detector;

/// Document abstraction and the in-memory DOM.
pub mod dom;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Host window abstraction and events.
pub mod host;

/// Type-safe identifiers for nodes, listeners and frames.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Overlay boxes.
pub mod overlay;

/// Reversible previews.
pub mod preview;

/// Wire protocol.
pub mod protocol;

/// Detection scheduling.
pub mod scheduler;

/// Selector synthesis.
pub mod selector;

/// Async page-event transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge
pub use bridge::Bridge;

// Configuration
pub use config::{BridgeConfig, ConfigureOptions};

// Classification
pub use classify::{ClassificationPolicy, ComponentAnalysis};

// DOM & host
pub use dom::{Document, MemoryDocument, Rect};
pub use host::{
    Clock, EventKind, HostWindow, ListenerOptions, ListenerTarget, MemoryWindow, MessageEvent,
    NativeEvent, PostedMessage,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{FrameRequestId, ListenerId, NodeId};

// Previews
pub use preview::{PreviewEngine, StylePatch};

// Protocol
pub use protocol::{BridgeMessage, DetectAction, HostMessage, OriginGuard};

// Selectors
pub use selector::{SelectorCache, SelectorGenerator, SelectorOptions};

// Transport
pub use transport::{BridgeHandle, BridgeRuntime, PageEvent};
