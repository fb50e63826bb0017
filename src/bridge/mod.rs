//! The bridge context object.
//!
//! One [`Bridge`] lives per embedded document. It owns every piece of mutable
//! bridge state (configuration, selector cache, overlays, previews, the
//! detection gate and the mode) and is driven by the host adapter through a
//! handful of entry points.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Bridge struct, install, outbound posting, lifecycle events |
//! | `dispatch` | Inbound message routing and the error boundary |
//! | `mode` | Edit-mode activation and deactivation |
//! | `detection` | Frame-coalesced element detection and highlighting |
//! | `info` | Element descriptions for `ELEMENT_INFO` |
//!
//! # Entry Points
//!
//! | Method | Host event |
//! |--------|------------|
//! | [`Bridge::install`] | script load |
//! | [`Bridge::handle_message`] | `message` on the window |
//! | [`Bridge::handle_native_event`] | capture-phase interaction events |
//! | [`Bridge::run_animation_frame`] | animation frame callback |
//! | [`Bridge::handle_scroll`] | `scroll` (capture) |
//! | [`Bridge::handle_resize`] | `resize` |
//! | [`Bridge::unload`] | `beforeunload` |
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use visual_edit_bridge::{Bridge, MemoryDocument, MemoryWindow, MessageEvent};
//!
//! # fn main() -> visual_edit_bridge::Result<()> {
//! let doc = MemoryDocument::new();
//! let (window, mut parent) = MemoryWindow::new("http://localhost:5173/")?;
//! let mut bridge = Bridge::install(doc, window)?;
//!
//! bridge.handle_message(MessageEvent::from_parent(
//!     "http://localhost:3000",
//!     json!({ "type": "VISUAL_EDIT_MODE_ACTIVATE" }),
//! ));
//! assert!(bridge.is_active());
//!
//! let ready = parent.try_recv().expect("ready");
//! assert_eq!(ready.message_type(), Some("VISUAL_EDIT_READY"));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod detection;
mod dispatch;
mod info;
mod mode;


// ============================================================================
// Re-exports
// ============================================================================

pub use core::Bridge;
pub use info::{COMPUTED_STYLE_PROPERTIES, MAX_TEXT_LEN, direct_text};
