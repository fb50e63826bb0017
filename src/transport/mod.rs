//! Page-event transport.
//!
//! Connects a host adapter to a [`Bridge`](crate::Bridge) running on its own
//! tokio task.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Host adapter   │        PageEvent             │  BridgeRuntime  │
//! │                 │ ────────────────────────────►│                 │
//! │  BridgeHandle   │   message / interaction /    │  Bridge         │
//! │                 │   scroll / resize / unload   │  frame clock    │
//! └─────────────────┘                              └────────┬────────┘
//!                                                           │ postMessage
//!                                                           ▼
//!                                                    parent window
//! ```
//!
//! # Lifecycle
//!
//! 1. `Bridge::install` - Announce readiness to the parent
//! 2. `BridgeRuntime::new` - Wrap the bridge, get a [`BridgeHandle`]
//! 3. `BridgeRuntime::spawn` - Start the event loop
//! 4. `BridgeHandle::unload` - Unload and stop; the task returns the bridge
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `runtime` | Page-event loop and handle |

// ============================================================================
// Submodules
// ============================================================================

/// Page-event loop and handle.
pub mod runtime;

// ============================================================================
// Re-exports
// ============================================================================

pub use runtime::{BridgeHandle, BridgeRuntime, DEFAULT_FRAME_INTERVAL, PageEvent};
