//! Wire protocol between the host editor and the bridge.
//!
//! Messages travel as JSON objects over the parent window's message channel.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`HostMessage`] | Host → Bridge | Mode changes, detection, previews, configuration |
//! | [`BridgeMessage`] | Bridge → Host | Replies and notifications, wrapped in an [`Envelope`] |
//!
//! Inbound messages pass the [`OriginGuard`] before they are parsed.
//! Outbound messages are posted to the origin [`resolve_target_origin`]
//! picks.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `inbound` | Host message sum type and parsing |
//! | `outbound` | Bridge message sum type and envelope |
//! | `origin` | Sender validation and target origin |

// ============================================================================
// Submodules
// ============================================================================

/// Host to bridge messages.
pub mod inbound;

/// Origin validation.
pub mod origin;

/// Bridge to host messages.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use inbound::{DetectAction, HostMessage};
pub use origin::{OriginGuard, OriginPattern, parent_origin_from_referrer, resolve_target_origin};
pub use outbound::{
    BRIDGE_FEATURES, BRIDGE_SOURCE, BRIDGE_VERSION, BoundingRect, BridgeMessage, ElementInfo,
    Envelope,
};
