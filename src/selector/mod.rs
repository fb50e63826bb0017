//! Selector synthesis.
//!
//! Given an element, produce the shortest CSS selector that resolves back to
//! exactly that element, so the host can name it in later requests.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SelectorGenerator`] | Priority chain from `#id` down to an indexed path |
//! | [`SelectorCache`] | Weak element to selector memo, revalidated on hit |
//! | [`css_escape`] | `CSS.escape` for identifiers and attribute values |

// ============================================================================
// Submodules
// ============================================================================

/// Weak selector cache.
pub mod cache;

/// `CSS.escape`.
pub mod escape;

/// Selector generator.
pub mod generator;

// ============================================================================
// Re-exports
// ============================================================================

pub use cache::SelectorCache;
pub use escape::css_escape;
pub use generator::{SelectorGenerator, SelectorOptions, is_unique};
