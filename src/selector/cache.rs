//! Element to selector memo.
//!
//! Keys are non-owning [`NodeId`] handles. An entry never keeps an element
//! alive: lookups for nodes that have left the document drop the entry, and
//! [`SelectorCache::prune`] sweeps every disconnected node at once. The
//! generator prunes on every miss.

use rustc_hash::FxHashMap;

use crate::dom::Document;
use crate::identifiers::NodeId;

// ============================================================================
// SelectorCache
// ============================================================================

/// Weak element-identity to selector map.
#[derive(Debug, Clone, Default)]
pub struct SelectorCache {
    entries: FxHashMap<NodeId, String>,
}

impl SelectorCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached selector for a connected node.
    ///
    /// Entries for disconnected nodes are evicted. The selector is not
    /// revalidated here.
    pub fn lookup(&mut self, doc: &impl Document, node: NodeId) -> Option<String> {
        if !doc.contains(node) {
            self.entries.remove(&node);
            return None;
        }
        self.entries.get(&node).cloned()
    }

    /// Records a selector.
    pub fn insert(&mut self, node: NodeId, selector: impl Into<String>) {
        self.entries.insert(node, selector.into());
    }

    /// Forgets a node.
    pub fn remove(&mut self, node: NodeId) {
        self.entries.remove(&node);
    }

    /// Drops entries whose node is no longer connected.
    pub fn prune(&mut self, doc: &impl Document) {
        self.entries.retain(|&node, _| doc.contains(node));
    }

    /// Empties the cache.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    #[test]
    fn test_lookup_evicts_disconnected() {
        let doc = MemoryDocument::new();
        let body = doc.body().expect("body");
        let card = doc.append_element(body, "div", &[]).expect("card");

        let mut cache = SelectorCache::new();
        cache.insert(card, ".card");
        assert_eq!(cache.lookup(&doc, card).as_deref(), Some(".card"));

        doc.remove_element(card);
        assert_eq!(cache.lookup(&doc, card), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_prune() {
        let doc = MemoryDocument::new();
        let body = doc.body().expect("body");
        let kept = doc.append_element(body, "div", &[]).expect("kept");
        let gone = doc.append_element(body, "div", &[]).expect("gone");

        let mut cache = SelectorCache::new();
        cache.insert(kept, "#kept");
        cache.insert(gone, "#gone");
        doc.remove_element(gone);

        cache.prune(&doc);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
