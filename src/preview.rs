//! Reversible live previews.
//!
//! The host edits an element speculatively: inline style overrides and text
//! replacements that must come off again without a trace. Every first touch
//! of a property (or of the text) snapshots the *inline* value, not the
//! computed one, so a revert puts back exactly what the page had.
//!
//! # Records
//!
//! | Key | Snapshot | Revert |
//! |-----|----------|--------|
//! | [`PreviewKey::Style`] | inline value and priority per property | remove if it was unset, else set it back |
//! | [`PreviewKey::Text`] | `textContent` | set it back |
//!
//! Style and text records for the same selector never collide. Records are
//! reverted newest first, so overlapping previews through two selectors that
//! resolve to one element unwind in the right order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::dom::{Document, to_kebab_case};
use crate::error::{Error, Result};
use crate::identifiers::NodeId;

// ============================================================================
// StylePatch
// ============================================================================

/// Ordered style overrides as sent by the host.
///
/// Keys may be camelCase (`backgroundColor`) or kebab-case. Entries without a
/// usable value (`null`, arrays, objects) are kept for reporting but never
/// applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct StylePatch {
    entries: Vec<(String, Option<String>)>,
}

impl StylePatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one declaration.
    #[inline]
    #[must_use]
    pub fn with(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((property.into(), Some(value.into())));
        self
    }

    /// Every key, in the order the host sent them.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Declarations that carry a value.
    pub fn declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
    }

    /// Number of keys.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the patch has no keys.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Map<String, Value>> for StylePatch {
    fn from(map: Map<String, Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    Value::Null | Value::Array(_) | Value::Object(_) => None,
                };
                (key, value)
            })
            .collect();
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StylePatch {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), Some(value.into())))
                .collect(),
        }
    }
}

// ============================================================================
// PreviewKey / PreviewRecord
// ============================================================================

/// Identifies an outstanding preview.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreviewKey {
    /// Style overrides applied through a selector.
    Style(String),
    /// Text replacement applied through a selector.
    Text(String),
}

impl PreviewKey {
    /// Selector the preview was applied through.
    #[inline]
    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            Self::Style(selector) | Self::Text(selector) => selector,
        }
    }
}

impl fmt::Display for PreviewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Style(selector) => f.write_str(selector),
            Self::Text(selector) => write!(f, "{selector}_text"),
        }
    }
}

/// Inline declaration as it was before the preview touched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSnapshot {
    /// Kebab-case property name.
    pub property: String,
    /// Inline value, empty when the property was unset.
    pub value: String,
    /// Whether the declaration carried `!important`.
    pub important: bool,
}

impl StyleSnapshot {
    /// Reads the current inline declaration of `property`.
    #[must_use]
    pub fn capture(doc: &impl Document, element: NodeId, property: &str) -> Self {
        Self {
            property: property.to_string(),
            value: doc.style_property(element, property),
            important: doc.style_priority(element, property),
        }
    }

    /// Puts the declaration back, removing it if it was unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`] if the declaration cannot be written.
    pub fn restore(&self, doc: &impl Document, element: NodeId) -> Result<()> {
        if self.value.is_empty() {
            doc.remove_style_property(element, &self.property);
            Ok(())
        } else {
            doc.set_style_property(element, &self.property, &self.value, self.important)
        }
    }
}

/// What a preview changed and how to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewRecord {
    /// Style overrides.
    Style {
        /// Element the overrides were written to.
        element: NodeId,
        /// First-touch snapshot per property, in touch order.
        original: Vec<StyleSnapshot>,
    },
    /// Text replacement.
    Text {
        /// Element whose text was replaced.
        element: NodeId,
        /// `textContent` before the first replacement.
        original_text: String,
    },
}

impl PreviewRecord {
    /// Element the preview was written to.
    #[inline]
    #[must_use]
    pub fn element(&self) -> NodeId {
        match self {
            Self::Style { element, .. } | Self::Text { element, .. } => *element,
        }
    }

    fn restore(&self, doc: &impl Document) -> Result<()> {
        if !doc.contains(self.element()) {
            return Err(Error::stale_element(self.element()));
        }
        match self {
            Self::Style { element, original } => {
                for snapshot in original.iter().rev() {
                    snapshot.restore(doc, *element)?;
                }
                Ok(())
            }
            Self::Text {
                element,
                original_text,
            } => doc.set_text_content(*element, original_text),
        }
    }
}

// ============================================================================
// PreviewEngine
// ============================================================================

/// Bookkeeping for outstanding previews.
#[derive(Debug, Clone, Default)]
pub struct PreviewEngine {
    records: Vec<(PreviewKey, PreviewRecord)>,
}

impl PreviewEngine {
    /// Creates an engine with no outstanding previews.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &PreviewKey) -> Option<usize> {
        self.records.iter().position(|(k, _)| k == key)
    }

    /// Outstanding record for `key`.
    #[must_use]
    pub fn record(&self, key: &PreviewKey) -> Option<&PreviewRecord> {
        self.position(key).map(|index| &self.records[index].1)
    }

    /// Writes `patch` to the element `selector` resolves to, with `!important`.
    ///
    /// The first write of each property through this selector snapshots its
    /// inline value; later writes leave the snapshot alone. If the selector
    /// now resolves to a different element, the old preview is reverted (when
    /// its element is still connected) and a fresh snapshot taken.
    ///
    /// Returns every key of the patch.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSelector`] if `selector` does not parse
    /// - [`Error::ElementNotFound`] if nothing matches
    /// - [`Error::Dom`] if a declaration cannot be written
    pub fn apply_style(
        &mut self,
        doc: &impl Document,
        selector: &str,
        patch: &StylePatch,
    ) -> Result<Vec<String>> {
        let element = doc
            .query_selector(selector)?
            .ok_or_else(|| Error::element_not_found(selector))?;

        let key = PreviewKey::Style(selector.to_string());
        let index = match self.position(&key) {
            Some(index) if self.records[index].1.element() == element => index,
            Some(index) => {
                self.discard(doc, index)?;
                self.push_style(key, element)
            }
            None => self.push_style(key, element),
        };

        let (_, PreviewRecord::Style { element, original }) = &mut self.records[index] else {
            return Err(Error::dom(format!("{selector} has no style record")));
        };
        let element = *element;

        for (property, value) in patch.declarations() {
            let property = to_kebab_case(property);
            if !original.iter().any(|s| s.property == property) {
                original.push(StyleSnapshot::capture(doc, element, &property));
            }
            doc.set_style_property(element, &property, value, true)?;
        }

        debug!(selector, properties = patch.len(), "Applied style preview");
        Ok(patch.keys())
    }

    fn push_style(&mut self, key: PreviewKey, element: NodeId) -> usize {
        self.records.push((
            key,
            PreviewRecord::Style {
                element,
                original: Vec::new(),
            },
        ));
        self.records.len() - 1
    }

    fn push_text(&mut self, doc: &impl Document, key: PreviewKey, element: NodeId) -> usize {
        self.records.push((
            key,
            PreviewRecord::Text {
                element,
                original_text: doc.text_content(element),
            },
        ));
        self.records.len() - 1
    }

    /// Drops the record at `index` and restores what it changed.
    ///
    /// A record whose element left the document is dropped without a write.
    fn discard(&mut self, doc: &impl Document, index: usize) -> Result<PreviewRecord> {
        let (key, record) = self.records.remove(index);
        match record.restore(doc) {
            Ok(()) => {}
            Err(Error::StaleElement { node }) => {
                debug!(%key, %node, "Preview element detached, record dropped");
            }
            Err(e) => return Err(e),
        }
        Ok(record)
    }

    /// Restores the inline styles a selector's preview replaced.
    ///
    /// Returns `false` when there is no outstanding style preview for the
    /// selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`] if a declaration cannot be restored. The record
    /// is dropped either way.
    pub fn revert_style(&mut self, doc: &impl Document, selector: &str) -> Result<bool> {
        self.revert(doc, &PreviewKey::Style(selector.to_string()))
    }

    /// Replaces the text of the element `selector` resolves to.
    ///
    /// Returns the text the element had before the first replacement. If the
    /// selector now resolves to a different element, the old preview is
    /// reverted (when its element is still connected) and the new element's
    /// text snapshotted.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSelector`] if `selector` does not parse
    /// - [`Error::ElementNotFound`] if nothing matches
    /// - [`Error::Dom`] if the text cannot be written
    pub fn apply_text(&mut self, doc: &impl Document, selector: &str, text: &str) -> Result<String> {
        let element = doc
            .query_selector(selector)?
            .ok_or_else(|| Error::element_not_found(selector))?;

        let key = PreviewKey::Text(selector.to_string());
        let index = match self.position(&key) {
            Some(index) if self.records[index].1.element() == element => index,
            Some(index) => {
                self.discard(doc, index)?;
                self.push_text(doc, key, element)
            }
            None => self.push_text(doc, key, element),
        };

        let PreviewRecord::Text { original_text, .. } = &self.records[index].1 else {
            return Err(Error::dom(format!("{selector} has no text record")));
        };
        let original_text = original_text.clone();

        doc.set_text_content(element, text)?;
        debug!(selector, "Applied text preview");
        Ok(original_text)
    }

    /// Restores a selector's original text.
    ///
    /// Returns the restored text, or `None` when there is no outstanding text
    /// preview for the selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dom`] if the text cannot be written.
    pub fn revert_text(&mut self, doc: &impl Document, selector: &str) -> Result<Option<String>> {
        let key = PreviewKey::Text(selector.to_string());
        let Some(index) = self.position(&key) else {
            return Ok(None);
        };
        let restored = match self.discard(doc, index)? {
            PreviewRecord::Text { original_text, .. } => original_text,
            PreviewRecord::Style { .. } => String::new(),
        };
        debug!(selector, "Reverted text preview");
        Ok(Some(restored))
    }

    fn revert(&mut self, doc: &impl Document, key: &PreviewKey) -> Result<bool> {
        let Some(index) = self.position(key) else {
            debug!(%key, "No preview to revert");
            return Ok(false);
        };
        self.discard(doc, index)?;
        debug!(%key, "Reverted preview");
        Ok(true)
    }

    /// Reverts every outstanding preview, newest first.
    ///
    /// Restoration failures are logged and skipped; every record is dropped.
    /// Returns the number of records reverted.
    pub fn revert_all(&mut self, doc: &impl Document) -> usize {
        self.revert_matching(doc, |_| true)
    }

    /// Reverts every outstanding text preview, newest first.
    pub fn revert_all_text(&mut self, doc: &impl Document) -> usize {
        self.revert_matching(doc, |key| matches!(key, PreviewKey::Text(_)))
    }

    fn revert_matching(&mut self, doc: &impl Document, select: impl Fn(&PreviewKey) -> bool) -> usize {
        let (selected, remaining): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.records).into_iter().partition(|(key, _)| select(key));
        self.records = remaining;

        let count = selected.len();
        for (key, record) in selected.into_iter().rev() {
            if let Err(e) = record.restore(doc) {
                debug!(%key, error = %e, "Failed to revert preview");
            }
        }
        if count > 0 {
            debug!(count, "Reverted previews");
        }
        count
    }

    /// Number of outstanding previews.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is outstanding.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;
    use serde_json::json;

    fn card(style: Option<&str>) -> (MemoryDocument, NodeId) {
        let doc = MemoryDocument::new();
        let body = doc.body().expect("body");
        let mut attrs = vec![("class", "card")];
        if let Some(style) = style {
            attrs.push(("style", style));
        }
        let card = doc.append_element(body, "div", &attrs).expect("card");
        (doc, card)
    }

    #[test]
    fn test_patch_from_json_keeps_order_and_skips_null() {
        let patch: StylePatch = serde_json::from_value(json!({
            "fontSize": "18px",
            "color": null,
            "opacity": 0.5,
            "backgroundColor": "blue"
        }))
        .expect("patch");

        assert_eq!(patch.keys(), vec!["fontSize", "color", "opacity", "backgroundColor"]);
        let applied: Vec<_> = patch.declarations().collect();
        assert_eq!(
            applied,
            vec![("fontSize", "18px"), ("opacity", "0.5"), ("backgroundColor", "blue")]
        );
    }

    #[test]
    fn test_apply_then_revert_removes_unset_property() {
        let (doc, card) = card(None);
        let mut engine = PreviewEngine::new();
        let patch: StylePatch = [("backgroundColor", "blue")].into_iter().collect();

        let keys = engine.apply_style(&doc, ".card", &patch).expect("apply");
        assert_eq!(keys, vec!["backgroundColor"]);
        assert_eq!(doc.style_property(card, "background-color"), "blue");
        assert!(doc.style_priority(card, "background-color"));

        assert!(engine.revert_style(&doc, ".card").expect("revert"));
        assert_eq!(doc.style_property(card, "background-color"), "");
        assert!(engine.is_empty());
    }

    #[test]
    fn test_revert_restores_original_value_and_priority() {
        let (doc, card) = card(Some("color: green; margin: 4px !important"));
        let mut engine = PreviewEngine::new();

        let first = StylePatch::new().with("color", "red").with("margin", "0");
        engine.apply_style(&doc, ".card", &first).expect("apply");
        let second = StylePatch::new().with("color", "purple");
        engine.apply_style(&doc, ".card", &second).expect("apply");
        assert_eq!(doc.style_property(card, "color"), "purple");

        engine.revert_style(&doc, ".card").expect("revert");
        assert_eq!(doc.style_property(card, "color"), "green");
        assert!(!doc.style_priority(card, "color"));
        assert_eq!(doc.style_property(card, "margin"), "4px");
        assert!(doc.style_priority(card, "margin"));
    }

    #[test]
    fn test_snapshot_extends_for_new_properties() {
        let (doc, card) = card(Some("padding: 2px"));
        let mut engine = PreviewEngine::new();

        engine
            .apply_style(&doc, ".card", &StylePatch::new().with("color", "red"))
            .expect("apply");
        engine
            .apply_style(&doc, ".card", &StylePatch::new().with("padding", "9px"))
            .expect("apply");

        engine.revert_style(&doc, ".card").expect("revert");
        assert_eq!(doc.style_property(card, "color"), "");
        assert_eq!(doc.style_property(card, "padding"), "2px");
    }

    #[test]
    fn test_revert_without_record_is_soft_failure() {
        let (doc, _) = card(None);
        let mut engine = PreviewEngine::new();
        assert!(!engine.revert_style(&doc, ".card").expect("revert"));
        assert_eq!(engine.revert_text(&doc, ".card").expect("revert"), None);
    }

    #[test]
    fn test_apply_missing_element() {
        let (doc, _) = card(None);
        let mut engine = PreviewEngine::new();
        let err = engine
            .apply_style(&doc, ".missing", &StylePatch::new().with("color", "red"))
            .expect_err("missing");
        assert!(err.is_element_error());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_text_preview_keeps_first_snapshot() {
        let (doc, card) = card(None);
        doc.append_text(card, "Original").expect("text");
        let mut engine = PreviewEngine::new();

        assert_eq!(engine.apply_text(&doc, ".card", "One").expect("apply"), "Original");
        assert_eq!(engine.apply_text(&doc, ".card", "Two").expect("apply"), "Original");
        assert_eq!(doc.text_content(card), "Two");

        assert_eq!(
            engine.revert_text(&doc, ".card").expect("revert").as_deref(),
            Some("Original")
        );
        assert_eq!(doc.text_content(card), "Original");
    }

    #[test]
    fn test_style_and_text_records_do_not_collide() {
        let (doc, card) = card(None);
        doc.append_text(card, "Hi").expect("text");
        let mut engine = PreviewEngine::new();

        engine
            .apply_style(&doc, ".card", &StylePatch::new().with("color", "red"))
            .expect("apply");
        engine.apply_text(&doc, ".card", "Bye").expect("apply");
        assert_eq!(engine.len(), 2);
        assert_eq!(PreviewKey::Text(".card".into()).to_string(), ".card_text");

        assert_eq!(engine.revert_all_text(&doc), 1);
        assert_eq!(doc.text_content(card), "Hi");
        assert_eq!(doc.style_property(card, "color"), "red");
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_revert_all_unwinds_overlapping_selectors() {
        let (doc, card) = card(Some("color: green"));
        doc.set_attribute(card, "id", "hero").expect("id");
        let mut engine = PreviewEngine::new();

        engine
            .apply_style(&doc, ".card", &StylePatch::new().with("color", "red"))
            .expect("apply");
        engine
            .apply_style(&doc, "#hero", &StylePatch::new().with("color", "blue"))
            .expect("apply");

        assert_eq!(engine.revert_all(&doc), 2);
        assert_eq!(doc.style_property(card, "color"), "green");
        assert!(engine.is_empty());
    }

    #[test]
    fn test_stale_record_is_replaced() {
        let (doc, old) = card(None);
        let mut engine = PreviewEngine::new();
        engine
            .apply_style(&doc, ".card", &StylePatch::new().with("color", "red"))
            .expect("apply");

        doc.remove_element(old);
        let body = doc.body().expect("body");
        let fresh = doc.append_element(body, "div", &[("class", "card")]).expect("card");
        engine
            .apply_style(&doc, ".card", &StylePatch::new().with("color", "blue"))
            .expect("apply");

        assert_eq!(engine.len(), 1);
        assert_eq!(
            engine.record(&PreviewKey::Style(".card".into())).map(PreviewRecord::element),
            Some(fresh)
        );
        engine.revert_style(&doc, ".card").expect("revert");
        assert_eq!(doc.style_property(fresh, "color"), "");
    }

    #[test]
    fn test_stale_text_record_is_replaced() {
        let (doc, old) = card(None);
        doc.append_text(old, "Old").expect("text");
        let mut engine = PreviewEngine::new();
        assert_eq!(engine.apply_text(&doc, ".card", "Preview").expect("apply"), "Old");

        doc.remove_element(old);
        let body = doc.body().expect("body");
        let fresh = doc.append_element(body, "div", &[("class", "card")]).expect("card");
        doc.append_text(fresh, "Fresh").expect("text");

        assert_eq!(engine.apply_text(&doc, ".card", "Preview2").expect("apply"), "Fresh");
        assert_eq!(engine.len(), 1);
        assert_eq!(doc.text_content(fresh), "Preview2");

        assert_eq!(
            engine.revert_text(&doc, ".card").expect("revert").as_deref(),
            Some("Fresh")
        );
        assert_eq!(doc.text_content(fresh), "Fresh");
    }

    #[test]
    fn test_connected_stale_element_is_restored() {
        let (doc, first) = card(Some("color: green"));
        let body = doc.body().expect("body");
        let mut engine = PreviewEngine::new();
        engine
            .apply_style(&doc, ".card", &StylePatch::new().with("color", "red"))
            .expect("apply");

        doc.remove_class(first, "card");
        let second = doc.append_element(body, "div", &[("class", "card")]).expect("card");
        engine
            .apply_style(&doc, ".card", &StylePatch::new().with("color", "blue"))
            .expect("apply");

        assert_eq!(doc.style_property(first, "color"), "green");
        assert_eq!(doc.style_property(second, "color"), "blue");
    }

    #[test]
    fn test_revert_of_detached_element_drops_record() {
        let (doc, card) = card(None);
        let mut engine = PreviewEngine::new();
        engine
            .apply_style(&doc, ".card", &StylePatch::new().with("color", "red"))
            .expect("apply");
        engine.apply_text(&doc, ".card", "Hi").expect("apply");

        doc.remove_element(card);
        assert!(matches!(
            engine.record(&PreviewKey::Style(".card".into())).map(|r| r.restore(&doc)),
            Some(Err(Error::StaleElement { node })) if node == card
        ));

        assert!(engine.revert_style(&doc, ".card").expect("revert"));
        assert_eq!(engine.revert_text(&doc, ".card").expect("revert").as_deref(), Some(""));
        assert!(engine.is_empty());
    }
}
