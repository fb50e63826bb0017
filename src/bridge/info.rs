//! Element descriptions for `ELEMENT_INFO`.

use serde_json::{Map, Value};

use crate::dom::{Document, to_kebab_case};
use crate::host::HostWindow;
use crate::identifiers::NodeId;
use crate::protocol::ElementInfo;

use super::Bridge;

// ============================================================================
// Constants
// ============================================================================

/// Text longer than this many characters is truncated with `...`.
pub const MAX_TEXT_LEN: usize = 1000;

/// Computed styles reported to the host, camelCase, in report order.
pub const COMPUTED_STYLE_PROPERTIES: [&str; 31] = [
    // dimensions
    "width",
    "height",
    // typography
    "color",
    "fontSize",
    "fontFamily",
    "fontWeight",
    "fontStyle",
    "textAlign",
    "textDecoration",
    "lineHeight",
    "letterSpacing",
    // spacing
    "padding",
    "margin",
    "paddingTop",
    "paddingRight",
    "paddingBottom",
    "paddingLeft",
    "marginTop",
    "marginRight",
    "marginBottom",
    "marginLeft",
    // background
    "backgroundColor",
    "opacity",
    // border
    "borderWidth",
    "borderColor",
    "borderStyle",
    "borderRadius",
    "borderTopWidth",
    "borderRightWidth",
    "borderBottomWidth",
    "borderLeftWidth",
];

// ============================================================================
// Text
// ============================================================================

/// Text the user would edit in place.
///
/// Joins the element's own non-blank text nodes with a space. A leaf element
/// without direct text reports its whole trimmed `textContent`.
#[must_use]
pub fn direct_text(doc: &impl Document, element: NodeId) -> String {
    let direct = doc
        .text_nodes(element)
        .iter()
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if direct.is_empty() && doc.children(element).is_empty() {
        return doc.text_content(element).trim().to_string();
    }
    direct
}

fn truncate(text: String) -> String {
    match text.char_indices().nth(MAX_TEXT_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

// ============================================================================
// Bridge - Info
// ============================================================================

impl<D: Document, W: HostWindow> Bridge<D, W> {
    /// Describes `element` for the host's property panel.
    #[must_use]
    pub fn element_info(&self, selector: &str, element: NodeId) -> ElementInfo {
        let policy = self.generator.policy();
        let component_id = self.component_id(element);
        let analysis = policy.analyze_component(component_id.as_deref());

        let computed_styles: Map<String, Value> = COMPUTED_STYLE_PROPERTIES
            .iter()
            .map(|&property| {
                let value = self.doc.computed_style(element, &to_kebab_case(property));
                (property.to_string(), Value::String(value))
            })
            .collect();

        ElementInfo {
            selector: selector.to_string(),
            component_id,
            is_shared_component: analysis.is_shared,
            shared_component_type: analysis.component_type,
            shared_component_warning: analysis.warning_message,
            tag_name: self
                .doc
                .tag_name(element)
                .unwrap_or_default()
                .to_ascii_uppercase(),
            class_name: self.doc.attribute(element, "class").unwrap_or_default(),
            semantic_classes: policy.semantic_classes(&self.doc.class_list(element)),
            text_content: truncate(direct_text(&self.doc, element)),
            has_children: !self.doc.children(element).is_empty(),
            computed_styles,
            bounding_rect: self.doc.bounding_rect(element).into(),
        }
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
    fn test_direct_text() {
        let doc = MemoryDocument::new();
        let body = doc.body().expect("body");

        let card = doc.append_element(body, "div", &[]).expect("card");
        doc.append_text(card, "  Price: ").expect("text");
        let amount = doc.append_element(card, "strong", &[]).expect("strong");
        doc.append_text(amount, "$10").expect("text");
        doc.append_text(card, " today ").expect("text");
        assert_eq!(direct_text(&doc, card), "Price: today");

        let wrapper = doc.append_element(body, "div", &[]).expect("wrapper");
        let inner = doc.append_element(wrapper, "span", &[]).expect("span");
        doc.append_text(inner, "nested").expect("text");
        assert_eq!(direct_text(&doc, wrapper), "");

        let leaf = doc.append_element(body, "h1", &[]).expect("h1");
        doc.append_text(leaf, "  Title  ").expect("text");
        assert_eq!(direct_text(&doc, leaf), "Title");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short".into()), "short");
        let long = "é".repeat(MAX_TEXT_LEN + 5);
        let cut = truncate(long);
        assert_eq!(cut.chars().count(), MAX_TEXT_LEN + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("a".repeat(MAX_TEXT_LEN)).len(), MAX_TEXT_LEN);
    }
}
