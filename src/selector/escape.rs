//! `CSS.escape` for identifiers and attribute values.

use std::fmt::Write;

/// Escapes a string for use as a CSS identifier (CSSOM `CSS.escape`).
///
/// The output is also valid inside a double-quoted attribute value.
#[must_use]
pub fn css_escape(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len() + 4);

    for (index, &ch) in chars.iter().enumerate() {
        let code = ch as u32;
        let leading_digit = ch.is_ascii_digit()
            && (index == 0 || (index == 1 && chars[0] == '-'));

        if code == 0 {
            out.push(char::REPLACEMENT_CHARACTER);
        } else if (0x01..=0x1f).contains(&code) || code == 0x7f || leading_digit {
            let _ = write!(out, "\\{code:x} ");
        } else if index == 0 && ch == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if code >= 0x80 || ch == '-' || ch == '_' || ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::dom::css::{MatchContext, SelectorList};
    use crate::identifiers::NodeId;

    #[test]
    fn test_plain_identifiers_unchanged() {
        assert_eq!(css_escape("card"), "card");
        assert_eq!(css_escape("product_title-2"), "product_title-2");
        assert_eq!(css_escape("café"), "café");
    }

    #[test]
    fn test_leading_digits() {
        assert_eq!(css_escape("1st"), "\\31 st");
        assert_eq!(css_escape("-2x"), "-\\32 x");
        assert_eq!(css_escape("a1"), "a1");
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(css_escape("sm:p-4"), "sm\\:p-4");
        assert_eq!(css_escape("w-1/2"), "w-1\\/2");
        assert_eq!(css_escape("a b"), "a\\ b");
        assert_eq!(css_escape("say \"hi\""), "say\\ \\\"hi\\\"");
        assert_eq!(css_escape("-"), "\\-");
        assert_eq!(css_escape("\u{1}"), "\\1 ");
        assert_eq!(css_escape("\0"), "\u{FFFD}");
    }

    struct OneClass(String);

    impl MatchContext for OneClass {
        fn tag(&self, _node: NodeId) -> Option<&str> {
            Some("div")
        }

        fn attr(&self, _node: NodeId, name: &str) -> Option<&str> {
            (name == "class").then_some(self.0.as_str())
        }

        fn parent_element(&self, _node: NodeId) -> Option<NodeId> {
            None
        }

        fn nth_of_type(&self, _node: NodeId) -> usize {
            1
        }
    }

    proptest! {
        #[test]
        fn test_escaped_class_parses_back(class in "[^\\s\\x00]{1,20}") {
            let selector = format!(".{}", css_escape(&class));
            let list = SelectorList::parse(&selector).expect("escaped selector parses");
            prop_assert!(list.matches(&OneClass(class), NodeId::new(1)));
        }

        #[test]
        fn test_escaped_value_parses_back(value in "[^\\x00]{0,20}") {
            let selector = format!("[data-x=\"{}\"]", css_escape(&value));
            let list = SelectorList::parse(&selector).expect("escaped selector parses");
            let ctx = DataAttr(value);
            prop_assert!(list.matches(&ctx, NodeId::new(1)));
        }
    }

    struct DataAttr(String);

    impl MatchContext for DataAttr {
        fn tag(&self, _node: NodeId) -> Option<&str> {
            Some("div")
        }

        fn attr(&self, _node: NodeId, name: &str) -> Option<&str> {
            (name == "data-x").then_some(self.0.as_str())
        }

        fn parent_element(&self, _node: NodeId) -> Option<NodeId> {
            None
        }

        fn nth_of_type(&self, _node: NodeId) -> usize {
            1
        }
    }
}
