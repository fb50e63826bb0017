//! CSS selector parsing and matching.
//!
//! Covers the selector grammar the bridge generates and the host sends back:
//!
//! - type (`div`), universal (`*`), id (`#buy`), class (`.card`)
//! - attribute presence and equality (`[data-id]`, `[data-id="42"]`)
//! - `:nth-of-type(n)` with a plain integer argument
//! - descendant (` `) and child (`>`) combinators, selector groups (`,`)
//! - CSS escapes in identifiers and quoted strings
//!
//! Anything else is rejected with [`Error::InvalidSelector`] rather than
//! silently mis-matched.

use crate::error::{Error, Result};
use crate::identifiers::NodeId;

// ============================================================================
// Match Context
// ============================================================================

/// Read access to an element tree, as needed for matching.
pub trait MatchContext {
    /// Lowercase tag name, `None` for non-elements.
    fn tag(&self, node: NodeId) -> Option<&str>;

    /// Attribute value.
    fn attr(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Parent element.
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;

    /// 1-based position among element siblings with the same tag.
    fn nth_of_type(&self, node: NodeId) -> usize;
}

// ============================================================================
// Selector AST
// ============================================================================

/// Relation of a compound to the compound on its left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists { name: String },
    Equals { name: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    nth_of_type: Vec<usize>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && !self.universal
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.nth_of_type.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    combinator: Option<Combinator>,
}

/// A parsed selector group list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    groups: Vec<Vec<Part>>,
}

impl SelectorList {
    /// Parses a selector list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] for empty input, dangling
    /// combinators, unsupported pseudo-classes or unbalanced brackets.
    pub fn parse(selector: &str) -> Result<Self> {
        let mut parser = Parser::new(selector);
        let groups = parser.parse_list()?;
        Ok(Self { groups })
    }

    /// Returns `true` if the node matches any group.
    pub fn matches(&self, ctx: &impl MatchContext, node: NodeId) -> bool {
        ctx.tag(node).is_some()
            && self
                .groups
                .iter()
                .any(|parts| matches_from(ctx, node, parts, parts.len() - 1))
    }

    /// Returns the id if the list is a single bare `#id` selector.
    #[must_use]
    pub fn id_only(&self) -> Option<&str> {
        match self.groups.as_slice() {
            [parts] if parts.len() == 1 => {
                let compound = &parts[0].compound;
                let only_id = compound.tag.is_none()
                    && !compound.universal
                    && compound.classes.is_empty()
                    && compound.attrs.is_empty()
                    && compound.nth_of_type.is_empty();
                if only_id { compound.id.as_deref() } else { None }
            }
            _ => None,
        }
    }
}

// ============================================================================
// Matching
// ============================================================================

fn matches_from(ctx: &impl MatchContext, node: NodeId, parts: &[Part], idx: usize) -> bool {
    let part = &parts[idx];
    if !matches_compound(ctx, node, &part.compound) {
        return false;
    }
    if idx == 0 {
        return true;
    }

    match part.combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => ctx
            .parent_element(node)
            .is_some_and(|parent| matches_from(ctx, parent, parts, idx - 1)),
        Combinator::Descendant => {
            let mut cursor = ctx.parent_element(node);
            while let Some(ancestor) = cursor {
                if matches_from(ctx, ancestor, parts, idx - 1) {
                    return true;
                }
                cursor = ctx.parent_element(ancestor);
            }
            false
        }
    }
}

fn matches_compound(ctx: &impl MatchContext, node: NodeId, compound: &Compound) -> bool {
    let Some(tag) = ctx.tag(node) else {
        return false;
    };

    if let Some(expected) = &compound.tag
        && !expected.eq_ignore_ascii_case(tag)
    {
        return false;
    }

    if let Some(id) = &compound.id
        && ctx.attr(node, "id") != Some(id.as_str())
    {
        return false;
    }

    if !compound.classes.is_empty() {
        let class_attr = ctx.attr(node, "class").unwrap_or_default();
        let has_all = compound
            .classes
            .iter()
            .all(|class| class_attr.split_whitespace().any(|token| token == class));
        if !has_all {
            return false;
        }
    }

    let attrs_ok = compound.attrs.iter().all(|condition| match condition {
        AttrCondition::Exists { name } => ctx.attr(node, name).is_some(),
        AttrCondition::Equals { name, value } => ctx.attr(node, name) == Some(value.as_str()),
    });
    if !attrs_ok {
        return false;
    }

    compound
        .nth_of_type
        .iter()
        .all(|&n| ctx.nth_of_type(node) == n)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self) -> Error {
        Error::invalid_selector(self.source)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.bump() == Some(expected) {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Vec<Part>>> {
        let mut groups = vec![self.parse_complex()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            groups.push(self.parse_complex()?);
        }
        if self.peek().is_some() {
            return Err(self.error());
        }
        Ok(groups)
    }

    fn parse_complex(&mut self) -> Result<Vec<Part>> {
        self.skip_whitespace();
        let mut parts = vec![Part {
            compound: self.parse_compound()?,
            combinator: None,
        }];

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(_) => return Err(self.error()),
            };
            parts.push(Part {
                compound: self.parse_compound()?,
                combinator: Some(combinator),
            });
        }

        Ok(parts)
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();

        while let Some(ch) = self.peek() {
            match ch {
                '*' => {
                    if !compound.is_empty() {
                        return Err(self.error());
                    }
                    self.pos += 1;
                    compound.universal = true;
                }
                '#' => {
                    self.pos += 1;
                    let id = self.parse_ident()?;
                    if compound.id.replace(id).is_some() {
                        return Err(self.error());
                    }
                }
                '.' => {
                    self.pos += 1;
                    let class = self.parse_ident()?;
                    compound.classes.push(class);
                }
                '[' => {
                    self.pos += 1;
                    let condition = self.parse_attr()?;
                    compound.attrs.push(condition);
                }
                ':' => {
                    self.pos += 1;
                    let n = self.parse_nth_of_type()?;
                    compound.nth_of_type.push(n);
                }
                _ if is_ident_start(ch) => {
                    if !compound.is_empty() {
                        return Err(self.error());
                    }
                    compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(self.error());
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<AttrCondition> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        match self.bump() {
            Some(']') => Ok(AttrCondition::Exists { name }),
            Some('=') => {
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.pos += 1;
                        self.parse_string(quote)?
                    }
                    _ => self.parse_ident()?,
                };
                self.skip_whitespace();
                self.expect(']')?;
                Ok(AttrCondition::Equals { name, value })
            }
            _ => Err(self.error()),
        }
    }

    fn parse_nth_of_type(&mut self) -> Result<usize> {
        let name = self.parse_ident()?;
        if !name.eq_ignore_ascii_case("nth-of-type") {
            return Err(self.error());
        }
        self.expect('(')?;
        self.skip_whitespace();

        let mut digits = String::new();
        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            digits.push(ch);
            self.pos += 1;
        }
        self.skip_whitespace();
        self.expect(')')?;

        match digits.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(self.error()),
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                out.push(self.parse_escape());
            } else if is_ident_char(ch) {
                out.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.error());
        }
        Ok(out)
    }

    fn parse_string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error()),
                Some(ch) if ch == quote => return Ok(out),
                Some('\\') => {
                    if self.peek() == Some('\n') {
                        self.pos += 1;
                    } else {
                        out.push(self.parse_escape());
                    }
                }
                Some(ch) => out.push(ch),
            }
        }
    }

    /// Consumes an escape body (the backslash is already consumed).
    fn parse_escape(&mut self) -> char {
        let Some(first) = self.peek() else {
            return char::REPLACEMENT_CHARACTER;
        };

        if !first.is_ascii_hexdigit() {
            self.pos += 1;
            return first;
        }

        let mut hex = String::new();
        while hex.len() < 6 && self.peek().is_some_and(|ch| ch.is_ascii_hexdigit()) {
            hex.extend(self.bump());
        }
        if self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }

        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|&code| code != 0)
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || ch == '\\' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rustc_hash::FxHashMap;

    /// Tiny tree: html > body > (div.card > span, div#main.card > span + span)
    struct Tree {
        tags: FxHashMap<NodeId, &'static str>,
        attrs: FxHashMap<(NodeId, &'static str), &'static str>,
        parents: FxHashMap<NodeId, NodeId>,
        nth: FxHashMap<NodeId, usize>,
    }

    impl MatchContext for Tree {
        fn tag(&self, node: NodeId) -> Option<&str> {
            self.tags.get(&node).copied()
        }

        fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
            self.attrs
                .iter()
                .find(|((id, key), _)| *id == node && *key == name)
                .map(|(_, value)| *value)
        }

        fn parent_element(&self, node: NodeId) -> Option<NodeId> {
            self.parents.get(&node).copied()
        }

        fn nth_of_type(&self, node: NodeId) -> usize {
            self.nth.get(&node).copied().unwrap_or(1)
        }
    }

    fn n(raw: u64) -> NodeId {
        NodeId::new(raw)
    }

    fn tree() -> Tree {
        let mut tree = Tree {
            tags: FxHashMap::default(),
            attrs: FxHashMap::default(),
            parents: FxHashMap::default(),
            nth: FxHashMap::default(),
        };
        for (id, tag) in [(1, "html"), (2, "body"), (3, "div"), (4, "span"), (5, "div"), (6, "span"), (7, "span")] {
            tree.tags.insert(n(id), tag);
        }
        for (child, parent) in [(2, 1), (3, 2), (4, 3), (5, 2), (6, 5), (7, 5)] {
            tree.parents.insert(n(child), n(parent));
        }
        tree.nth.insert(n(5), 2);
        tree.nth.insert(n(7), 2);
        tree.attrs.insert((n(3), "class"), "card");
        tree.attrs.insert((n(5), "class"), "card  featured");
        tree.attrs.insert((n(5), "id"), "main");
        tree.attrs.insert((n(6), "data-role"), "price tag");
        tree
    }

    fn matching(selector: &str) -> Vec<u64> {
        let tree = tree();
        let list = SelectorList::parse(selector).expect("parse");
        (1..=7)
            .filter(|&id| list.matches(&tree, n(id)))
            .collect()
    }

    #[test]
    fn test_simple_selectors() {
        assert_eq!(matching("span"), vec![4, 6, 7]);
        assert_eq!(matching("#main"), vec![5]);
        assert_eq!(matching(".card"), vec![3, 5]);
        assert_eq!(matching(".card.featured"), vec![5]);
        assert_eq!(matching("DIV.featured"), vec![5]);
        assert_eq!(matching("*"), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_attribute_selectors() {
        assert_eq!(matching("[data-role]"), vec![6]);
        assert_eq!(matching(r#"[data-role="price tag"]"#), vec![6]);
        assert_eq!(matching("[data-role='price tag']"), vec![6]);
        assert!(matching(r#"[data-role="price"]"#).is_empty());
    }

    #[test]
    fn test_combinators() {
        assert_eq!(matching("body > div > span"), vec![4, 6, 7]);
        assert_eq!(matching("html span"), vec![4, 6, 7]);
        assert!(matching("html > span").is_empty());
        assert_eq!(matching("div.featured > span:nth-of-type(2)"), vec![7]);
        assert_eq!(matching("div:nth-of-type(2)>span"), vec![6, 7]);
    }

    #[test]
    fn test_descendant_backtracks_past_first_ancestor() {
        // `.card span` must succeed even though the nearest div is not checked first
        assert_eq!(matching("html .card span"), vec![4, 6, 7]);
    }

    #[test]
    fn test_groups() {
        assert_eq!(matching("#main, span[data-role]"), vec![5, 6]);
    }

    #[test]
    fn test_escapes() {
        let list = SelectorList::parse(r"#\31 23").expect("parse");
        assert_eq!(list.id_only(), Some("123"));

        let list = SelectorList::parse(r".sm\:p-4").expect("parse");
        assert_eq!(list.groups[0][0].compound.classes, vec!["sm:p-4".to_string()]);

        let list = SelectorList::parse(r#"[data-x="a\"b"]"#).expect("parse");
        assert_eq!(
            list.groups[0][0].compound.attrs,
            vec![AttrCondition::Equals {
                name: "data-x".into(),
                value: "a\"b".into()
            }]
        );
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "   ", "div >", "> div", "div,", "#", ".", "[data-x", "a:hover", ":nth-of-type(0)", "div#a#b", "span*"] {
            assert!(SelectorList::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_id_only() {
        assert_eq!(SelectorList::parse("#buy").expect("parse").id_only(), Some("buy"));
        assert_eq!(SelectorList::parse("button#buy").expect("parse").id_only(), None);
        assert_eq!(SelectorList::parse("#a, #b").expect("parse").id_only(), None);
    }
}
