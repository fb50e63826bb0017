//! Priority-ordered selector synthesis.
//!
//! Each strategy is tried only when the previous one failed to produce a
//! selector that resolves to exactly the target element:
//!
//! | # | Strategy | Example |
//! |---|----------|---------|
//! | 1 | Valid, unique id | `#buy` |
//! | 2 | `data-*` attribute, declaration order | `[data-testid="cart"]` |
//! | 3 | Up to 3 semantic classes | `.card.featured` |
//! | 4 | Tag and up to 2 semantic classes | `article.card` |
//! | 5 | Deadline check, jumps to 7 when exceeded | |
//! | 6 | Shortest unique suffix of the ancestor path | `section.pricing > div > button` |
//! | 7 | Indexed path anchored at `<body>` | `body > main:nth-of-type(1) > div:nth-of-type(3)` |

// ============================================================================
// Imports
// ============================================================================

use tracing::{trace, warn};

use crate::classify::ClassificationPolicy;
use crate::config::BridgeConfig;
use crate::dom::Document;
use crate::host::Clock;
use crate::identifiers::NodeId;

use super::cache::SelectorCache;
use super::escape::css_escape;

// ============================================================================
// Constants
// ============================================================================

/// Separator between path parts.
const CHILD: &str = " > ";

/// Semantic classes used by the class-only strategy.
const MAX_CLASSES: usize = 3;

/// Semantic classes used per tag-qualified part.
const MAX_PART_CLASSES: usize = 2;

// ============================================================================
// SelectorOptions
// ============================================================================

/// Knobs of a single generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorOptions {
    /// Deadline checked before path strategies, in milliseconds.
    pub timeout_ms: u64,
    /// Ancestors walked by the path strategy.
    pub max_depth: usize,
    /// Try `data-*` attributes.
    pub prefer_data_attributes: bool,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for SelectorOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            max_depth: config.max_depth,
            prefer_data_attributes: config.prefer_data_attributes,
        }
    }
}

// ============================================================================
// SelectorGenerator
// ============================================================================

/// Synthesizes minimal unique selectors.
#[derive(Debug, Clone, Default)]
pub struct SelectorGenerator {
    policy: ClassificationPolicy,
    options: SelectorOptions,
}

impl SelectorGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(policy: ClassificationPolicy, options: SelectorOptions) -> Self {
        Self { policy, options }
    }

    /// Classification rules in use.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    /// Current options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> SelectorOptions {
        self.options
    }

    /// Replaces the options.
    pub fn set_options(&mut self, options: SelectorOptions) {
        self.options = options;
    }

    /// Returns a selector resolving to exactly `element`.
    ///
    /// `None` for `<html>`, detached nodes, and the exhausted fallback.
    /// Cache hits are revalidated before reuse; a miss first sweeps entries
    /// for nodes that have left the document.
    pub fn generate(
        &self,
        doc: &impl Document,
        clock: &impl Clock,
        cache: &mut SelectorCache,
        element: NodeId,
    ) -> Option<String> {
        if doc.document_element() == Some(element) || !doc.contains(element) {
            return None;
        }

        if let Some(cached) = cache.lookup(doc, element) {
            if is_unique(doc, &cached, element) {
                return Some(cached);
            }
            trace!(%element, selector = %cached, "Cached selector no longer unique");
            cache.remove(element);
        }

        cache.prune(doc);
        let selector = self.synthesize(doc, clock, element)?;
        cache.insert(element, selector.clone());
        Some(selector)
    }

    fn synthesize(&self, doc: &impl Document, clock: &impl Clock, element: NodeId) -> Option<String> {
        let started = clock.now_ms();
        let tag = doc.tag_name(element)?;

        if doc.body() == Some(element) {
            return Some(tag);
        }

        if let Some(selector) = self.by_id(doc, element) {
            return Some(selector);
        }

        if self.options.prefer_data_attributes
            && let Some(selector) = self.by_data_attribute(doc, element)
        {
            return Some(selector);
        }

        let classes: Vec<String> = self
            .policy
            .semantic_classes(&doc.class_list(element))
            .iter()
            .map(|class| css_escape(class))
            .collect();

        if !classes.is_empty() {
            let selector = format!(".{}", join_classes(&classes, MAX_CLASSES));
            if is_unique(doc, &selector, element) {
                return Some(selector);
            }

            let selector = format!("{tag}.{}", join_classes(&classes, MAX_PART_CLASSES));
            if is_unique(doc, &selector, element) {
                return Some(selector);
            }
        }

        let elapsed = clock.now_ms() - started;
        if elapsed > self.options.timeout_ms as f64 {
            warn!(%element, elapsed, "Selector generation timed out, using indexed path");
            return self.indexed_path(doc, element);
        }

        if let Some(selector) = self.shortest_unique_path(doc, element) {
            return Some(selector);
        }

        self.indexed_path(doc, element)
    }

    fn by_id(&self, doc: &impl Document, element: NodeId) -> Option<String> {
        let id = doc.attribute(element, "id")?;
        if !self.policy.is_valid_id(&id) {
            return None;
        }
        let selector = format!("#{}", css_escape(&id));
        is_unique(doc, &selector, element).then_some(selector)
    }

    fn by_data_attribute(&self, doc: &impl Document, element: NodeId) -> Option<String> {
        doc.attributes(element)
            .into_iter()
            .filter(|(name, value)| {
                name.starts_with("data-")
                    && !value.is_empty()
                    && self.policy.is_usable_data_value(value)
            })
            .map(|(name, value)| format!("[{}=\"{}\"]", css_escape(&name), css_escape(&value)))
            .find(|selector| is_unique(doc, selector, element))
    }

    /// Tag plus up to two semantic classes, optionally indexed.
    fn part(&self, doc: &impl Document, element: NodeId, indexed: bool) -> Option<String> {
        let mut part = doc.tag_name(element)?;
        let classes: Vec<String> = self
            .policy
            .semantic_classes(&doc.class_list(element))
            .iter()
            .take(MAX_PART_CLASSES)
            .map(|class| css_escape(class))
            .collect();
        if !classes.is_empty() {
            part.push('.');
            part.push_str(&classes.join("."));
        }
        if indexed {
            part.push_str(&format!(":nth-of-type({})", nth_of_type(doc, element)));
        }
        Some(part)
    }

    fn shortest_unique_path(&self, doc: &impl Document, element: NodeId) -> Option<String> {
        let root = doc.body();
        let mut parts = Vec::new();
        let mut current = Some(element);

        while let Some(node) = current
            && Some(node) != root
            && parts.len() < self.options.max_depth
        {
            parts.push(self.part(doc, node, false)?);
            current = doc.parent_element(node);
        }
        parts.reverse();

        (0..parts.len())
            .rev()
            .map(|start| parts[start..].join(CHILD))
            .find(|selector| is_unique(doc, selector, element))
    }

    /// Exhaustive indexed path, unique by construction, validated anyway.
    fn indexed_path(&self, doc: &impl Document, element: NodeId) -> Option<String> {
        let root = doc.body();
        let mut parts = Vec::new();
        let mut current = Some(element);
        let mut anchored = false;

        while let Some(node) = current {
            if Some(node) == root {
                anchored = true;
                break;
            }
            parts.push(self.part(doc, node, true)?);
            current = doc.parent_element(node);
        }
        if anchored {
            parts.push("body".to_string());
        }
        parts.reverse();

        let selector = parts.join(CHILD);
        match doc.query_selector(&selector) {
            Ok(Some(found)) if found == element => Some(selector),
            Ok(_) => {
                warn!(%element, %selector, "Indexed path resolved to another element");
                None
            }
            Err(e) => {
                warn!(%element, %selector, error = %e, "Indexed path is not a valid selector");
                None
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns `true` when `selector` matches exactly `element` and nothing else.
pub fn is_unique(doc: &impl Document, selector: &str, element: NodeId) -> bool {
    matches!(doc.query_selector_all(selector).as_deref(), Ok([only]) if *only == element)
}

fn join_classes(classes: &[String], limit: usize) -> String {
    classes[..classes.len().min(limit)].join(".")
}

fn nth_of_type(doc: &impl Document, element: NodeId) -> usize {
    let tag = doc.tag_name(element);
    let Some(parent) = doc.parent_element(element) else {
        return 1;
    };
    doc.children(parent)
        .into_iter()
        .filter(|&sibling| doc.tag_name(sibling) == tag)
        .position(|sibling| sibling == element)
        .map_or(1, |index| index + 1)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::dom::MemoryDocument;
    use crate::host::MemoryWindow;

    fn setup() -> (MemoryDocument, MemoryWindow, SelectorGenerator, SelectorCache) {
        let doc = MemoryDocument::new();
        let (window, _rx) = MemoryWindow::new("http://localhost:5173/").expect("window");
        (doc, window, SelectorGenerator::default(), SelectorCache::new())
    }

    #[test]
    fn test_valid_id_wins() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        let button = doc
            .append_element(body, "button", &[("id", "buy"), ("class", "cta"), ("data-testid", "buy")])
            .expect("button");

        let selector = generator.generate(&doc, &window, &mut cache, button);
        assert_eq!(selector.as_deref(), Some("#buy"));
    }

    #[test]
    fn test_framework_id_is_skipped() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        let input = doc
            .append_element(body, "input", &[("id", ":r3:"), ("data-field", "email")])
            .expect("input");

        let selector = generator.generate(&doc, &window, &mut cache, input);
        assert_eq!(selector.as_deref(), Some(r#"[data-field="email"]"#));
    }

    #[test]
    fn test_duplicate_id_falls_through() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        doc.append_element(body, "div", &[("id", "dup")]).expect("first");
        let second = doc
            .append_element(body, "div", &[("id", "dup"), ("class", "second")])
            .expect("second");

        let selector = generator.generate(&doc, &window, &mut cache, second);
        assert_eq!(selector.as_deref(), Some(".second"));
    }

    #[test]
    fn test_data_attributes_in_declaration_order() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        doc.append_element(body, "li", &[("data-kind", "item")]).expect("sibling");
        let target = doc
            .append_element(body, "li", &[("data-kind", "item"), ("data-sku", "A-1")])
            .expect("target");

        let selector = generator.generate(&doc, &window, &mut cache, target);
        assert_eq!(selector.as_deref(), Some(r#"[data-sku="A-1"]"#));
    }

    #[test]
    fn test_data_attributes_can_be_disabled() {
        let (doc, window, _, mut cache) = setup();
        let generator = SelectorGenerator::new(
            ClassificationPolicy::new(),
            SelectorOptions {
                prefer_data_attributes: false,
                ..SelectorOptions::default()
            },
        );
        let body = doc.body().expect("body");
        let target = doc
            .append_element(body, "li", &[("data-sku", "A-1"), ("class", "line")])
            .expect("target");

        let selector = generator.generate(&doc, &window, &mut cache, target);
        assert_eq!(selector.as_deref(), Some(".line"));
    }

    #[test]
    fn test_utility_classes_are_ignored() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        let card = doc
            .append_element(body, "div", &[("class", "p-4 flex card shadow-lg")])
            .expect("card");

        let selector = generator.generate(&doc, &window, &mut cache, card);
        assert_eq!(selector.as_deref(), Some(".card"));
    }

    #[test]
    fn test_tag_qualified_classes() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        doc.append_element(body, "div", &[("class", "card")]).expect("div");
        let article = doc
            .append_element(body, "article", &[("class", "card")])
            .expect("article");

        let selector = generator.generate(&doc, &window, &mut cache, article);
        assert_eq!(selector.as_deref(), Some("article.card"));
    }

    #[test]
    fn test_shortest_unique_path() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        let pricing = doc
            .append_element(body, "section", &[("class", "pricing")])
            .expect("pricing");
        let other = doc.append_element(body, "section", &[]).expect("other");
        let target = doc.append_element(pricing, "button", &[]).expect("target");
        doc.append_element(other, "button", &[]).expect("decoy");

        let selector = generator.generate(&doc, &window, &mut cache, target);
        assert_eq!(selector.as_deref(), Some("section.pricing > button"));
    }

    #[test]
    fn test_indexed_fallback_for_identical_siblings() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        let list = doc.append_element(body, "ul", &[]).expect("list");
        doc.append_element(list, "li", &[]).expect("first");
        let second = doc.append_element(list, "li", &[]).expect("second");

        let selector = generator.generate(&doc, &window, &mut cache, second);
        assert_eq!(
            selector.as_deref(),
            Some("body > ul:nth-of-type(1) > li:nth-of-type(2)")
        );
    }

    #[test]
    fn test_timeout_forces_indexed_path() {
        let (doc, window, _, mut cache) = setup();
        let generator = SelectorGenerator::new(
            ClassificationPolicy::new(),
            SelectorOptions {
                timeout_ms: 1,
                ..SelectorOptions::default()
            },
        );
        let body = doc.body().expect("body");
        let pricing = doc
            .append_element(body, "section", &[("class", "pricing")])
            .expect("pricing");
        let target = doc.append_element(pricing, "button", &[]).expect("target");
        doc.append_element(body, "button", &[]).expect("decoy");

        // The manual clock never advances, so a zero-cost run stays under the deadline.
        let selector = generator.generate(&doc, &window, &mut cache, target);
        assert_eq!(selector.as_deref(), Some("section.pricing > button"));

        let slow = SlowClock::default();
        cache.clear();
        let selector = generator.generate(&doc, &slow, &mut cache, target);
        assert_eq!(
            selector.as_deref(),
            Some("body > section.pricing:nth-of-type(1) > button:nth-of-type(1)")
        );
    }

    #[derive(Default)]
    struct SlowClock(std::cell::Cell<f64>);

    impl Clock for SlowClock {
        fn now_ms(&self) -> f64 {
            let now = self.0.get();
            self.0.set(now + 10.0);
            now
        }
    }

    #[test]
    fn test_html_and_detached_return_none() {
        let (doc, window, generator, mut cache) = setup();
        let html = doc.document_element().expect("html");
        assert_eq!(generator.generate(&doc, &window, &mut cache, html), None);

        let body = doc.body().expect("body");
        let gone = doc.append_element(body, "div", &[]).expect("gone");
        doc.remove_element(gone);
        assert_eq!(generator.generate(&doc, &window, &mut cache, gone), None);
    }

    #[test]
    fn test_body_selector() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        assert_eq!(
            generator.generate(&doc, &window, &mut cache, body).as_deref(),
            Some("body")
        );
    }

    #[test]
    fn test_cache_hit_is_revalidated() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        let card = doc
            .append_element(body, "div", &[("class", "card")])
            .expect("card");

        assert_eq!(
            generator.generate(&doc, &window, &mut cache, card).as_deref(),
            Some(".card")
        );

        // A clone of the card makes the cached selector ambiguous.
        let clone = doc
            .append_element(body, "div", &[("class", "card")])
            .expect("clone");
        doc.set_attribute(card, "data-slot", "hero").expect("attr");

        assert_eq!(
            generator.generate(&doc, &window, &mut cache, card).as_deref(),
            Some(r#"[data-slot="hero"]"#)
        );
        assert_ne!(
            generator.generate(&doc, &window, &mut cache, clone).as_deref(),
            Some(".card")
        );
    }

    #[test]
    fn test_miss_sweeps_removed_elements() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");

        for round in 0..50 {
            let id = format!("b{round}");
            let button = doc.append_element(body, "button", &[("id", id.as_str())]).expect("button");
            assert_eq!(
                generator.generate(&doc, &window, &mut cache, button),
                Some(format!("#{id}"))
            );
            doc.remove_element(button);
        }
        assert_eq!(cache.len(), 1);

        let kept = doc.append_element(body, "main", &[]).expect("main");
        generator.generate(&doc, &window, &mut cache, kept);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&doc, kept).as_deref(), Some("main"));
    }

    #[test]
    fn test_escapes_special_characters() {
        let (doc, window, generator, mut cache) = setup();
        let body = doc.body().expect("body");
        let node = doc
            .append_element(body, "div", &[("id", "hero:main")])
            .expect("node");
        let selector = generator
            .generate(&doc, &window, &mut cache, node)
            .expect("selector");
        assert_eq!(selector, r"#hero\:main");
        assert_eq!(doc.query_selector(&selector).expect("query"), Some(node));
    }

    // ------------------------------------------------------------------------
    // Property: round-trip uniqueness on random trees
    // ------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    struct NodeShape {
        parent: usize,
        tag: &'static str,
        class: Option<&'static str>,
        id: Option<&'static str>,
    }

    fn node_shape() -> impl Strategy<Value = NodeShape> {
        (
            any::<usize>(),
            prop::sample::select(vec!["div", "span", "p", "li", "section"]),
            prop::option::of(prop::sample::select(vec!["card", "item", "p-4", "hero", "row-1"])),
            prop::option::of(prop::sample::select(vec!["a", "b", "c", "1x", "react-9"])),
        )
            .prop_map(|(parent, tag, class, id)| NodeShape {
                parent,
                tag,
                class,
                id,
            })
    }

    proptest! {
        #[test]
        fn test_generated_selectors_round_trip(shapes in prop::collection::vec(node_shape(), 1..40)) {
            let (doc, window, generator, mut cache) = setup();
            let mut nodes = vec![doc.body().expect("body")];

            for shape in &shapes {
                let parent = nodes[shape.parent % nodes.len()];
                let mut attrs = Vec::new();
                if let Some(class) = shape.class {
                    attrs.push(("class", class));
                }
                if let Some(id) = shape.id {
                    attrs.push(("id", id));
                }
                nodes.push(doc.append_element(parent, shape.tag, &attrs).expect("append"));
            }

            for &node in &nodes {
                let selector = generator
                    .generate(&doc, &window, &mut cache, node)
                    .expect("every connected non-root element gets a selector");
                prop_assert_eq!(doc.query_selector_all(&selector).expect("query"), vec![node]);
            }
        }
    }
}
