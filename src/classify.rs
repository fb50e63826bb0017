//! Classification heuristics.
//!
//! Platform conventions drift: utility-class vocabularies grow, frameworks
//! change their generated id formats, design systems move shared components.
//! [`ClassificationPolicy`] gathers all of these rules in one replaceable
//! value instead of literals scattered through the selector generator and
//! detector.
//!
//! | Rule | Used by |
//! |------|---------|
//! | Utility-class patterns | selector generation, element info |
//! | Framework-generated id patterns | selector generation |
//! | Layout-utility prefixes | significance check |
//! | Decorative class markers | decorative check |
//! | Shared component paths | component analysis |

// ============================================================================
// Imports
// ============================================================================

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Identifiers, class names and attribute values at or above this length are
/// never used in selectors.
pub const MAX_TOKEN_LEN: usize = 50;

/// Utility-class patterns (spacing, sizing, color, layout, state variants,
/// breakpoints).
const UTILITY_CLASS_PATTERNS: &[&str] = &[
    r"^(p|m)(t|r|b|l|x|y)?-\d+$",
    r"^-?(p|m)(t|r|b|l|x|y)?-\d+$",
    r"^(w|h|min-w|min-h|max-w|max-h)-",
    r"^text-(xs|sm|base|lg|xl|\d*xl|center|left|right)",
    r"^(flex|grid|block|inline|hidden)",
    r"^(bg|text|border|ring|shadow|outline)-",
    r"^(rounded|opacity|cursor|select)-",
    r"^(absolute|relative|fixed|sticky)",
    r"^(top|right|bottom|left|inset|z)-",
    r"^(justify|items|content|self|place)-",
    r"^(gap|space)-",
    r"^(transition|duration|ease|delay|animate)-",
    r"^(hover|focus|active|disabled|group-hover):",
    r"^(sm|md|lg|xl|2xl):",
    r"^(overflow|object|aspect|container)",
    r"^(font|leading|tracking|decoration)",
    r"^(divide|border-[trbl])",
    r"^(col|row)-",
];

/// Ids generated by UI frameworks; unstable across renders.
const FRAMEWORK_ID_PATTERNS: &[&str] = &[r"^react-", r"^:r[0-9a-z]+:$", r"^radix-"];

/// Layout utilities that do not make an element significant on their own.
const LAYOUT_CLASS_PATTERN: &str =
    r"^(text-|bg-|p-|m-|flex|grid|w-|h-|from-|to-|via-|absolute|relative|fixed)";

/// Class substrings marking cosmetic layers.
const DECORATIVE_MARKERS: &[&str] = &[
    "gradient",
    "from-",
    "to-",
    "backdrop",
    "overlay",
    "bg-gradient",
    "shadow",
    "blur",
];

/// Source directories whose components are reused across the project.
const SHARED_COMPONENT_PATTERN: &str = r"(?i)/components/(ui|common|shared)/";

/// Extracts the component file stem from `src/components/ui/button.tsx:46:7`.
const COMPONENT_NAME_PATTERN: &str = r"(?i)/([^/]+)\.tsx?:\d+";

// ============================================================================
// ComponentAnalysis
// ============================================================================

/// Result of inspecting a source-mapped component id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentAnalysis {
    /// Whether edits affect every instance of the component.
    pub is_shared: bool,
    /// Component name for shared components, `unique` otherwise, `None`
    /// when the element carries no component id.
    pub component_type: Option<String>,
    /// Warning shown to the user before editing a shared component.
    pub warning_message: Option<String>,
}

// ============================================================================
// ClassificationPolicy
// ============================================================================

/// Replaceable set of naming heuristics.
#[derive(Debug, Clone)]
pub struct ClassificationPolicy {
    utility_classes: Vec<Regex>,
    framework_ids: Vec<Regex>,
    layout_classes: Vec<Regex>,
    decorative_markers: Vec<String>,
    shared_components: Vec<Regex>,
    component_name: Vec<Regex>,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationPolicy {
    /// Policy with the built-in rule set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            utility_classes: compile_all(UTILITY_CLASS_PATTERNS),
            framework_ids: compile_all(FRAMEWORK_ID_PATTERNS),
            layout_classes: compile_all(&[LAYOUT_CLASS_PATTERN]),
            decorative_markers: DECORATIVE_MARKERS.iter().map(|m| (*m).to_string()).collect(),
            shared_components: compile_all(&[SHARED_COMPONENT_PATTERN]),
            component_name: compile_all(&[COMPONENT_NAME_PATTERN]),
        }
    }

    /// Adds a utility-class pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the pattern is not a valid regex.
    pub fn with_utility_pattern(mut self, pattern: &str) -> Result<Self> {
        self.utility_classes.push(compile(pattern)?);
        Ok(self)
    }

    /// Adds a framework-generated id pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the pattern is not a valid regex.
    pub fn with_framework_id_pattern(mut self, pattern: &str) -> Result<Self> {
        self.framework_ids.push(compile(pattern)?);
        Ok(self)
    }

    /// Adds a decorative class marker (substring match).
    #[must_use]
    pub fn with_decorative_marker(mut self, marker: impl Into<String>) -> Self {
        self.decorative_markers.push(marker.into());
        self
    }

    /// Adds a shared-component path pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the pattern is not a valid regex.
    pub fn with_shared_component_pattern(mut self, pattern: &str) -> Result<Self> {
        self.shared_components.push(compile(pattern)?);
        Ok(self)
    }
}

// ============================================================================
// Class & Id Rules
// ============================================================================

impl ClassificationPolicy {
    /// Returns `true` for utility classes that say nothing about identity.
    #[must_use]
    pub fn is_utility_class(&self, class: &str) -> bool {
        self.utility_classes.iter().any(|re| re.is_match(class))
    }

    /// Returns `true` for classes usable in selectors.
    #[must_use]
    pub fn is_semantic_class(&self, class: &str) -> bool {
        !class.is_empty() && !self.is_utility_class(class) && class.chars().count() < MAX_TOKEN_LEN
    }

    /// Semantic classes in declaration order.
    #[must_use]
    pub fn semantic_classes(&self, classes: &[String]) -> Vec<String> {
        classes
            .iter()
            .filter(|class| self.is_semantic_class(class))
            .cloned()
            .collect()
    }

    /// Returns `true` for ids worth using as a selector.
    ///
    /// Rejects empty, long, digit-leading, whitespace-containing,
    /// framework-generated and `__`-prefixed ids.
    #[must_use]
    pub fn is_valid_id(&self, id: &str) -> bool {
        if id.is_empty() || id.chars().count() >= MAX_TOKEN_LEN {
            return false;
        }
        if id.starts_with(|ch: char| ch.is_ascii_digit()) || id.contains(char::is_whitespace) {
            return false;
        }
        if id.starts_with("__") {
            return false;
        }
        !self.framework_ids.iter().any(|re| re.is_match(id))
    }

    /// Returns `true` for `data-*` values short enough to select on.
    #[inline]
    #[must_use]
    pub fn is_usable_data_value(&self, value: &str) -> bool {
        value.chars().count() < MAX_TOKEN_LEN
    }

    /// Returns `true` for layout utilities ignored by the significance check.
    #[must_use]
    pub fn is_layout_class(&self, class: &str) -> bool {
        self.layout_classes.iter().any(|re| re.is_match(class))
    }

    /// Returns `true` for classes marking gradients, overlays, shadows or blurs.
    #[must_use]
    pub fn is_decorative_class(&self, class: &str) -> bool {
        self.decorative_markers
            .iter()
            .any(|marker| class.contains(marker.as_str()))
    }
}

// ============================================================================
// Component Analysis
// ============================================================================

impl ClassificationPolicy {
    /// Inspects a `data-lov-id` / `data-component-id` value.
    #[must_use]
    pub fn analyze_component(&self, component_id: Option<&str>) -> ComponentAnalysis {
        let Some(component_id) = component_id.filter(|id| !id.is_empty()) else {
            return ComponentAnalysis::default();
        };

        if !self.shared_components.iter().any(|re| re.is_match(component_id)) {
            return ComponentAnalysis {
                is_shared: false,
                component_type: Some("unique".to_string()),
                warning_message: None,
            };
        }

        let name = self
            .component_name
            .iter()
            .find_map(|re| re.captures(component_id))
            .and_then(|caps| caps.get(1))
            .map_or("component", |m| m.as_str());

        ComponentAnalysis {
            is_shared: true,
            component_type: Some(name.to_string()),
            warning_message: Some(format!(
                "Este es un componente compartido ({name}). Los cambios afectarán a TODAS las instancias de este componente en el proyecto."
            )),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::config(format!("invalid pattern {pattern:?}: {e}")))
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(%pattern, error = %e, "Skipping classification pattern");
                None
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_patterns_compile() {
        let policy = ClassificationPolicy::new();
        assert_eq!(policy.utility_classes.len(), UTILITY_CLASS_PATTERNS.len());
        assert_eq!(policy.framework_ids.len(), FRAMEWORK_ID_PATTERNS.len());
    }

    #[test]
    fn test_utility_classes() {
        let policy = ClassificationPolicy::new();
        for class in [
            "p-4", "mx-2", "-mt-8", "w-full", "max-w-lg", "text-sm", "text-2xl", "flex",
            "bg-blue-500", "rounded-lg", "absolute", "z-10", "items-center", "gap-4",
            "transition-all", "hover:bg-red-500", "md:flex", "overflow-hidden", "font-bold",
            "border-t", "col-span-2",
        ] {
            assert!(policy.is_utility_class(class), "{class} should be utility");
        }
        for class in ["card", "product-title", "hero", "navbar", "btn-primary"] {
            assert!(!policy.is_utility_class(class), "{class} should be semantic");
        }
    }

    #[test]
    fn test_semantic_classes_keep_order_and_skip_long() {
        let policy = ClassificationPolicy::new();
        let long = "x".repeat(50);
        let classes = vec![
            "p-4".to_string(),
            "card".to_string(),
            long,
            "featured".to_string(),
        ];
        assert_eq!(policy.semantic_classes(&classes), vec!["card", "featured"]);
    }

    #[test]
    fn test_is_valid_id() {
        let policy = ClassificationPolicy::new();
        assert!(policy.is_valid_id("buy"));
        assert!(policy.is_valid_id("main-nav"));
        assert!(!policy.is_valid_id(""));
        assert!(!policy.is_valid_id("1st"));
        assert!(!policy.is_valid_id("has space"));
        assert!(!policy.is_valid_id("react-select-2"));
        assert!(!policy.is_valid_id(":r1a:"));
        assert!(!policy.is_valid_id("radix-:R1:"));
        assert!(!policy.is_valid_id("__next"));
        assert!(!policy.is_valid_id(&"a".repeat(50)));
        assert!(policy.is_valid_id(&"a".repeat(49)));
    }

    #[test]
    fn test_custom_framework_pattern() {
        let policy = ClassificationPolicy::new()
            .with_framework_id_pattern(r"^ember\d+$")
            .expect("pattern");
        assert!(!policy.is_valid_id("ember42"));
        assert!(ClassificationPolicy::new().with_utility_pattern("(").is_err());
    }

    #[test]
    fn test_layout_and_decorative_classes() {
        let policy = ClassificationPolicy::new();
        assert!(policy.is_layout_class("from-purple-500"));
        assert!(policy.is_layout_class("relative"));
        assert!(!policy.is_layout_class("shadow-lg"));

        assert!(policy.is_decorative_class("bg-gradient-to-r"));
        assert!(policy.is_decorative_class("backdrop-blur-sm"));
        assert!(policy.is_decorative_class("hero-overlay"));
        assert!(!policy.is_decorative_class("card"));
    }

    #[test]
    fn test_analyze_component_without_id() {
        let policy = ClassificationPolicy::new();
        assert_eq!(policy.analyze_component(None), ComponentAnalysis::default());
        assert_eq!(policy.analyze_component(Some("")), ComponentAnalysis::default());
    }

    #[test]
    fn test_analyze_unique_component() {
        let policy = ClassificationPolicy::new();
        let analysis = policy.analyze_component(Some("src/pages/ui/Hero.tsx:12:4"));
        assert!(!analysis.is_shared);
        assert_eq!(analysis.component_type.as_deref(), Some("unique"));
        assert!(analysis.warning_message.is_none());
    }

    #[test]
    fn test_analyze_shared_component() {
        let policy = ClassificationPolicy::new();
        let analysis = policy.analyze_component(Some("src/components/ui/button.tsx:46:7"));
        assert!(analysis.is_shared);
        assert_eq!(analysis.component_type.as_deref(), Some("button"));
        let warning = analysis.warning_message.expect("warning");
        assert!(warning.contains("(button)"));
        assert!(warning.contains("TODAS"));

        let analysis = policy.analyze_component(Some("src/Components/Shared/index"));
        assert!(analysis.is_shared);
        assert_eq!(analysis.component_type.as_deref(), Some("component"));
    }
}
