//! Origin checks for both directions.
//!
//! Inbound, [`OriginGuard`] decides whether a sender may drive the bridge.
//! Outbound, [`resolve_target_origin`] picks the `targetOrigin` for every
//! post to the parent.
//!
//! # Inbound Rules
//!
//! | Allow-list | Sender | Verdict |
//! |------------|--------|---------|
//! | non-empty | matches an entry | accept |
//! | non-empty | no match | drop |
//! | empty | parent window | accept |
//! | empty | same origin, not strict | accept |
//! | empty | anything else | drop |
//!
//! Entries are `*`, an exact origin, or a pattern with a single `*` standing
//! for any run of host characters (`https://*.example.com`).

// ============================================================================
// Imports
// ============================================================================

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::host::MessageEvent;

// ============================================================================
// OriginPattern
// ============================================================================

/// A compiled allow-list entry.
#[derive(Debug, Clone)]
pub enum OriginPattern {
    /// `*`: every origin.
    Any,
    /// Exact origin string.
    Exact(String),
    /// Single-wildcard pattern compiled to an anchored regex.
    Wildcard(Regex),
}

impl OriginPattern {
    /// Compiles an allow-list entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOriginPattern`] for empty entries and entries
    /// with more than one wildcard.
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern == "*" {
            return Ok(Self::Any);
        }
        let wildcards = pattern.matches('*').count();
        if pattern.is_empty() || wildcards > 1 {
            return Err(Error::invalid_origin_pattern(pattern));
        }
        if wildcards == 0 {
            return Ok(Self::Exact(pattern.to_string()));
        }

        let (head, tail) = pattern.split_once('*').unwrap_or((pattern, ""));
        let source = format!("^{}[^/]*{}$", regex::escape(head), regex::escape(tail));
        Regex::new(&source)
            .map(Self::Wildcard)
            .map_err(|_| Error::invalid_origin_pattern(pattern))
    }

    /// Returns `true` if `origin` satisfies this entry.
    #[must_use]
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => exact == origin,
            Self::Wildcard(regex) => regex.is_match(origin),
        }
    }
}

// ============================================================================
// OriginGuard
// ============================================================================

/// Inbound sender check.
#[derive(Debug, Clone)]
pub struct OriginGuard {
    patterns: Vec<OriginPattern>,
    strict: bool,
    own_origin: String,
}

impl OriginGuard {
    /// Builds a guard from the current configuration.
    ///
    /// Invalid allow-list entries are skipped with a warning.
    #[must_use]
    pub fn new(config: &BridgeConfig, own_origin: impl Into<String>) -> Self {
        let patterns = config
            .allowed_origins
            .iter()
            .filter_map(|pattern| match OriginPattern::compile(pattern) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    warn!(%pattern, error = %e, "Skipping allowed origin");
                    None
                }
            })
            .collect();

        Self {
            patterns,
            strict: config.strict_origin_check,
            own_origin: own_origin.into(),
        }
    }

    /// Number of usable allow-list entries.
    #[inline]
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` if the message may be processed.
    #[must_use]
    pub fn accepts(&self, event: &MessageEvent) -> bool {
        if self.patterns.is_empty() {
            if event.from_parent {
                return true;
            }
            let same_origin = event.origin == self.own_origin;
            if same_origin && !self.strict {
                return true;
            }
            warn!(origin = %event.origin, strict = self.strict, "Message from non-parent origin");
            return false;
        }

        let allowed = self.patterns.iter().any(|p| p.matches(&event.origin));
        if !allowed {
            warn!(origin = %event.origin, "Message from unauthorized origin");
        }
        allowed
    }
}

// ============================================================================
// Target Origin
// ============================================================================

/// Origin of the referring document, if it has a tuple origin.
#[must_use]
pub fn parent_origin_from_referrer(referrer: Option<&str>) -> Option<String> {
    let referrer = referrer.filter(|r| !r.is_empty())?;
    match Url::parse(referrer) {
        Ok(url) => {
            let origin = url.origin();
            origin.is_tuple().then(|| origin.ascii_serialization())
        }
        Err(e) => {
            warn!(%referrer, error = %e, "Could not parse referrer");
            None
        }
    }
}

/// `targetOrigin` for the next post to the parent.
///
/// Uses the configured parent origin, else (with auto-detection on) the
/// referrer's origin, remembered for later posts, else `*`.
pub fn resolve_target_origin(config: &mut BridgeConfig, referrer: Option<&str>) -> String {
    if let Some(origin) = &config.parent_origin {
        return origin.clone();
    }

    if config.auto_detect_parent
        && let Some(detected) = parent_origin_from_referrer(referrer)
    {
        if config.debug {
            debug!(origin = %detected, "Auto-detected parent origin");
        }
        config.parent_origin = Some(detected.clone());
        return detected;
    }

    if config.debug {
        warn!("Using wildcard target origin");
    }
    "*".to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    fn guard(origins: &[&str], strict: bool) -> OriginGuard {
        let config = BridgeConfig::new()
            .with_allowed_origins(origins.iter().copied())
            .with_strict_origin_check(strict);
        OriginGuard::new(&config, "https://shop.test")
    }

    #[test]
    fn test_compile_rejects_multiple_wildcards() {
        assert!(OriginPattern::compile("https://*.*.example.com").is_err());
        assert!(OriginPattern::compile("").is_err());
        assert!(matches!(OriginPattern::compile("*"), Ok(OriginPattern::Any)));
    }

    #[test]
    fn test_wildcard_allow_list() {
        let guard = guard(&["https://*.lovivo.app"], false);
        assert!(!guard.accepts(&MessageEvent::from_parent("https://evil.example", Value::Null)));
        assert!(guard.accepts(&MessageEvent::from_other("https://shop.lovivo.app", Value::Null)));
        assert!(!guard.accepts(&MessageEvent::from_other("https://lovivo.app", Value::Null)));
        assert!(!guard.accepts(&MessageEvent::from_other("http://shop.lovivo.app", Value::Null)));
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let guard = guard(&["https://*.*.bad", "https://ok.test"], false);
        assert_eq!(guard.pattern_count(), 1);
        assert!(guard.accepts(&MessageEvent::from_other("https://ok.test", Value::Null)));
    }

    #[test]
    fn test_empty_allow_list_rules() {
        let lenient = guard(&[], false);
        assert!(lenient.accepts(&MessageEvent::from_parent("https://editor.test", Value::Null)));
        assert!(lenient.accepts(&MessageEvent::from_other("https://shop.test", Value::Null)));
        assert!(!lenient.accepts(&MessageEvent::from_other("https://other.test", Value::Null)));

        let strict = guard(&[], true);
        assert!(strict.accepts(&MessageEvent::from_parent("https://editor.test", Value::Null)));
        assert!(!strict.accepts(&MessageEvent::from_other("https://shop.test", Value::Null)));
    }

    #[test]
    fn test_parent_origin_from_referrer() {
        assert_eq!(
            parent_origin_from_referrer(Some("https://editor.lovivo.app/project/42?x=1")),
            Some("https://editor.lovivo.app".to_string())
        );
        assert_eq!(
            parent_origin_from_referrer(Some("http://localhost:5173/")),
            Some("http://localhost:5173".to_string())
        );
        assert_eq!(parent_origin_from_referrer(Some("not a url")), None);
        assert_eq!(parent_origin_from_referrer(Some("")), None);
        assert_eq!(parent_origin_from_referrer(None), None);
    }

    #[test]
    fn test_resolve_target_origin() {
        let mut config = BridgeConfig::new().with_parent_origin("https://editor.test");
        assert_eq!(resolve_target_origin(&mut config, Some("https://x.test/")), "https://editor.test");

        let mut config = BridgeConfig::new();
        assert_eq!(resolve_target_origin(&mut config, Some("https://x.test/a")), "https://x.test");
        assert_eq!(config.parent_origin.as_deref(), Some("https://x.test"));

        let mut config = BridgeConfig::new().with_auto_detect_parent(false);
        assert_eq!(resolve_target_origin(&mut config, Some("https://x.test/a")), "*");

        let mut config = BridgeConfig::new();
        assert_eq!(resolve_target_origin(&mut config, None), "*");
        assert_eq!(config.parent_origin, None);
    }

    proptest! {
        #[test]
        fn test_wildcard_matches_any_subdomain(label in "[a-z0-9]([a-z0-9-]{0,20}[a-z0-9])?(\\.[a-z0-9]{1,10}){0,2}") {
            let pattern = OriginPattern::compile("https://*.example.com").expect("pattern");
            let subdomain = format!("https://{label}.example.com");
            let attacker = format!("https://{label}.example.com.attacker.net");
            let lookalike = format!("https://{label}example.com");
            prop_assert!(pattern.matches(&subdomain));
            prop_assert!(!pattern.matches(&attacker));
            prop_assert!(!pattern.matches(&lookalike));
        }
    }
}
