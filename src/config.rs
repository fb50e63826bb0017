//! Bridge configuration.
//!
//! [`BridgeConfig`] holds every tunable knob. It starts from
//! [`BridgeConfig::default`], receives the platform allow-list on install
//! via [`BridgeConfig::for_platform`], and is updated at runtime by
//! `VISUAL_EDIT_CONFIGURE` messages, whose payload deserializes into
//! [`ConfigureOptions`].
//!
//! # Example
//!
//! ```
//! use visual_edit_bridge::BridgeConfig;
//!
//! let config = BridgeConfig::new()
//!     .with_allowed_origins(["https://*.example.com"])
//!     .with_strict_origin_check(true)
//!     .with_hover_throttle_ms(30);
//!
//! assert!(config.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default selector-generation deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default path search depth.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Default minimum interval between hover detections in milliseconds.
pub const DEFAULT_HOVER_THROTTLE_MS: u64 = 50;

/// Origins the platform's own editor is served from.
pub const PLATFORM_ORIGINS: [&str; 10] = [
    "https://*.lovable.app",
    "https://lovable.app",
    "https://*.lovableproject.com",
    "https://lovableproject.com",
    "https://*.lovivo.app",
    "https://lovivo.app",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

// ============================================================================
// BridgeConfig
// ============================================================================

/// Runtime configuration of a bridge instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Selector-generation deadline in milliseconds.
    pub timeout_ms: u64,
    /// Maximum ancestors walked when building a path selector.
    pub max_depth: usize,
    /// Try `data-*` attribute selectors before class selectors.
    pub prefer_data_attributes: bool,
    /// Minimum interval between hover detections in milliseconds.
    pub hover_throttle_ms: u64,
    /// Origin patterns allowed to send messages.
    pub allowed_origins: Vec<String>,
    /// Reject same-origin senders when no allow-list is set.
    pub strict_origin_check: bool,
    /// Explicit target origin for outbound messages.
    pub parent_origin: Option<String>,
    /// Derive the target origin from `document.referrer`.
    pub auto_detect_parent: bool,
    /// Emit diagnostic logging.
    pub debug: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeConfig {
    /// Creates a configuration with default values and an empty allow-list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_depth: DEFAULT_MAX_DEPTH,
            prefer_data_attributes: true,
            hover_throttle_ms: DEFAULT_HOVER_THROTTLE_MS,
            allowed_origins: Vec::new(),
            strict_origin_check: false,
            parent_origin: None,
            auto_detect_parent: true,
            debug: false,
        }
    }

    /// Configuration applied on install: platform allow-list, non-strict,
    /// auto-detected parent, debug on for development hosts.
    #[must_use]
    pub fn for_platform(hostname: &str) -> Self {
        Self {
            allowed_origins: PLATFORM_ORIGINS.iter().map(|origin| (*origin).to_string()).collect(),
            debug: is_development_host(hostname),
            ..Self::new()
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `timeout_ms` or `max_depth` is zero, or an
    /// explicit parent origin is empty.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::config("timeoutMs must be greater than zero"));
        }
        if self.max_depth == 0 {
            return Err(Error::config("maxDepth must be at least 1"));
        }
        if self.parent_origin.as_deref().is_some_and(str::is_empty) {
            return Err(Error::config("parentOrigin must not be empty"));
        }
        Ok(())
    }

    /// Merges a `CONFIGURE` payload into this configuration.
    ///
    /// Absent keys leave the current value untouched; `parentOrigin: null`
    /// clears the explicit parent origin.
    pub fn apply(&mut self, options: &ConfigureOptions) {
        if let Some(parent_origin) = &options.parent_origin {
            self.parent_origin.clone_from(parent_origin);
        }
        if let Some(allowed) = &options.allowed_origins {
            self.allowed_origins.clone_from(allowed);
        }
        if let Some(strict) = options.strict_origin_check {
            self.strict_origin_check = strict;
        }
        if let Some(auto_detect) = options.auto_detect_parent {
            self.auto_detect_parent = auto_detect;
        }
        if let Some(debug) = options.enable_debug {
            self.debug = debug;
        }
        if let Some(throttle) = options.hover_throttle_ms {
            self.hover_throttle_ms = throttle;
        }
        if let Some(timeout) = options.selector_timeout_ms {
            self.timeout_ms = timeout;
        }
        if let Some(depth) = options.max_depth {
            self.max_depth = depth;
        }
        if let Some(prefer) = options.prefer_data_attributes {
            self.prefer_data_attributes = prefer;
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeConfig {
    /// Sets the selector-generation deadline.
    #[inline]
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the path search depth.
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enables or disables `data-*` attribute selectors.
    #[inline]
    #[must_use]
    pub fn with_prefer_data_attributes(mut self, prefer: bool) -> Self {
        self.prefer_data_attributes = prefer;
        self
    }

    /// Sets the hover throttle interval.
    #[inline]
    #[must_use]
    pub fn with_hover_throttle_ms(mut self, throttle_ms: u64) -> Self {
        self.hover_throttle_ms = throttle_ms;
        self
    }

    /// Replaces the origin allow-list.
    #[must_use]
    pub fn with_allowed_origins(
        mut self,
        origins: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables strict origin checking.
    #[inline]
    #[must_use]
    pub fn with_strict_origin_check(mut self, strict: bool) -> Self {
        self.strict_origin_check = strict;
        self
    }

    /// Sets an explicit parent origin.
    #[inline]
    #[must_use]
    pub fn with_parent_origin(mut self, origin: impl Into<String>) -> Self {
        self.parent_origin = Some(origin.into());
        self
    }

    /// Enables or disables referrer-based parent detection.
    #[inline]
    #[must_use]
    pub fn with_auto_detect_parent(mut self, auto_detect: bool) -> Self {
        self.auto_detect_parent = auto_detect;
        self
    }

    /// Enables or disables diagnostic logging.
    #[inline]
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

// ============================================================================
// ConfigureOptions
// ============================================================================

/// Payload of a `VISUAL_EDIT_CONFIGURE` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureOptions {
    /// `Some(None)` when the key is present and `null`.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_origin: Option<Option<String>>,
    /// Replacement allow-list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    /// Strict origin checking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_origin_check: Option<bool>,
    /// Referrer-based parent detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_detect_parent: Option<bool>,
    /// Diagnostic logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_debug: Option<bool>,
    /// Hover throttle interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover_throttle_ms: Option<u64>,
    /// Selector-generation deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_timeout_ms: Option<u64>,
    /// Path search depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// `data-*` attribute selectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_data_attributes: Option<bool>,
}

fn present_or_null<'de, D>(deserializer: D) -> StdResult<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns `true` for local and preview hosts where debug logging is on by
/// default.
#[must_use]
pub fn is_development_host(hostname: &str) -> bool {
    hostname == "localhost"
        || hostname == "127.0.0.1"
        || hostname.contains("lovableproject.com")
        || hostname.contains("lovable.app")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.timeout_ms, 1000);
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.hover_throttle_ms, 50);
        assert!(config.prefer_data_attributes);
        assert!(config.auto_detect_parent);
        assert!(!config.strict_origin_check);
        assert!(config.allowed_origins.is_empty());
        assert!(config.parent_origin.is_none());
        assert!(!config.debug);
    }

    #[test]
    fn test_platform_defaults() {
        let config = BridgeConfig::for_platform("abc.lovableproject.com");
        assert_eq!(config.allowed_origins.len(), 10);
        assert_eq!(config.allowed_origins[0], "https://*.lovable.app");
        assert!(config.debug);

        let config = BridgeConfig::for_platform("shop.example.com");
        assert!(!config.debug);
    }

    #[test]
    fn test_is_development_host() {
        assert!(is_development_host("localhost"));
        assert!(is_development_host("127.0.0.1"));
        assert!(is_development_host("preview.lovable.app"));
        assert!(!is_development_host("lovivo.app"));
    }

    #[test]
    fn test_validate() {
        assert!(BridgeConfig::new().validate().is_ok());
        assert!(BridgeConfig::new().with_max_depth(0).validate().is_err());
        assert!(BridgeConfig::new().with_timeout_ms(0).validate().is_err());
        assert!(BridgeConfig::new().with_parent_origin("").validate().is_err());
    }

    #[test]
    fn test_parent_origin_absent_vs_null() {
        let absent: ConfigureOptions = serde_json::from_value(json!({})).expect("parse");
        assert_eq!(absent.parent_origin, None);

        let null: ConfigureOptions =
            serde_json::from_value(json!({"parentOrigin": null})).expect("parse");
        assert_eq!(null.parent_origin, Some(None));

        let set: ConfigureOptions =
            serde_json::from_value(json!({"parentOrigin": "https://lovable.app"})).expect("parse");
        assert_eq!(set.parent_origin, Some(Some("https://lovable.app".to_string())));
    }

    #[test]
    fn test_apply_merges_present_keys() {
        let mut config = BridgeConfig::new().with_parent_origin("https://lovable.app");
        let options: ConfigureOptions = serde_json::from_value(json!({
            "allowedOrigins": ["https://*.example.com"],
            "strictOriginCheck": true,
            "enableDebug": true,
            "hoverThrottleMs": 20,
        }))
        .expect("parse");

        config.apply(&options);
        assert_eq!(config.allowed_origins, vec!["https://*.example.com"]);
        assert!(config.strict_origin_check);
        assert!(config.debug);
        assert_eq!(config.hover_throttle_ms, 20);
        assert_eq!(config.parent_origin.as_deref(), Some("https://lovable.app"));

        let clear: ConfigureOptions =
            serde_json::from_value(json!({"parentOrigin": null})).expect("parse");
        config.apply(&clear);
        assert!(config.parent_origin.is_none());
    }
}
