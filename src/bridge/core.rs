//! Core Bridge struct, install and lifecycle.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info};

use crate::classify::ClassificationPolicy;
use crate::config::BridgeConfig;
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::host::{EventKind, HostWindow, ListenerOptions, ListenerTarget, NativeEvent};
use crate::identifiers::ListenerId;
use crate::overlay::{OverlayKind, OverlayManager};
use crate::preview::PreviewEngine;
use crate::protocol::{BridgeMessage, Envelope, OriginGuard, resolve_target_origin};
use crate::scheduler::DetectionGate;
use crate::selector::{SelectorCache, SelectorGenerator, SelectorOptions};

use super::mode::Mode;

// ============================================================================
// Types
// ============================================================================

/// Scroll and resize listeners, registered on first highlight.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ViewportListeners {
    pub scroll: ListenerId,
    pub resize: ListenerId,
}

// ============================================================================
// Bridge
// ============================================================================

/// Bridge between a host editor and one embedded document.
pub struct Bridge<D: Document, W: HostWindow> {
    pub(crate) doc: D,
    pub(crate) window: W,
    pub(crate) config: BridgeConfig,
    pub(crate) guard: OriginGuard,
    pub(crate) generator: SelectorGenerator,
    pub(crate) cache: SelectorCache,
    pub(crate) overlays: OverlayManager,
    pub(crate) previews: PreviewEngine,
    pub(crate) gate: DetectionGate,
    pub(crate) mode: Mode,
    pub(crate) last_hovered: Option<String>,
    pub(crate) viewport_listeners: Option<ViewportListeners>,
    pub(crate) lifecycle_listeners: Vec<ListenerId>,
}

impl<D: Document, W: HostWindow> fmt::Debug for Bridge<D, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("active", &self.is_active())
            .field("previews", &self.previews.len())
            .field("last_hovered", &self.last_hovered)
            .finish_non_exhaustive()
    }
}

impl<D: Document, W: HostWindow> Bridge<D, W> {
    /// Installs the bridge with the platform configuration.
    ///
    /// Applies the platform allow-list, registers the `message` and
    /// `beforeunload` listeners and announces `VISUAL_EDIT_READY`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEmbedded`] in a top-level window.
    pub fn install(doc: D, window: W) -> Result<Self> {
        let config = BridgeConfig::for_platform(&window.hostname());
        Self::install_with_config(doc, window, config)
    }

    /// Installs the bridge with an explicit configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::NotEmbedded`] in a top-level window
    /// - [`Error::Config`] if `config` fails validation
    pub fn install_with_config(doc: D, window: W, config: BridgeConfig) -> Result<Self> {
        if window.is_top_level() {
            debug!("Not in an embedded frame, skipping install");
            return Err(Error::NotEmbedded);
        }
        config.validate()?;

        let guard = OriginGuard::new(&config, window.location_origin());
        let generator =
            SelectorGenerator::new(ClassificationPolicy::new(), SelectorOptions::from(&config));

        let lifecycle_listeners = vec![
            window.add_listener(ListenerTarget::Window, EventKind::Message, ListenerOptions::default()),
            window.add_listener(
                ListenerTarget::Window,
                EventKind::BeforeUnload,
                ListenerOptions::default(),
            ),
        ];

        let mut bridge = Self {
            doc,
            window,
            config,
            guard,
            generator,
            cache: SelectorCache::new(),
            overlays: OverlayManager::new(),
            previews: PreviewEngine::new(),
            gate: DetectionGate::new(),
            mode: Mode::Inactive,
            last_hovered: None,
            viewport_listeners: None,
            lifecycle_listeners,
        };

        bridge.send(BridgeMessage::ready());
        info!(
            origin = %bridge.window.location_origin(),
            allowed = bridge.guard.pattern_count(),
            debug = bridge.config.debug,
            "Visual edit bridge installed"
        );
        Ok(bridge)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The embedded document.
    #[inline]
    #[must_use]
    pub fn document(&self) -> &D {
        &self.doc
    }

    /// The embedding window.
    #[inline]
    #[must_use]
    pub fn window(&self) -> &W {
        &self.window
    }

    /// Current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns `true` while edit mode is on.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.mode, Mode::Active(_))
    }

    /// Overlay state.
    #[inline]
    #[must_use]
    pub fn overlays(&self) -> &OverlayManager {
        &self.overlays
    }

    /// Outstanding previews.
    #[inline]
    #[must_use]
    pub fn previews(&self) -> &PreviewEngine {
        &self.previews
    }

    /// Selector of the last hovered or clicked element.
    #[inline]
    #[must_use]
    pub fn last_hovered(&self) -> Option<&str> {
        self.last_hovered.as_deref()
    }

    /// Number of memoized selectors.
    #[inline]
    #[must_use]
    pub fn cached_selectors(&self) -> usize {
        self.cache.len()
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Posts a message to the parent window.
    ///
    /// Delivery is fire-and-forget; failures are logged.
    pub(crate) fn send(&mut self, message: BridgeMessage) {
        let referrer = self.window.referrer();
        let target_origin = resolve_target_origin(&mut self.config, referrer.as_deref());
        let message_type = message.message_type();

        let posted = Envelope::new(message, epoch_ms())
            .to_value()
            .and_then(|value| self.window.post_to_parent(value, &target_origin));

        match posted {
            Ok(()) => {
                if self.config.debug {
                    debug!(message_type, %target_origin, "Message sent");
                }
            }
            Err(e) => error!(message_type, error = %e, "Error sending message"),
        }
    }

    /// Rebuilds the pieces derived from the configuration.
    pub(crate) fn reconfigure(&mut self) {
        self.guard = OriginGuard::new(&self.config, self.window.location_origin());
        self.generator.set_options(SelectorOptions::from(&self.config));
    }

    // ========================================================================
    // Host Events
    // ========================================================================

    /// Capture-phase interaction hook.
    ///
    /// While active, blocked interaction kinds are cancelled and stopped.
    /// Returns `true` if the event was suppressed.
    pub fn handle_native_event(&self, event: &mut NativeEvent) -> bool {
        if !self.is_active() || !event.kind.is_blocked() {
            return false;
        }
        event.prevent_default();
        event.stop_propagation();
        event.stop_immediate_propagation();
        true
    }

    /// `scroll` hook: clears both overlays and tells the host.
    ///
    /// Does nothing before the first highlight registered the listener.
    pub fn handle_scroll(&mut self) {
        if self.viewport_listeners.is_none() {
            return;
        }
        self.send(BridgeMessage::ScrollDetected);
        self.overlays.hide(&self.doc, OverlayKind::Hover);
        self.overlays.hide(&self.doc, OverlayKind::Selection);
    }

    /// `resize` hook: re-syncs visible overlays to their targets.
    pub fn handle_resize(&mut self) {
        if self.viewport_listeners.is_none() {
            return;
        }
        if let Err(e) = self.overlays.reposition(&self.doc) {
            error!(error = %e, "Error repositioning overlays");
        }
    }

    /// `beforeunload` hook.
    ///
    /// Deactivates, reverts every preview, removes the overlays and all
    /// listeners, and clears the selector cache.
    pub fn unload(&mut self) {
        self.deactivate();
        self.previews.revert_all(&self.doc);
        self.overlays.remove_all(&self.doc);

        if let Some(listeners) = self.viewport_listeners.take() {
            self.window.remove_listener(listeners.scroll);
            self.window.remove_listener(listeners.resize);
        }
        for id in self.lifecycle_listeners.drain(..) {
            self.window.remove_listener(id);
        }

        self.cache.clear();
        self.last_hovered = None;
        debug!("Visual edit bridge unloaded");
    }

    /// Registers the scroll and resize listeners once.
    pub(crate) fn ensure_viewport_listeners(&mut self) {
        if self.viewport_listeners.is_some() {
            return;
        }
        let scroll = self.window.add_listener(
            ListenerTarget::Window,
            EventKind::Scroll,
            ListenerOptions {
                capture: true,
                passive: true,
            },
        );
        let resize = self.window.add_listener(
            ListenerTarget::Window,
            EventKind::Resize,
            ListenerOptions::PASSIVE,
        );
        self.viewport_listeners = Some(ViewportListeners { scroll, resize });
    }
}

/// Milliseconds since the Unix epoch.
fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
