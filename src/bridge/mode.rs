//! Edit-mode activation and deactivation.

use tracing::{debug, info, warn};

use crate::dom::Document;
use crate::host::{EventKind, HostWindow, ListenerOptions, ListenerTarget};
use crate::identifiers::ListenerId;
use crate::overlay::OverlayKind;
use crate::preview::StyleSnapshot;
use crate::protocol::BridgeMessage;

use super::Bridge;

// ============================================================================
// Constants
// ============================================================================

/// Class added to `<body>` while edit mode is on.
pub(crate) const ACTIVE_BODY_CLASS: &str = "lovivo-visual-edit-active";

// ============================================================================
// Mode
// ============================================================================

/// Edit mode.
#[derive(Debug, Clone, Default)]
pub(crate) enum Mode {
    #[default]
    Inactive,
    Active(ActiveMode),
}

/// What activation changed, so deactivation can undo exactly that.
#[derive(Debug, Clone)]
pub(crate) struct ActiveMode {
    listeners: Vec<ListenerId>,
    cursor: Option<StyleSnapshot>,
    user_select: Option<StyleSnapshot>,
}

// ============================================================================
// Bridge - Mode
// ============================================================================

impl<D: Document, W: HostWindow> Bridge<D, W> {
    /// Enters edit mode.
    ///
    /// Registers capture-phase, non-passive listeners for every blocked
    /// interaction kind, sets a crosshair cursor, disables text selection,
    /// marks `<body>` and acknowledges with `VISUAL_EDIT_READY {active}`.
    /// Does nothing when already active.
    pub fn activate(&mut self) {
        if self.is_active() {
            debug!("Already active");
            return;
        }

        let listeners = EventKind::BLOCKED
            .iter()
            .map(|&kind| {
                self.window
                    .add_listener(ListenerTarget::Document, kind, ListenerOptions::CAPTURE_ACTIVE)
            })
            .collect();

        let body = self.doc.body();
        let (cursor, user_select) = match body {
            Some(body) => {
                let cursor = StyleSnapshot::capture(&self.doc, body, "cursor");
                let user_select = StyleSnapshot::capture(&self.doc, body, "user-select");
                if let Err(e) = self
                    .doc
                    .set_style_property(body, "cursor", "crosshair", false)
                    .and_then(|()| self.doc.set_style_property(body, "user-select", "none", false))
                {
                    warn!(error = %e, "Could not style body");
                }
                self.doc.add_class(body, ACTIVE_BODY_CLASS);
                (Some(cursor), Some(user_select))
            }
            None => (None, None),
        };

        self.mode = Mode::Active(ActiveMode {
            listeners,
            cursor,
            user_select,
        });

        info!("Visual edit mode activated");
        self.send(BridgeMessage::Activated { active: true });
    }

    /// Leaves edit mode.
    ///
    /// Removes the interaction listeners, restores the body's cursor and
    /// selection styles, hides both overlays, cancels the pending animation
    /// frame, drops queued detections and reverts every preview. Sends
    /// nothing. Does nothing when inactive.
    pub fn deactivate(&mut self) {
        let Mode::Active(active) = std::mem::take(&mut self.mode) else {
            return;
        };

        for id in active.listeners {
            self.window.remove_listener(id);
        }

        if let Some(body) = self.doc.body() {
            for snapshot in [active.cursor, active.user_select].into_iter().flatten() {
                if let Err(e) = snapshot.restore(&self.doc, body) {
                    warn!(property = %snapshot.property, error = %e, "Could not restore body style");
                }
            }
            self.doc.remove_class(body, ACTIVE_BODY_CLASS);
        }

        self.overlays.hide(&self.doc, OverlayKind::Hover);
        self.overlays.hide(&self.doc, OverlayKind::Selection);

        if let Some(frame) = self.gate.cancel() {
            self.window.cancel_animation_frame(frame);
        }

        let reverted = self.previews.revert_all(&self.doc);
        info!(reverted, "Visual edit mode deactivated");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::bridge::Bridge;
    use crate::config::BridgeConfig;
    use crate::dom::{Document, MemoryDocument};
    use crate::host::{EventKind, MemoryWindow, MessageEvent, NativeEvent};

    use super::ACTIVE_BODY_CLASS;

    fn bridge() -> Bridge<MemoryDocument, MemoryWindow> {
        let doc = MemoryDocument::new();
        let (window, _parent) = MemoryWindow::new("https://shop.test/").expect("window");
        Bridge::install_with_config(doc, window, BridgeConfig::new()).expect("install")
    }

    fn activate(bridge: &mut Bridge<MemoryDocument, MemoryWindow>) {
        bridge.handle_message(MessageEvent::from_parent(
            "https://editor.test",
            json!({ "type": "VISUAL_EDIT_MODE_ACTIVATE" }),
        ));
    }

    #[test]
    fn test_activate_is_idempotent() {
        let mut bridge = bridge();
        activate(&mut bridge);
        activate(&mut bridge);

        assert!(bridge.is_active());
        assert_eq!(bridge.window().capture_listener_count(), EventKind::BLOCKED.len());

        let body = bridge.document().body().expect("body");
        assert_eq!(bridge.document().style_property(body, "cursor"), "crosshair");
        assert_eq!(bridge.document().style_property(body, "user-select"), "none");
        assert!(bridge.document().class_list(body).contains(&ACTIVE_BODY_CLASS.to_string()));
    }

    #[test]
    fn test_deactivate_restores_body() {
        let mut bridge = bridge();
        let body = bridge.document().body().expect("body");
        bridge
            .document()
            .set_style_property(body, "cursor", "pointer", false)
            .expect("style");

        activate(&mut bridge);
        bridge.deactivate();
        bridge.deactivate();

        assert!(!bridge.is_active());
        assert_eq!(bridge.window().capture_listener_count(), 0);
        assert_eq!(bridge.document().style_property(body, "cursor"), "pointer");
        assert_eq!(bridge.document().style_property(body, "user-select"), "");
        assert!(bridge.document().class_list(body).is_empty());
    }

    #[test]
    fn test_native_events_blocked_only_while_active() {
        let mut bridge = bridge();
        let mut click = NativeEvent::new(EventKind::Click, None);
        assert!(!bridge.handle_native_event(&mut click));
        assert!(!click.default_prevented());

        activate(&mut bridge);
        let mut click = NativeEvent::new(EventKind::Click, None);
        assert!(bridge.handle_native_event(&mut click));
        assert!(click.default_prevented());
        assert!(click.propagation_stopped());
        assert!(click.immediate_propagation_stopped());

        let mut scroll = NativeEvent::new(EventKind::Scroll, None);
        assert!(!bridge.handle_native_event(&mut scroll));
    }
}
