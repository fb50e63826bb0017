//! Inbound message routing and the error boundary.

use serde_json::Value;
use tracing::{debug, error, trace};

use crate::config::ConfigureOptions;
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::host::{HostWindow, MessageEvent};
use crate::overlay::OverlayKind;
use crate::preview::StylePatch;
use crate::protocol::inbound::{message_type, non_empty};
use crate::protocol::{BridgeMessage, HostMessage};
use crate::scheduler::DetectRequest;

use super::Bridge;

// ============================================================================
// Error Messages
// ============================================================================

const INVALID_PREVIEW: &str = "Invalid preview data: selector and styles required";
const APPLY_PREVIEW_FAILED: &str = "Failed to apply preview styles";
const REVERT_PREVIEW_FAILED: &str = "Failed to revert preview styles";
const INVALID_TEXT_PREVIEW: &str = "Invalid text preview data: selector and text required";
const TEXT_TARGET_MISSING: &str = "Element not found for text preview";
const NO_TEXT_PREVIEW: &str = "No text preview found to revert";
const ELEMENT_NOT_FOUND: &str = "Element not found";

/// Selector reported when a revert covers every preview.
const ALL: &str = "all";

// ============================================================================
// Bridge - Dispatch
// ============================================================================

impl<D: Document, W: HostWindow> Bridge<D, W> {
    /// `message` hook.
    ///
    /// Ignores anything without a string `type`, drops messages the origin
    /// guard rejects, and answers handler failures with `VISUAL_EDIT_ERROR`
    /// carrying the inbound type.
    pub fn handle_message(&mut self, event: MessageEvent) {
        let Some(message_type) = message_type(&event.data).map(str::to_string) else {
            return;
        };
        if !self.guard.accepts(&event) {
            return;
        }

        let message = match HostMessage::parse(&message_type, event.data) {
            Ok(Some(message)) => message,
            Ok(None) => {
                if self.config.debug {
                    trace!(%message_type, "Ignoring unknown message");
                }
                return;
            }
            Err(e) => {
                debug!(%message_type, error = %e, "Malformed message");
                self.send_dispatch_error(&message_type, &e);
                return;
            }
        };

        if self.config.debug {
            debug!(%message_type, origin = %event.origin, "Message received");
        }
        if let Err(e) = self.dispatch(message) {
            error!(%message_type, error = %e, "Error handling message");
            self.send_dispatch_error(&message_type, &e);
        }
    }

    fn send_dispatch_error(&mut self, message_type: &str, e: &Error) {
        self.send(BridgeMessage::Error {
            error: e.to_string(),
            selector: None,
            message_type: Some(message_type.to_string()),
            action: None,
        });
    }

    fn dispatch(&mut self, message: HostMessage) -> Result<()> {
        match message {
            HostMessage::Activate => self.activate(),
            HostMessage::Deactivate => self.deactivate(),
            HostMessage::DetectElement { x, y, action } => {
                self.submit_detection(DetectRequest::new(x, y, action));
            }
            HostMessage::Highlight { selector } => {
                if let Some(selector) = non_empty(selector.as_deref()) {
                    self.highlight_selector(selector)?;
                }
            }
            HostMessage::ClearHighlight => self.overlays.hide(&self.doc, OverlayKind::Hover),
            HostMessage::RequestInfo { selector } => self.request_info(&selector)?,
            HostMessage::ApplyPreview { selector, styles } => {
                self.apply_preview(selector.as_deref(), styles);
            }
            HostMessage::RevertPreview { selector } => self.revert_preview(selector.as_deref()),
            HostMessage::ApplyTextPreview { selector, text } => {
                self.apply_text_preview(selector.as_deref(), text);
            }
            HostMessage::RevertTextPreview { selector } => {
                self.revert_text_preview(selector.as_deref());
            }
            HostMessage::Configure(options) => self.configure(&options)?,
        }
        Ok(())
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    fn highlight_selector(&mut self, selector: &str) -> Result<()> {
        match self.doc.query_selector(selector)? {
            Some(element) => self.highlight(element),
            None => {
                self.send(BridgeMessage::selector_error(ELEMENT_NOT_FOUND, Some(selector)));
                Ok(())
            }
        }
    }

    fn request_info(&mut self, selector: &str) -> Result<()> {
        match self.doc.query_selector(selector)? {
            Some(element) => {
                let info = self.element_info(selector, element);
                self.send(BridgeMessage::ElementInfo(Box::new(info)));
            }
            None => {
                self.send(BridgeMessage::selector_error(ELEMENT_NOT_FOUND, Some(selector)));
            }
        }
        Ok(())
    }

    fn apply_preview(&mut self, selector: Option<&str>, styles: Option<Value>) {
        let (selector, patch) = match (non_empty(selector), styles) {
            (Some(selector), Some(Value::Object(map))) => (selector, StylePatch::from(map)),
            _ => {
                self.send(BridgeMessage::selector_error(INVALID_PREVIEW, selector));
                return;
            }
        };

        match self.previews.apply_style(&self.doc, selector, &patch) {
            Ok(applied_styles) => self.send(BridgeMessage::PreviewApplied {
                selector: selector.to_string(),
                applied_styles,
            }),
            Err(e) => {
                debug!(selector, error = %e, "Style preview failed");
                self.send(BridgeMessage::selector_error(APPLY_PREVIEW_FAILED, Some(selector)));
            }
        }
    }

    fn revert_preview(&mut self, selector: Option<&str>) {
        let Some(selector) = non_empty(selector) else {
            let reverted = self.previews.revert_all(&self.doc);
            debug!(reverted, "Reverted every preview");
            self.send(BridgeMessage::PreviewReverted {
                selector: ALL.to_string(),
            });
            return;
        };

        match self.previews.revert_style(&self.doc, selector) {
            Ok(true) => self.send(BridgeMessage::PreviewReverted {
                selector: selector.to_string(),
            }),
            Ok(false) => {
                self.send(BridgeMessage::selector_error(REVERT_PREVIEW_FAILED, Some(selector)));
            }
            Err(e) => {
                debug!(selector, error = %e, "Style revert failed");
                self.send(BridgeMessage::selector_error(REVERT_PREVIEW_FAILED, Some(selector)));
            }
        }
    }

    fn apply_text_preview(&mut self, selector: Option<&str>, text: Option<Value>) {
        let text = match text {
            Some(Value::String(text)) => Some(text),
            Some(Value::Null) => Some(String::new()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(Value::Array(_) | Value::Object(_)) | None => None,
        };
        let (Some(selector), Some(text)) = (non_empty(selector), text) else {
            self.send(BridgeMessage::selector_error(INVALID_TEXT_PREVIEW, selector));
            return;
        };

        match self.previews.apply_text(&self.doc, selector, &text) {
            Ok(original_text) => self.send(BridgeMessage::TextPreviewApplied {
                selector: selector.to_string(),
                text,
                original_text,
            }),
            Err(e) => {
                debug!(selector, error = %e, "Text preview failed");
                self.send(BridgeMessage::selector_error(TEXT_TARGET_MISSING, Some(selector)));
            }
        }
    }

    fn revert_text_preview(&mut self, selector: Option<&str>) {
        let Some(selector) = non_empty(selector) else {
            let reverted = self.previews.revert_all_text(&self.doc);
            debug!(reverted, "Reverted every text preview");
            self.send(BridgeMessage::TextPreviewReverted {
                selector: ALL.to_string(),
                restored_text: None,
            });
            return;
        };

        match self.previews.revert_text(&self.doc, selector) {
            Ok(Some(restored_text)) => self.send(BridgeMessage::TextPreviewReverted {
                selector: selector.to_string(),
                restored_text: Some(restored_text),
            }),
            Ok(None) => {
                self.send(BridgeMessage::selector_error(NO_TEXT_PREVIEW, Some(selector)));
            }
            Err(e) => {
                debug!(selector, error = %e, "Text revert failed");
                self.send(BridgeMessage::selector_error(NO_TEXT_PREVIEW, Some(selector)));
            }
        }
    }

    /// Merges a `CONFIGURE` payload; an invalid result is rolled back.
    fn configure(&mut self, options: &ConfigureOptions) -> Result<()> {
        let previous = self.config.clone();
        self.config.apply(options);
        if let Err(e) = self.config.validate() {
            self.config = previous;
            return Err(e);
        }
        self.reconfigure();
        debug!(
            allowed = self.guard.pattern_count(),
            strict = self.config.strict_origin_check,
            throttle_ms = self.config.hover_throttle_ms,
            debug = self.config.debug,
            "Configuration updated"
        );
        Ok(())
    }
}
