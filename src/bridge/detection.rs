//! Frame-coalesced element detection and highlighting.

use tracing::{debug, trace};

use crate::detector::{ElementDetector, translate_coordinates};
use crate::dom::Document;
use crate::error::Result;
use crate::host::HostWindow;
use crate::identifiers::{FrameRequestId, NodeId};
use crate::overlay::OverlayKind;
use crate::protocol::{BridgeMessage, DetectAction};
use crate::scheduler::DetectRequest;

use super::Bridge;

// ============================================================================
// Constants
// ============================================================================

/// Attributes carrying a source-mapped component id, in lookup order.
const COMPONENT_ID_ATTRIBUTES: [&str; 2] = ["data-lov-id", "data-component-id"];

// ============================================================================
// Bridge - Detection
// ============================================================================

impl<D: Document, W: HostWindow> Bridge<D, W> {
    /// Queues a detection for the next animation frame.
    pub(crate) fn submit_detection(&mut self, request: DetectRequest) {
        if self.gate.submit(request) {
            let frame = self.window.request_animation_frame();
            self.gate.frame_requested(frame);
        }
    }

    /// Animation frame the bridge is waiting for.
    #[inline]
    #[must_use]
    pub fn scheduled_frame(&self) -> Option<FrameRequestId> {
        self.gate.frame()
    }

    /// Animation-frame callback.
    ///
    /// Processes the scheduled detection unless it is a hover inside the
    /// throttle window, then schedules the trailing request if there is one.
    /// Returns `true` if a detection ran. Frames the bridge did not request
    /// are ignored.
    pub fn run_animation_frame(&mut self, frame: FrameRequestId) -> bool {
        let Some(request) = self.gate.begin_frame(frame) else {
            return false;
        };

        let now = self.window.now_ms();
        let ran = if self
            .gate
            .is_throttled(request.action, now, self.config.hover_throttle_ms)
        {
            if self.config.debug {
                trace!(x = request.x, y = request.y, "Hover throttled");
            }
            false
        } else {
            self.gate.record_detection(now);
            if let Err(e) = self.detect(request) {
                debug!(action = %request.action, error = %e, "Error detecting element");
                self.send(BridgeMessage::Error {
                    error: e.to_string(),
                    selector: None,
                    message_type: None,
                    action: Some(request.action),
                });
            }
            true
        };

        if self.gate.promote_trailing() {
            let frame = self.window.request_animation_frame();
            self.gate.frame_requested(frame);
        }
        ran
    }

    fn detect(&mut self, request: DetectRequest) -> Result<()> {
        let (x, y) = translate_coordinates(&self.window, request.x, request.y);
        let excluded = self.overlays.nodes();

        let element = ElementDetector::new(self.generator.policy(), self.config.debug)
            .detect_at(&self.doc, &excluded, x, y);
        let detected = element.and_then(|element| {
            self.generator
                .generate(&self.doc, &self.window, &mut self.cache, element)
                .map(|selector| (element, selector))
        });

        let Some((element, selector)) = detected else {
            self.report_nothing(request.action);
            return Ok(());
        };

        match request.action {
            DetectAction::Hover => {
                if self.last_hovered.as_deref() == Some(selector.as_str()) {
                    if self.config.debug {
                        trace!(%selector, "Hover unchanged");
                    }
                    return Ok(());
                }
                self.last_hovered = Some(selector.clone());
                self.highlight(element)?;

                let component_id = self.component_id(element);
                let analysis = self
                    .generator
                    .policy()
                    .analyze_component(component_id.as_deref());
                if self.config.debug {
                    debug!(%selector, "Hover changed");
                }
                self.send(BridgeMessage::hovered(selector, component_id, analysis));
            }
            DetectAction::Click => {
                self.last_hovered = Some(selector.clone());
                self.select(element)?;

                let component_id = self.component_id(element);
                let analysis = self
                    .generator
                    .policy()
                    .analyze_component(component_id.as_deref());
                if self.config.debug {
                    debug!(%selector, "Click");
                }
                self.send(BridgeMessage::clicked(selector, component_id, analysis));
            }
        }
        Ok(())
    }

    /// Nothing usable under the pointer.
    ///
    /// Hovers only report the transition away from an element; clicks
    /// always report.
    fn report_nothing(&mut self, action: DetectAction) {
        let was_hovering = self.last_hovered.take().is_some();
        if was_hovering || action == DetectAction::Click {
            self.send(BridgeMessage::NoElement { action });
        }
        self.overlays.hide(&self.doc, OverlayKind::Hover);
    }

    /// Shows the hover box over `element`.
    pub(crate) fn highlight(&mut self, element: NodeId) -> Result<()> {
        self.overlays.show(&self.doc, OverlayKind::Hover, element)?;
        self.ensure_viewport_listeners();
        Ok(())
    }

    /// Shows the selection box over `element`.
    pub(crate) fn select(&mut self, element: NodeId) -> Result<()> {
        self.overlays.show(&self.doc, OverlayKind::Selection, element)?;
        self.ensure_viewport_listeners();
        Ok(())
    }

    /// First non-empty component id attribute.
    pub(crate) fn component_id(&self, element: NodeId) -> Option<String> {
        COMPONENT_ID_ATTRIBUTES
            .iter()
            .filter_map(|name| self.doc.attribute(element, name))
            .find(|value| !value.is_empty())
    }
}
