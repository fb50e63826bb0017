//! Frame-synchronised detection coalescing.
//!
//! Pointer traffic from the host arrives far faster than the page paints.
//! [`DetectionGate`] holds at most two requests: the one the next animation
//! frame will process and one trailing request for the frame after. It is a
//! pair of slots, not a queue.
//!
//! # Slot Rules
//!
//! | Scheduled | Incoming | Result |
//! |-----------|----------|--------|
//! | empty | any | scheduled, frame requested |
//! | hover | any | replaces the scheduled request |
//! | click | click | trailing slot |
//! | click | hover | trailing slot, unless it holds a click |
//!
//! A scheduled click is never replaced and a trailing click is never
//! overwritten by a hover. Within a frame, hovers are additionally throttled
//! against the last detection; clicks never are.

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::FrameRequestId;
use crate::protocol::DetectAction;

// ============================================================================
// DetectRequest
// ============================================================================

/// One `DETECT` request in parent-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectRequest {
    /// Parent-window x.
    pub x: f64,
    /// Parent-window y.
    pub y: f64,
    /// Hover or click.
    pub action: DetectAction,
}

impl DetectRequest {
    /// Creates a request.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, action: DetectAction) -> Self {
        Self { x, y, action }
    }

    #[inline]
    fn is_click(&self) -> bool {
        self.action == DetectAction::Click
    }
}

// ============================================================================
// DetectionGate
// ============================================================================

/// Two-slot detection coalescer with a hover throttle.
#[derive(Debug, Clone, Default)]
pub struct DetectionGate {
    frame: Option<FrameRequestId>,
    scheduled: Option<DetectRequest>,
    trailing: Option<DetectRequest>,
    last_detection_ms: Option<f64>,
}

impl DetectionGate {
    /// Creates an idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a request.
    ///
    /// Returns `true` when the caller must request an animation frame and
    /// hand its id to [`DetectionGate::frame_requested`].
    pub fn submit(&mut self, request: DetectRequest) -> bool {
        match self.scheduled {
            None => {
                self.scheduled = Some(request);
                self.frame.is_none()
            }
            Some(scheduled) if !scheduled.is_click() => {
                self.scheduled = Some(request);
                false
            }
            Some(_) => {
                let trailing_click = self.trailing.is_some_and(|t| t.is_click());
                if request.is_click() || !trailing_click {
                    self.trailing = Some(request);
                }
                false
            }
        }
    }

    /// Records the id of the frame requested for the scheduled slot.
    #[inline]
    pub fn frame_requested(&mut self, id: FrameRequestId) {
        self.frame = Some(id);
    }

    /// Frame the gate is waiting for.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> Option<FrameRequestId> {
        self.frame
    }

    /// Starts frame `id`, returning the request to process.
    ///
    /// Returns `None` for frames the gate is not waiting for.
    pub fn begin_frame(&mut self, id: FrameRequestId) -> Option<DetectRequest> {
        if self.frame != Some(id) {
            return None;
        }
        self.frame = None;
        self.scheduled.take()
    }

    /// Moves the trailing request into the scheduled slot.
    ///
    /// Returns `true` when the caller must request another frame.
    pub fn promote_trailing(&mut self) -> bool {
        if self.scheduled.is_some() || self.frame.is_some() {
            return false;
        }
        self.scheduled = self.trailing.take();
        self.scheduled.is_some()
    }

    /// Drops both slots.
    ///
    /// Returns the frame to cancel, if one was requested.
    pub fn cancel(&mut self) -> Option<FrameRequestId> {
        self.scheduled = None;
        self.trailing = None;
        self.frame.take()
    }

    /// Returns `true` if a hover at `now_ms` falls inside the throttle window.
    ///
    /// Clicks are never throttled.
    #[must_use]
    pub fn is_throttled(&self, action: DetectAction, now_ms: f64, throttle_ms: u64) -> bool {
        if action == DetectAction::Click {
            return false;
        }
        self.last_detection_ms
            .is_some_and(|last| now_ms - last < throttle_ms as f64)
    }

    /// Marks a completed detection.
    #[inline]
    pub fn record_detection(&mut self, now_ms: f64) {
        self.last_detection_ms = Some(now_ms);
    }

    /// Request the next frame will process.
    #[inline]
    #[must_use]
    pub fn scheduled(&self) -> Option<DetectRequest> {
        self.scheduled
    }

    /// Request held for the frame after.
    #[inline]
    #[must_use]
    pub fn trailing(&self) -> Option<DetectRequest> {
        self.trailing
    }

    /// Returns `true` when nothing is scheduled or waiting.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.frame.is_none() && self.scheduled.is_none() && self.trailing.is_none()
    }
}

// ============================================================================
// Tests
// ============================================================================
