//! In-memory host window.
//!
//! Records listeners and animation-frame requests, keeps a controllable
//! clock, and forwards every message posted to the parent into a tokio
//! channel so a test (or an embedding event loop) can observe the bridge's
//! output.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;
use url::Url;

use crate::dom::Rect;
use crate::error::{Error, Result};
use crate::identifiers::{FrameRequestId, ListenerId};

use super::{Clock, EventKind, HostWindow, ListenerOptions, ListenerTarget};

// ============================================================================
// Constants
// ============================================================================

/// Default viewport size.
const DEFAULT_VIEWPORT: (f64, f64) = (1280.0, 800.0);

// ============================================================================
// Types
// ============================================================================

/// A message delivered to the parent window.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    /// `targetOrigin` argument of `postMessage`.
    pub target_origin: String,
    /// Message body.
    pub payload: Value,
}

impl PostedMessage {
    /// The `type` field of the payload, if any.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }
}

/// A registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerRecord {
    /// Listener handle.
    pub id: ListenerId,
    /// Object the listener is attached to.
    pub target: ListenerTarget,
    /// Event type.
    pub kind: EventKind,
    /// Registration options.
    pub options: ListenerOptions,
}

#[derive(Debug, Clone, Copy)]
enum ClockSource {
    Manual(f64),
    Tokio(Instant),
}

#[derive(Debug)]
struct WindowState {
    top_level: bool,
    frame_rect: Option<Rect>,
    scroll: (f64, f64),
    viewport: (f64, f64),
    referrer: Option<String>,
    origin: String,
    hostname: String,
    clock: ClockSource,
    listeners: FxHashMap<ListenerId, ListenerRecord>,
    next_listener: u64,
    frames: Vec<FrameRequestId>,
    next_frame: u64,
}

// ============================================================================
// MemoryWindow
// ============================================================================

/// Recording [`HostWindow`] implementation.
///
/// Cloning is cheap; all clones share state and the outbound channel.
#[derive(Debug, Clone)]
pub struct MemoryWindow {
    state: Arc<Mutex<WindowState>>,
    outbound: mpsc::UnboundedSender<PostedMessage>,
}

impl MemoryWindow {
    /// Creates an embedded (non top-level) window for a document at `url`.
    ///
    /// Returns the window and the receiving end of its parent channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `url` cannot be parsed.
    pub fn new(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<PostedMessage>)> {
        let parsed = Url::parse(url)?;
        let (outbound, inbound) = mpsc::unbounded_channel();

        let state = WindowState {
            top_level: false,
            frame_rect: None,
            scroll: (0.0, 0.0),
            viewport: DEFAULT_VIEWPORT,
            referrer: None,
            origin: parsed.origin().ascii_serialization(),
            hostname: parsed.host_str().unwrap_or_default().to_string(),
            clock: ClockSource::Manual(0.0),
            listeners: FxHashMap::default(),
            next_listener: 1,
            frames: Vec::new(),
            next_frame: 1,
        };

        let window = Self {
            state: Arc::new(Mutex::new(state)),
            outbound,
        };
        Ok((window, inbound))
    }

    // ------------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------------

    /// Marks the window as the top-level browsing context.
    #[must_use]
    pub fn with_top_level(self, top_level: bool) -> Self {
        self.state.lock().top_level = top_level;
        self
    }

    /// Sets the hosting frame's rect in parent coordinates.
    #[must_use]
    pub fn with_frame_rect(self, rect: Rect) -> Self {
        self.state.lock().frame_rect = Some(rect);
        self
    }

    /// Sets `document.referrer`.
    #[must_use]
    pub fn with_referrer(self, referrer: impl Into<String>) -> Self {
        self.state.lock().referrer = Some(referrer.into());
        self
    }

    /// Sets the viewport size.
    #[must_use]
    pub fn with_viewport(self, width: f64, height: f64) -> Self {
        self.state.lock().viewport = (width, height);
        self
    }

    /// Drives the clock from `tokio::time` instead of manual advancement.
    ///
    /// Works with paused time in tests.
    #[must_use]
    pub fn with_tokio_clock(self) -> Self {
        self.state.lock().clock = ClockSource::Tokio(Instant::now());
        self
    }

    // ------------------------------------------------------------------------
    // Controls
    // ------------------------------------------------------------------------

    /// Advances a manual clock.
    pub fn advance(&self, ms: f64) {
        let mut state = self.state.lock();
        if let ClockSource::Manual(now) = &mut state.clock {
            *now += ms;
        }
    }

    /// Sets the scroll offset.
    pub fn set_scroll(&self, x: f64, y: f64) {
        self.state.lock().scroll = (x, y);
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// All registered listeners.
    #[must_use]
    pub fn listeners(&self) -> Vec<ListenerRecord> {
        let mut records: Vec<_> = self.state.lock().listeners.values().copied().collect();
        records.sort_by_key(|record| record.id.as_u64());
        records
    }

    /// Number of capture-phase listeners currently registered.
    #[must_use]
    pub fn capture_listener_count(&self) -> usize {
        self.state
            .lock()
            .listeners
            .values()
            .filter(|record| record.options.capture)
            .count()
    }

    /// Returns `true` if a listener for `kind` is registered on `target`.
    #[must_use]
    pub fn has_listener(&self, target: ListenerTarget, kind: EventKind) -> bool {
        self.state
            .lock()
            .listeners
            .values()
            .any(|record| record.target == target && record.kind == kind)
    }

    /// Outstanding animation-frame requests.
    #[must_use]
    pub fn pending_frames(&self) -> Vec<FrameRequestId> {
        self.state.lock().frames.clone()
    }

    /// Removes and returns outstanding frame requests, as the browser does
    /// when it starts running a frame.
    pub fn take_frames(&self) -> Vec<FrameRequestId> {
        std::mem::take(&mut self.state.lock().frames)
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl Clock for MemoryWindow {
    fn now_ms(&self) -> f64 {
        match self.state.lock().clock {
            ClockSource::Manual(now) => now,
            ClockSource::Tokio(start) => start.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

impl HostWindow for MemoryWindow {
    fn is_top_level(&self) -> bool {
        self.state.lock().top_level
    }

    fn frame_element_rect(&self) -> Option<Rect> {
        let state = self.state.lock();
        if state.top_level {
            return None;
        }
        state.frame_rect
    }

    fn scroll_offset(&self) -> (f64, f64) {
        self.state.lock().scroll
    }

    fn viewport_size(&self) -> (f64, f64) {
        self.state.lock().viewport
    }

    fn referrer(&self) -> Option<String> {
        self.state
            .lock()
            .referrer
            .clone()
            .filter(|referrer| !referrer.is_empty())
    }

    fn location_origin(&self) -> String {
        self.state.lock().origin.clone()
    }

    fn hostname(&self) -> String {
        self.state.lock().hostname.clone()
    }

    fn add_listener(
        &self,
        target: ListenerTarget,
        kind: EventKind,
        options: ListenerOptions,
    ) -> ListenerId {
        let mut state = self.state.lock();
        let id = ListenerId::new(state.next_listener);
        state.next_listener += 1;
        state.listeners.insert(
            id,
            ListenerRecord {
                id,
                target,
                kind,
                options,
            },
        );
        trace!(%id, %kind, "Listener added");
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        if self.state.lock().listeners.remove(&id).is_some() {
            trace!(%id, "Listener removed");
        }
    }

    fn request_animation_frame(&self) -> FrameRequestId {
        let mut state = self.state.lock();
        let id = FrameRequestId::new(state.next_frame);
        state.next_frame += 1;
        state.frames.push(id);
        id
    }

    fn cancel_animation_frame(&self, id: FrameRequestId) {
        self.state.lock().frames.retain(|&frame| frame != id);
    }

    fn post_to_parent(&self, message: Value, target_origin: &str) -> Result<()> {
        self.outbound
            .send(PostedMessage {
                target_origin: target_origin.to_string(),
                payload: message,
            })
            .map_err(|_| Error::ChannelClosed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_origin_and_hostname_from_url() {
        let (window, _rx) = MemoryWindow::new("https://shop.lovivo.app/products/1").expect("window");
        assert_eq!(window.location_origin(), "https://shop.lovivo.app");
        assert_eq!(window.hostname(), "shop.lovivo.app");
        assert!(!window.is_top_level());
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(MemoryWindow::new("not a url"), Err(Error::Url(_))));
    }

    #[test]
    fn test_manual_clock() {
        let (window, _rx) = MemoryWindow::new("http://localhost:5173/").expect("window");
        assert_eq!(window.now_ms(), 0.0);
        window.advance(16.0);
        window.advance(4.5);
        assert_eq!(window.now_ms(), 20.5);
    }

    #[test]
    fn test_listener_bookkeeping() {
        let (window, _rx) = MemoryWindow::new("http://localhost:5173/").expect("window");
        let click = window.add_listener(
            ListenerTarget::Document,
            EventKind::Click,
            ListenerOptions::CAPTURE_ACTIVE,
        );
        window.add_listener(
            ListenerTarget::Window,
            EventKind::Scroll,
            ListenerOptions::PASSIVE,
        );

        assert_eq!(window.listeners().len(), 2);
        assert_eq!(window.capture_listener_count(), 1);
        assert!(window.has_listener(ListenerTarget::Document, EventKind::Click));

        window.remove_listener(click);
        window.remove_listener(click);
        assert_eq!(window.capture_listener_count(), 0);
    }

    #[test]
    fn test_animation_frames() {
        let (window, _rx) = MemoryWindow::new("http://localhost:5173/").expect("window");
        let first = window.request_animation_frame();
        let second = window.request_animation_frame();
        window.cancel_animation_frame(first);
        assert_eq!(window.pending_frames(), vec![second]);
        assert_eq!(window.take_frames(), vec![second]);
        assert!(window.pending_frames().is_empty());
    }

    #[test]
    fn test_frame_rect_hidden_when_top_level() {
        let (window, _rx) = MemoryWindow::new("http://localhost:5173/").expect("window");
        let window = window.with_frame_rect(Rect::new(100.0, 50.0, 800.0, 600.0));
        assert!(window.frame_element_rect().is_some());
        let window = window.with_top_level(true);
        assert!(window.frame_element_rect().is_none());
    }

    #[test]
    fn test_post_to_parent() {
        let (window, mut rx) = MemoryWindow::new("http://localhost:5173/").expect("window");
        window
            .post_to_parent(json!({"type": "VISUAL_EDIT_READY"}), "*")
            .expect("post");

        let posted = rx.try_recv().expect("message");
        assert_eq!(posted.target_origin, "*");
        assert_eq!(posted.message_type(), Some("VISUAL_EDIT_READY"));

        drop(rx);
        assert!(matches!(
            window.post_to_parent(json!({}), "*"),
            Err(Error::ChannelClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let (window, _rx) = MemoryWindow::new("http://localhost:5173/").expect("window");
        let window = window.with_tokio_clock();
        tokio::time::advance(std::time::Duration::from_millis(50)).await;
        assert!((window.now_ms() - 50.0).abs() < 1.0);
    }

    #[test]
    fn test_empty_referrer_is_none() {
        let (window, _rx) = MemoryWindow::new("http://localhost:5173/").expect("window");
        assert_eq!(window.referrer(), None);
        let window = window.with_referrer("");
        assert_eq!(window.referrer(), None);
        let window = window.with_referrer("https://lovable.app/projects/1");
        assert_eq!(window.referrer().as_deref(), Some("https://lovable.app/projects/1"));
    }
}
