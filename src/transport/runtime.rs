//! Async page-event loop driving a [`Bridge`].
//!
//! The host adapter forwards page events through a [`BridgeHandle`]; the
//! runtime task owns the bridge and stands in for the browser's animation
//! frame clock.
//!
//! # Event Loop
//!
//! The runtime spawns a tokio task that handles:
//!
//! - Inbound `message` events
//! - Capture-phase interaction events (suppressed events are handed back)
//! - `scroll`, `resize` and `beforeunload`
//! - Animation frames at a fixed interval while a detection is scheduled
//!
//! The loop ends on `beforeunload` or when every handle is dropped; either
//! way the bridge is unloaded and returned from the task.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, trace};

use crate::bridge::Bridge;
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::host::{HostWindow, MessageEvent, NativeEvent};

// ============================================================================
// Constants
// ============================================================================

/// Animation frame interval, roughly 60 frames per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

// ============================================================================
// PageEvent
// ============================================================================

/// An event the page delivers to the bridge.
#[derive(Debug)]
pub enum PageEvent {
    /// `message` on the window.
    Message(MessageEvent),
    /// Capture-phase interaction; the event comes back with its flags set.
    Interaction {
        /// The event as dispatched.
        event: NativeEvent,
        /// Receives the event after the bridge handled it.
        reply: oneshot::Sender<NativeEvent>,
    },
    /// `scroll` (capture).
    Scroll,
    /// `resize`.
    Resize,
    /// `beforeunload`.
    BeforeUnload,
}

// ============================================================================
// BridgeHandle
// ============================================================================

/// Cloneable sender of page events.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    events: mpsc::UnboundedSender<PageEvent>,
}

impl BridgeHandle {
    /// Forwards a raw page event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] once the runtime has stopped.
    pub fn send(&self, event: PageEvent) -> Result<()> {
        self.events.send(event).map_err(|_| Error::ChannelClosed)
    }

    /// Forwards a `message` event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] once the runtime has stopped.
    pub fn message(&self, event: MessageEvent) -> Result<()> {
        self.send(PageEvent::Message(event))
    }

    /// Runs an interaction event through the capture-phase hook.
    ///
    /// Returns the event with its suppression flags applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the runtime stops before replying.
    pub async fn interaction(&self, event: NativeEvent) -> Result<NativeEvent> {
        let (reply, rx) = oneshot::channel();
        self.send(PageEvent::Interaction { event, reply })?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Forwards a `scroll` event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] once the runtime has stopped.
    pub fn scroll(&self) -> Result<()> {
        self.send(PageEvent::Scroll)
    }

    /// Forwards a `resize` event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] once the runtime has stopped.
    pub fn resize(&self) -> Result<()> {
        self.send(PageEvent::Resize)
    }

    /// Forwards `beforeunload`, which stops the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] once the runtime has stopped.
    pub fn unload(&self) -> Result<()> {
        self.send(PageEvent::BeforeUnload)
    }

    /// Returns `true` once the runtime has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

// ============================================================================
// BridgeRuntime
// ============================================================================

/// Owns a bridge and processes its page events.
pub struct BridgeRuntime<D: Document, W: HostWindow> {
    bridge: Bridge<D, W>,
    events: mpsc::UnboundedReceiver<PageEvent>,
    frame_interval: Duration,
}

impl<D: Document, W: HostWindow> BridgeRuntime<D, W> {
    /// Wraps an installed bridge.
    ///
    /// Returns the runtime and the handle that feeds it.
    #[must_use]
    pub fn new(bridge: Bridge<D, W>) -> (Self, BridgeHandle) {
        let (tx, events) = mpsc::unbounded_channel();
        let runtime = Self {
            bridge,
            events,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        };
        (runtime, BridgeHandle { events: tx })
    }

    /// Sets the animation frame interval.
    #[inline]
    #[must_use]
    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    /// Runs the event loop to completion and returns the unloaded bridge.
    pub async fn run(self) -> Bridge<D, W> {
        let Self {
            mut bridge,
            mut events,
            frame_interval,
        } = self;

        let mut frames = interval(frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Page events
                event = events.recv() => {
                    match event {
                        Some(PageEvent::Message(event)) => bridge.handle_message(event),

                        Some(PageEvent::Interaction { mut event, reply }) => {
                            let suppressed = bridge.handle_native_event(&mut event);
                            trace!(kind = %event.kind, suppressed, "Interaction handled");
                            let _ = reply.send(event);
                        }

                        Some(PageEvent::Scroll) => bridge.handle_scroll(),

                        Some(PageEvent::Resize) => bridge.handle_resize(),

                        Some(PageEvent::BeforeUnload) => {
                            debug!("Unload received");
                            break;
                        }

                        None => {
                            debug!("Page event channel closed");
                            break;
                        }
                    }
                }

                // Animation frames
                _ = frames.tick() => {
                    if let Some(frame) = bridge.scheduled_frame() {
                        bridge.run_animation_frame(frame);
                    }
                }
            }
        }

        bridge.unload();
        debug!("Bridge runtime terminated");
        bridge
    }
}

impl<D, W> BridgeRuntime<D, W>
where
    D: Document + Send + 'static,
    W: HostWindow + Send + 'static,
{
    /// Spawns the event loop on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<Bridge<D, W>> {
        tokio::spawn(self.run())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::config::BridgeConfig;
    use crate::dom::{MemoryDocument, Rect};
    use crate::host::{EventKind, MemoryWindow, PostedMessage};

    fn install() -> (
        Bridge<MemoryDocument, MemoryWindow>,
        mpsc::UnboundedReceiver<PostedMessage>,
    ) {
        let doc = MemoryDocument::new();
        let body = doc.body().expect("body");
        let link = doc
            .append_element(body, "a", &[("id", "home"), ("href", "/")])
            .expect("link");
        doc.append_text(link, "Home").expect("text");
        doc.set_layout(link, Rect::new(0.0, 0.0, 80.0, 20.0));

        let (window, parent) = MemoryWindow::new("https://shop.test/").expect("window");
        let bridge = Bridge::install_with_config(doc, window.with_tokio_clock(), BridgeConfig::new())
            .expect("install");
        (bridge, parent)
    }

    fn activate() -> MessageEvent {
        MessageEvent::from_parent("https://editor.test", json!({ "type": "VISUAL_EDIT_MODE_ACTIVATE" }))
    }

    fn drain(parent: &mut mpsc::UnboundedReceiver<PostedMessage>) -> Vec<String> {
        let mut types = Vec::new();
        while let Ok(posted) = parent.try_recv() {
            types.extend(posted.message_type().map(str::to_string));
        }
        types
    }

    #[tokio::test(start_paused = true)]
    async fn test_runtime_detects_on_frame() -> anyhow::Result<()> {
        let (bridge, mut parent) = install();
        let (runtime, handle) = BridgeRuntime::new(bridge);
        let task = runtime.spawn();

        handle.message(activate())?;
        handle.message(MessageEvent::from_parent(
            "https://editor.test",
            json!({ "type": "VISUAL_EDIT_DETECT_ELEMENT", "x": 10, "y": 10, "action": "click" }),
        ))?;
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.unload()?;
        let bridge = task.await?;

        assert!(!bridge.is_active());
        assert!(bridge.window().listeners().is_empty());
        assert_eq!(
            drain(&mut parent),
            ["VISUAL_EDIT_READY", "VISUAL_EDIT_READY", "ELEMENT_CLICKED"]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_interaction_round_trip() -> anyhow::Result<()> {
        let (bridge, _parent) = install();
        let (runtime, handle) = BridgeRuntime::new(bridge);
        let task = runtime.spawn();

        let click = handle.interaction(NativeEvent::new(EventKind::Click, None)).await?;
        assert!(!click.default_prevented());

        handle.message(activate())?;
        let click = handle.interaction(NativeEvent::new(EventKind::Click, None)).await?;
        assert!(click.default_prevented());
        assert!(click.propagation_stopped());

        drop(handle);
        let bridge = task.await?;
        assert!(!bridge.is_active());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_closed_runtime() {
        let (bridge, _parent) = install();
        let (runtime, handle) = BridgeRuntime::new(bridge);
        let task = runtime.with_frame_interval(Duration::from_millis(8)).spawn();

        handle.unload().expect("unload");
        task.await.expect("join");

        assert!(handle.is_closed());
        assert!(matches!(handle.scroll(), Err(Error::ChannelClosed)));
        assert!(matches!(
            handle.interaction(NativeEvent::new(EventKind::Click, None)).await,
            Err(Error::ChannelClosed)
        ));
    }
}
