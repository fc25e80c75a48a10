//! Page state-change events and their SSE encoding.
//!
//! Panels and the chat widget publish a [`PageEvent`] whenever their visible
//! state changes. The server forwards these to the client over
//! Server-Sent Events so it can restyle without polling.
//!
//! # Example
//!
//! ```rust
//! use portfolio_engine::events::{PageEvent, sse_event};
//!
//! let event = PageEvent::LoadingChanged { loading: true };
//! let sse = sse_event(&event);
//! assert!(sse.starts_with("event: chat.loading\n"));
//! ```

use serde::Serialize;
use tokio::sync::broadcast;

use crate::chat::Message;
use crate::page::Theme;
use crate::panel::PanelSnapshot;

/// Default buffer size of a page's event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// A visible state change on one page.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum PageEvent {
    /// A panel changed phase or selection.
    #[serde(rename = "panel.changed")]
    PanelChanged {
        /// Snapshot after the change.
        snapshot: PanelSnapshot,
    },

    /// A message was appended to the chat transcript.
    #[serde(rename = "chat.message")]
    MessageAppended {
        /// The appended message.
        message: Message,
    },

    /// The chat loading indicator changed.
    #[serde(rename = "chat.loading")]
    LoadingChanged {
        /// Whether a reply is pending.
        loading: bool,
    },

    /// The chat surface was opened or closed.
    #[serde(rename = "chat.visibility")]
    VisibilityChanged {
        /// Whether the chat window is open.
        open: bool,
    },

    /// The colour theme was toggled.
    #[serde(rename = "theme.changed")]
    ThemeChanged {
        /// New theme.
        theme: Theme,
    },
}

/// Fan-out publisher for one page's events.
///
/// Publishing never fails: with no subscribers the event is dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<PageEvent>,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: PageEvent) {
        tracing::trace!(event = event_name(&event), "Page event");
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.tx.subscribe()
    }
}

/// Convert a [`PageEvent`] to an SSE-formatted string.
///
/// Emits an `event:` line for `EventSource` listeners followed by a `data:`
/// line containing the JSON payload.
pub fn sse_event(evt: &PageEvent) -> String {
    let json = serde_json::to_string(evt).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "data": { "message": e.to_string() } }).to_string()
    });

    let event_name = event_name(evt);

    format!("event: {event_name}\ndata: {json}\n\n")
}

/// Get the SSE event name for a [`PageEvent`].
pub fn event_name(evt: &PageEvent) -> &'static str {
    match evt {
        PageEvent::PanelChanged { .. } => "panel.changed",
        PageEvent::MessageAppended { .. } => "chat.message",
        PageEvent::LoadingChanged { .. } => "chat.loading",
        PageEvent::VisibilityChanged { .. } => "chat.visibility",
        PageEvent::ThemeChanged { .. } => "theme.changed",
    }
}
