//! The portfolio assistant widget.
//!
//! State lives behind a synchronous mutex that is never held across an
//! await. A turn is split in two: the user message is appended under the
//! lock, then the remote call runs unlocked and the reply is appended when it
//! returns.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{error, info, warn};

use super::{
    ChatBackend, ChatError, ChatSession, DEFAULT_SYSTEM_PROMPT, EMPTY_RESPONSE, FALLBACK_APOLOGY,
    GeminiBackend, Message, Role,
};
use crate::config::ChatSettings;
use crate::events::{EventSink, PageEvent};

/// How an injected query was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryDisposition {
    /// The query was appended as a new user message.
    Submitted,
    /// The most recent user message already equals the query.
    AlreadyHandled,
    /// A newer query replaced this one before it was handled.
    Superseded,
}

type QueryCallback = Box<dyn FnOnce(QueryDisposition) + Send>;

struct PendingQuery {
    query: String,
    on_handled: QueryCallback,
}

struct WidgetState {
    open: bool,
    input: String,
    transcript: Vec<Message>,
    in_flight: usize,
    session: Option<Arc<dyn ChatSession>>,
    creating: bool,
    pending: Option<PendingQuery>,
}

impl WidgetState {
    fn loading(&self) -> bool {
        self.in_flight > 0
    }

    fn ready(&self) -> bool {
        self.session.is_some()
    }

    fn last_user_text(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text.as_str())
    }
}

/// A user message waiting for its reply.
struct Turn {
    session: Option<Arc<dyn ChatSession>>,
    text: String,
}

/// Serializable view of the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSnapshot {
    pub open: bool,
    pub loading: bool,
    pub ready: bool,
    pub input: String,
    pub can_submit: bool,
    pub messages: Vec<Message>,
}

/// Chat assistant for one page.
pub struct ChatWidget {
    backend: Arc<dyn ChatBackend>,
    system_prompt: String,
    state: Mutex<WidgetState>,
    events: EventSink,
}

impl std::fmt::Debug for ChatWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ChatWidget")
            .field("backend", &self.backend)
            .field("open", &state.open)
            .field("ready", &state.ready())
            .field("messages", &state.transcript.len())
            .finish_non_exhaustive()
    }
}

impl ChatWidget {
    /// Create a closed widget whose transcript holds only the greeting.
    pub fn new(backend: Arc<dyn ChatBackend>, system_prompt: impl Into<String>, events: EventSink) -> Self {
        Self {
            backend,
            system_prompt: system_prompt.into(),
            state: Mutex::new(WidgetState {
                open: false,
                input: String::new(),
                transcript: vec![Message::greeting()],
                in_flight: 0,
                session: None,
                creating: false,
                pending: None,
            }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, WidgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show the chat surface, creating the session on first open.
    ///
    /// A failed creation leaves the widget not ready; the next open retries.
    pub async fn open(&self) {
        let create = {
            let mut state = self.lock();
            if !state.open {
                state.open = true;
                self.events.emit(PageEvent::VisibilityChanged { open: true });
            }
            if state.session.is_none() && !state.creating {
                state.creating = true;
                true
            } else {
                false
            }
        };

        if create {
            let result = self.backend.create_session(&self.system_prompt).await;
            let mut state = self.lock();
            state.creating = false;
            match result {
                Ok(session) => {
                    info!(name: "chat.session.created", "Chat session created");
                    state.session = Some(session);
                }
                Err(e) => {
                    error!(name: "chat.session.init_failed", error = %e, "Failed to create chat session");
                }
            }
        }

        self.drain_pending().await;
    }

    /// Hide the chat surface. Transcript and session are kept.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.open {
            state.open = false;
            self.events.emit(PageEvent::VisibilityChanged { open: false });
        }
    }

    /// Send `text` as a user message and wait for the reply.
    ///
    /// Blank text is ignored. Every accepted message gets exactly one model
    /// reply in the transcript, falling back to an apology on failure.
    pub async fn send(&self, text: &str) {
        let turn = {
            let mut state = self.lock();
            self.begin_turn(&mut state, text)
        };
        if let Some(turn) = turn {
            self.finish_turn(turn).await;
            self.drain_pending().await;
        }
    }

    /// Replace the contents of the input box.
    pub fn set_input(&self, text: impl Into<String>) {
        self.lock().input = text.into();
    }

    /// Send the input box contents.
    ///
    /// Returns `false` without doing anything while a reply is pending or
    /// when the input is blank.
    pub async fn submit_input(&self) -> bool {
        let turn = {
            let mut state = self.lock();
            if state.loading() || state.input.trim().is_empty() {
                return false;
            }
            let text = std::mem::take(&mut state.input);
            self.begin_turn(&mut state, &text)
        };
        if let Some(turn) = turn {
            self.finish_turn(turn).await;
            self.drain_pending().await;
        }
        true
    }

    /// Queue a query from elsewhere on the page and open the widget.
    ///
    /// `on_handled` fires once: after the query's user message is appended,
    /// when the query matches the latest user message, or when a newer
    /// injection replaces it.
    pub async fn inject<F>(&self, query: impl Into<String>, on_handled: F)
    where
        F: FnOnce(QueryDisposition) + Send + 'static,
    {
        let query = query.into();
        if query.trim().is_empty() {
            return;
        }

        let replaced = self.lock().pending.replace(PendingQuery {
            query,
            on_handled: Box::new(on_handled),
        });
        if let Some(old) = replaced {
            tracing::debug!(query = %old.query, "Pending query superseded");
            (old.on_handled)(QueryDisposition::Superseded);
        }

        self.open().await;
    }

    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.lock();
        let loading = state.loading();
        ChatSnapshot {
            open: state.open,
            loading,
            ready: state.ready(),
            input: state.input.clone(),
            can_submit: !loading && !state.input.trim().is_empty(),
            messages: state.transcript.clone(),
        }
    }

    #[must_use]
    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lock().ready()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().loading()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    fn begin_turn(&self, state: &mut WidgetState, text: &str) -> Option<Turn> {
        if text.trim().is_empty() {
            return None;
        }

        let message = Message::new(Role::User, text);
        state.transcript.push(message.clone());
        self.events.emit(PageEvent::MessageAppended { message });

        state.in_flight += 1;
        if state.in_flight == 1 {
            self.events.emit(PageEvent::LoadingChanged { loading: true });
        }

        Some(Turn {
            session: state.session.clone(),
            text: text.to_string(),
        })
    }

    async fn finish_turn(&self, turn: Turn) {
        let result = match &turn.session {
            Some(session) => session.send_message(&turn.text).await,
            None => Err(ChatError::SessionUnavailable),
        };

        let reply = match result {
            Ok(text) if text.is_empty() => EMPTY_RESPONSE.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(name: "chat.turn.failed", error = %e, "Chat turn failed");
                FALLBACK_APOLOGY.to_string()
            }
        };

        let mut state = self.lock();
        let message = Message::new(Role::Model, reply);
        state.transcript.push(message.clone());
        self.events.emit(PageEvent::MessageAppended { message });

        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            self.events.emit(PageEvent::LoadingChanged { loading: false });
        }
    }

    /// Handle the pending query if the widget can take it now.
    async fn drain_pending(&self) {
        loop {
            let (turn, callback) = {
                let mut state = self.lock();
                if !state.open || !state.ready() || state.loading() {
                    return;
                }
                let Some(pending) = state.pending.take() else {
                    return;
                };

                if state.last_user_text() == Some(pending.query.as_str()) {
                    drop(state);
                    (pending.on_handled)(QueryDisposition::AlreadyHandled);
                    return;
                }

                (self.begin_turn(&mut state, &pending.query), pending.on_handled)
            };

            callback(QueryDisposition::Submitted);
            match turn {
                Some(turn) => self.finish_turn(turn).await,
                None => return,
            }
        }
    }
}

/// Whether the page gets a chat assistant.
///
/// Decided once from configuration; a missing credential disables the
/// feature entirely.
#[derive(Debug, Clone)]
pub enum ChatCapability {
    Enabled {
        backend: Arc<dyn ChatBackend>,
        system_prompt: String,
    },
    Disabled,
}

impl ChatCapability {
    /// Resolve the capability from chat settings.
    pub fn from_settings(settings: &ChatSettings) -> Self {
        if settings.api_key.is_none() {
            info!(name: "chat.config.loaded", enabled = false, "No chat credential; assistant disabled");
            return Self::Disabled;
        }

        match GeminiBackend::from_settings(settings) {
            Ok(backend) => {
                info!(
                    name: "chat.config.loaded",
                    enabled = true,
                    model = %backend.model(),
                    "Chat assistant enabled"
                );
                Self::Enabled {
                    backend: Arc::new(backend),
                    system_prompt: settings.system_prompt.clone(),
                }
            }
            Err(e) => {
                error!(name: "chat.config.loaded", enabled = false, error = %e, "Chat backend unavailable");
                Self::Disabled
            }
        }
    }

    /// Enable the assistant with an explicit backend.
    pub fn with_backend(backend: Arc<dyn ChatBackend>) -> Self {
        Self::Enabled {
            backend,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// Build the per-page feature.
    #[must_use]
    pub fn new_feature(&self, events: EventSink) -> ChatFeature {
        match self {
            Self::Enabled {
                backend,
                system_prompt,
            } => ChatFeature::Available(Arc::new(ChatWidget::new(
                Arc::clone(backend),
                system_prompt.clone(),
                events,
            ))),
            Self::Disabled => ChatFeature::Unavailable,
        }
    }
}

/// A page's chat assistant, or nothing when chat is disabled.
#[derive(Debug, Clone)]
pub enum ChatFeature {
    Available(Arc<ChatWidget>),
    Unavailable,
}

impl ChatFeature {
    #[must_use]
    pub fn widget(&self) -> Option<&Arc<ChatWidget>> {
        match self {
            Self::Available(widget) => Some(widget),
            Self::Unavailable => None,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.widget().is_some()
    }

    /// `None` when chat is disabled; nothing is rendered in that case.
    #[must_use]
    pub fn snapshot(&self) -> Option<ChatSnapshot> {
        self.widget().map(|w| w.snapshot())
    }

    pub async fn open(&self) {
        if let Some(widget) = self.widget() {
            widget.open().await;
        }
    }

    pub fn close(&self) {
        if let Some(widget) = self.widget() {
            widget.close();
        }
    }

    pub async fn send(&self, text: &str) {
        if let Some(widget) = self.widget() {
            widget.send(text).await;
        }
    }

    pub async fn inject<F>(&self, query: impl Into<String>, on_handled: F)
    where
        F: FnOnce(QueryDisposition) + Send + 'static,
    {
        if let Some(widget) = self.widget() {
            widget.inject(query, on_handled).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, Copy)]
    enum Reply {
        Echo,
        Empty,
        Fail,
    }

    #[derive(Debug)]
    struct StubBackend {
        reply: Reply,
        create_fails: bool,
        delay: Duration,
        sessions: AtomicUsize,
    }

    impl StubBackend {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                create_fails: false,
                delay: Duration::ZERO,
                sessions: AtomicUsize::new(0),
            }
        }
    }

    #[derive(Debug)]
    struct StubSession {
        reply: Reply,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl ChatBackend for StubBackend {
        async fn create_session(&self, _system_prompt: &str) -> Result<Arc<dyn ChatSession>, ChatError> {
            self.sessions.fetch_add(1, Ordering::SeqCst);
            if self.create_fails {
                return Err(ChatError::MissingCredential);
            }
            Ok(Arc::new(StubSession {
                reply: self.reply,
                delay: self.delay,
            }))
        }
    }

    #[async_trait::async_trait]
    impl ChatSession for StubSession {
        async fn send_message(&self, text: &str) -> Result<String, ChatError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.reply {
                Reply::Echo => Ok(format!("echo: {text}")),
                Reply::Empty => Ok(String::new()),
                Reply::Fail => Err(ChatError::Api {
                    status: 500,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    fn widget(backend: StubBackend) -> Arc<ChatWidget> {
        Arc::new(ChatWidget::new(Arc::new(backend), "prompt", EventSink::default()))
    }

    fn texts(widget: &ChatWidget) -> Vec<String> {
        widget.transcript().into_iter().map(|m| m.text).collect()
    }

    #[tokio::test]
    async fn test_starts_closed_with_greeting() {
        let w = widget(StubBackend::new(Reply::Echo));
        let snap = w.snapshot();
        assert!(!snap.open);
        assert!(!snap.ready);
        assert_eq!(snap.messages, vec![Message::greeting()]);
    }

    #[tokio::test]
    async fn test_open_creates_session_once() {
        let backend = Arc::new(StubBackend::new(Reply::Echo));
        let w = ChatWidget::new(backend.clone(), "prompt", EventSink::default());

        w.open().await;
        w.close();
        w.open().await;

        assert!(w.is_ready());
        assert_eq!(backend.sessions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_appends_user_then_reply() {
        let w = widget(StubBackend::new(Reply::Echo));
        w.open().await;
        w.send("What stack?").await;

        let transcript = w.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].role, Role::User);
        assert_eq!(transcript[1].text, "What stack?");
        assert_eq!(transcript[2].role, Role::Model);
        assert_eq!(transcript[2].text, "echo: What stack?");
        assert!(!w.is_loading());
    }

    #[tokio::test]
    async fn test_blank_send_is_ignored() {
        let w = widget(StubBackend::new(Reply::Echo));
        w.open().await;
        w.send("   ").await;
        assert_eq!(w.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply_uses_placeholder() {
        let w = widget(StubBackend::new(Reply::Empty));
        w.open().await;
        w.send("hi").await;
        assert_eq!(texts(&w).last().map(String::as_str), Some(EMPTY_RESPONSE));
    }

    #[tokio::test]
    async fn test_failed_turn_uses_fallback_and_session_survives() {
        let w = widget(StubBackend::new(Reply::Fail));
        w.open().await;
        w.send("hi").await;
        w.send("again").await;

        let texts = texts(&w);
        assert_eq!(texts.len(), 5);
        assert_eq!(texts[2], FALLBACK_APOLOGY);
        assert_eq!(texts[4], FALLBACK_APOLOGY);
        assert!(w.is_ready());
        assert!(!w.is_loading());
    }

    #[tokio::test]
    async fn test_session_failure_leaves_widget_not_ready() {
        let backend = Arc::new(StubBackend {
            create_fails: true,
            ..StubBackend::new(Reply::Echo)
        });
        let w = ChatWidget::new(backend.clone(), "prompt", EventSink::default());

        w.open().await;
        assert!(w.is_open());
        assert!(!w.is_ready());

        w.send("hello").await;
        assert_eq!(texts(&w), vec![Message::greeting().text, "hello".to_string(), FALLBACK_APOLOGY.to_string()]);

        w.close();
        w.open().await;
        assert_eq!(backend.sessions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_submit_input_clears_box() {
        let w = widget(StubBackend::new(Reply::Echo));
        w.open().await;

        w.set_input("   ");
        assert!(!w.snapshot().can_submit);
        assert!(!w.submit_input().await);

        w.set_input("Tell me about HivePro");
        assert!(w.snapshot().can_submit);
        assert!(w.submit_input().await);

        let snap = w.snapshot();
        assert_eq!(snap.input, "");
        assert_eq!(snap.messages[1].text, "Tell me about HivePro");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_refused_while_loading() {
        let w = widget(StubBackend {
            delay: Duration::from_millis(100),
            ..StubBackend::new(Reply::Echo)
        });
        w.open().await;

        let sender = Arc::clone(&w);
        let handle = tokio::spawn(async move { sender.send("first").await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(w.is_loading());

        w.set_input("second");
        assert!(!w.snapshot().can_submit);
        assert!(!w.submit_input().await);
        assert_eq!(w.snapshot().input, "second");

        handle.await.unwrap();
        assert!(!w.is_loading());
        assert_eq!(w.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_inject_opens_and_submits() {
        let w = widget(StubBackend::new(Reply::Echo));
        let (tx, rx) = oneshot::channel();

        w.inject("Tell me about your experience at HivePro", move |d| {
            let _ = tx.send(d);
        })
        .await;

        assert_eq!(rx.await.unwrap(), QueryDisposition::Submitted);
        assert!(w.is_open());
        let texts = texts(&w);
        assert_eq!(texts[1], "Tell me about your experience at HivePro");
        assert_eq!(texts[2], "echo: Tell me about your experience at HivePro");
    }

    #[tokio::test]
    async fn test_inject_duplicate_is_acknowledged() {
        let w = widget(StubBackend::new(Reply::Echo));
        w.open().await;
        w.send("Skills?").await;

        let (tx, rx) = oneshot::channel();
        w.inject("Skills?", move |d| {
            let _ = tx.send(d);
        })
        .await;

        assert_eq!(rx.await.unwrap(), QueryDisposition::AlreadyHandled);
        assert_eq!(w.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_same_injection_twice_submits_once() {
        let w = widget(StubBackend::new(Reply::Echo));

        let (tx, rx) = oneshot::channel();
        w.inject("Q", move |d| {
            let _ = tx.send(d);
        })
        .await;
        assert_eq!(rx.await.unwrap(), QueryDisposition::Submitted);

        let (tx, rx) = oneshot::channel();
        w.inject("Q", move |d| {
            let _ = tx.send(d);
        })
        .await;
        assert_eq!(rx.await.unwrap(), QueryDisposition::AlreadyHandled);

        let user_turns = w
            .transcript()
            .into_iter()
            .filter(|m| m.role == Role::User && m.text == "Q")
            .count();
        assert_eq!(user_turns, 1);
        assert_eq!(w.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_inject_empty_is_ignored() {
        let w = widget(StubBackend::new(Reply::Echo));
        let called = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&called);

        w.inject("", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert!(!w.is_open());
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inject_while_loading_runs_after_turn() {
        let w = widget(StubBackend {
            delay: Duration::from_millis(100),
            ..StubBackend::new(Reply::Echo)
        });
        w.open().await;

        let sender = Arc::clone(&w);
        let handle = tokio::spawn(async move { sender.send("first").await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (tx, mut rx) = oneshot::channel();
        w.inject("second", move |d| {
            let _ = tx.send(d);
        })
        .await;
        assert!(rx.try_recv().is_err());

        handle.await.unwrap();
        assert_eq!(rx.await.unwrap(), QueryDisposition::Submitted);
        assert_eq!(
            texts(&w)[1..],
            ["first", "echo: first", "second", "echo: second"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_injection_supersedes() {
        let w = widget(StubBackend {
            delay: Duration::from_millis(100),
            ..StubBackend::new(Reply::Echo)
        });
        w.open().await;

        let sender = Arc::clone(&w);
        let handle = tokio::spawn(async move { sender.send("first").await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (tx_old, rx_old) = oneshot::channel();
        w.inject("old", move |d| {
            let _ = tx_old.send(d);
        })
        .await;
        let (tx_new, rx_new) = oneshot::channel();
        w.inject("new", move |d| {
            let _ = tx_new.send(d);
        })
        .await;

        assert_eq!(rx_old.await.unwrap(), QueryDisposition::Superseded);
        handle.await.unwrap();
        assert_eq!(rx_new.await.unwrap(), QueryDisposition::Submitted);
        assert!(!texts(&w).iter().any(|t| t == "old"));
    }

    #[tokio::test]
    async fn test_events_follow_turn() {
        let events = EventSink::default();
        let mut rx = events.subscribe();
        let w = ChatWidget::new(Arc::new(StubBackend::new(Reply::Echo)), "prompt", events);

        w.open().await;
        w.send("hi").await;

        assert_eq!(rx.recv().await.unwrap(), PageEvent::VisibilityChanged { open: true });
        assert!(matches!(rx.recv().await.unwrap(), PageEvent::MessageAppended { message } if message.role == Role::User));
        assert_eq!(rx.recv().await.unwrap(), PageEvent::LoadingChanged { loading: true });
        assert!(matches!(rx.recv().await.unwrap(), PageEvent::MessageAppended { message } if message.role == Role::Model));
        assert_eq!(rx.recv().await.unwrap(), PageEvent::LoadingChanged { loading: false });
    }

    #[tokio::test]
    async fn test_unavailable_feature_is_inert() {
        let feature = ChatCapability::Disabled.new_feature(EventSink::default());
        feature.open().await;
        feature.send("hi").await;
        feature.close();
        assert!(feature.snapshot().is_none());
        assert!(!feature.is_available());
    }

    #[test]
    fn test_capability_without_key_is_disabled() {
        let settings = ChatSettings {
            api_key: None,
            ..ChatSettings::default()
        };
        assert!(!ChatCapability::from_settings(&settings).is_enabled());
    }

    #[test]
    fn test_capability_with_key_is_enabled() {
        let settings = ChatSettings {
            api_key: Some("test-key".to_string()),
            ..ChatSettings::default()
        };
        assert!(ChatCapability::from_settings(&settings).is_enabled());
    }
}
