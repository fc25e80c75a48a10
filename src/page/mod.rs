//! Page loads and their in-memory store.
//!
//! A [`Page`] owns everything one visitor sees: both animated panels, the
//! chat assistant, and the colour theme. Nothing is shared between pages.
//!
//! # Architecture
//!
//! - [`Page`]: one page load, cheap to clone
//! - [`PageTemplate`]: the settings every new page is built from
//! - [`PageStore`]: thread-safe store with idle expiry
//!
//! # Example
//!
//! ```rust
//! use portfolio_engine::chat::ChatCapability;
//! use portfolio_engine::page::{PageStore, PageTemplate, Theme};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = PageStore::new(PageTemplate::new(ChatCapability::Disabled));
//! let page = store.create(true);
//! assert_eq!(page.theme(), Theme::Dark);
//! assert!(store.get(page.id()).is_some());
//! # }
//! ```

mod store;
mod theme;

pub use store::PageStore;
pub use theme::Theme;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::chat::{ChatCapability, ChatFeature, ChatSnapshot, QueryDisposition};
use crate::events::{EventSink, PageEvent};
use crate::panel::{Panel, PanelError, PanelKind, PanelSnapshot, PanelView, SelectOutcome};
use crate::portfolio::{Education, Experience};
use crate::transition::{OverlapPolicy, TransitionTimings};

/// Settings shared by every page the store creates.
#[derive(Debug, Clone)]
pub struct PageTemplate {
    pub timings: TransitionTimings,
    pub policy: OverlapPolicy,
    pub chat: ChatCapability,
}

impl PageTemplate {
    /// Default timings and overlap policy.
    pub fn new(chat: ChatCapability) -> Self {
        Self {
            timings: TransitionTimings::default(),
            policy: OverlapPolicy::default(),
            chat,
        }
    }

    #[must_use]
    pub fn with_timings(mut self, timings: TransitionTimings, policy: OverlapPolicy) -> Self {
        self.timings = timings;
        self.policy = policy;
        self
    }
}

/// One page load.
#[derive(Debug, Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

#[derive(Debug)]
struct PageInner {
    id: String,
    created_at: DateTime<Utc>,
    last_activity: RwLock<DateTime<Utc>>,
    theme: RwLock<Theme>,
    experience: Panel<Experience>,
    education: Panel<Education>,
    chat: ChatFeature,
    events: EventSink,
}

/// Panel state plus the content it currently shows.
#[derive(Debug, Clone, Serialize)]
pub struct PanelInfo {
    #[serde(flatten)]
    pub snapshot: PanelSnapshot,
    pub view: AnyPanelView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnyPanelView {
    Experience(PanelView<Experience>),
    Education(PanelView<Education>),
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelSnapshots {
    pub experience: PanelSnapshot,
    pub education: PanelSnapshot,
}

/// Serializable summary of a page.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub id: String,
    pub theme: Theme,
    pub created_at: DateTime<Utc>,
    pub panels: PanelSnapshots,
    pub chat: Option<ChatSnapshot>,
}

impl Page {
    pub(crate) fn new(id: String, template: &PageTemplate, theme: Theme) -> Self {
        let events = EventSink::default();
        let now = Utc::now();
        Self {
            inner: Arc::new(PageInner {
                id,
                created_at: now,
                last_activity: RwLock::new(now),
                theme: RwLock::new(theme),
                experience: Panel::experience(template.timings, template.policy, events.clone()),
                education: Panel::education(template.timings, template.policy, events.clone()),
                chat: template.chat.new_feature(events.clone()),
                events,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn experience(&self) -> &Panel<Experience> {
        &self.inner.experience
    }

    #[must_use]
    pub fn education(&self) -> &Panel<Education> {
        &self.inner.education
    }

    #[must_use]
    pub fn chat(&self) -> &ChatFeature {
        &self.inner.chat
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        *self.inner.theme.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flip the theme and publish the change.
    pub fn toggle_theme(&self) -> Theme {
        let theme = {
            let mut guard = self.inner.theme.write().unwrap_or_else(PoisonError::into_inner);
            *guard = guard.toggle();
            *guard
        };
        self.inner.events.emit(PageEvent::ThemeChanged { theme });
        self.touch();
        theme
    }

    pub fn select(&self, panel: PanelKind, id: &str) -> Result<SelectOutcome, PanelError> {
        self.touch();
        match panel {
            PanelKind::Experience => self.inner.experience.select(id),
            PanelKind::Education => self.inner.education.select(id),
        }
    }

    pub fn back(&self, panel: PanelKind) {
        self.touch();
        match panel {
            PanelKind::Experience => self.inner.experience.back(),
            PanelKind::Education => self.inner.education.back(),
        }
    }

    #[must_use]
    pub fn panel(&self, panel: PanelKind) -> PanelInfo {
        match panel {
            PanelKind::Experience => PanelInfo {
                snapshot: self.inner.experience.snapshot(),
                view: AnyPanelView::Experience(self.inner.experience.view()),
            },
            PanelKind::Education => PanelInfo {
                snapshot: self.inner.education.snapshot(),
                view: AnyPanelView::Education(self.inner.education.view()),
            },
        }
    }

    /// Forward an "Ask AI" card query to the assistant.
    ///
    /// Returns `false` when the query is blank or chat is disabled; the
    /// callback is not invoked in either case.
    pub async fn ask<F>(&self, query: &str, on_handled: F) -> bool
    where
        F: FnOnce(QueryDisposition) + Send + 'static,
    {
        self.touch();
        if query.trim().is_empty() {
            return false;
        }
        let Some(widget) = self.inner.chat.widget() else {
            return false;
        };
        widget.inject(query, on_handled).await;
        true
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn info(&self) -> PageInfo {
        PageInfo {
            id: self.inner.id.clone(),
            theme: self.theme(),
            created_at: self.inner.created_at,
            panels: PanelSnapshots {
                experience: self.inner.experience.snapshot(),
                education: self.inner.education.snapshot(),
            },
            chat: self.inner.chat.snapshot(),
        }
    }

    pub fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Utc::now();
    }

    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }
}
