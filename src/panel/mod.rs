//! Panel controllers for the Experience and Education timelines.
//!
//! A [`Panel`] owns one [`Sequencer`] and drives it on the tokio clock:
//! `select`/`back` flip the phase to `exiting` at once, a [`DelayedTask`]
//! swaps the selection after the exit delay and settles the phase a few
//! frames later. Every phase change is published to the page's
//! [`EventSink`].

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::{EventSink, PageEvent};
use crate::portfolio::{self, Education, Experience, PanelEntry};
use crate::transition::{
    DelayedTask, OverlapPolicy, PendingSwap, Phase, Sequencer, TransitionTimings,
};

/// Which timeline a panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    Experience,
    Education,
}

impl PanelKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Experience => "experience",
            Self::Education => "education",
        }
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PanelKind {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "experience" => Ok(Self::Experience),
            "education" => Ok(Self::Education),
            other => Err(PanelError::UnknownPanel(other.to_string())),
        }
    }
}

/// Errors raised by panel operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    /// The requested id is not in the panel's catalog.
    #[error("unknown {panel} entry: {id}")]
    UnknownEntry { panel: PanelKind, id: String },

    /// The panel name is not recognised.
    #[error("unknown panel: {0}")]
    UnknownPanel(String),
}

/// Result of a `select` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectOutcome {
    /// A transition was started.
    Started,
    /// The id was already selected; nothing happened.
    Unchanged,
}

/// Point-in-time view of a panel's transition state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelSnapshot {
    pub panel: PanelKind,
    pub phase: Phase,
    /// Classes for the transition container.
    pub style: &'static str,
    /// True while exiting or entering.
    pub transitioning: bool,
    pub selection: Option<String>,
}

/// Content the panel currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "data", rename_all = "lowercase")]
pub enum PanelView<E: 'static> {
    List(&'static [E]),
    Detail(&'static E),
}

/// Animated list/detail panel over a static catalog.
#[derive(Debug)]
pub struct Panel<E: PanelEntry> {
    kind: PanelKind,
    catalog: &'static [E],
    timings: TransitionTimings,
    state: Arc<Mutex<Sequencer>>,
    pending: Mutex<Option<DelayedTask>>,
    events: EventSink,
}

impl Panel<Experience> {
    /// Panel over the work-experience timeline.
    #[must_use]
    pub fn experience(timings: TransitionTimings, policy: OverlapPolicy, events: EventSink) -> Self {
        Self::new(
            PanelKind::Experience,
            portfolio::experiences(),
            timings,
            policy,
            events,
        )
    }
}

impl Panel<Education> {
    /// Panel over the education timeline.
    #[must_use]
    pub fn education(timings: TransitionTimings, policy: OverlapPolicy, events: EventSink) -> Self {
        Self::new(
            PanelKind::Education,
            portfolio::education(),
            timings,
            policy,
            events,
        )
    }
}

impl<E: PanelEntry> Panel<E> {
    #[must_use]
    pub fn new(
        kind: PanelKind,
        catalog: &'static [E],
        timings: TransitionTimings,
        policy: OverlapPolicy,
        events: EventSink,
    ) -> Self {
        Self {
            kind,
            catalog,
            timings,
            state: Arc::new(Mutex::new(Sequencer::new(policy))),
            pending: Mutex::new(None),
            events,
        }
    }

    #[must_use]
    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    #[must_use]
    pub fn catalog(&self) -> &'static [E] {
        self.catalog
    }

    /// Open the detail view for `id`.
    pub fn select(&self, id: &str) -> Result<SelectOutcome, PanelError> {
        let Some(entry) = portfolio::find(self.catalog, id) else {
            return Err(PanelError::UnknownEntry {
                panel: self.kind,
                id: id.to_string(),
            });
        };
        tracing::debug!(panel = %self.kind, id, title = entry.title(), "Panel entry selected");

        let (swap, snapshot) = {
            let mut seq = lock(&self.state);
            let Some(swap) = seq.select(id) else {
                return Ok(SelectOutcome::Unchanged);
            };
            (swap, snapshot_of(self.kind, &seq))
        };

        self.start(swap, snapshot);
        Ok(SelectOutcome::Started)
    }

    /// Return to the list view.
    pub fn back(&self) {
        let (swap, snapshot) = {
            let mut seq = lock(&self.state);
            let swap = seq.back();
            (swap, snapshot_of(self.kind, &seq))
        };
        self.start(swap, snapshot);
    }

    #[must_use]
    pub fn snapshot(&self) -> PanelSnapshot {
        snapshot_of(self.kind, &lock(&self.state))
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        lock(&self.state).phase()
    }

    #[must_use]
    pub fn selection(&self) -> Option<String> {
        lock(&self.state).selection().map(ToString::to_string)
    }

    /// Content for the current selection, not the transition target.
    #[must_use]
    pub fn view(&self) -> PanelView<E> {
        let seq = lock(&self.state);
        match seq.selection().and_then(|id| portfolio::find(self.catalog, id)) {
            Some(entry) => PanelView::Detail(entry),
            None => PanelView::List(self.catalog),
        }
    }

    fn start(&self, swap: PendingSwap, exiting: PanelSnapshot) {
        info!(
            name: "panel.transition.started",
            panel = %self.kind,
            target = ?swap.target(),
            generation = swap.generation(),
            "Panel transition started"
        );
        self.events.emit(PageEvent::PanelChanged { snapshot: exiting });

        let kind = self.kind;
        let timings = self.timings;
        let state = Arc::clone(&self.state);
        let events = self.events.clone();

        let mut pending = lock(&self.pending);
        let policy = lock(&self.state).policy();
        if policy == OverlapPolicy::Supersede {
            if let Some(previous) = pending.take() {
                previous.cancel();
            }
        }

        let task = DelayedTask::spawn(timings.exit_delay, async move {
            let entering = {
                let mut seq = lock(&state);
                seq.complete_exit(&swap).then(|| snapshot_of(kind, &seq))
            };
            let Some(entering) = entering else {
                tracing::debug!(panel = %kind, generation = swap.generation(), "Stale swap skipped");
                return;
            };
            events.emit(PageEvent::PanelChanged { snapshot: entering });

            for _ in 0..timings.settle_frames {
                tokio::time::sleep(timings.frame_interval).await;
            }

            let visible = {
                let mut seq = lock(&state);
                seq.settle(&swap).then(|| snapshot_of(kind, &seq))
            };
            if let Some(visible) = visible {
                events.emit(PageEvent::PanelChanged { snapshot: visible });
            }
        });
        *pending = Some(task);
    }
}

fn snapshot_of(panel: PanelKind, seq: &Sequencer) -> PanelSnapshot {
    PanelSnapshot {
        panel,
        phase: seq.phase(),
        style: seq.phase().style(),
        transitioning: seq.phase().is_transitioning(),
        selection: seq.selection().map(ToString::to_string),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn experience_panel(policy: OverlapPolicy) -> (Panel<Experience>, EventSink) {
        let sink = EventSink::default();
        let panel = Panel::experience(TransitionTimings::default(), policy, sink.clone());
        (panel, sink)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_hivepro_detail() {
        let (panel, _sink) = experience_panel(OverlapPolicy::Overlap);

        assert_eq!(panel.select("hivepro").unwrap(), SelectOutcome::Started);
        assert_eq!(panel.phase(), Phase::Exiting);
        assert!(matches!(panel.view(), PanelView::List(_)));

        advance(310).await;
        assert_eq!(panel.phase(), Phase::Entering);
        assert_eq!(panel.selection().as_deref(), Some("hivepro"));

        advance(30).await;
        assert_eq!(panel.phase(), Phase::Visible);
        let PanelView::Detail(exp) = panel.view() else {
            panic!("expected detail view");
        };
        assert_eq!(exp.company, "Hive Pro");
        assert_eq!(exp.role, "Sr. Software Engineer");
        assert!(exp.tech_stack.contains(&"React"));
        assert!(exp.tech_stack.contains(&"Spring Boot"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_entry_settles_visible() {
        for entry in portfolio::experiences() {
            let (panel, _sink) = experience_panel(OverlapPolicy::Overlap);
            panel.select(entry.id).unwrap();
            advance(400).await;
            assert_eq!(panel.phase(), Phase::Visible);
            assert_eq!(panel.selection().as_deref(), Some(entry.id));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_current_is_noop() {
        let (panel, sink) = experience_panel(OverlapPolicy::Overlap);
        panel.select("born").unwrap();
        advance(400).await;

        let mut rx = sink.subscribe();
        assert_eq!(panel.select("born").unwrap(), SelectOutcome::Unchanged);
        assert_eq!(panel.phase(), Phase::Visible);
        advance(400).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_entry_rejected() {
        let (panel, _sink) = experience_panel(OverlapPolicy::Overlap);
        let err = panel.select("acme").unwrap_err();
        assert_eq!(
            err,
            PanelError::UnknownEntry {
                panel: PanelKind::Experience,
                id: "acme".to_string()
            }
        );
        assert_eq!(panel.phase(), Phase::Visible);
        assert_eq!(panel.selection(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_returns_to_list() {
        let sink = EventSink::default();
        let panel = Panel::education(
            TransitionTimings::default(),
            OverlapPolicy::Overlap,
            sink,
        );
        panel.select("masters").unwrap();
        advance(400).await;

        panel.back();
        assert_eq!(panel.phase(), Phase::Exiting);
        assert_eq!(panel.selection().as_deref(), Some("masters"));
        advance(400).await;
        assert_eq!(panel.phase(), Phase::Visible);
        assert_eq!(panel.selection(), None);
        assert!(matches!(panel.view(), PanelView::List(list) if list.len() == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_sequence() {
        let (panel, sink) = experience_panel(OverlapPolicy::Overlap);
        let mut rx = sink.subscribe();

        panel.select("stamina").unwrap();
        advance(400).await;

        let mut phases = Vec::new();
        while let Ok(PageEvent::PanelChanged { snapshot }) = rx.try_recv() {
            phases.push((snapshot.phase, snapshot.selection));
        }
        assert_eq!(
            phases,
            vec![
                (Phase::Exiting, None),
                (Phase::Entering, Some("stamina".to_string())),
                (Phase::Visible, Some("stamina".to_string())),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlap_interleaves() {
        let (panel, _sink) = experience_panel(OverlapPolicy::Overlap);
        panel.select("stamina").unwrap();
        advance(100).await;
        panel.select("hivepro").unwrap();

        advance(210).await;
        assert_eq!(panel.selection().as_deref(), Some("stamina"));

        advance(200).await;
        assert_eq!(panel.selection().as_deref(), Some("hivepro"));
        assert_eq!(panel.phase(), Phase::Visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supersede_drops_earlier_swap() {
        let (panel, sink) = experience_panel(OverlapPolicy::Supersede);
        let mut rx = sink.subscribe();

        panel.select("stamina").unwrap();
        advance(100).await;
        panel.select("hivepro").unwrap();
        advance(500).await;

        assert_eq!(panel.selection().as_deref(), Some("hivepro"));
        assert_eq!(panel.phase(), Phase::Visible);

        while let Ok(PageEvent::PanelChanged { snapshot }) = rx.try_recv() {
            assert_ne!(snapshot.selection.as_deref(), Some("stamina"));
        }
    }

    #[test]
    fn test_panel_kind_parse() {
        assert_eq!("education".parse::<PanelKind>().unwrap(), PanelKind::Education);
        assert!("skills".parse::<PanelKind>().is_err());
    }
}
