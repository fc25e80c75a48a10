//! List ⇄ detail view transition sequencing.
//!
//! A panel swaps its content in three phases:
//!
//! ```text
//! visible ──select/back──▶ exiting ──exit delay──▶ entering ──N frames──▶ visible
//!                                   (selection swaps here)
//! ```
//!
//! [`Sequencer`] is the pure state machine. It knows nothing about clocks;
//! callers drive it with the [`PendingSwap`] tickets it hands out. The
//! [`crate::panel::Panel`] controller is the tokio-driven host used by the
//! server.
//!
//! # Example
//!
//! ```rust
//! use portfolio_engine::transition::{OverlapPolicy, Phase, Sequencer};
//!
//! let mut seq = Sequencer::new(OverlapPolicy::Overlap);
//! let swap = seq.select("hivepro").unwrap();
//! assert_eq!(seq.phase(), Phase::Exiting);
//!
//! seq.complete_exit(&swap);
//! assert_eq!(seq.phase(), Phase::Entering);
//! assert_eq!(seq.selection(), Some("hivepro"));
//!
//! seq.settle(&swap);
//! assert_eq!(seq.phase(), Phase::Visible);
//! ```

mod scheduler;

pub use scheduler::DelayedTask;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between starting the exit and swapping the content.
pub const DEFAULT_EXIT_DELAY: Duration = Duration::from_millis(300);

/// One display refresh at 60 Hz.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Frames to wait after the swap so the entering style is painted at least once.
pub const DEFAULT_SETTLE_FRAMES: u32 = 2;

/// Visibility phase of a panel's content container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Steady state.
    #[default]
    Visible,
    /// Fading out the old content.
    Exiting,
    /// New content is in place but still styled as hidden.
    Entering,
}

impl Phase {
    /// CSS classes applied to the transition container.
    #[must_use]
    pub fn style(self) -> &'static str {
        match self {
            Self::Visible => "opacity-100 translate-y-0 scale-100 filter-none",
            Self::Exiting => "opacity-0 -translate-y-4 scale-95 blur-sm",
            Self::Entering => "opacity-0 translate-y-4 scale-95 blur-sm",
        }
    }

    /// Whether a transition is in flight.
    #[must_use]
    pub fn is_transitioning(self) -> bool {
        !matches!(self, Self::Visible)
    }
}

/// What happens when a transition starts while another is still pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Earlier handoffs still run and may interleave with the new one.
    #[default]
    Overlap,
    /// The newest transition wins; earlier tickets become stale.
    Supersede,
}

/// Timing parameters for one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTimings {
    pub exit_delay: Duration,
    pub frame_interval: Duration,
    pub settle_frames: u32,
}

impl Default for TransitionTimings {
    fn default() -> Self {
        Self {
            exit_delay: DEFAULT_EXIT_DELAY,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            settle_frames: DEFAULT_SETTLE_FRAMES,
        }
    }
}

/// Ticket for one started transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSwap {
    target: Option<String>,
    generation: u64,
}

impl PendingSwap {
    /// Selection that will be applied when the exit completes.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Three-phase selection state machine.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    selection: Option<String>,
    phase: Phase,
    generation: u64,
    policy: OverlapPolicy,
}

impl Sequencer {
    #[must_use]
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    #[must_use]
    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Start a transition towards `id`.
    ///
    /// Returns `None` without touching any state when `id` is already selected.
    pub fn select(&mut self, id: &str) -> Option<PendingSwap> {
        if self.selection.as_deref() == Some(id) {
            return None;
        }
        Some(self.begin(Some(id.to_string())))
    }

    /// Start a transition back to the list view.
    pub fn back(&mut self) -> PendingSwap {
        self.begin(None)
    }

    fn begin(&mut self, target: Option<String>) -> PendingSwap {
        self.generation += 1;
        self.phase = Phase::Exiting;
        PendingSwap {
            target,
            generation: self.generation,
        }
    }

    /// Swap the selection and switch to `entering`.
    ///
    /// Returns `false` when the ticket was superseded and nothing changed.
    pub fn complete_exit(&mut self, swap: &PendingSwap) -> bool {
        if self.is_stale(swap) {
            return false;
        }
        self.selection.clone_from(&swap.target);
        self.phase = Phase::Entering;
        true
    }

    /// Finish the transition.
    ///
    /// Returns `false` when the ticket was superseded and nothing changed.
    pub fn settle(&mut self, swap: &PendingSwap) -> bool {
        if self.is_stale(swap) {
            return false;
        }
        self.phase = Phase::Visible;
        true
    }

    fn is_stale(&self, swap: &PendingSwap) -> bool {
        self.policy == OverlapPolicy::Supersede && swap.generation != self.generation
    }
}
