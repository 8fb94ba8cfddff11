//! Sequencer playback states.

use crate::animation::Animation;
use crate::sequencer::TransitionKind;
use std::time::Duration;

/// A constructed, entered run-list entry.
pub struct ActiveEntry {
    pub index: usize,
    pub animation: Box<dyn Animation>,
    /// Play time left; also counts down while the entry is incoming
    pub remaining: Duration,
}

impl ActiveEntry {
    pub fn name(&self) -> &str {
        self.animation.name()
    }
}

/// Exists only while two entries are alive.
pub struct TransitionState {
    pub kind: TransitionKind,
    pub duration: Duration,
    pub elapsed: Duration,
    pub outgoing: ActiveEntry,
    pub incoming: ActiveEntry,
}

impl TransitionState {
    /// Fraction of the transition completed, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0) as f32
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }
}

pub enum PlayState {
    Idle,
    Playing(ActiveEntry),
    Transitioning(TransitionState),
}

impl PlayState {
    pub fn phase(&self) -> Phase {
        match self {
            PlayState::Idle => Phase::Idle,
            PlayState::Playing(entry) => Phase::Playing { index: entry.index },
            PlayState::Transitioning(t) => Phase::Transitioning {
                from: t.outgoing.index,
                to: t.incoming.index,
            },
        }
    }
}

/// Observable summary of [`PlayState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing { index: usize },
    Transitioning { from: usize, to: usize },
}
