//! Timed hero cross-fade, driven by the frame clock.
//!
//! ```text
//! Pending --trigger--> Crossfading --2.0s--> SecondStage --3.5s--> Done
//!    ^                      |                     |
//!    +-------cancel---------+---------------------+
//! ```
//! Deadlines are measured from the trigger. `Done` is terminal.

use smallvec::SmallVec;

use crate::constants::{REVEAL_AT_SEC, SECOND_STAGE_AT_SEC};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceState {
    Pending,
    Crossfading,
    SecondStage,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceEvent {
    /// Fade the secondary clip into the tertiary one.
    StartSecondFade,
    /// Hide the climber and show the hero tile's own character.
    RevealTileCharacter,
}

#[derive(Clone, Debug)]
pub struct CrossFadeSequence {
    state: SequenceState,
    elapsed: f32,
    second_stage_at: f32,
    reveal_at: f32,
}

impl Default for CrossFadeSequence {
    fn default() -> Self {
        Self::new(SECOND_STAGE_AT_SEC, REVEAL_AT_SEC)
    }
}

impl CrossFadeSequence {
    pub fn new(second_stage_at: f32, reveal_at: f32) -> Self {
        Self {
            state: SequenceState::Pending,
            elapsed: 0.0,
            second_stage_at,
            reveal_at: reveal_at.max(second_stage_at),
        }
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Has the sequence been started (and not cancelled)?
    pub fn is_triggered(&self) -> bool {
        self.state != SequenceState::Pending
    }

    /// Started but not finished.
    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            SequenceState::Crossfading | SequenceState::SecondStage
        )
    }

    /// Start from `Pending`. Returns `false` when already started.
    pub fn trigger(&mut self) -> bool {
        if self.state != SequenceState::Pending {
            return false;
        }
        self.state = SequenceState::Crossfading;
        self.elapsed = 0.0;
        true
    }

    /// Abort a running sequence and re-arm it. A finished sequence stays
    /// finished.
    pub fn cancel(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = SequenceState::Pending;
        self.elapsed = 0.0;
        true
    }

    /// Advance by `delta` seconds, returning the stage events whose deadlines
    /// passed, in order.
    pub fn advance(&mut self, delta: f32) -> SmallVec<[SequenceEvent; 2]> {
        let mut events = SmallVec::new();
        if !self.is_running() {
            return events;
        }
        self.elapsed += delta.max(0.0);
        if self.state == SequenceState::Crossfading && self.elapsed >= self.second_stage_at {
            self.state = SequenceState::SecondStage;
            events.push(SequenceEvent::StartSecondFade);
        }
        if self.state == SequenceState::SecondStage && self.elapsed >= self.reveal_at {
            self.state = SequenceState::Done;
            events.push(SequenceEvent::RevealTileCharacter);
        }
        events
    }
}
