//! Service lifecycle phases.
//!
//! Phases:
//! - Starting
//! - LoadingModel
//! - Serving
//! - Failed (terminal, entered from any phase)
//!
//! Tracks how long each phase lasted so startup cost can be logged once the
//! service begins serving.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase { Starting, LoadingModel, Serving, Failed }

#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
    started_at: Instant,
    phase_started_at: Instant,
    phase_durations: Vec<(Phase, Duration)>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { phase: Phase::Starting, started_at: now, phase_started_at: now, phase_durations: Vec::new() }
    }

    pub fn phase(&self) -> Phase { self.phase }

    /// Moves to the next phase. `Serving` and `Failed` are sticky.
    pub fn advance(&mut self) {
        let next = match self.phase {
            Phase::Starting => Phase::LoadingModel,
            Phase::LoadingModel => Phase::Serving,
            Phase::Serving => Phase::Serving,
            Phase::Failed => Phase::Failed,
        };
        self.transition(next);
    }

    pub fn fail(&mut self) { self.transition(Phase::Failed); }

    pub fn is_serving(&self) -> bool { self.phase == Phase::Serving }

    pub fn durations(&self) -> &[(Phase, Duration)] { &self.phase_durations }

    /// Time from creation until now.
    pub fn elapsed(&self) -> Duration { self.started_at.elapsed() }

    fn transition(&mut self, next: Phase) {
        if next == self.phase { return; }
        let now = Instant::now();
        self.phase_durations.push((self.phase, now - self.phase_started_at));
        self.phase = next;
        self.phase_started_at = now;
    }
}

impl Default for Lifecycle {
    fn default() -> Self { Self::new() }
}
