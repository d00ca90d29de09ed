//! Capability hooks notified by the session as play progresses.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::game::Game;
use crate::session::TurnReport;
use crate::stage::{GameStatus, Stage};

/// Receives session events. Every hook defaults to a no-op.
pub trait GameObserver: Send {
    fn on_turn_resolved(&mut self, _game: &Game, _report: &TurnReport) {}

    fn on_stage_advanced(&mut self, _game: &Game, _from: Stage, _to: Stage) {}

    fn on_game_finished(&mut self, _game: &Game) {}
}

/// One resolved turn as recorded by [`TurnLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnLogEntry {
    pub turn: u32,
    pub stage: Stage,
    pub challenge: String,
    pub required_power: i32,
    pub total_power: i32,
    pub success: bool,
    pub vitality_after: i32,
}

#[derive(Debug, Default)]
struct TurnLogInner {
    entries: Vec<TurnLogEntry>,
    stages: Vec<Stage>,
    finished: Option<GameStatus>,
}

/// Cloneable recorder: register one clone with the session, read the other.
#[derive(Debug, Clone, Default)]
pub struct TurnLog {
    inner: Arc<Mutex<TurnLogInner>>,
}

impl TurnLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut TurnLogInner) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    #[must_use]
    pub fn entries(&self) -> Vec<TurnLogEntry> {
        self.with_inner(|inner| inner.entries.clone())
    }

    /// Stages entered after the first, in order.
    #[must_use]
    pub fn stage_changes(&self) -> Vec<Stage> {
        self.with_inner(|inner| inner.stages.clone())
    }

    #[must_use]
    pub fn finished(&self) -> Option<GameStatus> {
        self.with_inner(|inner| inner.finished)
    }
}

impl GameObserver for TurnLog {
    fn on_turn_resolved(&mut self, _game: &Game, report: &TurnReport) {
        let entry = TurnLogEntry {
            turn: report.turn,
            stage: report.stage,
            challenge: report.result.challenge.name.clone(),
            required_power: report.result.required_power,
            total_power: report.result.total_power,
            success: report.result.success,
            vitality_after: report.result.vitality_after,
        };
        self.with_inner(|inner| inner.entries.push(entry));
    }

    fn on_stage_advanced(&mut self, _game: &Game, _from: Stage, to: Stage) {
        self.with_inner(|inner| inner.stages.push(to));
    }

    fn on_game_finished(&mut self, game: &Game) {
        let status = game.status();
        self.with_inner(|inner| inner.finished = Some(status));
    }
}
