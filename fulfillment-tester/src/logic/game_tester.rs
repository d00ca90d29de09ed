use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fulfillment_game::{
    CardCatalog, Difficulty, EmbeddedCatalog, FileStorage, Game, GameConfig, GameEngine,
    GameSession, GameStatus, GameStorage, MemoryStorage, Stage, StrategyId, TurnLog, TurnLogEntry,
    TurnOutcome,
};

/// Hard stop for runaway sessions; a full game resolves far fewer turns.
pub const DEFAULT_MAX_TURNS: u32 = 500;
const ROUND_TRIP_SLOT: &str = "tester";

/// Keeps concurrent round trips sharing a save directory on distinct slots.
static ROUND_TRIPS: AtomicU64 = AtomicU64::new(0);

/// What to simulate and what must hold afterwards.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub difficulty: Difficulty,
    pub strategy: StrategyId,
    pub max_turns: Option<u32>,
    pub save_round_trip: bool,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(difficulty: Difficulty, strategy: StrategyId) -> Self {
        Self {
            difficulty,
            strategy,
            max_turns: None,
            save_round_trip: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    #[must_use]
    pub const fn with_save_round_trip(mut self) -> Self {
        self.save_round_trip = true;
        self
    }

    #[must_use]
    pub const fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Per-run numbers used by expectations and playability reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayabilityMetrics {
    pub turns_played: u32,
    pub final_vitality: i32,
    pub max_vitality: i32,
    pub final_stage: Stage,
    pub status: GameStatus,
    pub score: i32,
    pub challenges_cleared: u32,
    pub challenges_failed: u32,
    pub dreams_fulfilled: u32,
    pub insurances_purchased: u32,
    pub damage_absorbed: u32,
}

impl PlayabilityMetrics {
    fn from_game(game: &Game, turns_played: u32) -> Self {
        let stats = game.stats();
        Self {
            turns_played,
            final_vitality: game.vitality().value(),
            max_vitality: game.max_vitality(),
            final_stage: game.stage(),
            status: game.status(),
            score: game.score(),
            challenges_cleared: stats.challenges_cleared,
            challenges_failed: stats.challenges_failed,
            dreams_fulfilled: stats.dreams_fulfilled,
            insurances_purchased: stats.insurances_purchased,
            damage_absorbed: stats.damage_absorbed,
        }
    }

    #[must_use]
    pub const fn is_victory(&self) -> bool {
        matches!(self.status, GameStatus::Victory)
    }
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub difficulty: Difficulty,
    pub strategy: StrategyId,
    pub turns: Vec<TurnLogEntry>,
    pub stage_changes: Vec<Stage>,
    pub metrics: PlayabilityMetrics,
    pub final_state: Game,
    /// Hash of the turn log; equal seeds and plans must produce equal fingerprints.
    pub fingerprint: u64,
    /// The final state after a save and load, when the plan asked for one.
    pub restored_state: Option<Game>,
    pub game_ended: bool,
}

impl SimulationSummary {
    #[must_use]
    pub fn ending_label(&self) -> &'static str {
        self.metrics.status.as_str()
    }
}

/// Headless deterministic runner for the core game logic.
#[derive(Debug, Clone, Default)]
pub struct GameTester {
    verbose: bool,
    save_dir: Option<PathBuf>,
}

impl GameTester {
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self {
            verbose,
            save_dir: None,
        }
    }

    /// Route save round trips through files under `dir` instead of memory.
    #[must_use]
    pub fn with_save_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.save_dir = dir;
        self
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Play one game for `plan` on `seed` and summarise it.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects an operation or a save round
    /// trip fails.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let catalog = Arc::new(CardCatalog::default_catalog());
        let game = Game::new(GameConfig::for_difficulty(plan.difficulty), catalog, seed)
            .context("creating game")?;
        let log = TurnLog::new();
        let mut session = GameSession::new(game);
        session.add_observer(log.clone());
        session.start().context("starting game")?;

        let max_turns = plan.max_turns.unwrap_or(DEFAULT_MAX_TURNS);
        let mut strategy = plan.strategy;
        let mut turns_played = 0;
        while turns_played < max_turns {
            match session
                .play_turn(&mut strategy)
                .with_context(|| format!("turn {}", session.game().turn()))?
            {
                TurnOutcome::Resolved(report) => {
                    turns_played += 1;
                    if self.verbose {
                        let marker = if report.result.success {
                            "✓".green()
                        } else {
                            "✗".red()
                        };
                        println!(
                            "    {marker} turn {} [{}] {} {}/{} vitality {}",
                            report.turn,
                            report.stage,
                            report.result.challenge.name,
                            report.result.total_power,
                            report.result.required_power,
                            report.result.vitality_after
                        );
                    }
                    if report.status.is_terminal() {
                        break;
                    }
                }
                TurnOutcome::Victory | TurnOutcome::Finished { .. } => break,
            }
        }

        let restored_state = if plan.save_round_trip || self.save_dir.is_some() {
            Some(self.round_trip(&session, seed)?)
        } else {
            None
        };

        let final_state = session.into_game();
        let turns = log.entries();
        Ok(SimulationSummary {
            seed,
            difficulty: plan.difficulty,
            strategy: plan.strategy,
            fingerprint: fingerprint(seed, &turns)?,
            stage_changes: log.stage_changes(),
            metrics: PlayabilityMetrics::from_game(&final_state, turns_played),
            game_ended: final_state.is_finished(),
            final_state,
            turns,
            restored_state,
        })
    }

    fn round_trip(&self, session: &GameSession, seed: u64) -> Result<Game> {
        let slot = format!(
            "{ROUND_TRIP_SLOT}-{seed}-{}",
            ROUND_TRIPS.fetch_add(1, Ordering::Relaxed)
        );
        match &self.save_dir {
            Some(dir) => {
                let engine = GameEngine::new(EmbeddedCatalog, FileStorage::new(dir));
                let restored = save_and_load(&engine, &slot, session)?;
                engine.delete_save(&slot).context("removing round-trip save")?;
                Ok(restored)
            }
            None => {
                let engine = GameEngine::new(EmbeddedCatalog, MemoryStorage::new());
                save_and_load(&engine, &slot, session)
            }
        }
    }
}

fn save_and_load<S: GameStorage>(
    engine: &GameEngine<EmbeddedCatalog, S>,
    slot: &str,
    session: &GameSession,
) -> Result<Game> {
    engine
        .save_game(slot, session)
        .with_context(|| format!("saving slot {slot}"))?;
    let Some(data) = engine
        .load_game(slot)
        .with_context(|| format!("loading slot {slot}"))?
    else {
        bail!("slot {slot} vanished after saving");
    };
    Ok(data.game_state)
}

fn fingerprint(seed: u64, turns: &[TurnLogEntry]) -> Result<u64> {
    let bytes = serde_json::to_vec(turns).context("encoding turn log")?;
    Ok(twox_hash::XxHash64::oneshot(seed, &bytes))
}
