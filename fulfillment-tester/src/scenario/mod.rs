use anyhow::{Result, ensure};
use fulfillment_game::{Difficulty, GameStatus, Stage, StrategyId};

use crate::logic::{GameTester, SimulationPlan, SimulationSummary};

/// A named simulation plan.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

/// Every run must end in a consistent terminal state.
fn consistent_ending(summary: &SimulationSummary) -> Result<()> {
    let m = &summary.metrics;
    ensure!(summary.game_ended, "game halted after {} turns", m.turns_played);
    ensure!(
        m.final_vitality >= 0 && m.final_vitality <= m.max_vitality,
        "vitality {} outside 0..={}",
        m.final_vitality,
        m.max_vitality
    );
    match m.status {
        GameStatus::GameOver => ensure!(m.final_vitality == 0, "game over with vitality left"),
        GameStatus::Victory => ensure!(
            m.final_stage == Stage::Fulfillment,
            "victory declared in stage {}",
            m.final_stage
        ),
        other => anyhow::bail!("unexpected terminal status {other}"),
    }
    ensure!(
        u32::try_from(summary.turns.len()).ok() == Some(m.challenges_cleared + m.challenges_failed),
        "turn log has {} entries for {} attempts",
        summary.turns.len(),
        m.challenges_cleared + m.challenges_failed
    );
    Ok(())
}

fn stages_in_order(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.turns.windows(2).all(|w| w[0].stage <= w[1].stage),
        "stage went backwards"
    );
    ensure!(
        summary.stage_changes.windows(2).all(|w| w[0] < w[1]),
        "stage advanced out of order: {:?}",
        summary.stage_changes
    );
    if let Some(first) = summary.turns.first() {
        ensure!(first.stage == Stage::Youth, "first turn played in {}", first.stage);
    }
    Ok(())
}

fn turns_are_numbered(summary: &SimulationSummary) -> Result<()> {
    for (expected, entry) in (1..).zip(&summary.turns) {
        ensure!(entry.turn == expected, "turn {} logged as {}", expected, entry.turn);
    }
    Ok(())
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.metrics.turns_played > 0, "no turn was played");
    consistent_ending(summary)
}

fn deterministic_replay(summary: &SimulationSummary) -> Result<()> {
    let plan = SimulationPlan::new(summary.difficulty, summary.strategy);
    let replay = GameTester::new(false).run_plan(&plan, summary.seed)?;
    ensure!(
        replay.fingerprint == summary.fingerprint,
        "replay fingerprint {:016x} differs from {:016x}",
        replay.fingerprint,
        summary.fingerprint
    );
    ensure!(
        replay.metrics == summary.metrics,
        "replay ended with {:?}, original with {:?}",
        replay.metrics,
        summary.metrics
    );
    Ok(())
}

fn save_round_trip(summary: &SimulationSummary) -> Result<()> {
    let Some(restored) = &summary.restored_state else {
        anyhow::bail!("no restored state captured");
    };
    ensure!(
        restored == &summary.final_state,
        "restored game differs from the saved one"
    );
    ensure!(
        restored.score() == summary.metrics.score,
        "score changed across save"
    );
    Ok(())
}

fn mid_game_round_trip(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.turns_played <= 4,
        "plan should stop after four turns"
    );
    save_round_trip(summary)
}

fn strategy_scenario(name: &str, strategy: StrategyId) -> TestScenario {
    TestScenario::simulation(
        name,
        SimulationPlan::new(Difficulty::Normal, strategy)
            .with_expectation(consistent_ending)
            .with_expectation(stages_in_order),
    )
}

fn difficulty_scenario(name: &str, difficulty: Difficulty) -> TestScenario {
    TestScenario::simulation(
        name,
        SimulationPlan::new(difficulty, StrategyId::Weakest)
            .with_expectation(consistent_ending)
            .with_expectation(turns_are_numbered),
    )
}

/// Look up a scenario by key or alias; `difficulty` overrides the plan's default.
pub fn get_scenario(name: &str, difficulty: Option<Difficulty>) -> Option<TestScenario> {
    let scenario = match name.to_lowercase().as_str() {
        "smoke" => TestScenario::simulation(
            "Smoke Test",
            SimulationPlan::new(Difficulty::Normal, StrategyId::First)
                .with_expectation(smoke_expectation),
        ),
        "first-strategy" | "first" => strategy_scenario("First Pick Strategy", StrategyId::First),
        "weakest-strategy" | "weakest" => {
            strategy_scenario("Weakest Pick Strategy", StrategyId::Weakest)
        }
        "strongest-strategy" | "strongest" => {
            strategy_scenario("Strongest Pick Strategy", StrategyId::Strongest)
        }
        "random-strategy" | "random" => {
            strategy_scenario("Random Pick Strategy", StrategyId::Random)
        }
        "deterministic" | "deterministic-replay" => TestScenario::simulation(
            "Deterministic Replay",
            SimulationPlan::new(Difficulty::Normal, StrategyId::Random)
                .with_expectation(deterministic_replay),
        ),
        "save-round-trip" | "save" => TestScenario::simulation(
            "Save Round Trip",
            SimulationPlan::new(Difficulty::Normal, StrategyId::Weakest)
                .with_save_round_trip()
                .with_expectation(save_round_trip),
        ),
        "mid-game-save" => TestScenario::simulation(
            "Mid-Game Save Round Trip",
            SimulationPlan::new(Difficulty::Normal, StrategyId::Strongest)
                .with_max_turns(4)
                .with_save_round_trip()
                .with_expectation(mid_game_round_trip),
        ),
        "easy" => difficulty_scenario("Difficulty Easy", Difficulty::Easy),
        "normal" => difficulty_scenario("Difficulty Normal", Difficulty::Normal),
        "hard" => difficulty_scenario("Difficulty Hard", Difficulty::Hard),
        "expert" => difficulty_scenario("Difficulty Expert", Difficulty::Expert),
        _ => return None,
    };

    Some(match difficulty {
        Some(difficulty) => TestScenario {
            plan: scenario.plan.with_difficulty(difficulty),
            ..scenario
        },
        None => scenario,
    })
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("first-strategy", "First Pick Strategy"),
        ("weakest-strategy", "Weakest Pick Strategy"),
        ("strongest-strategy", "Strongest Pick Strategy"),
        ("random-strategy", "Random Pick Strategy"),
        ("deterministic", "Deterministic Replay"),
        ("save-round-trip", "Save Round Trip"),
        ("mid-game-save", "Mid-Game Save Round Trip"),
        ("easy", "Difficulty Easy"),
        ("normal", "Difficulty Normal"),
        ("hard", "Difficulty Hard"),
        ("expert", "Difficulty Expert"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::LogicTester;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, description) in list_scenarios() {
            let scenario = get_scenario(key, None).unwrap();
            assert_eq!(scenario.name, description);
        }
        assert!(get_scenario("nope", None).is_none());
    }

    #[test]
    fn difficulty_override_applies() {
        let scenario = get_scenario("smoke", Some(Difficulty::Expert)).unwrap();
        assert_eq!(scenario.plan.difficulty, Difficulty::Expert);
        assert_eq!(scenario.plan.expectations.len(), 1);
    }

    #[test]
    fn every_scenario_passes_on_a_fixed_seed() {
        let tester = LogicTester::new(GameTester::new(false));
        for (key, _) in list_scenarios() {
            let scenario = get_scenario(key, None).unwrap();
            let results = tester.run_scenario(&scenario, &[1337], 2);
            assert!(results[0].passed, "{key}: {:?}", results[0].failures);
        }
    }
}
