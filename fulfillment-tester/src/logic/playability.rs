use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::logic::{GameTester, PlayabilityMetrics, SimulationPlan};
use fulfillment_game::numbers::usize_to_f64;
use fulfillment_game::{Difficulty, StrategyId};

#[derive(Debug, Clone, Serialize)]
pub struct PlayabilityRecord {
    pub scenario_name: String,
    pub difficulty: Difficulty,
    pub strategy: StrategyId,
    pub seed: u64,
    pub metrics: PlayabilityMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayabilityAggregate {
    pub scenario_name: String,
    pub difficulty: Difficulty,
    pub strategy: StrategyId,
    pub iterations: usize,
    pub win_rate: f64,
    pub mean_turns: f64,
    pub std_turns: f64,
    pub mean_final_vitality: f64,
    pub mean_score: f64,
    pub mean_insurances: f64,
}

fn scenario_label(difficulty: Difficulty, strategy: StrategyId) -> String {
    format!("Playability {difficulty}/{strategy}")
}

/// Play every strategy on each difficulty for every seed and iteration.
///
/// # Errors
///
/// Returns the first engine error raised by a simulation.
pub fn run_playability_analysis(
    tester: &GameTester,
    difficulties: &[Difficulty],
    seeds: &[u64],
    iterations: usize,
) -> Result<Vec<PlayabilityRecord>> {
    let mut records = Vec::new();
    for &difficulty in difficulties {
        for strategy in StrategyId::ALL {
            let plan = SimulationPlan::new(difficulty, strategy);
            for &seed in seeds {
                for i in 0..iterations.max(1) {
                    let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
                    let summary = tester.run_plan(&plan, iteration_seed)?;
                    records.push(PlayabilityRecord {
                        scenario_name: scenario_label(difficulty, strategy),
                        difficulty,
                        strategy,
                        seed: iteration_seed,
                        metrics: summary.metrics,
                    });
                }
            }
        }
    }
    Ok(records)
}

#[must_use]
pub fn aggregate_playability(records: &[PlayabilityRecord]) -> Vec<PlayabilityAggregate> {
    let mut grouped: BTreeMap<(usize, usize), Vec<&PlayabilityRecord>> = BTreeMap::new();
    for record in records {
        let key = (
            Difficulty::ALL
                .iter()
                .position(|d| *d == record.difficulty)
                .unwrap_or(usize::MAX),
            StrategyId::ALL
                .iter()
                .position(|s| *s == record.strategy)
                .unwrap_or(usize::MAX),
        );
        grouped.entry(key).or_default().push(record);
    }

    grouped
        .into_values()
        .filter_map(|group| {
            let first = group.first()?;
            let turns: Vec<f64> = group
                .iter()
                .map(|r| f64::from(r.metrics.turns_played))
                .collect();
            let (mean_turns, std_turns) = mean_and_std_dev(&turns);
            let wins = group.iter().filter(|r| r.metrics.is_victory()).count();
            Some(PlayabilityAggregate {
                scenario_name: first.scenario_name.clone(),
                difficulty: first.difficulty,
                strategy: first.strategy,
                iterations: group.len(),
                win_rate: ratio(wins, group.len()),
                mean_turns,
                std_turns,
                mean_final_vitality: mean(group.iter().map(|r| f64::from(r.metrics.final_vitality))),
                mean_score: mean(group.iter().map(|r| f64::from(r.metrics.score))),
                mean_insurances: mean(
                    group
                        .iter()
                        .map(|r| f64::from(r.metrics.insurances_purchased)),
                ),
            })
        })
        .collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        usize_to_f64(part) / usize_to_f64(whole)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / usize_to_f64(count) }
}

fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let center = mean(values.iter().copied());
    let variance = mean(values.iter().map(|v| (v - center).powi(2)));
    (center, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fulfillment_game::{GameStatus, Stage};

    fn metrics(turns: u32, status: GameStatus, vitality: i32) -> PlayabilityMetrics {
        PlayabilityMetrics {
            turns_played: turns,
            final_vitality: vitality,
            max_vitality: 100,
            final_stage: Stage::Youth,
            status,
            score: vitality,
            challenges_cleared: 0,
            challenges_failed: 0,
            dreams_fulfilled: 0,
            insurances_purchased: 1,
            damage_absorbed: 0,
        }
    }

    fn record(strategy: StrategyId, turns: u32, status: GameStatus, vitality: i32) -> PlayabilityRecord {
        PlayabilityRecord {
            scenario_name: scenario_label(Difficulty::Normal, strategy),
            difficulty: Difficulty::Normal,
            strategy,
            seed: 1,
            metrics: metrics(turns, status, vitality),
        }
    }

    #[test]
    fn aggregates_group_by_difficulty_and_strategy() {
        let records = vec![
            record(StrategyId::First, 10, GameStatus::Victory, 40),
            record(StrategyId::First, 20, GameStatus::GameOver, 0),
            record(StrategyId::Weakest, 12, GameStatus::Victory, 80),
        ];
        let aggregates = aggregate_playability(&records);
        assert_eq!(aggregates.len(), 2);

        let first = &aggregates[0];
        assert_eq!(first.strategy, StrategyId::First);
        assert_eq!(first.iterations, 2);
        assert!((first.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((first.mean_turns - 15.0).abs() < f64::EPSILON);
        assert!((first.std_turns - 5.0).abs() < f64::EPSILON);
        assert!((first.mean_final_vitality - 20.0).abs() < f64::EPSILON);

        assert_eq!(aggregates[1].strategy, StrategyId::Weakest);
        assert!((aggregates[1].win_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn analysis_covers_every_strategy() {
        let tester = GameTester::new(false);
        let records = run_playability_analysis(&tester, &[Difficulty::Easy], &[7], 1).unwrap();
        assert_eq!(records.len(), StrategyId::ALL.len());
        assert!(records.iter().all(|r| r.metrics.status.is_terminal()));
    }

    #[test]
    fn empty_input_yields_no_aggregates() {
        assert!(aggregate_playability(&[]).is_empty());
    }
}
