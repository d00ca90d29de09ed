use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::logic::game_tester::{GameTester, SimulationPlan, SimulationSummary};
use crate::scenario::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    tester: GameTester,
}

impl LogicTester {
    pub const fn new(tester: GameTester) -> Self {
        Self { tester }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.tester.verbose() {
                println!(
                    "🧪 Testing scenario: {} (difficulty: {} strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.difficulty,
                    scenario.plan.strategy,
                    seed
                );
            }

            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let (successes, failures, performance_data) =
            self.run_simulation_iterations(&scenario.plan, seed, iterations);

        let avg_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration: avg_duration,
            performance_data,
        }
    }

    fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> (usize, Vec<String>, Vec<Duration>) {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match self.tester.run_plan(plan, iteration_seed) {
                Ok(summary) => summary,
                Err(err) => {
                    failures.push(format!(
                        "Iteration {} (difficulty {}, strategy {}, seed {iteration_seed}): engine error: {err:#}",
                        i + 1,
                        plan.difficulty,
                        plan.strategy
                    ));
                    if self.tester.verbose() {
                        println!(
                            "  ❌ Iteration {}/{} errored: {}",
                            i + 1,
                            iterations,
                            format!("{err:#}").red()
                        );
                    }
                    continue;
                }
            };

            if let Some(err) = evaluate_expectations(plan, &summary) {
                let metrics = &summary.metrics;
                failures.push(format!(
                    "Iteration {} (difficulty {}, strategy {}, seed {}, turns {}, ending {}): {} | {} | final vitality {}/{} score {}",
                    i + 1,
                    summary.difficulty,
                    summary.strategy,
                    summary.seed,
                    metrics.turns_played,
                    summary.ending_label(),
                    err,
                    summarize_recent_turns(&summary),
                    metrics.final_vitality,
                    metrics.max_vitality,
                    metrics.score
                ));

                if self.tester.verbose() {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.clone().red()
                    );
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);

                if self.tester.verbose() {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) turns:{} ending:{} score:{}",
                        i + 1,
                        iterations,
                        summary.metrics.turns_played,
                        summary.ending_label(),
                        summary.metrics.score
                    );
                }
            }
        }

        (successes, failures, performance_data)
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    for expectation in &plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn summarize_recent_turns(summary: &SimulationSummary) -> String {
    if summary.turns.is_empty() {
        return "no turns recorded".to_string();
    }

    summary
        .turns
        .iter()
        .rev()
        .take(3)
        .map(|entry| {
            format!(
                "turn {} ({}): {} {}/{} -> vitality {}",
                entry.turn,
                entry.stage,
                entry.challenge,
                entry.total_power,
                entry.required_power,
                entry.vitality_after
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fulfillment_game::{Difficulty, StrategyId};

    fn scenario(plan: SimulationPlan) -> TestScenario {
        TestScenario::simulation("Unit", plan)
    }

    #[test]
    fn passing_scenario_reports_every_iteration() {
        let tester = LogicTester::new(GameTester::new(false));
        let plan = SimulationPlan::new(Difficulty::Normal, StrategyId::First);
        let results = tester.run_scenario(&scenario(plan), &[1, 2], 2);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));
        assert!(results.iter().all(|r| r.successful_iterations == 2));
        assert_eq!(results[1].seed, 2);
    }

    #[test]
    fn failed_expectation_is_collected() {
        let tester = LogicTester::new(GameTester::new(false));
        let plan = SimulationPlan::new(Difficulty::Normal, StrategyId::First)
            .with_expectation(|_: &SimulationSummary| -> anyhow::Result<()> {
                anyhow::bail!("always fails")
            });
        let results = tester.run_scenario(&scenario(plan), &[9], 3);
        let result = &results[0];
        assert!(!result.passed);
        assert_eq!(result.successful_iterations, 0);
        assert_eq!(result.failures.len(), 3);
        assert!(result.failures[0].contains("always fails"));
        assert!(result.performance_data.is_empty());
        assert_eq!(result.average_duration, Duration::ZERO);
    }

    #[test]
    fn results_serialize_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: "Smoke".into(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let encoded = serde_json::to_string(&result).unwrap();
        let json: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(json["average_duration"], 12);
        assert_eq!(json["performance_data"][0], 12);
        let back: ScenarioResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(back.average_duration, result.average_duration);
    }
}
