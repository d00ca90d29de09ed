pub mod game_tester;
pub mod playability;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use game_tester::{GameTester, PlayabilityMetrics, SimulationPlan, SimulationSummary};
pub use playability::{
    PlayabilityAggregate, PlayabilityRecord, aggregate_playability, run_playability_analysis,
};
pub use seeds::resolve_seed_inputs;
pub use tester::*;
