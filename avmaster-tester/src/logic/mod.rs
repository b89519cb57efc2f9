pub mod audit;
pub mod game_tester;
pub mod planner;
pub mod player;
pub mod policy;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use game_tester::{GameTester, RunKind, RunSummary, SimulationPlan};
pub use policy::PlayerStrategy;
pub use seeds::resolve_seed_inputs;
pub use tester::*;
