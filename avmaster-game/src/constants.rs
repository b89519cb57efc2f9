// Scoring
pub(crate) const SCORE_COMPLETION_BONUS: u32 = 100;
pub(crate) const DETAILED_HINT_COST: u32 = 50;

// Player defaults
pub(crate) const STARTING_LIVES: i32 = 3;
pub const DEFAULT_SAVE_KEY: &str = "avMasterGameState";

// Connector geometry relative to an equipment instance's placement point
pub(crate) const CONNECTOR_OFFSET_X: f32 = 40.0;
pub(crate) const CONNECTOR_OFFSET_Y: f32 = 30.0;

// Clock
pub(crate) const SECONDS_PER_MINUTE: u32 = 60;
