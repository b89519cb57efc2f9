//! AV Master Game Engine
//!
//! Connection validation and level progression for the AV Master stage
//! technician training game. The crate holds all rules and progress
//! bookkeeping; rendering and input belong to the embedding front end.

pub mod catalog;
pub mod completion;
pub mod config;
pub mod connection;
pub mod constants;
pub mod events;
pub mod hints;
pub mod progress;
pub mod rules;
pub mod session;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use catalog::{
    Animation, CableSpec, CableType, CatalogError, ConnectionRule, ConnectorSpec, ConnectorType,
    CrewMember, Difficulty, EquipmentSpec, Level, LevelCatalog, LevelCategory, MountPosition,
    catalog,
};
pub use completion::{CompletionReport, CompletionStatus, check_completion, complete_level};
pub use config::{ConfigError, RulesConfig};
pub use connection::{
    Connection, ConnectionId, ConnectorRef, Endpoint, InstanceId, InvalidConnection, Position,
};
pub use events::SessionEvent;
pub use hints::{basic_hints, detailed_hints};
pub use progress::{
    CategoryProgress, ConnectionCategory, ConnectionProgress, recompute, required_counts,
};
pub use rules::{RuleMatch, accepted_cables, cable_choices, evaluate};
pub use session::{
    AttemptStatus, ConnectionOutcome, CrewAssignment, GameSession, LevelAttempt, Placement,
    PlacedEquipment, SessionError, ToolbarItem, ValidationReport, format_clock,
};
pub use state::GameState;
pub use store::{
    MemoryProgressStore, MemoryStoreError, PersistFailure, ProgressStore, load_game_state,
    persist,
};
