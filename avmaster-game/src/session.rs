//! The live game session: one player's progress plus the level attempt in
//! front of them.

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CableType, CatalogError, Level, LevelCatalog};
use crate::completion::{CompletionReport, CompletionStatus, check_completion, complete_level};
use crate::config::RulesConfig;
use crate::connection::{
    Connection, ConnectionId, ConnectorRef, Endpoint, InstanceId, InvalidConnection, Position,
};
use crate::constants::SECONDS_PER_MINUTE;
use crate::events::SessionEvent;
use crate::hints::{basic_hints, detailed_hints};
use crate::progress::{ConnectionCategory, ConnectionProgress, recompute};
use crate::rules::{RuleMatch, evaluate};
use crate::state::GameState;
use crate::store::{PersistFailure, ProgressStore, load_game_state, persist};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no level is loaded")]
    NoActiveLevel,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("level `{level_id}` is locked")]
    Locked { level_id: String },
    #[error("toolbar has no slot {slot}")]
    UnknownSlot { slot: usize },
    #[error("no more `{name}` left to place")]
    ToolbarExhausted { name: String },
    #[error("{instance} is not on stage")]
    UnknownInstance { instance: InstanceId },
    #[error("{instance} has no connector {connector}")]
    UnknownConnector {
        instance: InstanceId,
        connector: usize,
    },
    #[error("a connector cannot be connected to itself")]
    SameConnector,
    #[error("no crew member `{crew_id}` on this level")]
    UnknownCrew { crew_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedEquipment {
    pub id: InstanceId,
    /// Index into the level's equipment list.
    pub slot: usize,
    pub kind: String,
    pub name: String,
    pub position: Position,
    pub crew: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolbarItem {
    pub slot: usize,
    pub name: String,
    pub quantity: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub instance: InstanceId,
    pub completion: Option<CompletionReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionOutcome {
    Connected {
        connection: Connection,
        /// Present when this connection completed the level.
        completion: Option<CompletionReport>,
    },
    Rejected(InvalidConnection),
}

impl ConnectionOutcome {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    #[must_use]
    pub const fn completion(&self) -> Option<&CompletionReport> {
        match self {
            Self::Connected { completion, .. } => completion.as_ref(),
            Self::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrewAssignment {
    Accepted,
    Rejected { qualified: Vec<String> },
}

/// Readiness summary of the current attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub level_id: String,
    pub missing: Vec<(ConnectionCategory, u32)>,
    pub unplaced: u32,
    pub crew_complete: bool,
    pub ready: bool,
}

/// Working state for one attempt at a level. Discarded on exit, restart,
/// or loading another level.
#[derive(Debug, Clone)]
pub struct LevelAttempt<'c> {
    level: &'c Level,
    placed: Vec<PlacedEquipment>,
    connections: Vec<Connection>,
    progress: ConnectionProgress,
    remaining: Vec<u32>,
    status: AttemptStatus,
    rejected: u32,
    last_rejected: Option<InvalidConnection>,
}

impl<'c> LevelAttempt<'c> {
    fn new(level: &'c Level) -> Self {
        Self {
            level,
            placed: Vec::new(),
            connections: Vec::new(),
            progress: ConnectionProgress::for_level(level),
            remaining: level.equipment.iter().map(|spec| spec.quantity).collect(),
            status: AttemptStatus::InProgress,
            rejected: 0,
            last_rejected: None,
        }
    }

    #[must_use]
    pub const fn level(&self) -> &'c Level {
        self.level
    }

    #[must_use]
    pub fn placed(&self) -> &[PlacedEquipment] {
        &self.placed
    }

    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    #[must_use]
    pub const fn progress(&self) -> &ConnectionProgress {
        &self.progress
    }

    #[must_use]
    pub const fn status(&self) -> AttemptStatus {
        self.status
    }

    #[must_use]
    pub const fn rejected_count(&self) -> u32 {
        self.rejected
    }

    #[must_use]
    pub const fn last_rejected(&self) -> Option<&InvalidConnection> {
        self.last_rejected.as_ref()
    }

    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&PlacedEquipment> {
        self.placed.iter().find(|placed| placed.id == id)
    }

    #[must_use]
    pub fn toolbar(&self) -> Vec<ToolbarItem> {
        self.level
            .equipment
            .iter()
            .zip(&self.remaining)
            .enumerate()
            .map(|(slot, (spec, remaining))| ToolbarItem {
                slot,
                name: spec.name.clone(),
                quantity: spec.quantity,
                remaining: *remaining,
            })
            .collect()
    }

    #[must_use]
    pub fn unplaced(&self) -> u32 {
        self.remaining
            .iter()
            .fold(0_u32, |acc, left| acc.saturating_add(*left))
    }

    /// Cabled levels are ready when every category is satisfied; levels
    /// without cabling are ready once the whole toolbar is on stage.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        if self.level.requires_connections() {
            check_completion(&self.progress) == CompletionStatus::Complete
        } else {
            self.unplaced() == 0
        }
    }

    /// Every placed instance that needs crew has a qualified operator, and
    /// at least one such instance exists. Levels without crew requirements
    /// are always complete.
    #[must_use]
    pub fn crew_complete(&self) -> bool {
        if self.level.crew_requirements.is_empty() {
            return true;
        }
        let mut staffed = 0_u32;
        for placed in &self.placed {
            let qualified = self.level.crew_for(&placed.kind);
            if qualified.is_empty() {
                continue;
            }
            match &placed.crew {
                Some(crew) if qualified.contains(crew) => staffed += 1,
                _ => return false,
            }
        }
        staffed > 0
    }

    fn endpoint(&self, at: ConnectorRef) -> Result<Endpoint, SessionError> {
        let placed = self
            .instance(at.instance)
            .ok_or(SessionError::UnknownInstance {
                instance: at.instance,
            })?;
        let spec = self
            .level
            .equipment
            .get(placed.slot)
            .and_then(|equipment| equipment.connectors.get(at.connector))
            .ok_or(SessionError::UnknownConnector {
                instance: at.instance,
                connector: at.connector,
            })?;
        Ok(Endpoint {
            at,
            kind: spec.kind,
            position: placed.position.offset_by(spec.position),
        })
    }
}

/// Render elapsed seconds as `MM:SS`.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!(
        "{:02}:{:02}",
        seconds / SECONDS_PER_MINUTE,
        seconds % SECONDS_PER_MINUTE
    )
}

/// Owns the player's [`GameState`] and the current [`LevelAttempt`], and
/// routes every state change through the catalog, rules, and store.
pub struct GameSession<'c, S: ProgressStore> {
    catalog: &'c LevelCatalog,
    config: RulesConfig,
    store: S,
    state: GameState,
    attempt: Option<LevelAttempt<'c>>,
    clock_running: bool,
    next_instance: u64,
    next_connection: u64,
    events: Vec<SessionEvent>,
}

impl<'c, S: ProgressStore> GameSession<'c, S> {
    /// Start a session from whatever progress the store holds.
    pub fn new(catalog: &'c LevelCatalog, config: RulesConfig, store: S) -> Self {
        let state = load_game_state(&store, catalog, &config);
        Self::with_state(catalog, config, store, state)
    }

    pub const fn with_state(
        catalog: &'c LevelCatalog,
        config: RulesConfig,
        store: S,
        state: GameState,
    ) -> Self {
        Self {
            catalog,
            config,
            store,
            state,
            attempt: None,
            clock_running: false,
            next_instance: 0,
            next_connection: 0,
            events: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn catalog(&self) -> &'c LevelCatalog {
        self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &RulesConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    #[must_use]
    pub const fn attempt(&self) -> Option<&LevelAttempt<'c>> {
        self.attempt.as_ref()
    }

    #[must_use]
    pub fn current_level(&self) -> Option<&'c Level> {
        self.attempt.as_ref().map(LevelAttempt::level)
    }

    #[must_use]
    pub fn progress(&self) -> Option<&ConnectionProgress> {
        self.attempt.as_ref().map(LevelAttempt::progress)
    }

    /// Agrees with [`LevelAttempt::is_ready`], so levels without cabling
    /// stay incomplete until the toolbar is empty.
    #[must_use]
    pub fn completion_status(&self) -> Option<CompletionStatus> {
        self.attempt.as_ref().map(|attempt| {
            if attempt.status == AttemptStatus::Complete || attempt.is_ready() {
                CompletionStatus::Complete
            } else {
                CompletionStatus::Incomplete
            }
        })
    }

    #[must_use]
    pub const fn is_clock_running(&self) -> bool {
        self.clock_running
    }

    /// Take every event raised since the last drain.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Begin a fresh attempt at `id`. An unknown id leaves no level loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Catalog`] when the id is not in the catalog.
    pub fn load_level(&mut self, id: &str) -> Result<&LevelAttempt<'c>, SessionError> {
        let catalog = self.catalog;
        let level = match catalog.get_level(id) {
            Ok(level) => level,
            Err(err) => {
                log::error!("cannot load level: {err}");
                self.attempt = None;
                self.clock_running = false;
                return Err(err.into());
            }
        };

        self.state.time = 0;
        self.clock_running = true;
        self.events.push(SessionEvent::LevelLoaded {
            level_id: level.id.clone(),
        });
        log::info!("loaded level {} ({})", level.id, level.title);
        Ok(&*self.attempt.insert(LevelAttempt::new(level)))
    }

    /// Load a level the player picked from the menu. Only unlocked or
    /// completed levels may be entered.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Locked`] for an inaccessible level, or a
    /// catalog error for an unknown id.
    pub fn select_level(&mut self, id: &str) -> Result<&LevelAttempt<'c>, SessionError> {
        if self.catalog.contains(id) && !self.state.is_accessible(id) {
            log::debug!("refusing locked level {id}");
            return Err(SessionError::Locked {
                level_id: id.to_string(),
            });
        }
        self.load_level(id)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveLevel`] when nothing is loaded.
    pub fn restart(&mut self) -> Result<&LevelAttempt<'c>, SessionError> {
        let level = self.current_level().ok_or(SessionError::NoActiveLevel)?;
        self.load_level(&level.id)
    }

    /// Move on to the successor of the current level. `Ok(None)` on the
    /// last level.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Locked`] if the successor has not been
    /// unlocked yet.
    pub fn next_level(&mut self) -> Result<Option<&LevelAttempt<'c>>, SessionError> {
        let level = self.current_level().ok_or(SessionError::NoActiveLevel)?;
        let catalog = self.catalog;
        let Some(next) = catalog.next_level(&level.id) else {
            return Ok(None);
        };
        if !self.state.is_accessible(next) {
            return Err(SessionError::Locked {
                level_id: next.to_string(),
            });
        }
        self.load_level(next).map(Some)
    }

    /// Leave the current level, discarding the attempt.
    pub fn exit(&mut self) {
        self.clock_running = false;
        if let Some(attempt) = self.attempt.take() {
            log::debug!("exited level {}", attempt.level.id);
            self.events.push(SessionEvent::LevelExited {
                level_id: attempt.level.id.clone(),
            });
        }
    }

    /// Place one item from toolbar `slot` at `position`.
    ///
    /// # Errors
    ///
    /// Returns an error if no level is loaded, the slot does not exist, or
    /// the slot's quantity is used up.
    pub fn place_equipment(
        &mut self,
        slot: usize,
        position: Position,
    ) -> Result<Placement, SessionError> {
        let attempt = self.attempt.as_mut().ok_or(SessionError::NoActiveLevel)?;
        let level = attempt.level;
        let spec = level
            .equipment
            .get(slot)
            .ok_or(SessionError::UnknownSlot { slot })?;
        let remaining = attempt
            .remaining
            .get_mut(slot)
            .ok_or(SessionError::UnknownSlot { slot })?;
        if *remaining == 0 {
            return Err(SessionError::ToolbarExhausted {
                name: spec.name.clone(),
            });
        }
        *remaining -= 1;

        self.next_instance += 1;
        let instance = InstanceId(self.next_instance);
        attempt.placed.push(PlacedEquipment {
            id: instance,
            slot,
            kind: spec.kind.clone(),
            name: spec.name.clone(),
            position,
            crew: None,
        });
        log::debug!("placed {} as {instance}", spec.name);
        self.events.push(SessionEvent::EquipmentPlaced {
            instance,
            name: spec.name.clone(),
        });

        let completion = self.maybe_complete();
        Ok(Placement {
            instance,
            completion,
        })
    }

    /// Reposition a placed instance; attached cable ends follow it.
    ///
    /// # Errors
    ///
    /// Returns an error if no level is loaded or the instance is unknown.
    pub fn move_equipment(
        &mut self,
        instance: InstanceId,
        position: Position,
    ) -> Result<(), SessionError> {
        let attempt = self.attempt.as_mut().ok_or(SessionError::NoActiveLevel)?;
        let level = attempt.level;
        let placed = attempt
            .placed
            .iter_mut()
            .find(|placed| placed.id == instance)
            .ok_or(SessionError::UnknownInstance { instance })?;
        placed.position = position;
        let connectors = level
            .equipment
            .get(placed.slot)
            .map(|spec| spec.connectors.as_slice())
            .unwrap_or(&[]);

        for connection in &mut attempt.connections {
            for end in [&mut connection.from, &mut connection.to] {
                if end.at.instance != instance {
                    continue;
                }
                if let Some(spec) = connectors.get(end.at.connector) {
                    end.position = position.offset_by(spec.position);
                }
            }
        }
        Ok(())
    }

    /// Propose a connection from one connector to another with `cable`.
    ///
    /// A proposal matching one of the level's rules is stored and counted;
    /// anything else is reported back as rejected and leaves progress
    /// untouched. Duplicate connections are accepted and counted again.
    ///
    /// # Errors
    ///
    /// Returns an error if no level is loaded, an endpoint does not
    /// resolve, or both endpoints are the same connector.
    pub fn attempt_connection(
        &mut self,
        from: ConnectorRef,
        to: ConnectorRef,
        cable: CableType,
    ) -> Result<ConnectionOutcome, SessionError> {
        if from == to {
            return Err(SessionError::SameConnector);
        }
        let attempt = self.attempt.as_mut().ok_or(SessionError::NoActiveLevel)?;
        let from = attempt.endpoint(from)?;
        let to = attempt.endpoint(to)?;
        let level = attempt.level;

        match evaluate(level, from.kind, to.kind, cable) {
            RuleMatch::Unmatched => {
                let invalid = InvalidConnection { from, to, cable };
                attempt.rejected = attempt.rejected.saturating_add(1);
                attempt.last_rejected = Some(invalid);
                log::debug!("rejected {} -> {} with {cable}", from.kind, to.kind);
                self.events.push(SessionEvent::ConnectionRejected {
                    from: from.kind,
                    to: to.kind,
                    cable,
                });
                Ok(ConnectionOutcome::Rejected(invalid))
            }
            RuleMatch::Matched(rule) => {
                self.next_connection += 1;
                let connection = Connection {
                    id: ConnectionId(self.next_connection),
                    from,
                    to,
                    cable: rule.cable,
                    animation: rule.animation,
                };
                attempt.last_rejected = None;
                attempt.connections.push(connection.clone());
                attempt.progress = recompute(level, &attempt.connections);
                log::debug!("connected {} -> {} with {cable}", from.kind, to.kind);
                self.events.push(SessionEvent::ConnectionMade {
                    connection: connection.id,
                    cable: connection.cable,
                    animation: connection.animation,
                });

                let completion = self.maybe_complete();
                Ok(ConnectionOutcome::Connected {
                    connection,
                    completion,
                })
            }
        }
    }

    /// Assign a crew member to operate a placed instance. Unqualified
    /// assignments are rejected and not stored. Crew never gates completion.
    ///
    /// # Errors
    ///
    /// Returns an error if no level is loaded, the instance is unknown, or
    /// the crew id does not belong to this level.
    pub fn assign_crew(
        &mut self,
        instance: InstanceId,
        crew_id: &str,
    ) -> Result<CrewAssignment, SessionError> {
        let attempt = self.attempt.as_mut().ok_or(SessionError::NoActiveLevel)?;
        let level = attempt.level;
        if level.crew_member(crew_id).is_none() {
            return Err(SessionError::UnknownCrew {
                crew_id: crew_id.to_string(),
            });
        }
        let placed = attempt
            .placed
            .iter_mut()
            .find(|placed| placed.id == instance)
            .ok_or(SessionError::UnknownInstance { instance })?;
        let qualified = level.crew_for(&placed.kind);
        if qualified.iter().any(|id| id == crew_id) {
            placed.crew = Some(crew_id.to_string());
            Ok(CrewAssignment::Accepted)
        } else {
            Ok(CrewAssignment::Rejected {
                qualified: qualified.to_vec(),
            })
        }
    }

    #[must_use]
    pub fn crew_complete(&self) -> bool {
        self.attempt
            .as_ref()
            .is_some_and(LevelAttempt::crew_complete)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveLevel`] when nothing is loaded.
    pub fn validation_report(&self) -> Result<ValidationReport, SessionError> {
        let attempt = self.attempt.as_ref().ok_or(SessionError::NoActiveLevel)?;
        let crew_complete = attempt.crew_complete();
        Ok(ValidationReport {
            level_id: attempt.level.id.clone(),
            missing: attempt.progress.missing().into_vec(),
            unplaced: attempt.unplaced(),
            crew_complete,
            ready: attempt.is_ready() && crew_complete,
        })
    }

    /// Free hint listing what is still missing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveLevel`] when nothing is loaded.
    pub fn hint(&mut self) -> Result<Vec<String>, SessionError> {
        let attempt = self.attempt.as_ref().ok_or(SessionError::NoActiveLevel)?;
        let lines = basic_hints(attempt.level, &attempt.progress);
        self.events.push(SessionEvent::HintShown {
            detailed: false,
            cost: 0,
        });
        Ok(lines)
    }

    /// Paid hint with solutions. Deducts the configured cost (never below
    /// zero) and persists the new score.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveLevel`] when nothing is loaded.
    pub fn detailed_hint(&mut self) -> Result<Vec<String>, SessionError> {
        let attempt = self.attempt.as_ref().ok_or(SessionError::NoActiveLevel)?;
        let lines = detailed_hints(attempt.level, &attempt.progress);
        let cost = self.state.deduct(self.config.detailed_hint_cost);
        log::info!("detailed hint cost {cost} (score {})", self.state.score);
        self.events.push(SessionEvent::HintShown {
            detailed: true,
            cost,
        });
        if let Err(failure) = persist(&self.store, &self.config.save_key, &self.state) {
            self.events.push(SessionEvent::ProgressNotSaved(failure));
        }
        Ok(lines)
    }

    pub fn pause(&mut self) {
        self.clock_running = false;
    }

    /// Resume the clock. Has no effect without a loaded, unfinished level.
    pub fn resume(&mut self) {
        self.clock_running = self
            .attempt
            .as_ref()
            .is_some_and(|attempt| attempt.status == AttemptStatus::InProgress);
    }

    /// Advance the clock by `seconds` while it is running.
    pub fn tick(&mut self, seconds: u32) {
        if self.clock_running {
            self.state.time = self.state.time.saturating_add(seconds);
        }
    }

    #[must_use]
    pub fn clock_display(&self) -> String {
        format_clock(self.state.time)
    }

    /// Forget all progress, both in memory and in the store.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistFailure`] if the store could not be cleared; the
    /// in-memory reset still happens.
    pub fn reset_progress(&mut self) -> Result<(), PersistFailure> {
        self.exit();
        self.state = GameState::fresh(self.catalog, &self.config);
        self.store.clear(&self.config.save_key).map_err(|err| {
            log::warn!("could not clear saved progress: {err}");
            PersistFailure {
                key: self.config.save_key.clone(),
                message: err.to_string(),
            }
        })
    }

    fn maybe_complete(&mut self) -> Option<CompletionReport> {
        let attempt = self.attempt.as_mut()?;
        if attempt.status == AttemptStatus::Complete || !attempt.is_ready() {
            return None;
        }
        attempt.status = AttemptStatus::Complete;
        let level = attempt.level;
        self.clock_running = false;

        let report = complete_level(
            &mut self.state,
            &level.id,
            self.catalog,
            &self.config,
            &self.store,
        );
        if let Some(failure) = &report.persist_failure {
            self.events
                .push(SessionEvent::ProgressNotSaved(failure.clone()));
        }
        self.events
            .push(SessionEvent::LevelCompleted(report.clone()));
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;
    use crate::store::MemoryProgressStore;

    fn session() -> GameSession<'static, MemoryProgressStore> {
        GameSession::new(catalog(), RulesConfig::default(), MemoryProgressStore::new())
    }

    fn at(instance: InstanceId, connector: usize) -> ConnectorRef {
        ConnectorRef::new(instance, connector)
    }

    fn place(session: &mut GameSession<'static, MemoryProgressStore>, slot: usize) -> InstanceId {
        session
            .place_equipment(slot, Position::new(100.0, 100.0))
            .unwrap()
            .instance
    }

    #[test]
    fn loading_starts_clean_attempt() {
        let mut session = session();
        let attempt = session.load_level("audio-1").unwrap();
        assert_eq!(attempt.level().id, "audio-1");
        assert!(attempt.connections().is_empty());
        assert_eq!(attempt.status(), AttemptStatus::InProgress);
        assert!(session.is_clock_running());
        assert_eq!(
            session.completion_status(),
            Some(CompletionStatus::Incomplete)
        );
        assert_eq!(
            session.drain_events(),
            vec![SessionEvent::LevelLoaded {
                level_id: "audio-1".into()
            }]
        );
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn unknown_level_clears_attempt() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let err = session.load_level("not-a-level").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Catalog(CatalogError::UnknownLevel { .. })
        ));
        assert!(session.attempt().is_none());
        assert!(!session.is_clock_running());
    }

    #[test]
    fn select_respects_locks() {
        let mut session = session();
        assert!(matches!(
            session.select_level("audio-2"),
            Err(SessionError::Locked { .. })
        ));
        assert!(session.select_level("audio-1").is_ok());
        assert!(matches!(
            session.select_level("nope"),
            Err(SessionError::Catalog(_))
        ));
    }

    #[test]
    fn toolbar_quantities_are_enforced() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        place(&mut session, 2);
        let err = session
            .place_equipment(2, Position::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::ToolbarExhausted { ref name } if name == "Mixing Console"));
        assert!(matches!(
            session.place_equipment(99, Position::default()),
            Err(SessionError::UnknownSlot { slot: 99 })
        ));
        let toolbar = session.attempt().unwrap().toolbar();
        assert_eq!(toolbar[2].remaining, 0);
        assert_eq!(toolbar[0].remaining, 2);
    }

    #[test]
    fn rejected_connection_changes_nothing() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let distro = place(&mut session, 4);
        let console = place(&mut session, 2);
        let before = session.progress().unwrap().clone();

        let outcome = session
            .attempt_connection(at(distro, 0), at(console, 0), CableType::XlrCable)
            .unwrap();
        assert!(!outcome.is_connected());
        assert_eq!(session.progress().unwrap(), &before);
        let attempt = session.attempt().unwrap();
        assert!(attempt.connections().is_empty());
        assert_eq!(attempt.rejected_count(), 1);
        assert!(attempt.last_rejected().is_some());
    }

    #[test]
    fn reversed_direction_is_rejected() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let distro = place(&mut session, 4);
        let console = place(&mut session, 2);
        let outcome = session
            .attempt_connection(at(console, 0), at(distro, 0), CableType::PowerCable)
            .unwrap();
        assert!(matches!(outcome, ConnectionOutcome::Rejected(_)));
    }

    #[test]
    fn endpoint_errors() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let distro = place(&mut session, 4);
        assert!(matches!(
            session.attempt_connection(at(distro, 0), at(distro, 0), CableType::PowerCable),
            Err(SessionError::SameConnector)
        ));
        assert!(matches!(
            session.attempt_connection(at(distro, 0), at(InstanceId(404), 0), CableType::PowerCable),
            Err(SessionError::UnknownInstance { .. })
        ));
        assert!(matches!(
            session.attempt_connection(at(distro, 0), at(distro, 9), CableType::PowerCable),
            Err(SessionError::UnknownConnector { connector: 9, .. })
        ));
    }

    #[test]
    fn duplicate_connections_count_twice() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let distro = place(&mut session, 4);
        let console = place(&mut session, 2);
        for _ in 0..2 {
            let outcome = session
                .attempt_connection(at(distro, 0), at(console, 0), CableType::PowerCable)
                .unwrap();
            assert!(outcome.is_connected());
        }
        let power = session.progress().unwrap().get(ConnectionCategory::Power);
        assert_eq!(power.current, 2);
    }

    #[test]
    fn moving_equipment_drags_cable_ends() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let distro = place(&mut session, 4);
        let console = place(&mut session, 2);
        session
            .attempt_connection(at(distro, 0), at(console, 0), CableType::PowerCable)
            .unwrap();
        session
            .move_equipment(console, Position::new(300.0, 50.0))
            .unwrap();
        let connection = &session.attempt().unwrap().connections()[0];
        assert_eq!(connection.to.position, Position::new(260.0, 50.0));
        assert_eq!(connection.from.position, Position::new(140.0, 100.0));
    }

    #[test]
    fn set_level_completes_when_toolbar_is_placed() {
        let mut session = session();
        session.load_level("set-1").unwrap();
        let slots: Vec<(usize, u32)> = session
            .attempt()
            .unwrap()
            .toolbar()
            .iter()
            .map(|item| (item.slot, item.quantity))
            .collect();
        assert_eq!(
            session.completion_status(),
            Some(CompletionStatus::Incomplete)
        );
        let mut completions = 0;
        for (slot, quantity) in slots {
            for _ in 0..quantity {
                assert_eq!(
                    session.completion_status(),
                    Some(CompletionStatus::Incomplete)
                );
                let placement = session
                    .place_equipment(slot, Position::default())
                    .unwrap();
                if placement.completion.is_some() {
                    completions += 1;
                }
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(
            session.completion_status(),
            Some(CompletionStatus::Complete)
        );
        assert_eq!(session.attempt().unwrap().status(), AttemptStatus::Complete);
        assert!(session.state().is_completed("set-1"));
        assert!(session.state().is_unlocked("set-2"));
        assert_eq!(session.state().score, 100);
        assert!(!session.is_clock_running());
    }

    #[test]
    fn crew_assignment_checks_qualification() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let level = session.current_level().unwrap();
        let (kind, qualified) = level.crew_requirements.iter().next().unwrap();
        let slot = level.equipment.iter().position(|spec| &spec.kind == kind).unwrap();
        let good = qualified[0].clone();
        let bad = level
            .crew
            .iter()
            .map(|member| member.id.clone())
            .find(|id| !qualified.contains(id));
        let instance = place(&mut session, slot);

        if let Some(bad) = bad {
            assert!(matches!(
                session.assign_crew(instance, &bad).unwrap(),
                CrewAssignment::Rejected { .. }
            ));
        }
        assert_eq!(
            session.assign_crew(instance, &good).unwrap(),
            CrewAssignment::Accepted
        );
        assert!(matches!(
            session.assign_crew(instance, "nobody"),
            Err(SessionError::UnknownCrew { .. })
        ));
    }

    fn wire_audio_one(session: &mut GameSession<'static, MemoryProgressStore>) -> Vec<InstanceId> {
        let placed: Vec<InstanceId> = [0, 0, 1, 2, 3, 3, 4]
            .into_iter()
            .map(|slot| place(session, slot))
            .collect();
        let (mic_a, mic_b, receiver, console) = (placed[0], placed[1], placed[2], placed[3]);
        let (speaker_l, speaker_r, distro) = (placed[4], placed[5], placed[6]);
        let plan = [
            (at(distro, 0), at(receiver, 0), CableType::PowerCable),
            (at(distro, 1), at(console, 0), CableType::PowerCable),
            (at(distro, 2), at(speaker_l, 0), CableType::PowerCable),
            (at(distro, 3), at(speaker_r, 0), CableType::PowerCable),
            (at(receiver, 2), at(console, 1), CableType::XlrCable),
            (at(console, 2), at(speaker_l, 1), CableType::XlrCable),
            (at(console, 2), at(speaker_r, 1), CableType::XlrCable),
            (at(mic_a, 0), at(receiver, 1), CableType::WirelessCable),
            (at(mic_b, 0), at(receiver, 1), CableType::WirelessCable),
        ];
        for (from, to, cable) in plan {
            assert!(session.attempt_connection(from, to, cable).unwrap().is_connected());
        }
        placed
    }

    fn staff(session: &mut GameSession<'static, MemoryProgressStore>, placed: &[InstanceId]) {
        for &instance in placed {
            let attempt = session.attempt().unwrap();
            let kind = attempt.instance(instance).unwrap().kind.clone();
            let crew_id = attempt.level().crew_for(&kind)[0].clone();
            assert_eq!(
                session.assign_crew(instance, &crew_id).unwrap(),
                CrewAssignment::Accepted
            );
        }
    }

    #[test]
    fn unstaffed_wiring_is_not_ready() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        wire_audio_one(&mut session);

        let report = session.validation_report().unwrap();
        assert!(report.missing.is_empty());
        assert_eq!(report.unplaced, 0);
        assert!(!report.crew_complete);
        assert!(!report.ready);
        assert!(!session.crew_complete());
        assert!(session.state().is_completed("audio-1"));
    }

    #[test]
    fn qualified_crew_completes_staffing() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let placed: Vec<InstanceId> = [2, 4]
            .into_iter()
            .map(|slot| place(&mut session, slot))
            .collect();
        assert!(!session.crew_complete());

        staff(&mut session, &placed[..1]);
        assert!(!session.crew_complete());
        staff(&mut session, &placed[1..]);
        assert!(session.crew_complete());

        let report = session.validation_report().unwrap();
        assert!(report.crew_complete);
        assert!(!report.ready);
        assert!(!report.missing.is_empty());
    }

    #[test]
    fn set_level_reports_unplaced_items() {
        let mut session = session();
        session.load_level("set-1").unwrap();
        let total = session.current_level().unwrap().toolbar_total();
        place(&mut session, 0);

        let report = session.validation_report().unwrap();
        assert_eq!(report.level_id, "set-1");
        assert!(report.missing.is_empty());
        assert!(report.unplaced > 0);
        assert_eq!(report.unplaced, total - 1);
        assert!(!report.ready);
    }

    #[test]
    fn staffed_and_wired_level_is_ready() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let placed = wire_audio_one(&mut session);
        staff(&mut session, &placed);

        let report = session.validation_report().unwrap();
        assert_eq!(report.level_id, "audio-1");
        assert!(report.missing.is_empty());
        assert_eq!(report.unplaced, 0);
        assert!(report.crew_complete);
        assert!(report.ready);
    }

    #[test]
    fn validation_needs_a_level() {
        assert!(matches!(
            session().validation_report(),
            Err(SessionError::NoActiveLevel)
        ));
        assert!(!session().crew_complete());
    }

    #[test]
    fn detailed_hint_costs_points_and_saturates() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        let lines = session.detailed_hint().unwrap();
        assert!(!lines.is_empty());
        assert_eq!(session.state().score, 0);
        let events = session.drain_events();
        assert!(events.contains(&SessionEvent::HintShown {
            detailed: true,
            cost: 0
        }));
        assert!(session.store().raw("avMasterGameState").is_some());
    }

    #[test]
    fn basic_hint_is_free() {
        let mut session = session();
        assert!(matches!(session.hint(), Err(SessionError::NoActiveLevel)));
        session.load_level("audio-1").unwrap();
        let lines = session.hint().unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(session.state().score, 0);
    }

    #[test]
    fn clock_runs_only_while_playing() {
        let mut session = session();
        session.tick(5);
        assert_eq!(session.state().time, 0);
        session.resume();
        assert!(!session.is_clock_running());

        session.load_level("audio-1").unwrap();
        session.tick(65);
        assert_eq!(session.clock_display(), "01:05");
        session.pause();
        session.tick(10);
        assert_eq!(session.state().time, 65);
        session.resume();
        session.tick(1);
        assert_eq!(session.state().time, 66);

        session.restart().unwrap();
        assert_eq!(session.state().time, 0);
    }

    #[test]
    fn next_level_requires_unlock() {
        let mut session = session();
        assert!(matches!(
            session.next_level(),
            Err(SessionError::NoActiveLevel)
        ));
        session.load_level("audio-1").unwrap();
        assert!(matches!(
            session.next_level(),
            Err(SessionError::Locked { ref level_id }) if level_id == "audio-2"
        ));
        session.load_level("set-3").unwrap();
        assert!(session.next_level().unwrap().is_none());
    }

    #[test]
    fn exit_discards_attempt() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        session.exit();
        assert!(session.attempt().is_none());
        assert!(!session.is_clock_running());
        assert!(matches!(
            session.restart(),
            Err(SessionError::NoActiveLevel)
        ));
    }

    #[test]
    fn reset_progress_clears_store() {
        let mut session = session();
        session.load_level("audio-1").unwrap();
        session.detailed_hint().unwrap();
        session.reset_progress().unwrap();
        assert!(session.store().raw("avMasterGameState").is_none());
        assert_eq!(
            session.state(),
            &GameState::fresh(catalog(), &RulesConfig::default())
        );
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(600), "10:00");
    }
}
