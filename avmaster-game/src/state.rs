use serde::{Deserialize, Serialize};

use crate::catalog::LevelCatalog;
use crate::config::RulesConfig;

/// Persistent player progress.
///
/// Every field is required when deserialising so a partial or foreign
/// document is rejected as a whole rather than half-applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub score: u32,
    pub lives: i32,
    /// Seconds elapsed on the current attempt. Not meaningful across loads.
    pub time: u32,
    pub completed_levels: Vec<String>,
    pub unlocked_levels: Vec<String>,
}

impl GameState {
    /// A new player: zero score, configured lives, and only the first level
    /// of the catalog unlocked.
    #[must_use]
    pub fn fresh(catalog: &LevelCatalog, config: &RulesConfig) -> Self {
        Self {
            score: 0,
            lives: config.starting_lives,
            time: 0,
            completed_levels: Vec::new(),
            unlocked_levels: catalog
                .first_level()
                .map(|id| vec![id.to_string()])
                .unwrap_or_default(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the JSON is not a complete game state.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Repair a loaded state: drop duplicates and ids the catalog does not
    /// know, keep the first level unlocked, and reset the clock.
    #[must_use]
    pub fn normalized(mut self, catalog: &LevelCatalog) -> Self {
        dedup_known(&mut self.completed_levels, catalog);
        dedup_known(&mut self.unlocked_levels, catalog);
        if let Some(first) = catalog.first_level() {
            if !self.is_unlocked(first) {
                self.unlocked_levels.insert(0, first.to_string());
            }
        }
        self.time = 0;
        self
    }

    #[must_use]
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed_levels.iter().any(|done| done == id)
    }

    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked_levels.iter().any(|open| open == id)
    }

    /// Whether the player may enter the level.
    #[must_use]
    pub fn is_accessible(&self, id: &str) -> bool {
        self.is_unlocked(id) || self.is_completed(id)
    }

    /// Returns `true` if the level was not already completed.
    pub fn mark_completed(&mut self, id: &str) -> bool {
        if self.is_completed(id) {
            return false;
        }
        self.completed_levels.push(id.to_string());
        true
    }

    /// Returns `true` if the level was not already unlocked.
    pub fn unlock(&mut self, id: &str) -> bool {
        if self.is_unlocked(id) {
            return false;
        }
        self.unlocked_levels.push(id.to_string());
        true
    }

    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Deducts up to `points`, never below zero. Returns what was taken.
    pub fn deduct(&mut self, points: u32) -> u32 {
        let taken = points.min(self.score);
        self.score -= taken;
        taken
    }
}

fn dedup_known(ids: &mut Vec<String>, catalog: &LevelCatalog) {
    let mut kept: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids.drain(..) {
        if catalog.contains(&id) && !kept.contains(&id) {
            kept.push(id);
        }
    }
    *ids = kept;
}
