//! Tunable rules for scoring, hints, and persistence.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_SAVE_KEY, DETAILED_HINT_COST, SCORE_COMPLETION_BONUS, STARTING_LIVES,
};

const DEFAULT_RULES_DATA: &str = include_str!("../assets/data/rules.json");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("rules config could not be parsed: {0}")]
    Parse(String),
    #[error("completion bonus must be greater than zero")]
    ZeroCompletionBonus,
    #[error("starting lives must be positive (got {0})")]
    NonPositiveLives(i32),
    #[error("save key must not be empty")]
    EmptySaveKey,
}

/// Scoring and persistence knobs shared by every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Points awarded each time a level reaches completion.
    #[serde(default = "default_completion_bonus")]
    pub completion_bonus: u32,
    /// Points deducted for a detailed hint. Score saturates at zero.
    #[serde(default = "default_detailed_hint_cost")]
    pub detailed_hint_cost: u32,
    #[serde(default = "default_starting_lives")]
    pub starting_lives: i32,
    /// Key under which progress is written to the store.
    #[serde(default = "default_save_key")]
    pub save_key: String,
}

const fn default_completion_bonus() -> u32 {
    SCORE_COMPLETION_BONUS
}

const fn default_detailed_hint_cost() -> u32 {
    DETAILED_HINT_COST
}

const fn default_starting_lives() -> i32 {
    STARTING_LIVES
}

fn default_save_key() -> String {
    DEFAULT_SAVE_KEY.to_string()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            completion_bonus: default_completion_bonus(),
            detailed_hint_cost: default_detailed_hint_cost(),
            starting_lives: default_starting_lives(),
            save_key: default_save_key(),
        }
    }
}

impl RulesConfig {
    /// Parse and validate a rules document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or any value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_RULES_DATA).unwrap_or_else(|err| {
            log::warn!("embedded rules config rejected ({err}); using built-in defaults");
            Self::default()
        })
    }

    #[must_use]
    pub fn default_config() -> Self {
        Self::load_from_static()
    }

    /// # Errors
    ///
    /// Returns the first rule that is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.completion_bonus == 0 {
            return Err(ConfigError::ZeroCompletionBonus);
        }
        if self.starting_lives <= 0 {
            return Err(ConfigError::NonPositiveLives(self.starting_lives));
        }
        if self.save_key.trim().is_empty() {
            return Err(ConfigError::EmptySaveKey);
        }
        Ok(())
    }

    #[must_use]
    pub fn with_save_key(mut self, key: impl Into<String>) -> Self {
        self.save_key = key.into();
        self
    }
}
