//! Persistence seam for player progress.

use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

use crate::catalog::LevelCatalog;
use crate::config::RulesConfig;
use crate::state::GameState;

/// Storage backend for [`GameState`] snapshots keyed by save name.
pub trait ProgressStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save game state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save(&self, key: &str, state: &GameState) -> Result<(), Self::Error>;

    /// Load game state; `Ok(None)` when nothing was saved under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored data is unreadable or corrupt.
    fn load(&self, key: &str) -> Result<Option<GameState>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the entry cannot be removed.
    fn clear(&self, key: &str) -> Result<(), Self::Error>;
}

/// A failed write. Progress stays correct in memory; the failure is
/// reported rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("failed to persist progress under `{key}`: {message}")]
pub struct PersistFailure {
    pub key: String,
    pub message: String,
}

/// Write `state` under `key`, converting a backend error into a
/// [`PersistFailure`].
///
/// # Errors
///
/// Returns the failure when the backend rejects the write.
pub fn persist<S: ProgressStore>(
    store: &S,
    key: &str,
    state: &GameState,
) -> Result<(), PersistFailure> {
    store.save(key, state).map_err(|err| {
        log::warn!("progress save under `{key}` failed: {err}");
        PersistFailure {
            key: key.to_string(),
            message: err.to_string(),
        }
    })
}

/// Progress to start a session with. Missing or unreadable saves fall back
/// to a fresh state; loaded saves are normalised.
pub fn load_game_state<S: ProgressStore>(
    store: &S,
    catalog: &LevelCatalog,
    config: &RulesConfig,
) -> GameState {
    match store.load(&config.save_key) {
        Ok(Some(state)) => {
            log::debug!(
                "restored progress: score {} with {} completed",
                state.score,
                state.completed_levels.len()
            );
            state.normalized(catalog)
        }
        Ok(None) => GameState::fresh(catalog, config),
        Err(err) => {
            log::warn!(
                "discarding unreadable progress under `{}`: {err}",
                config.save_key
            );
            GameState::fresh(catalog, config)
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("stored progress is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("store is read-only")]
    ReadOnly,
}

/// In-process store holding serialised JSON per key. Clones share the same
/// backing map.
#[derive(Debug, Clone, Default)]
pub struct MemoryProgressStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    read_only: Rc<Cell<bool>>,
}

impl MemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place raw text under `key`, bypassing serialisation.
    pub fn insert_raw(&self, key: &str, raw: impl Into<String>) {
        self.entries.borrow_mut().insert(key.to_string(), raw.into());
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Make subsequent saves fail, to exercise write failures.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }
}

impl ProgressStore for MemoryProgressStore {
    type Error = MemoryStoreError;

    fn save(&self, key: &str, state: &GameState) -> Result<(), Self::Error> {
        if self.read_only.get() {
            return Err(MemoryStoreError::ReadOnly);
        }
        let json = state.to_json()?;
        self.entries.borrow_mut().insert(key.to_string(), json);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<GameState>, Self::Error> {
        self.entries
            .borrow()
            .get(key)
            .map(|raw| GameState::from_json(raw))
            .transpose()
            .map_err(MemoryStoreError::from)
    }

    fn clear(&self, key: &str) -> Result<(), Self::Error> {
        if self.read_only.get() {
            return Err(MemoryStoreError::ReadOnly);
        }
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
