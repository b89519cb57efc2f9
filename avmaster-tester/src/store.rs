use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use avmaster_game::{GameState, ProgressStore};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("could not access save file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("save file {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Progress store backed by a single JSON file holding one entry per key.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn read_entries(&self) -> Result<BTreeMap<String, Value>, FileStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(FileStoreError::Io {
                    path: self.display_path(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| FileStoreError::Corrupt {
            path: self.display_path(),
            source,
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, Value>) -> Result<(), FileStoreError> {
        let json = serde_json::to_string_pretty(entries).map_err(|source| {
            FileStoreError::Corrupt {
                path: self.display_path(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(|source| FileStoreError::Io {
            path: self.display_path(),
            source,
        })
    }
}

impl ProgressStore for JsonFileStore {
    type Error = FileStoreError;

    fn save(&self, key: &str, state: &GameState) -> Result<(), Self::Error> {
        // A corrupt file is replaced; an unreadable one is left alone.
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(FileStoreError::Corrupt { .. }) => BTreeMap::new(),
            Err(err) => return Err(err),
        };
        let value = serde_json::to_value(state).map_err(|source| FileStoreError::Corrupt {
            path: self.display_path(),
            source,
        })?;
        entries.insert(key.to_string(), value);
        self.write_entries(&entries)
    }

    fn load(&self, key: &str) -> Result<Option<GameState>, Self::Error> {
        let entries = self.read_entries()?;
        entries
            .get(key)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|source| FileStoreError::Corrupt {
                path: self.display_path(),
                source,
            })
    }

    fn clear(&self, key: &str) -> Result<(), Self::Error> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
