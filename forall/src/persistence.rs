//! Storage of replay records between runs.
//!
//! A failed check leaves its [`GenerationInfo`] in a [`ReplayStore`]; the
//! next run of the same property picks it up as its previous failure, so
//! the configured [`AfterFailureMode`](crate::config::AfterFailureMode)
//! decides what happens with it.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PropertyError;
use crate::execution::{PropertyCheck, PropertyCheckResult};
use crate::generation_info::GenerationInfo;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed replay record {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("replay store lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Check(#[from] PropertyError),
}

/// What is kept about the last failure of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub property_name: String,
    pub generation: GenerationInfo,
    /// Rendered shrunk sample, for humans only
    pub sample: Option<String>,
    pub error_message: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ReplayRecord {
    /// The record of a failed check, `None` for any other outcome
    pub fn from_result(result: &PropertyCheckResult) -> Option<Self> {
        if !result.is_failed() {
            return None;
        }
        Some(Self {
            property_name: result.property_name.clone(),
            generation: result.generation.clone(),
            sample: result.falsified_parameters().map(ToString::to_string),
            error_message: result.error.as_ref().map(ToString::to_string),
            recorded_at: Utc::now(),
        })
    }
}

/// Keeps at most one replay record per property name.
pub trait ReplayStore: Send + Sync {
    fn save(&self, record: &ReplayRecord) -> Result<(), PersistenceError>;

    fn load(&self, property_name: &str) -> Result<Option<ReplayRecord>, PersistenceError>;

    fn remove(&self, property_name: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryReplayStore {
    records: Mutex<HashMap<String, ReplayRecord>>,
}

impl InMemoryReplayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplayStore for InMemoryReplayStore {
    fn save(&self, record: &ReplayRecord) -> Result<(), PersistenceError> {
        let mut records = self.records.lock().map_err(|_| PersistenceError::Poisoned)?;
        records.insert(record.property_name.clone(), record.clone());
        Ok(())
    }

    fn load(&self, property_name: &str) -> Result<Option<ReplayRecord>, PersistenceError> {
        let records = self.records.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(records.get(property_name).cloned())
    }

    fn remove(&self, property_name: &str) -> Result<(), PersistenceError> {
        let mut records = self.records.lock().map_err(|_| PersistenceError::Poisoned)?;
        records.remove(property_name);
        Ok(())
    }
}

/// One pretty-printed JSON file per property below a root directory
#[derive(Debug, Clone)]
pub struct JsonFileReplayStore {
    root_dir: PathBuf,
}

impl JsonFileReplayStore {
    /// Create the store, creating `path` if needed
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let root_dir = path.as_ref().to_path_buf();
        fs::create_dir_all(&root_dir).map_err(|source| PersistenceError::Io {
            path: root_dir.clone(),
            source,
        })?;
        Ok(Self { root_dir })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn path_for(&self, property_name: &str) -> PathBuf {
        let file_name: String = property_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root_dir.join(format!("{}.json", file_name))
    }
}

impl ReplayStore for JsonFileReplayStore {
    fn save(&self, record: &ReplayRecord) -> Result<(), PersistenceError> {
        let path = self.path_for(&record.property_name);
        let json = serde_json::to_string_pretty(record).map_err(|source| PersistenceError::Format {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| PersistenceError::Io { path, source })
    }

    fn load(&self, property_name: &str) -> Result<Option<ReplayRecord>, PersistenceError> {
        let path = self.path_for(property_name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };
        let record: ReplayRecord = serde_json::from_str(&contents)
            .map_err(|source| PersistenceError::Format { path, source })?;
        // Sanitized file names may collide.
        Ok(Some(record).filter(|record| record.property_name == property_name))
    }

    fn remove(&self, property_name: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(property_name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }
}

/// Run `check` with the failure recorded for it in `store`, then record the
/// new failure or forget the old one.
pub fn check_with_store(
    check: PropertyCheck<'_>,
    store: &dyn ReplayStore,
) -> Result<PropertyCheckResult, PersistenceError> {
    let name = check.name().to_string();
    let check = match store.load(&name)? {
        Some(record) => {
            tracing::debug!(property = %name, recorded_at = %record.recorded_at, "Using previous failure");
            check.with_previous_failure(record.generation)
        }
        None => check,
    };

    let result = check.check()?;
    match ReplayRecord::from_result(&result) {
        Some(record) => store.save(&record)?,
        None => store.remove(&name)?,
    }
    Ok(result)
}
