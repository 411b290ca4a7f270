//! Persistence boundary for checkpoints.

use super::{Checkpoint, CheckpointError};
use crate::core::{Context, State};
use std::collections::HashMap;

/// Somewhere checkpoints can be kept between runs.
///
/// The machine never persists anything itself; hosts call
/// `Machine::checkpoint` and hand the result to a store.
pub trait CheckpointStore<S: State, C: Context> {
    fn save(&mut self, key: &str, checkpoint: &Checkpoint<S, C>) -> Result<(), CheckpointError>;

    fn load(&self, key: &str) -> Result<Checkpoint<S, C>, CheckpointError>;

    /// Forget a checkpoint. Returns false if nothing was stored under `key`.
    fn remove(&mut self, key: &str) -> bool;
}

/// In-process store keeping checkpoints as JSON strings.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl<S: State, C: Context> CheckpointStore<S, C> for MemoryStore {
    fn save(&mut self, key: &str, checkpoint: &Checkpoint<S, C>) -> Result<(), CheckpointError> {
        let json = checkpoint.to_json()?;
        self.entries.insert(key.to_string(), json);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Checkpoint<S, C>, CheckpointError> {
        let json = self
            .entries
            .get(key)
            .ok_or_else(|| CheckpointError::NotFound(key.to_string()))?;
        Checkpoint::from_json(json)
    }

    fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}
