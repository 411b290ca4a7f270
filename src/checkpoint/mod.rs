//! Checkpoint and resume functionality for machines.
//!
//! This module provides serialization and deserialization of machine images,
//! enabling long-running workflows to survive process restarts. A checkpoint
//! captures the active configuration, the context, retry counters and
//! history. Actions, guards and services are code and stay in the definition;
//! resuming pairs a checkpoint with the definition it was taken from.

use crate::core::{Context, State, StateHistory};
use crate::machine::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod error;
pub mod store;

pub use error::CheckpointError;
pub use store::{CheckpointStore, MemoryStore};

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Metadata tracked by a machine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineMetadata {
    /// When the machine was created
    pub created_at: DateTime<Utc>,

    /// Last committed change
    pub updated_at: DateTime<Utc>,

    /// Number of committed transitions
    pub generation: u64,

    /// Lifecycle status at capture time
    pub status: Status,
}

impl Default for MachineMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            generation: 0,
            status: Status::NotStarted,
        }
    }
}

/// Serializable image of a machine.
/// Does NOT include actions, guards or services (not serializable).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Checkpoint<S: State, C: Context> {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// Active states, top-level first
    pub configuration: Vec<S>,

    /// Machine context
    pub context: C,

    /// Failure counts per operation
    pub retries: BTreeMap<String, u32>,

    /// Recorded transition history
    pub history: StateHistory<S>,

    /// Machine metadata
    pub metadata: MachineMetadata,
}

impl<S: State, C: Context> Checkpoint<S, C> {
    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON, rejecting unsupported versions.
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)?;
        checkpoint.validate_version()?;
        Ok(checkpoint)
    }

    /// Encode with bincode.
    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bincode, rejecting unsupported versions.
    ///
    /// Bincode is not self-describing, so contexts holding
    /// `serde_json::Value` (such as `JsonContext`) must use JSON instead.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self = bincode::deserialize(bytes)?;
        checkpoint.validate_version()?;
        Ok(checkpoint)
    }

    pub fn validate_version(&self) -> Result<(), CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        Ok(())
    }
}
