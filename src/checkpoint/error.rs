//! Checkpoint error types.

use crate::builder::DefinitionError;
use thiserror::Error;

/// Errors raised while encoding, decoding, storing or resuming checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("JSON checkpoint encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary checkpoint encoding failed: {0}")]
    Binary(#[from] bincode::Error),

    /// Checkpoint was written by an incompatible format version
    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The definition a checkpoint is resumed against is itself invalid
    #[error("cannot resume against an invalid definition: {0}")]
    Definition(#[from] DefinitionError),

    /// The saved active states do not form a path of the definition
    #[error("checkpoint configuration does not fit the definition: {0}")]
    InvalidConfiguration(String),

    #[error("No checkpoint stored under '{0}'")]
    NotFound(String),
}
