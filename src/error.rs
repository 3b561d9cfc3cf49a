//! Error types for configuration loading and replay verification.
//!
//! Gameplay itself never fails: rejected actions surface as
//! `DuelEvent::CommandRejected` instead.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config extension: {0:?} (expected .ron or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Recording hash mismatch: stored {stored:#018x}, computed {computed:#018x}")]
    IntegrityMismatch { stored: u64, computed: u64 },

    #[error("Replay diverged: expected digest {expected}, got {actual}")]
    Diverged { expected: String, actual: String },

    #[error("Unsupported replay version {0}")]
    UnsupportedVersion(u32),

    #[error("Replay serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
