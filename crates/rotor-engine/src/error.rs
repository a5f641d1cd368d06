//! Error types for engine configuration and topology builds.

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating a [`RotorConfig`](crate::RotorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field holds a value the engine cannot run with
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Description of why the value is rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid field error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors reported by the control side of the engine.
///
/// None of these can occur on the realtime thread: configuration is validated
/// in [`PhaseRotator::configure`](crate::PhaseRotator::configure) and topology
/// builds run on the rebuild worker.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Sample rate is zero, negative or not finite
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),

    /// Maximum block size is zero
    #[error("invalid maximum block size: {0}")]
    InvalidBlockSize(u32),

    /// Channel count is zero
    #[error("invalid channel count: {0}")]
    InvalidChannelCount(u32),

    /// Allocating filter state for a topology failed
    #[error("failed to allocate {stages} filter stages: {source}")]
    Allocation {
        /// Requested stage count.
        stages: usize,
        /// Underlying allocation error.
        #[source]
        source: TryReserveError,
    },

    /// The rebuild worker thread could not be started
    #[error("failed to spawn rebuild worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// Invalid engine configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Create an allocation error for a build of `stages` stages.
    pub fn allocation(stages: usize, source: TryReserveError) -> Self {
        EngineError::Allocation { stages, source }
    }
}
