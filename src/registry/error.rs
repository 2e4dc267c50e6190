//! Error types for registry operations.

use crate::lock::LockError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from registry load, save, and assignment.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("could not acquire registry lock: {0}")]
    Lock(#[from] LockError),

    /// The persisted registry failed parsing or invariant validation.
    /// Nothing is written over a corrupt registry.
    #[error("registry {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
