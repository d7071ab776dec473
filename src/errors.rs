// src/errors.rs

//! Crate-wide error types.
//!
//! - [`AppvisorError`] covers configuration and host wiring.
//! - [`SupervisorError`] is the supervisor's failure taxonomy. All variants
//!   except [`SupervisorError::AlreadyStarted`] are recovered locally and only
//!   surface through logs and [`crate::supervisor::ModuleSupervisor::last_failure`].
//! - [`BoundaryError`] is what an isolation host reports.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppvisorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Duplicate application name: {0}")]
    DuplicateApplication(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("application directory {0:?} does not exist")]
    MissingDirectory(PathBuf),

    #[error("application config {0:?} does not exist")]
    MissingConfig(PathBuf),

    #[error("peer failed to load the workload")]
    PeerLoadFailure,

    #[error("failed to create isolation boundary: {0}")]
    BoundaryCreateFailure(String),

    #[error("failed to destroy isolation boundary after {attempts} attempts: {reason}")]
    BoundaryDestroyFailure { attempts: u32, reason: String },

    #[error("supervisor for '{0}' is already started")]
    AlreadyStarted(String),
}

#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("boundary '{name}' could not be created: {reason}")]
    Create { name: String, reason: String },

    #[error("boundary '{0}' is closed")]
    Closed(String),

    #[error("could not instantiate {type_name} inside boundary '{boundary}': {reason}")]
    Instantiate {
        boundary: String,
        type_name: &'static str,
        reason: String,
    },

    #[error("boundary '{name}' could not be destroyed: {reason}")]
    Destroy { name: String, reason: String },

    #[error("invalid components config {path:?}: {reason}")]
    Components { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AppvisorError>;
