//! Error types for the runtime and the thread registry.

use std::{io, path::PathBuf};

use thiserror::Error;

use super::thread::ThreadStatus;

/// Failures reported by [`ThreadRegistry`](super::thread::ThreadRegistry).
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("thread registry is not initialized")]
    NotInitialized,
    #[error("thread registry is already initialized")]
    AlreadyInitialized,
    #[error("thread already exists: {0}")]
    NameTaken(String),
    #[error("thread not found: {0}")]
    NotFound(String),
    #[error("maximum thread count would be exceeded ({requested} requested, {max} allowed)")]
    CapacityExceeded { requested: usize, max: usize },
    #[error("thread pool already exists: {0}")]
    PoolExists(String),
    #[error("thread pool not found: {0}")]
    PoolNotFound(String),
    #[error("thread {name} is {status:?}, cannot {action}")]
    InvalidStatus {
        name: String,
        status: ThreadStatus,
        action: &'static str,
    },
    #[error("failed to spawn thread {name}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to set {what} for thread {name}")]
    Platform {
        name: String,
        what: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Failure reported by a subsystem collaborator.
#[derive(Debug, Error)]
#[error("{name}: {reason}")]
pub struct SubsystemError {
    pub name: String,
    pub reason: String,
}

impl SubsystemError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Failures reported by [`Engine`](super::engine::Engine).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is already initialized")]
    AlreadyInitialized,
    #[error("thread registry: {0}")]
    Threads(#[from] ThreadError),
    #[error("subsystem failed to initialize: {0}")]
    Subsystem(#[from] SubsystemError),
    #[error("failed to open log file {path}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures loading an [`EngineConfig`](super::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
