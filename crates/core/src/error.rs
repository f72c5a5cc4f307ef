//! Error types for the checkpoint service
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Store and engine errors propagate unmodified to the client facade.
//! Usage errors are a CLI concern and never enter this type.

use crate::types::{CheckpointName, ProcessId, Role, SectionId};
use crate::version::Version;
use std::io;
use thiserror::Error;

/// Result type alias for checkpoint operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the checkpoint service
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (checkpoint log, writer slot, metadata files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Checkpoint absent and the caller is a Reader (Readers cannot create)
    #[error("Checkpoint not found: {0}")]
    NotFound(CheckpointName),

    /// Section absent (or expired) in an existing checkpoint
    #[error("Section not found: {0}")]
    SectionNotFound(SectionId),

    /// A second Writer attempted to attach while one is active
    #[error("Checkpoint {name} already has an active writer (pid {holder})")]
    ConflictingWriter {
        /// Checkpoint being attached
        name: CheckpointName,
        /// Process holding the writer slot
        holder: ProcessId,
    },

    /// Invalid role transition for a process on a checkpoint
    #[error("Process {process} already holds a {held} session on {name}")]
    RoleConflict {
        /// Checkpoint being attached
        name: CheckpointName,
        /// Process attempting the attach
        process: ProcessId,
        /// Role it already holds
        held: Role,
    },

    /// Persistence failed while a commit was staged; prior versions intact
    #[error("Write aborted at {version}: {reason}")]
    AbortedWrite {
        /// Version the aborted commit would have published
        version: Version,
        /// What failed during staging
        reason: String,
    },

    /// A creation-attribute limit was exceeded
    #[error("Limit exceeded: {what} is {actual}, limit is {limit}")]
    LimitExceeded {
        /// Which limit was violated
        what: &'static str,
        /// Observed quantity
        actual: usize,
        /// Configured limit
        limit: usize,
    },

    /// Malformed checkpoint name
    #[error("Invalid checkpoint name: {0}")]
    InvalidName(String),

    /// Operation invalid in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Data corruption detected in persisted state
    #[error("Data corruption: {0}")]
    Corruption(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
