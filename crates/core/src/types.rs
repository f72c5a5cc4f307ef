//! Identity types for checkpoints, sections, and sessions
//!
//! This module defines the foundational identifiers:
//! - CheckpointName: validated name of a checkpoint region
//! - SectionId: identifier of a section within a checkpoint
//! - ProcessId: OS identity of an attached process
//! - Role: Writer/Reader tag carried by every session

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a checkpoint name in bytes
pub const MAX_CHECKPOINT_NAME_LEN: usize = 255;

/// Validated name of a checkpoint region
///
/// The name doubles as the on-disk directory name for the checkpoint,
/// so it must be non-empty, at most [`MAX_CHECKPOINT_NAME_LEN`] bytes,
/// and free of path separators and NUL bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckpointName(String);

impl CheckpointName {
    /// Create a validated checkpoint name
    ///
    /// # Errors
    /// Returns `InvalidName` if the name is empty, too long, or contains
    /// `/`, `\` or NUL.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidName("name must not be empty".to_string()));
        }
        if name.len() > MAX_CHECKPOINT_NAME_LEN {
            return Err(Error::InvalidName(format!(
                "name exceeds {} bytes",
                MAX_CHECKPOINT_NAME_LEN
            )));
        }
        if name.contains(['/', '\\', '\0']) {
            return Err(Error::InvalidName(
                "name must not contain path separators or NUL".to_string(),
            ));
        }
        Ok(CheckpointName(name))
    }

    /// View the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CheckpointName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a section within a checkpoint
///
/// Section ids are arbitrary byte strings, bounded by the checkpoint's
/// `max_section_id_size` creation attribute. The demo applications use
/// short ASCII ids such as `"11"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(Vec<u8>);

impl SectionId {
    /// Create a section id from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        SectionId(bytes.into())
    }

    /// View the id as raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the id in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the id is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SectionId {
    fn from(s: &str) -> Self {
        SectionId(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for SectionId {
    fn from(b: &[u8]) -> Self {
        SectionId(b.to_vec())
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// OS identity of a process attached to a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Identity of the calling process
    pub fn current() -> Self {
        ProcessId(std::process::id())
    }

    /// Wrap a raw OS process id
    pub const fn from_raw(pid: u32) -> Self {
        ProcessId(pid)
    }

    /// The raw OS process id
    pub const fn as_raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a session holds on a checkpoint
///
/// Writer is exclusive per checkpoint; any number of Reader sessions may
/// be attached concurrently. The role is a tagged variant handled
/// exhaustively at the client facade, never a dynamic flag threaded
/// through the protocol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Exclusive mutating role; commits versioned section updates
    Writer,
    /// Shared observing role; reads committed versions only
    Reader,
}

impl Role {
    /// Whether this is the Writer role
    pub const fn is_writer(&self) -> bool {
        matches!(self, Role::Writer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Writer => write!(f, "writer"),
            Role::Reader => write!(f, "reader"),
        }
    }
}
