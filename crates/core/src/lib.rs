//! Core types and traits for Syncpoint
//!
//! This crate defines the foundational types used throughout the system:
//! - CheckpointName: Validated identifier for a checkpoint region
//! - SectionId: Identifier for the smallest independently-writable unit
//! - ProcessId / Role: Process identity and the Writer/Reader role tag
//! - Version: Monotonic per-checkpoint commit version
//! - Timestamp: Microsecond-precision wall-clock time
//! - Versioned<T>: Value + version + timestamp wrapper returned by reads
//! - CreationAttributes: Size limits fixed at checkpoint creation
//! - CommitRecord / CommitState: Per-write state machine (Staged -> terminal)
//! - Error: Error type hierarchy
//! - LivenessProbe: Pluggable process liveness detection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attrs;
pub mod commit;
pub mod error;
pub mod timestamp;
pub mod traits;
pub mod types;
pub mod version;
pub mod versioned;

pub use attrs::CreationAttributes;
pub use commit::{CommitRecord, CommitState};
pub use error::{Error, Result};
pub use timestamp::Timestamp;
pub use traits::LivenessProbe;
pub use types::{CheckpointName, ProcessId, Role, SectionId, MAX_CHECKPOINT_NAME_LEN};
pub use version::Version;
pub use versioned::Versioned;
