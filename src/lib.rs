//! Syncpoint - process-synchronizing checkpoint service
//!
//! Two processes — one designated Writer and any number of Readers —
//! synchronize through a shared, durable checkpoint region. The Writer
//! commits versioned section updates; Readers always observe a
//! consistent, fully-committed view, never a partial write.
//!
//! # Quick Start
//!
//! ```ignore
//! use syncpoint::{CheckpointService, Client};
//!
//! // Open (or create) the service data directory
//! let service = CheckpointService::open(".syncpoint")?;
//! let client = Client::new(service)?;
//!
//! // Writer process: commit one payload
//! let record = client.run_as_writer(b"Hello world!")?;
//!
//! // Reader process: observe the latest committed payload
//! let got = client.run_as_reader()?;
//! assert_eq!(got.value, b"Hello world!");
//! ```
//!
//! # Architecture
//!
//! The facade sits on a [`CheckpointService`] wiring four layers: the
//! session manager (roles, liveness), the sync protocol engine (commit
//! sequencing and visibility), the in-memory checkpoint store, and the
//! durable checkpoint log with its crash-releasing writer slot.

// Re-export the public surface from syncpoint-api and the contract
// types from syncpoint-core.
pub use syncpoint_api::{CheckpointService, Client, ServiceConfig, CONFIG_FILE_NAME};
pub use syncpoint_core::{
    CheckpointName, CommitRecord, CommitState, CreationAttributes, Error, ProcessId, Result,
    Role, SectionId, Timestamp, Version, Versioned,
};
pub use syncpoint_protocol::{SectionWrite, SyncEngine};
pub use syncpoint_session::{OsProcessProbe, Session, SessionManager, TestProbe};
pub use syncpoint_storage::CheckpointStatus;
pub use syncpoint_durability::DurabilityMode;
