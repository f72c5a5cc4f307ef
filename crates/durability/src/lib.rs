//! Persisted checkpoint state
//!
//! Each checkpoint region persists as a directory under the service data
//! dir:
//!
//! ```text
//! <data-dir>/<checkpoint-name>/
//!   meta           checkpoint uuid, creation attributes, creation time
//!   ckpt.log       header + CRC32-framed commit records, append-only
//!   writer.lock    active-writer marker, held under an OS advisory lock
//! ```
//!
//! The log is the durable form of the commit history: a record is the
//! durable image of one completed commit. A record whose frame fails
//! validation (torn tail after a crash mid-commit) is dropped on replay
//! and the file is truncated to the last valid frame — which is exactly
//! how an interrupted commit finalizes as aborted.
//!
//! The writer slot is an `fs2` advisory file lock. The OS releases it
//! when the holding process dies, so a crashed writer never permanently
//! locks the checkpoint.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod log;
pub mod meta;
pub mod mode;
pub mod paths;
pub mod reader;
pub mod recovery;
pub mod writer_slot;

pub use format::{CommitFrame, FrameError, LogHeader, SectionUpdate, LOG_HEADER_SIZE};
pub use log::CheckpointLog;
pub use meta::CheckpointMeta;
pub use mode::DurabilityMode;
pub use paths::CheckpointPaths;
pub use reader::{read_log, ReadStopReason};
pub use recovery::{recover_checkpoint, scan_checkpoints, RecoveredCheckpoint};
pub use writer_slot::{WriterMarker, WriterSlot};
