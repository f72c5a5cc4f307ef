//! Per-checkpoint handle
//!
//! A `CheckpointHandle` ties together everything one checkpoint needs:
//! the in-memory region state, the persisted identity, and the commit
//! sequencer with its log append handle. The sequencer serializes the
//! version-assignment and publication steps of commits on this
//! checkpoint only; handles for different checkpoints share nothing.

use parking_lot::Mutex;

use syncpoint_core::Timestamp;
use syncpoint_durability::{CheckpointLog, CheckpointMeta, CheckpointPaths, LOG_HEADER_SIZE};
use syncpoint_storage::CheckpointState;

use std::sync::Arc;

/// State guarded by the commit sequencer
#[derive(Debug)]
pub(crate) struct CommitSlot {
    /// Append handle, opened by the first commit after service open
    pub(crate) log: Option<CheckpointLog>,
    /// Where valid frames end, from recovery; the first open truncates here
    pub(crate) valid_end: u64,
}

/// One open checkpoint region
pub struct CheckpointHandle {
    pub(crate) state: Arc<CheckpointState>,
    pub(crate) meta: CheckpointMeta,
    pub(crate) paths: CheckpointPaths,
    /// Commit sequencer: one logical lock per checkpoint, guarding
    /// version assignment and publication order only
    pub(crate) sequencer: Mutex<CommitSlot>,
}

impl CheckpointHandle {
    pub(crate) fn new(
        state: Arc<CheckpointState>,
        meta: CheckpointMeta,
        paths: CheckpointPaths,
        valid_end: u64,
    ) -> Self {
        CheckpointHandle {
            state,
            meta,
            paths,
            sequencer: Mutex::new(CommitSlot {
                log: None,
                valid_end,
            }),
        }
    }

    pub(crate) fn fresh(
        state: Arc<CheckpointState>,
        meta: CheckpointMeta,
        paths: CheckpointPaths,
    ) -> Self {
        Self::new(state, meta, paths, LOG_HEADER_SIZE as u64)
    }

    /// The live region state (sections, version counter, history)
    ///
    /// Reads go straight here; they never touch the sequencer.
    pub fn state(&self) -> &Arc<CheckpointState> {
        &self.state
    }

    /// Persisted identity and creation attributes
    pub fn meta(&self) -> &CheckpointMeta {
        &self.meta
    }

    /// When the checkpoint was created
    pub fn created_at(&self) -> Timestamp {
        self.meta.created_at()
    }

    /// On-disk layout of this checkpoint
    pub fn paths(&self) -> &CheckpointPaths {
        &self.paths
    }
}

impl std::fmt::Debug for CheckpointHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointHandle")
            .field("name", self.state.name())
            .field("current_version", &self.state.current_version())
            .finish()
    }
}
