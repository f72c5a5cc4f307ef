//! The sync protocol engine
//!
//! Owns every open checkpoint and drives the commit protocol:
//!
//! 1. Assign the next version under the checkpoint's commit sequencer
//!    (strictly increasing, no gaps; an aborted commit's number goes to
//!    the next attempt)
//! 2. Stage the update as a `CommitRecord`
//! 3. Append the durable frame; a failure here finalizes the record as
//!    `Aborted` and nothing becomes visible
//! 4. Publish the section payloads, advance the visible version, flip
//!    the completion flag
//!
//! Once the completion flag is set the commit is final; nothing cancels
//! or rolls it back short of a later commit overwriting the sections.
//! Readers never take the sequencer: `read` observes whatever is
//! published at call time.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use syncpoint_core::{
    CheckpointName, CommitRecord, CreationAttributes, Error, Result, SectionId, Timestamp,
    Version, Versioned,
};
use syncpoint_durability::{
    recover_checkpoint, scan_checkpoints, CheckpointLog, CheckpointMeta, CheckpointPaths,
    CommitFrame, DurabilityMode, LogHeader, RecoveredCheckpoint, SectionUpdate,
};
use syncpoint_storage::{CheckpointState, StoredSection};

use crate::handle::{CheckpointHandle, CommitSlot};

/// One section update inside a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionWrite {
    /// Section to update (created if absent)
    pub section: SectionId,
    /// Full replacement payload
    pub payload: Vec<u8>,
    /// Absolute expiration for the section, if it should expire
    pub expiration: Option<Timestamp>,
}

impl SectionWrite {
    /// A non-expiring section update
    pub fn new(section: SectionId, payload: Vec<u8>) -> Self {
        SectionWrite {
            section,
            payload,
            expiration: None,
        }
    }
}

/// The engine: open checkpoints plus the commit protocol over them
///
/// Operations on different checkpoints are fully independent; there is
/// no cross-checkpoint locking anywhere in the engine.
pub struct SyncEngine {
    data_dir: PathBuf,
    mode: DurabilityMode,
    handles: DashMap<CheckpointName, Arc<CheckpointHandle>>,
}

impl SyncEngine {
    /// Open the engine over a data directory, recovering every
    /// checkpoint found there
    pub fn open(data_dir: impl Into<PathBuf>, mode: DurabilityMode) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let engine = SyncEngine {
            data_dir: data_dir.clone(),
            mode,
            handles: DashMap::new(),
        };

        for paths in scan_checkpoints(&data_dir)? {
            let recovered = recover_checkpoint(&paths)?;
            let handle = Self::rebuild(recovered, paths)?;
            engine
                .handles
                .insert(handle.state().name().clone(), Arc::new(handle));
        }

        info!(
            target: "syncpoint::protocol",
            data_dir = %data_dir.display(),
            checkpoints = engine.handles.len(),
            "Engine open"
        );
        Ok(engine)
    }

    /// Rebuild in-memory state from a recovered checkpoint
    ///
    /// Frames must carry consecutive versions starting at 1; anything
    /// else means the log was tampered with or mis-assembled.
    fn rebuild(recovered: RecoveredCheckpoint, paths: CheckpointPaths) -> Result<CheckpointHandle> {
        let name = recovered.meta.checkpoint_name()?;
        let state = Arc::new(CheckpointState::restore(
            name,
            recovered.meta.attrs,
            recovered.meta.created_at(),
            Version::ZERO,
        ));

        let mut expected = Version::ZERO;
        for frame in &recovered.frames {
            let version = frame.commit_version();
            if version != expected.next() {
                return Err(Error::Corruption(format!(
                    "log for {} jumps from {} to {}",
                    state.name(),
                    expected,
                    version
                )));
            }
            for update in &frame.updates {
                state.publish(
                    update.section(),
                    Arc::new(StoredSection::new(
                        update.payload.clone(),
                        version,
                        frame.committed_at(),
                        update.expiration(),
                    )),
                );
            }
            state.advance_version(version);
            let mut record = CommitRecord::staged(
                version,
                frame.updates.iter().map(|u| u.section()).collect(),
            );
            record.complete(frame.committed_at());
            state.record_commit(record);
            expected = version;
        }

        Ok(CheckpointHandle::new(
            state,
            recovered.meta,
            paths,
            recovered.valid_end,
        ))
    }

    /// Open a checkpoint, creating it on disk if absent
    ///
    /// This is the Writer open path. Returns the handle and whether this
    /// call created the checkpoint. The registry entry is held locked
    /// across the on-disk creation so two concurrent creators cannot
    /// race.
    pub fn open_or_create(
        &self,
        name: &CheckpointName,
        attrs: CreationAttributes,
    ) -> Result<(Arc<CheckpointHandle>, bool)> {
        match self.handles.entry(name.clone()) {
            Entry::Occupied(entry) => Ok((entry.get().clone(), false)),
            Entry::Vacant(entry) => {
                let paths = CheckpointPaths::new(&self.data_dir, name);
                std::fs::create_dir_all(&paths.dir)?;
                let meta = CheckpointMeta::new(name, attrs);
                meta.write_to(&paths.meta())?;

                let state = Arc::new(CheckpointState::restore(
                    name.clone(),
                    attrs,
                    meta.created_at(),
                    Version::ZERO,
                ));
                let handle = Arc::new(CheckpointHandle::fresh(state, meta, paths));
                info!(target: "syncpoint::protocol", checkpoint = %name, "Checkpoint created");
                Ok((entry.insert(handle).clone(), true))
            }
        }
    }

    /// Look up an open checkpoint
    ///
    /// This is the Reader open path; Readers cannot create.
    ///
    /// # Errors
    /// `NotFound` if no checkpoint exists under this name.
    pub fn lookup(&self, name: &CheckpointName) -> Result<Arc<CheckpointHandle>> {
        self.handles
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound(name.clone()))
    }

    /// Commit a set of section updates as one version
    ///
    /// Blocks only on this checkpoint's commit sequencer, never on
    /// readers. On success every update is durable and visible under the
    /// returned record's version. On persistence failure the commit
    /// finalizes as aborted, prior versions stay intact and visible, and
    /// the version number is reused by the next commit.
    pub fn commit(
        &self,
        name: &CheckpointName,
        writes: Vec<SectionWrite>,
    ) -> Result<CommitRecord> {
        let handle = self.lookup(name)?;
        if writes.is_empty() {
            return Err(Error::InvalidOperation(
                "commit with no section updates".to_string(),
            ));
        }

        let attrs = handle.meta().attrs;
        for write in &writes {
            attrs.check_section_id(write.section.len())?;
            attrs.check_payload(write.payload.len())?;
        }

        let mut slot = handle.sequencer.lock();

        let fresh: BTreeSet<&SectionId> = writes
            .iter()
            .map(|w| &w.section)
            .filter(|id| !handle.state().contains_section(id))
            .collect();
        attrs.check_section_count(handle.state().section_count() + fresh.len())?;

        // Step 1-2: assign the version and stage.
        let version = handle.state().current_version().next();
        let mut record = CommitRecord::staged(
            version,
            writes.iter().map(|w| w.section.clone()).collect(),
        );
        let committed_at = Timestamp::now();

        // Step 3: durable append. Failure finalizes the record as
        // aborted; the version was never published.
        let frame = CommitFrame::new(
            version,
            committed_at,
            writes
                .iter()
                .map(|w| SectionUpdate::new(&w.section, w.payload.clone(), w.expiration))
                .collect(),
        );
        if let Err(err) = Self::append_frame(&handle, &mut slot, self.mode, &frame) {
            let reason = err.to_string();
            warn!(
                target: "syncpoint::protocol",
                checkpoint = %name,
                version = %version,
                error = %reason,
                "Commit aborted"
            );
            record.abort(reason.clone());
            handle.state().record_commit(record);
            return Err(Error::AbortedWrite { version, reason });
        }

        // Step 4: publish, advance, complete. Section swaps are atomic
        // per section; the version counter moves only after every swap.
        for write in writes {
            handle.state().publish(
                write.section,
                Arc::new(StoredSection::new(
                    write.payload,
                    version,
                    committed_at,
                    write.expiration,
                )),
            );
        }
        handle.state().advance_version(version);
        record.complete(committed_at);
        handle.state().record_commit(record.clone());

        info!(
            target: "syncpoint::protocol",
            checkpoint = %name,
            version = %version,
            sections = record.sections.len(),
            "Commit complete"
        );
        Ok(record)
    }

    fn append_frame(
        handle: &CheckpointHandle,
        slot: &mut CommitSlot,
        mode: DurabilityMode,
        frame: &CommitFrame,
    ) -> Result<()> {
        if slot.log.is_none() {
            let log_path = handle.paths().log();
            let log = if log_path.is_file() {
                CheckpointLog::open_append(&log_path, handle.meta().uuid, mode, slot.valid_end)?
            } else {
                CheckpointLog::create(
                    &log_path,
                    &LogHeader::new(handle.meta().uuid, handle.meta().created_at()),
                    mode,
                )?
            };
            slot.log = Some(log);
        }
        let log = slot.log.as_mut().ok_or_else(|| {
            Error::InvalidOperation("commit log unavailable".to_string())
        })?;
        match log.append(frame) {
            Ok(appended) => {
                slot.valid_end += appended;
                Ok(())
            }
            Err(err) => {
                // The append may have written partial bytes. Drop the
                // handle; the next commit reopens and truncates back to
                // valid_end.
                slot.log = None;
                Err(err)
            }
        }
    }

    /// Read the latest committed payload of a section
    ///
    /// Snapshot isolation per read: the result reflects the latest
    /// fully-completed version at call time, independent of earlier
    /// reads in the same session.
    pub fn read(&self, name: &CheckpointName, section: &SectionId) -> Result<Versioned<Vec<u8>>> {
        self.lookup(name)?.state().read(section)
    }

    /// Force appended commits to stable storage
    ///
    /// A no-op in `Always` mode (every commit already synced) and when
    /// no commit has opened the log yet.
    pub fn sync(&self, name: &CheckpointName) -> Result<()> {
        let handle = self.lookup(name)?;
        let mut slot = handle.sequencer.lock();
        if let Some(log) = slot.log.as_mut() {
            log.sync()?;
        }
        Ok(())
    }

    /// Delete a checkpoint and its persisted state
    ///
    /// Explicit deletion is the only way a checkpoint is destroyed.
    ///
    /// # Errors
    /// `NotFound` if no checkpoint exists under this name.
    pub fn delete(&self, name: &CheckpointName) -> Result<()> {
        let (_, handle) = self
            .handles
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.clone()))?;
        // Close our log handle before removing the files.
        handle.sequencer.lock().log = None;
        std::fs::remove_dir_all(&handle.paths().dir)?;
        info!(target: "syncpoint::protocol", checkpoint = %name, "Checkpoint deleted");
        Ok(())
    }

    /// Whether a checkpoint exists under this name
    pub fn contains(&self, name: &CheckpointName) -> bool {
        self.handles.contains_key(name)
    }

    /// Names of all open checkpoints, sorted
    pub fn names(&self) -> Vec<CheckpointName> {
        let mut names: Vec<CheckpointName> = self
            .handles
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of open checkpoints
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no checkpoints are open
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The engine's data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The durability mode commits run under
    pub fn mode(&self) -> DurabilityMode {
        self.mode
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("data_dir", &self.data_dir)
            .field("mode", &self.mode)
            .field("checkpoint_count", &self.handles.len())
            .finish()
    }
}
