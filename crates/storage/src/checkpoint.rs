//! Live state of one checkpoint region
//!
//! `CheckpointState` owns the sections, the visible version counter, and
//! the commit history of a single named checkpoint. Mutation is driven by
//! the protocol engine under its per-checkpoint commit sequencer; readers
//! go straight to the section map and never take the sequencer.
//!
//! Visibility model:
//! - Sections live in a concurrent map as `Arc<StoredSection>`; publishing
//!   swaps the whole Arc, so readers see the old or the new payload, never
//!   a partial write.
//! - The visible version counter advances only after a commit completes.
//!   An aborted commit leaves it unchanged, and its version number is
//!   assigned to the next commit (strictly increasing, no gaps).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use syncpoint_core::{
    CheckpointName, CommitRecord, CreationAttributes, Error, Result, SectionId, Timestamp,
    Version, Versioned,
};

use crate::section::StoredSection;

/// Point-in-time summary of a checkpoint region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointStatus {
    /// Checkpoint name
    pub name: CheckpointName,
    /// Latest fully-committed version
    pub current_version: Version,
    /// Number of live (non-expired) sections
    pub section_count: usize,
    /// Total payload bytes across live sections
    pub total_payload_bytes: usize,
    /// Creation attributes the checkpoint enforces
    pub attrs: CreationAttributes,
    /// When the checkpoint was created
    pub created_at: Timestamp,
}

/// Live state of one checkpoint region
///
/// ## Invariants
///
/// - A section Arc in the map always holds a fully-committed payload
/// - `current_version` only moves forward, and only on completed commits
/// - History is ordered by version; committed entries are exactly the
///   versions that ever became visible
pub struct CheckpointState {
    name: CheckpointName,
    attrs: CreationAttributes,
    created_at: Timestamp,
    /// Published sections; the Arc swap is the publication point
    sections: DashMap<SectionId, Arc<StoredSection>>,
    /// Latest fully-committed version
    version: AtomicU64,
    /// Ordered history of commit records (committed and aborted)
    history: Mutex<Vec<CommitRecord>>,
}

impl CheckpointState {
    /// Create an empty checkpoint region
    pub fn new(name: CheckpointName, attrs: CreationAttributes) -> Self {
        Self::restore(name, attrs, Timestamp::now(), Version::ZERO)
    }

    /// Reconstruct a checkpoint region from recovered metadata
    ///
    /// Used by replay: sections are then republished one commit at a time
    /// in version order.
    pub fn restore(
        name: CheckpointName,
        attrs: CreationAttributes,
        created_at: Timestamp,
        version: Version,
    ) -> Self {
        CheckpointState {
            name,
            attrs,
            created_at,
            sections: DashMap::new(),
            version: AtomicU64::new(version.as_u64()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Checkpoint name
    pub fn name(&self) -> &CheckpointName {
        &self.name
    }

    /// Creation attributes
    pub fn attrs(&self) -> &CreationAttributes {
        &self.attrs
    }

    /// Creation time
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Latest fully-committed version
    ///
    /// This is the version a read started now would observe (or newer, if
    /// a commit completes in between).
    pub fn current_version(&self) -> Version {
        Version::new(self.version.load(Ordering::Acquire))
    }

    /// Number of live sections (expired sections excluded)
    pub fn section_count(&self) -> usize {
        let now = Timestamp::now();
        self.sections
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    /// Whether a live section exists under this id
    pub fn contains_section(&self, id: &SectionId) -> bool {
        match self.sections.get(id) {
            Some(entry) => !entry.value().is_expired(Timestamp::now()),
            None => false,
        }
    }

    /// Read the latest committed payload of a section
    ///
    /// Never blocks on an in-progress write: the read observes whatever
    /// Arc is published at call time. Expired sections read as absent.
    ///
    /// # Errors
    /// `SectionNotFound` if the section does not exist or has expired.
    pub fn read(&self, id: &SectionId) -> Result<Versioned<Vec<u8>>> {
        let section = self
            .sections
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::SectionNotFound(id.clone()))?;
        if section.is_expired(Timestamp::now()) {
            return Err(Error::SectionNotFound(id.clone()));
        }
        Ok(section.versioned())
    }

    /// Publish a fully-committed section payload
    ///
    /// Called by the protocol engine only, after the payload is durable.
    /// The Arc swap is atomic from the reader's perspective.
    pub fn publish(&self, id: SectionId, section: Arc<StoredSection>) {
        debug!(
            target: "syncpoint::storage",
            checkpoint = %self.name,
            section = %id,
            version = %section.version(),
            bytes = section.len(),
            "Section published"
        );
        self.sections.insert(id, section);
    }

    /// Advance the visible version after a completed commit
    ///
    /// Called by the protocol engine under the commit sequencer. The
    /// counter never moves backwards.
    pub fn advance_version(&self, to: Version) {
        debug_assert!(
            to.as_u64() > self.version.load(Ordering::Relaxed),
            "visible version must advance"
        );
        self.version.store(to.as_u64(), Ordering::Release);
    }

    /// Append a finalized commit record to the history
    pub fn record_commit(&self, record: CommitRecord) {
        debug_assert!(record.state.is_terminal(), "history takes terminal records");
        self.history.lock().push(record);
    }

    /// Committed records with a version strictly greater than `since`
    ///
    /// This is the polling counterpart of update tracking: a reader that
    /// remembers the last version it saw learns exactly which sections
    /// changed afterwards.
    pub fn updates_since(&self, since: Version) -> Vec<CommitRecord> {
        self.history
            .lock()
            .iter()
            .filter(|r| r.is_complete() && r.version > since)
            .cloned()
            .collect()
    }

    /// Full commit history, including aborted records
    pub fn history(&self) -> Vec<CommitRecord> {
        self.history.lock().clone()
    }

    /// Ids of all live sections, sorted
    pub fn section_ids(&self) -> Vec<SectionId> {
        let now = Timestamp::now();
        let mut ids: Vec<SectionId> = self
            .sections
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Point-in-time summary of the region
    pub fn status(&self) -> CheckpointStatus {
        let now = Timestamp::now();
        let mut count = 0usize;
        let mut bytes = 0usize;
        for entry in self.sections.iter() {
            if !entry.value().is_expired(now) {
                count += 1;
                bytes += entry.value().len();
            }
        }
        CheckpointStatus {
            name: self.name.clone(),
            current_version: self.current_version(),
            section_count: count,
            total_payload_bytes: bytes,
            attrs: self.attrs,
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for CheckpointState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointState")
            .field("name", &self.name)
            .field("current_version", &self.current_version())
            .field("section_count", &self.sections.len())
            .finish()
    }
}
