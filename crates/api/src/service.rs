//! Checkpoint service wiring
//!
//! A `CheckpointService` ties a data directory's protocol engine,
//! session manager, and durable writer slots together. Services are
//! process-wide singletons per canonical data directory: opening the
//! same directory twice returns the same instance, so the in-process
//! session invariants hold no matter how many components open the
//! service.
//!
//! The writer invariant is enforced twice, on purpose:
//! - the session manager rejects a second writer within this process
//!   (and reaps sessions whose process died);
//! - the durable writer slot rejects writers from other processes, and
//!   frees itself when a holder crashes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::info;

use syncpoint_core::{
    CheckpointName, CommitRecord, CreationAttributes, Error, LivenessProbe, ProcessId, Result,
    Role, SectionId, Version, Versioned,
};
use syncpoint_durability::WriterSlot;
use syncpoint_protocol::{SectionWrite, SyncEngine};
use syncpoint_session::{OsProcessProbe, Session, SessionId, SessionManager};
use syncpoint_storage::CheckpointStatus;

use crate::config::ServiceConfig;

/// Open services by canonical data directory.
///
/// Weak references: a service closes when the last Arc drops, and a
/// later open builds a fresh one.
static OPEN_SERVICES: Lazy<Mutex<HashMap<PathBuf, Weak<CheckpointService>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// A checkpoint service over one data directory
pub struct CheckpointService {
    engine: SyncEngine,
    sessions: SessionManager,
    config: ServiceConfig,
    /// Durable writer slots held by this process, keyed by session
    writer_slots: Mutex<HashMap<SessionId, (CheckpointName, WriterSlot)>>,
}

impl CheckpointService {
    /// Open the service for a data directory
    ///
    /// Returns the existing instance when the directory is already open
    /// in this process. The registry lock is held across the whole open
    /// so two threads cannot race to create one.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Arc<Self>> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let canonical = data_dir.canonicalize()?;

        let mut registry = OPEN_SERVICES.lock();
        if let Some(weak) = registry.get(&canonical) {
            if let Some(service) = weak.upgrade() {
                info!(
                    target: "syncpoint::api",
                    path = %canonical.display(),
                    "Returning existing service instance"
                );
                return Ok(service);
            }
        }

        let service = Arc::new(Self::build(&canonical, Arc::new(OsProcessProbe))?);
        registry.insert(canonical, Arc::downgrade(&service));
        Ok(service)
    }

    /// Open a standalone service with a custom liveness probe
    ///
    /// Bypasses the process-wide registry; meant for embedding and for
    /// tests that need a deterministic probe.
    pub fn open_with_probe(
        data_dir: impl AsRef<Path>,
        probe: Arc<dyn LivenessProbe>,
    ) -> Result<Arc<Self>> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        Ok(Arc::new(Self::build(data_dir, probe)?))
    }

    fn build(data_dir: &Path, probe: Arc<dyn LivenessProbe>) -> Result<Self> {
        let config = ServiceConfig::load_or_create(data_dir)?;
        let mode = config.durability_mode()?;
        let engine = SyncEngine::open(data_dir, mode)?;
        info!(
            target: "syncpoint::api",
            path = %data_dir.display(),
            mode = mode.as_str(),
            checkpoints = engine.len(),
            "Service open"
        );
        Ok(CheckpointService {
            engine,
            sessions: SessionManager::new(probe),
            config,
            writer_slots: Mutex::new(HashMap::new()),
        })
    }

    /// The loaded configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The underlying protocol engine
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Attach the calling process as the Writer of a checkpoint
    ///
    /// Creates the checkpoint (with `attrs`) if absent. Fails with
    /// `ConflictingWriter` while another writer — in this process or
    /// another — holds the checkpoint, and with `RoleConflict` if this
    /// process already holds a Reader session on it.
    pub fn attach_writer(
        &self,
        name: &CheckpointName,
        attrs: CreationAttributes,
    ) -> Result<Session> {
        let process = ProcessId::current();
        let session = self.sessions.attach(name, Role::Writer, process)?;

        let handle = match self.engine.open_or_create(name, attrs) {
            Ok((handle, _)) => handle,
            Err(err) => {
                self.sessions.detach(&session);
                return Err(err);
            }
        };

        // Drop slots whose session is no longer the active writer (the
        // reap above may have removed a dead writer); releasing the slot
        // here mirrors the OS releasing it on process death.
        {
            let mut slots = self.writer_slots.lock();
            let active = self.sessions.active_writer(name).map(|s| s.id);
            slots.retain(|sid, (slot_name, _)| *slot_name != *name || Some(*sid) == active);
        }

        match WriterSlot::acquire(&handle.paths().writer_lock(), name, process) {
            Ok(slot) => {
                self.writer_slots
                    .lock()
                    .insert(session.id, (name.clone(), slot));
                Ok(session)
            }
            Err(err) => {
                self.sessions.detach(&session);
                Err(err)
            }
        }
    }

    /// Attach the calling process as a Reader of a checkpoint
    ///
    /// # Errors
    /// `NotFound` if the checkpoint does not exist — Readers cannot
    /// create.
    pub fn attach_reader(&self, name: &CheckpointName) -> Result<Session> {
        self.engine.lookup(name)?;
        self.sessions.attach(name, Role::Reader, ProcessId::current())
    }

    /// Detach a session
    ///
    /// For writer sessions this syncs the commit log (a no-op in
    /// `always` mode) and releases the durable writer slot.
    pub fn detach(&self, session: &Session) -> Result<()> {
        let mut result = Ok(());
        if session.role.is_writer() {
            if self.engine.contains(&session.checkpoint) {
                result = self.engine.sync(&session.checkpoint);
            }
            if let Some((_, slot)) = self.writer_slots.lock().remove(&session.id) {
                let released = slot.release();
                if result.is_ok() {
                    result = released;
                }
            }
        }
        self.sessions.detach(session);
        result
    }

    /// Whether a session is still attached with a live process
    pub fn is_alive(&self, session: &Session) -> bool {
        self.sessions.is_alive(session)
    }

    /// Reap sessions of terminated processes on a checkpoint
    pub fn reap(&self, name: &CheckpointName) -> usize {
        self.sessions.reap(name)
    }

    // =========================================================================
    // Data path
    // =========================================================================

    /// Commit section updates through a writer session
    ///
    /// # Errors
    /// `InvalidOperation` if the session is not the checkpoint's active
    /// writer (detached, reaped, or a reader).
    pub fn write(&self, session: &Session, writes: Vec<SectionWrite>) -> Result<CommitRecord> {
        let active = self.sessions.active_writer(&session.checkpoint);
        if active.as_ref().map(|s| s.id) != Some(session.id) {
            return Err(Error::InvalidOperation(format!(
                "session {} is not the active writer of {}",
                session.id, session.checkpoint
            )));
        }
        self.engine.commit(&session.checkpoint, writes)
    }

    /// Read the latest committed payload of a section
    ///
    /// Available to any attached session; each read observes the latest
    /// fully-completed version at call time.
    pub fn read(&self, session: &Session, section: &SectionId) -> Result<Versioned<Vec<u8>>> {
        if !self.sessions.is_alive(session) {
            return Err(Error::InvalidOperation(format!(
                "session {} is not attached to {}",
                session.id, session.checkpoint
            )));
        }
        self.engine.read(&session.checkpoint, section)
    }

    // =========================================================================
    // Checkpoint administration
    // =========================================================================

    /// Delete a checkpoint and its persisted state
    ///
    /// # Errors
    /// `InvalidOperation` while sessions are attached; `NotFound` if the
    /// checkpoint does not exist.
    pub fn delete(&self, name: &CheckpointName) -> Result<()> {
        self.sessions.reap(name);
        if self.sessions.active_writer(name).is_some() || self.sessions.reader_count(name) > 0 {
            return Err(Error::InvalidOperation(format!(
                "checkpoint {} still has attached sessions",
                name
            )));
        }
        self.engine.delete(name)?;
        self.sessions.forget(name);
        Ok(())
    }

    /// Point-in-time status of a checkpoint
    pub fn status(&self, name: &CheckpointName) -> Result<CheckpointStatus> {
        Ok(self.engine.lookup(name)?.state().status())
    }

    /// Ids of a checkpoint's live sections, sorted
    pub fn sections(&self, name: &CheckpointName) -> Result<Vec<SectionId>> {
        Ok(self.engine.lookup(name)?.state().section_ids())
    }

    /// Committed records newer than `since` (update polling)
    pub fn updates_since(
        &self,
        name: &CheckpointName,
        since: Version,
    ) -> Result<Vec<CommitRecord>> {
        Ok(self.engine.lookup(name)?.state().updates_since(since))
    }

    /// Names of all open checkpoints, sorted
    pub fn names(&self) -> Vec<CheckpointName> {
        self.engine.names()
    }
}

impl std::fmt::Debug for CheckpointService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointService")
            .field("engine", &self.engine)
            .field("sessions", &self.sessions)
            .finish()
    }
}
