//! Session manager
//!
//! Enforces the attachment invariants per checkpoint:
//! - at most one active Writer session at any instant
//! - any number of concurrent Reader sessions
//! - a process holding a Reader session cannot attach as Writer on the
//!   same checkpoint without detaching first
//!
//! Dead sessions are reaped through the liveness probe on demand; a
//! crashed writer therefore never permanently locks a checkpoint. The
//! reap runs under the slot lock only, never under the commit sequencer.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use syncpoint_core::{CheckpointName, Error, LivenessProbe, ProcessId, Result, Role};

use crate::session::{Session, SessionId};

/// Attachment state of one checkpoint
#[derive(Debug, Default)]
struct Slot {
    writer: Option<Session>,
    readers: Vec<Session>,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.writer.is_none() && self.readers.is_empty()
    }
}

/// Registry of sessions, keyed by checkpoint name
pub struct SessionManager {
    slots: DashMap<CheckpointName, Arc<Mutex<Slot>>>,
    probe: Arc<dyn LivenessProbe>,
}

impl SessionManager {
    /// Create a manager using the given liveness probe
    pub fn new(probe: Arc<dyn LivenessProbe>) -> Self {
        SessionManager {
            slots: DashMap::new(),
            probe,
        }
    }

    fn slot(&self, name: &CheckpointName) -> Arc<Mutex<Slot>> {
        self.slots
            .entry(name.clone())
            .or_default()
            .clone()
    }

    /// Attach a process to a checkpoint in the requested role
    ///
    /// Dead sessions on the checkpoint are reaped first, so a slot held
    /// by a crashed writer is released here rather than leaking.
    ///
    /// # Errors
    /// - `ConflictingWriter` for a second Writer while one is active
    /// - `RoleConflict` for a Writer attach by a process already holding
    ///   a Reader session on the same checkpoint
    pub fn attach(
        &self,
        name: &CheckpointName,
        role: Role,
        process: ProcessId,
    ) -> Result<Session> {
        let slot = self.slot(name);
        let mut slot = slot.lock();
        self.reap_locked(name, &mut slot);

        if role.is_writer() {
            if slot.readers.iter().any(|s| s.process == process) {
                return Err(Error::RoleConflict {
                    name: name.clone(),
                    process,
                    held: Role::Reader,
                });
            }
            if let Some(writer) = &slot.writer {
                return Err(Error::ConflictingWriter {
                    name: name.clone(),
                    holder: writer.process,
                });
            }
        }

        let session = Session::new(name.clone(), role, process);
        info!(
            target: "syncpoint::session",
            checkpoint = %name,
            session = %session.id,
            role = %role,
            pid = process.as_raw(),
            "Session attached"
        );
        match role {
            Role::Writer => slot.writer = Some(session.clone()),
            Role::Reader => slot.readers.push(session.clone()),
        }
        Ok(session)
    }

    /// Detach a session
    ///
    /// Idempotent: a session already removed by reaping detaches cleanly.
    pub fn detach(&self, session: &Session) {
        let slot = self.slot(&session.checkpoint);
        let mut slot = slot.lock();
        let was_attached = match session.role {
            Role::Writer => {
                let held = slot.writer.as_ref().map(|s| s.id) == Some(session.id);
                if held {
                    slot.writer = None;
                }
                held
            }
            Role::Reader => {
                let before = slot.readers.len();
                slot.readers.retain(|s| s.id != session.id);
                slot.readers.len() != before
            }
        };
        if was_attached {
            info!(
                target: "syncpoint::session",
                checkpoint = %session.checkpoint,
                session = %session.id,
                "Session detached"
            );
        }
    }

    /// Whether a session is still attached and its process is running
    pub fn is_alive(&self, session: &Session) -> bool {
        let slot = self.slot(&session.checkpoint);
        let slot = slot.lock();
        let attached = match session.role {
            Role::Writer => slot.writer.as_ref().map(|s| s.id) == Some(session.id),
            Role::Reader => slot.readers.iter().any(|s| s.id == session.id),
        };
        attached && self.probe.is_alive(session.process)
    }

    /// Reap sessions whose process has terminated
    ///
    /// Returns the number of sessions removed.
    pub fn reap(&self, name: &CheckpointName) -> usize {
        let slot = self.slot(name);
        let mut slot = slot.lock();
        self.reap_locked(name, &mut slot)
    }

    fn reap_locked(&self, name: &CheckpointName, slot: &mut Slot) -> usize {
        let mut removed = 0;
        if let Some(writer) = &slot.writer {
            if !self.probe.is_alive(writer.process) {
                debug!(
                    target: "syncpoint::session",
                    checkpoint = %name,
                    session = %writer.id,
                    pid = writer.process.as_raw(),
                    "Reaping dead writer session"
                );
                slot.writer = None;
                removed += 1;
            }
        }
        let before = slot.readers.len();
        slot.readers.retain(|s| self.probe.is_alive(s.process));
        removed += before - slot.readers.len();
        removed
    }

    /// The active writer session of a checkpoint, if any
    pub fn active_writer(&self, name: &CheckpointName) -> Option<Session> {
        self.slot(name).lock().writer.clone()
    }

    /// Number of attached reader sessions on a checkpoint
    pub fn reader_count(&self, name: &CheckpointName) -> usize {
        self.slot(name).lock().readers.len()
    }

    /// Drop empty slots (called after checkpoint deletion)
    pub fn forget(&self, name: &CheckpointName) {
        if let Some(slot) = self.slots.get(name) {
            if slot.lock().is_empty() {
                drop(slot);
                self.slots.remove_if(name, |_, s| s.lock().is_empty());
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("checkpoint_count", &self.slots.len())
            .finish()
    }
}
