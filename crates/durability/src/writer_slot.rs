//! Active-writer slot
//!
//! The writer slot is a marker file guarded by an OS advisory lock
//! (`fs2`). Holding the slot is what makes a session *the* Writer of a
//! checkpoint across process boundaries:
//!
//! - a second process attaching as Writer fails to take the lock and is
//!   rejected with `ConflictingWriter`, naming the holder from the marker;
//! - a writer that crashes loses the lock with its process, so the slot
//!   frees itself without any cleanup protocol.
//!
//! The marker content (process id + attach time) is informational; the
//! lock is the authority.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use syncpoint_core::{CheckpointName, Error, ProcessId, Result, Timestamp};

/// Persisted identity of the active writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterMarker {
    /// OS process id of the holder
    pub pid: u32,
    /// When the holder attached, microseconds since epoch
    pub attached_at_micros: u64,
}

impl WriterMarker {
    /// Marker for the given process attaching now
    pub fn new(process: ProcessId, attached_at: Timestamp) -> Self {
        WriterMarker {
            pid: process.as_raw(),
            attached_at_micros: attached_at.as_micros(),
        }
    }

    /// The holder's process id as a contract type
    pub fn process(&self) -> ProcessId {
        ProcessId::from_raw(self.pid)
    }

    /// Attach time as a contract type
    pub fn attached_at(&self) -> Timestamp {
        Timestamp::from_micros(self.attached_at_micros)
    }
}

/// Held writer slot; the lock is released on [`release`] or drop
///
/// [`release`]: WriterSlot::release
pub struct WriterSlot {
    file: File,
    path: PathBuf,
    marker: WriterMarker,
}

impl WriterSlot {
    /// Acquire the writer slot for a checkpoint
    ///
    /// # Errors
    /// `ConflictingWriter` if another process holds the slot. The holder
    /// pid is read from the marker file (best effort: 0 if unreadable).
    pub fn acquire(path: &Path, name: &CheckpointName, process: ProcessId) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;

        if fs2::FileExt::try_lock_exclusive(&file).is_err() {
            let holder = Self::read_marker_from(&mut file)
                .map(|m| m.process())
                .unwrap_or(ProcessId::from_raw(0));
            return Err(Error::ConflictingWriter {
                name: name.clone(),
                holder,
            });
        }

        let marker = WriterMarker::new(process, Timestamp::now());
        let bytes = bincode::serialize(&marker)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bytes)?;
        file.sync_data()?;

        debug!(
            target: "syncpoint::durability",
            checkpoint = %name,
            pid = marker.pid,
            "Writer slot acquired"
        );
        Ok(WriterSlot {
            file,
            path: path.to_path_buf(),
            marker,
        })
    }

    /// The marker written by this holder
    pub fn marker(&self) -> &WriterMarker {
        &self.marker
    }

    /// Read the current marker without taking the lock
    ///
    /// Returns `None` if the file is absent or empty (no writer attached
    /// since the last clean detach).
    pub fn read_marker(path: &Path) -> Result<Option<WriterMarker>> {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::read_marker_from(&mut file))
    }

    fn read_marker_from(file: &mut File) -> Option<WriterMarker> {
        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0)).ok()?;
        file.read_to_end(&mut bytes).ok()?;
        if bytes.is_empty() {
            return None;
        }
        bincode::deserialize(&bytes).ok()
    }

    /// Clear the marker and release the slot
    pub fn release(self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_data()?;
        debug!(
            target: "syncpoint::durability",
            path = %self.path.display(),
            "Writer slot released"
        );
        // Dropping the file releases the advisory lock.
        Ok(())
    }
}

impl Drop for WriterSlot {
    fn drop(&mut self) {
        // Best-effort marker cleanup; the lock itself dies with the fd.
        let _ = self.file.set_len(0);
    }
}

impl std::fmt::Debug for WriterSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSlot")
            .field("path", &self.path)
            .field("marker", &self.marker)
            .finish()
    }
}
