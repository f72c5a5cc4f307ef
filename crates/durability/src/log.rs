//! Commit log writer with durability mode support
//!
//! The log is append-only. A commit frame is written in full before the
//! commit is allowed to complete; in `Always` mode the frame is also
//! fsynced first. Opening an existing log truncates it to the end of the
//! last valid frame, as determined by replay, so a torn tail from a
//! crashed writer never survives into the next append.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use syncpoint_core::{Error, Result};

use crate::format::{CommitFrame, LogHeader, LOG_HEADER_SIZE};
use crate::mode::DurabilityMode;

/// Append handle for a checkpoint's commit log
pub struct CheckpointLog {
    file: File,
    path: PathBuf,
    mode: DurabilityMode,
    /// Frames appended through this handle
    appended: u64,
    /// Bytes written through this handle
    bytes_written: u64,
}

impl CheckpointLog {
    /// Create a new, empty commit log
    ///
    /// Writes and syncs the header. Fails if the file already exists.
    pub fn create(path: &Path, header: &LogHeader, mode: DurabilityMode) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.write_all(&header.to_bytes())?;
        file.sync_data()?;
        debug!(target: "syncpoint::durability", path = %path.display(), "Commit log created");
        Ok(CheckpointLog {
            file,
            path: path.to_path_buf(),
            mode,
            appended: 0,
            bytes_written: 0,
        })
    }

    /// Open an existing commit log for appending
    ///
    /// Validates the stored header against the expected checkpoint uuid
    /// and truncates the file to `valid_end` (the end of the last valid
    /// frame found by replay) before seeking to the end.
    pub fn open_append(
        path: &Path,
        expected_uuid: [u8; 16],
        mode: DurabilityMode,
        valid_end: u64,
    ) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut header_bytes = [0u8; LOG_HEADER_SIZE];
        file.read_exact(&mut header_bytes)?;
        let header = LogHeader::from_bytes(&header_bytes)
            .filter(|h| h.is_valid())
            .ok_or_else(|| {
                Error::Corruption(format!("invalid log header in {}", path.display()))
            })?;
        if header.checkpoint_uuid != expected_uuid {
            return Err(Error::Corruption(format!(
                "log {} belongs to a different checkpoint",
                path.display()
            )));
        }

        let end = file.metadata()?.len();
        if valid_end < end {
            debug!(
                target: "syncpoint::durability",
                path = %path.display(),
                dropped = end - valid_end,
                "Truncating torn tail"
            );
            file.set_len(valid_end)?;
            file.sync_data()?;
        }
        file.seek(SeekFrom::Start(valid_end.min(end)))?;

        Ok(CheckpointLog {
            file,
            path: path.to_path_buf(),
            mode,
            appended: 0,
            bytes_written: 0,
        })
    }

    /// Append one commit frame
    ///
    /// The frame is fully written (and in `Always` mode fsynced) before
    /// this returns. Returns the number of bytes appended, so the caller
    /// can track where valid frames end. On any failure the caller must
    /// treat the commit as aborted; the torn bytes, if any, are dropped
    /// by the next replay.
    pub fn append(&mut self, frame: &CommitFrame) -> Result<u64> {
        let bytes = frame
            .to_bytes()
            .map_err(|e| Error::Serialization(e.to_string()))?;
        self.file.write_all(&bytes)?;
        if self.mode.sync_each_append() {
            self.file.sync_data()?;
        }
        self.appended += 1;
        self.bytes_written += bytes.len() as u64;
        Ok(bytes.len() as u64)
    }

    /// Force everything appended so far to stable storage
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames appended through this handle
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Bytes written through this handle
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl std::fmt::Debug for CheckpointLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointLog")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("appended", &self.appended)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SectionUpdate;
    use crate::reader::read_log;
    use syncpoint_core::{SectionId, Timestamp, Version};

    fn header() -> LogHeader {
        LogHeader::new([9u8; 16], Timestamp::from_secs(1))
    }

    fn frame(version: u64) -> CommitFrame {
        CommitFrame::new(
            Version::new(version),
            Timestamp::from_secs(version),
            vec![SectionUpdate::new(
                &SectionId::from("11"),
                format!("payload-{}", version).into_bytes(),
                None,
            )],
        )
    }

    #[test]
    fn test_create_append_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");

        let mut log = CheckpointLog::create(&path, &header(), DurabilityMode::Always).unwrap();
        log.append(&frame(1)).unwrap();
        log.append(&frame(2)).unwrap();
        assert_eq!(log.appended(), 2);
        drop(log);

        let (hdr, frames, _, _) = read_log(&path).unwrap();
        assert_eq!(hdr.checkpoint_uuid, [9u8; 16]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], frame(1));
        assert_eq!(frames[1], frame(2));
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");
        CheckpointLog::create(&path, &header(), DurabilityMode::Always).unwrap();
        assert!(CheckpointLog::create(&path, &header(), DurabilityMode::Always).is_err());
    }

    #[test]
    fn test_open_append_continues_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");

        let mut log = CheckpointLog::create(&path, &header(), DurabilityMode::Standard).unwrap();
        log.append(&frame(1)).unwrap();
        log.sync().unwrap();
        drop(log);

        let (_, frames, valid_end, _) = read_log(&path).unwrap();
        assert_eq!(frames.len(), 1);

        let mut log =
            CheckpointLog::open_append(&path, [9u8; 16], DurabilityMode::Standard, valid_end)
                .unwrap();
        log.append(&frame(2)).unwrap();
        log.sync().unwrap();
        drop(log);

        let (_, frames, _, _) = read_log(&path).unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_open_append_rejects_wrong_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");
        CheckpointLog::create(&path, &header(), DurabilityMode::Always).unwrap();

        let err = CheckpointLog::open_append(
            &path,
            [1u8; 16],
            DurabilityMode::Always,
            LOG_HEADER_SIZE as u64,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Corruption(_)));
    }

    #[test]
    fn test_open_append_truncates_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");

        let mut log = CheckpointLog::create(&path, &header(), DurabilityMode::Always).unwrap();
        log.append(&frame(1)).unwrap();
        drop(log);

        // Simulate a crash mid-append: half a frame at the tail.
        let torn = frame(2).to_bytes().unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&torn[..torn.len() / 2]).unwrap();
        drop(file);

        let (_, frames, valid_end, _) = read_log(&path).unwrap();
        assert_eq!(frames.len(), 1);

        let mut log =
            CheckpointLog::open_append(&path, [9u8; 16], DurabilityMode::Always, valid_end)
                .unwrap();
        log.append(&frame(2)).unwrap();
        drop(log);

        let (_, frames, _, _) = read_log(&path).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], frame(2));
    }
}
