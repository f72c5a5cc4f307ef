//! Commit log replay
//!
//! Reads frames in order, stopping at the first invalid or incomplete
//! frame. The returned position marks where valid frames end; everything
//! past it is the torn tail of an interrupted commit and is truncated by
//! the next writer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::warn;

use syncpoint_core::{Error, Result};

use crate::format::{CommitFrame, FrameError, LogHeader, LOG_HEADER_SIZE};

/// Why replay stopped consuming frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStopReason {
    /// Every byte decoded into valid frames
    EndOfData,
    /// A torn or corrupt frame at the tail; bytes past `valid_end` dropped
    TornFrame,
    /// A frame from a newer format version; replay stops before it
    UnsupportedFrame,
}

/// Read all valid frames from a commit log
///
/// Returns the header, the frames in append order, the byte offset where
/// valid frames end, and why reading stopped.
///
/// # Errors
/// `Corruption` if the header itself is missing or invalid — a log with
/// a bad header is not a checkpoint log at all. A bad or incomplete
/// frame, by contrast, is an expected crash artifact and only stops the
/// read.
pub fn read_log(path: &Path) -> Result<(LogHeader, Vec<CommitFrame>, u64, ReadStopReason)> {
    let mut file = File::open(path)?;

    let mut header_bytes = [0u8; LOG_HEADER_SIZE];
    file.read_exact(&mut header_bytes).map_err(|_| {
        Error::Corruption(format!("log {} shorter than its header", path.display()))
    })?;
    let header = LogHeader::from_bytes(&header_bytes)
        .filter(|h| h.is_valid())
        .ok_or_else(|| Error::Corruption(format!("invalid log header in {}", path.display())))?;

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    let mut frames = Vec::new();
    let mut offset = 0usize;
    let mut stop = ReadStopReason::EndOfData;

    while offset < buffer.len() {
        match CommitFrame::from_bytes(&buffer[offset..]) {
            Ok((frame, consumed)) => {
                frames.push(frame);
                offset += consumed;
            }
            Err(FrameError::UnsupportedVersion(v)) => {
                warn!(
                    target: "syncpoint::durability",
                    path = %path.display(),
                    frame_version = v,
                    "Stopping replay at frame from a newer format"
                );
                stop = ReadStopReason::UnsupportedFrame;
                break;
            }
            Err(err) => {
                // InsufficientData, BadChecksum, or an undecodable body:
                // the torn tail of an interrupted commit.
                warn!(
                    target: "syncpoint::durability",
                    path = %path.display(),
                    error = %err,
                    dropped = buffer.len() - offset,
                    "Dropping torn tail"
                );
                stop = ReadStopReason::TornFrame;
                break;
            }
        }
    }

    let valid_end = LOG_HEADER_SIZE as u64 + offset as u64;
    Ok((header, frames, valid_end, stop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SectionUpdate;
    use std::io::Write;
    use syncpoint_core::{SectionId, Timestamp, Version};

    fn write_log(path: &Path, frames: &[CommitFrame]) {
        let mut file = File::create(path).unwrap();
        file.write_all(&LogHeader::new([3u8; 16], Timestamp::EPOCH).to_bytes())
            .unwrap();
        for frame in frames {
            file.write_all(&frame.to_bytes().unwrap()).unwrap();
        }
    }

    fn frame(version: u64) -> CommitFrame {
        CommitFrame::new(
            Version::new(version),
            Timestamp::from_secs(version),
            vec![SectionUpdate::new(&SectionId::from("s"), vec![1, 2, 3], None)],
        )
    }

    #[test]
    fn test_read_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");
        write_log(&path, &[]);

        let (header, frames, valid_end, stop) = read_log(&path).unwrap();
        assert_eq!(header.checkpoint_uuid, [3u8; 16]);
        assert!(frames.is_empty());
        assert_eq!(valid_end, LOG_HEADER_SIZE as u64);
        assert_eq!(stop, ReadStopReason::EndOfData);
    }

    #[test]
    fn test_read_stops_at_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");
        write_log(&path, &[frame(1), frame(2)]);

        // Append half of a third frame.
        let torn = frame(3).to_bytes().unwrap();
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        file.write_all(&torn[..torn.len() - 3]).unwrap();
        drop(file);

        let (_, frames, valid_end, stop) = read_log(&path).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(stop, ReadStopReason::TornFrame);

        let full_len = std::fs::metadata(&path).unwrap().len();
        assert!(valid_end < full_len);
    }

    #[test]
    fn test_read_stops_at_corrupt_frame_mid_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");
        write_log(&path, &[frame(1), frame(2), frame(3)]);

        // Flip a byte inside the second frame's body.
        let first_len = frame(1).to_bytes().unwrap().len();
        let mut bytes = std::fs::read(&path).unwrap();
        let target = LOG_HEADER_SIZE + first_len + 10;
        bytes[target] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let (_, frames, _, stop) = read_log(&path).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].commit_version(), Version::new(1));
        assert_eq!(stop, ReadStopReason::TornFrame);
    }

    #[test]
    fn test_missing_header_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");
        std::fs::write(&path, b"short").unwrap();
        assert!(matches!(read_log(&path), Err(Error::Corruption(_))));
    }

    #[test]
    fn test_bad_magic_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.log");
        let mut bytes = LogHeader::new([0u8; 16], Timestamp::EPOCH).to_bytes();
        bytes[0] = b'N';
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(read_log(&path), Err(Error::Corruption(_))));
    }
}
