//! Commit log file and frame format
//!
//! # Log Layout
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ Log Header (32 bytes)              │
//! ├────────────────────────────────────┤
//! │ Commit Frame 1                     │
//! ├────────────────────────────────────┤
//! │ Commit Frame 2                     │
//! ├────────────────────────────────────┤
//! │ ...                                │
//! └────────────────────────────────────┘
//! ```
//!
//! # Frame Layout
//!
//! ```text
//! ┌─────────────────┬────────────────┬────────────────────┬──────────┐
//! │ Length (4 bytes)│ Format Ver (1) │ Body (variable)    │ CRC32 (4)│
//! └─────────────────┴────────────────┴────────────────────┴──────────┘
//! ```
//!
//! Length counts the body only. The CRC covers the format version byte
//! and the body. The body is the bincode encoding of [`CommitFrame`]:
//! version, completion time, and the full payload of every updated
//! section. A frame that fails any of these checks is treated as the torn
//! tail of an interrupted commit.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use syncpoint_core::{SectionId, Timestamp, Version};

/// Magic bytes identifying a checkpoint log file
pub const LOG_MAGIC: [u8; 4] = *b"SYNC";

/// Current log format version
pub const LOG_FORMAT_VERSION: u32 = 1;

/// Size of the log header in bytes
pub const LOG_HEADER_SIZE: usize = 32;

/// Current commit frame format version
pub const FRAME_FORMAT_VERSION: u8 = 1;

/// Frame overhead outside the body: length + format version + CRC
const FRAME_OVERHEAD: usize = 4 + 1 + 4;

/// Errors produced while decoding a commit frame
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer ends before the frame does (torn tail)
    #[error("insufficient data for a complete frame")]
    InsufficientData,

    /// Stored checksum does not match the frame content
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    BadChecksum {
        /// CRC stored in the frame
        stored: u32,
        /// CRC computed over the frame content
        computed: u32,
    },

    /// Frame written by an unknown format version
    #[error("unsupported frame format version {0}")]
    UnsupportedVersion(u8),

    /// Body failed to encode or decode
    #[error("frame body encoding: {0}")]
    Encoding(String),
}

/// Checkpoint log header (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    /// Magic bytes: "SYNC"
    pub magic: [u8; 4],
    /// Log format version
    pub format_version: u32,
    /// Uuid of the checkpoint this log belongs to
    pub checkpoint_uuid: [u8; 16],
    /// Creation time of the checkpoint, microseconds since epoch
    pub created_at_micros: u64,
}

impl LogHeader {
    /// Create a header for a new checkpoint log
    pub fn new(checkpoint_uuid: [u8; 16], created_at: Timestamp) -> Self {
        LogHeader {
            magic: LOG_MAGIC,
            format_version: LOG_FORMAT_VERSION,
            checkpoint_uuid,
            created_at_micros: created_at.as_micros(),
        }
    }

    /// Serialize the header
    pub fn to_bytes(&self) -> [u8; LOG_HEADER_SIZE] {
        let mut bytes = [0u8; LOG_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.format_version.to_le_bytes());
        bytes[8..24].copy_from_slice(&self.checkpoint_uuid);
        bytes[24..32].copy_from_slice(&self.created_at_micros.to_le_bytes());
        bytes
    }

    /// Deserialize a header
    pub fn from_bytes(bytes: &[u8; LOG_HEADER_SIZE]) -> Option<Self> {
        Some(LogHeader {
            magic: bytes[0..4].try_into().ok()?,
            format_version: u32::from_le_bytes(bytes[4..8].try_into().ok()?),
            checkpoint_uuid: bytes[8..24].try_into().ok()?,
            created_at_micros: u64::from_le_bytes(bytes[24..32].try_into().ok()?),
        })
    }

    /// Whether the header carries the expected magic and version
    pub fn is_valid(&self) -> bool {
        self.magic == LOG_MAGIC && self.format_version == LOG_FORMAT_VERSION
    }

    /// Creation time recorded in the header
    pub fn created_at(&self) -> Timestamp {
        Timestamp::from_micros(self.created_at_micros)
    }
}

/// One section's payload within a commit frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionUpdate {
    /// Raw section id bytes
    pub section_id: Vec<u8>,
    /// Full payload as committed
    pub payload: Vec<u8>,
    /// Absolute expiration, microseconds since epoch, if the section expires
    pub expiration_micros: Option<u64>,
}

impl SectionUpdate {
    /// Build an update from contract types
    pub fn new(section: &SectionId, payload: Vec<u8>, expiration: Option<Timestamp>) -> Self {
        SectionUpdate {
            section_id: section.as_bytes().to_vec(),
            payload,
            expiration_micros: expiration.map(|t| t.as_micros()),
        }
    }

    /// The section id as a contract type
    pub fn section(&self) -> SectionId {
        SectionId::new(self.section_id.clone())
    }

    /// The expiration as a contract type
    pub fn expiration(&self) -> Option<Timestamp> {
        self.expiration_micros.map(Timestamp::from_micros)
    }
}

/// Durable image of one completed commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFrame {
    /// Version the commit published
    pub version: u64,
    /// Completion time, microseconds since epoch
    pub committed_at_micros: u64,
    /// Every section updated by the commit
    pub updates: Vec<SectionUpdate>,
}

impl CommitFrame {
    /// Build a frame from contract types
    pub fn new(version: Version, committed_at: Timestamp, updates: Vec<SectionUpdate>) -> Self {
        CommitFrame {
            version: version.as_u64(),
            committed_at_micros: committed_at.as_micros(),
            updates,
        }
    }

    /// The commit version as a contract type
    pub fn commit_version(&self) -> Version {
        Version::new(self.version)
    }

    /// The completion time as a contract type
    pub fn committed_at(&self) -> Timestamp {
        Timestamp::from_micros(self.committed_at_micros)
    }

    /// Encode the frame: length, format version, body, CRC
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        let body = bincode::serialize(self).map_err(|e| FrameError::Encoding(e.to_string()))?;

        let mut hasher = Hasher::new();
        hasher.update(&[FRAME_FORMAT_VERSION]);
        hasher.update(&body);
        let crc = hasher.finalize();

        let mut bytes = Vec::with_capacity(body.len() + FRAME_OVERHEAD);
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.push(FRAME_FORMAT_VERSION);
        bytes.extend_from_slice(&body);
        bytes.extend_from_slice(&crc.to_le_bytes());
        Ok(bytes)
    }

    /// Decode one frame from the front of `buf`
    ///
    /// Returns the frame and the number of bytes consumed. A buffer that
    /// ends mid-frame yields `InsufficientData`; a frame whose CRC does
    /// not match yields `BadChecksum`. Both are how a torn tail presents
    /// after a crash.
    pub fn from_bytes(buf: &[u8]) -> Result<(CommitFrame, usize), FrameError> {
        if buf.len() < 5 {
            return Err(FrameError::InsufficientData);
        }
        let body_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        let format_version = buf[4];

        let total = body_len
            .checked_add(FRAME_OVERHEAD)
            .ok_or(FrameError::InsufficientData)?;
        if buf.len() < total {
            return Err(FrameError::InsufficientData);
        }
        if format_version != FRAME_FORMAT_VERSION {
            return Err(FrameError::UnsupportedVersion(format_version));
        }

        let body = &buf[5..5 + body_len];
        let crc_at = 5 + body_len;
        let stored = u32::from_le_bytes([
            buf[crc_at],
            buf[crc_at + 1],
            buf[crc_at + 2],
            buf[crc_at + 3],
        ]);

        let mut hasher = Hasher::new();
        hasher.update(&[format_version]);
        hasher.update(body);
        let computed = hasher.finalize();
        if stored != computed {
            return Err(FrameError::BadChecksum { stored, computed });
        }

        let frame: CommitFrame =
            bincode::deserialize(body).map_err(|e| FrameError::Encoding(e.to_string()))?;
        Ok((frame, total))
    }
}
