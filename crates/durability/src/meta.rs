//! Checkpoint metadata file
//!
//! Small bincode-encoded record written once at checkpoint creation and
//! replaced atomically (write-temp-then-rename) if it ever changes. The
//! uuid ties the metadata to the commit log: replay refuses a log whose
//! header carries a different uuid.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use syncpoint_core::{CheckpointName, CreationAttributes, Result, Timestamp};

/// Persisted identity and attributes of a checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Checkpoint name (redundant with the directory name, kept for
    /// integrity checking)
    pub name: String,
    /// Uuid tying metadata and log together
    pub uuid: [u8; 16],
    /// Creation time, microseconds since epoch
    pub created_at_micros: u64,
    /// Size limits fixed at creation
    pub attrs: CreationAttributes,
}

impl CheckpointMeta {
    /// Metadata for a freshly created checkpoint
    pub fn new(name: &CheckpointName, attrs: CreationAttributes) -> Self {
        CheckpointMeta {
            name: name.as_str().to_string(),
            uuid: Uuid::new_v4().into_bytes(),
            created_at_micros: Timestamp::now().as_micros(),
            attrs,
        }
    }

    /// The checkpoint name as a contract type
    pub fn checkpoint_name(&self) -> Result<CheckpointName> {
        CheckpointName::new(self.name.clone())
    }

    /// Creation time as a contract type
    pub fn created_at(&self) -> Timestamp {
        Timestamp::from_micros(self.created_at_micros)
    }

    /// Write the metadata atomically
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_data()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read metadata back
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta");

        let name = CheckpointName::new("demo").unwrap();
        let meta = CheckpointMeta::new(&name, CreationAttributes::with_small_limits());
        meta.write_to(&path).unwrap();

        let read = CheckpointMeta::read_from(&path).unwrap();
        assert_eq!(read, meta);
        assert_eq!(read.checkpoint_name().unwrap(), name);
        assert_eq!(read.attrs.max_section_size, 700);
    }

    #[test]
    fn test_meta_uuids_unique() {
        let name = CheckpointName::new("demo").unwrap();
        let a = CheckpointMeta::new(&name, CreationAttributes::default());
        let b = CheckpointMeta::new(&name, CreationAttributes::default());
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn test_meta_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta");
        fs::write(&path, b"\xFF\xFE\xFD").unwrap();
        assert!(CheckpointMeta::read_from(&path).is_err());
    }
}
