//! On-disk layout of a checkpoint directory

use std::path::{Path, PathBuf};

use syncpoint_core::CheckpointName;

/// File name of the commit log inside a checkpoint directory
pub const LOG_FILE_NAME: &str = "ckpt.log";
/// File name of the checkpoint metadata
pub const META_FILE_NAME: &str = "meta";
/// File name of the active-writer marker
pub const WRITER_LOCK_FILE_NAME: &str = "writer.lock";

/// Paths of the files making up one persisted checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPaths {
    /// Checkpoint directory: `<data-dir>/<name>`
    pub dir: PathBuf,
}

impl CheckpointPaths {
    /// Layout for a checkpoint name under a data directory
    ///
    /// The name is validated to be separator-free, so joining it is safe.
    pub fn new(data_dir: &Path, name: &CheckpointName) -> Self {
        CheckpointPaths {
            dir: data_dir.join(name.as_str()),
        }
    }

    /// Path of the commit log
    pub fn log(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    /// Path of the metadata file
    pub fn meta(&self) -> PathBuf {
        self.dir.join(META_FILE_NAME)
    }

    /// Path of the active-writer marker
    pub fn writer_lock(&self) -> PathBuf {
        self.dir.join(WRITER_LOCK_FILE_NAME)
    }

    /// Whether the checkpoint directory exists with a metadata file
    pub fn exists(&self) -> bool {
        self.meta().is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_join_name() {
        let name = CheckpointName::new("demo").unwrap();
        let paths = CheckpointPaths::new(Path::new("/data"), &name);
        assert_eq!(paths.dir, Path::new("/data/demo"));
        assert_eq!(paths.log(), Path::new("/data/demo/ckpt.log"));
        assert_eq!(paths.meta(), Path::new("/data/demo/meta"));
        assert_eq!(paths.writer_lock(), Path::new("/data/demo/writer.lock"));
    }
}
