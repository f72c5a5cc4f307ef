//! Service configuration via `syncpoint.toml`
//!
//! A config file in the data directory, created with defaults on first
//! open. To change settings, edit the file and restart the attached
//! processes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use syncpoint_core::{CheckpointName, CreationAttributes, Error, Result};
use syncpoint_durability::DurabilityMode;

/// Config file name placed in the service data directory.
pub const CONFIG_FILE_NAME: &str = "syncpoint.toml";

fn default_durability_str() -> String {
    DurabilityMode::Standard.as_str().to_string()
}

fn default_checkpoint_name() -> String {
    "demo".to_string()
}

fn default_section_id() -> String {
    "11".to_string()
}

/// Attributes of the demo checkpoint the two-argument facade uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FacadeConfig {
    /// Checkpoint name the facade opens
    #[serde(default = "default_checkpoint_name")]
    pub checkpoint: String,
    /// Section id the facade writes and reads
    #[serde(default = "default_section_id")]
    pub section: String,
    /// Creation attributes applied when the facade creates the checkpoint
    #[serde(default)]
    pub attrs: CreationAttributes,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        FacadeConfig {
            checkpoint: default_checkpoint_name(),
            section: default_section_id(),
            attrs: CreationAttributes::default(),
        }
    }
}

/// Service configuration loaded from `syncpoint.toml`.
///
/// # Example
///
/// ```toml
/// # Durability mode: "standard" (default) or "always"
/// # "standard" = OS write-through, fsync on detach
/// # "always" = fsync every commit, zero data loss
/// durability = "standard"
///
/// [facade]
/// checkpoint = "demo"
/// section = "11"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Durability mode: `"standard"` or `"always"`.
    #[serde(default = "default_durability_str")]
    pub durability: String,
    /// Demo checkpoint settings for the two-argument facade.
    #[serde(default)]
    pub facade: FacadeConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            durability: default_durability_str(),
            facade: FacadeConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Parse the durability string into a `DurabilityMode`.
    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        self.durability.parse()
    }

    /// The facade's checkpoint name, validated.
    pub fn facade_checkpoint(&self) -> Result<CheckpointName> {
        CheckpointName::new(self.facade.checkpoint.clone())
    }

    /// Load the config from a data directory, writing defaults on first
    /// open.
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            let text = std::fs::read_to_string(&path)?;
            let config: ServiceConfig = toml::from_str(&text)
                .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)))?;
            // Validate eagerly so a bad file fails at open, not first use.
            config.durability_mode()?;
            config.facade_checkpoint()?;
            debug!(target: "syncpoint::api", path = %path.display(), "Config loaded");
            Ok(config)
        } else {
            let config = ServiceConfig::default();
            let text = toml::to_string_pretty(&config)
                .map_err(|e| Error::Serialization(e.to_string()))?;
            std::fs::write(&path, text)?;
            debug!(target: "syncpoint::api", path = %path.display(), "Default config written");
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.durability_mode().unwrap(), DurabilityMode::Standard);
        assert_eq!(config.facade_checkpoint().unwrap().as_str(), "demo");
        assert_eq!(config.facade.section, "11");
    }

    #[test]
    fn test_first_open_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert!(dir.path().join(CONFIG_FILE_NAME).is_file());

        // Second open reads the same file back.
        let again = ServiceConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "durability = \"always\"\n",
        )
        .unwrap();

        let config = ServiceConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config.durability_mode().unwrap(), DurabilityMode::Always);
        assert_eq!(config.facade.checkpoint, "demo");
    }

    #[test]
    fn test_bad_durability_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "durability = \"sometimes\"\n",
        )
        .unwrap();
        assert!(ServiceConfig::load_or_create(dir.path()).is_err());
    }

    #[test]
    fn test_custom_facade_attrs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
durability = "standard"

[facade]
checkpoint = "my-ckpt"
section = "s1"

[facade.attrs]
max_sections = 2
max_section_size = 700
max_section_id_size = 4
"#,
        )
        .unwrap();

        let config = ServiceConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config.facade.checkpoint, "my-ckpt");
        assert_eq!(config.facade.attrs.max_section_size, 700);
    }
}
