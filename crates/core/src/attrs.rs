//! Creation attributes for a checkpoint region
//!
//! Fixed at checkpoint creation and enforced on every section create and
//! write. Violations return `LimitExceeded` with the offending quantity.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Size limits fixed when a checkpoint is created
///
/// The attributes are persisted with the checkpoint metadata, so a
/// checkpoint reopened after restart enforces the same limits it was
/// created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationAttributes {
    /// Maximum number of sections in the checkpoint (default: 1024)
    pub max_sections: usize,
    /// Maximum payload size of a single section in bytes (default: 16MB)
    pub max_section_size: usize,
    /// Maximum length of a section id in bytes (default: 255)
    pub max_section_id_size: usize,
}

impl Default for CreationAttributes {
    fn default() -> Self {
        CreationAttributes {
            max_sections: 1024,
            max_section_size: 16 * 1024 * 1024,
            max_section_id_size: 255,
        }
    }
}

impl CreationAttributes {
    /// Small limits for exercising enforcement in tests
    pub fn with_small_limits() -> Self {
        CreationAttributes {
            max_sections: 2,
            max_section_size: 700,
            max_section_id_size: 4,
        }
    }

    /// Validate a section id length
    pub fn check_section_id(&self, id_len: usize) -> Result<()> {
        if id_len > self.max_section_id_size {
            return Err(Error::LimitExceeded {
                what: "section id length",
                actual: id_len,
                limit: self.max_section_id_size,
            });
        }
        Ok(())
    }

    /// Validate a section payload length
    pub fn check_payload(&self, payload_len: usize) -> Result<()> {
        if payload_len > self.max_section_size {
            return Err(Error::LimitExceeded {
                what: "section payload size",
                actual: payload_len,
                limit: self.max_section_size,
            });
        }
        Ok(())
    }

    /// Validate the section count after an insertion
    pub fn check_section_count(&self, count: usize) -> Result<()> {
        if count > self.max_sections {
            return Err(Error::LimitExceeded {
                what: "section count",
                actual: count,
                limit: self.max_sections,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_attrs_accept_typical_sizes() {
        let attrs = CreationAttributes::default();
        assert!(attrs.check_section_id(2).is_ok());
        assert!(attrs.check_payload(4096).is_ok());
        assert!(attrs.check_section_count(10).is_ok());
    }

    #[test]
    fn test_small_limits_enforced() {
        let attrs = CreationAttributes::with_small_limits();
        assert!(attrs.check_section_id(4).is_ok());
        assert!(matches!(
            attrs.check_section_id(5),
            Err(Error::LimitExceeded {
                what: "section id length",
                ..
            })
        ));
        assert!(attrs.check_payload(700).is_ok());
        assert!(attrs.check_payload(701).is_err());
        assert!(attrs.check_section_count(2).is_ok());
        assert!(attrs.check_section_count(3).is_err());
    }
}
