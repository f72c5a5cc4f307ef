//! Durability modes for the commit log

use std::str::FromStr;

use syncpoint_core::Error;

/// How aggressively the commit log is synced to stable storage
///
/// - `Always`: fsync after every commit record. A completed commit is
///   durable before it becomes visible to readers.
/// - `Standard`: write-through to the OS on every record, fsync on close
///   and on explicit sync points. A crash may lose the last records, but
///   never produces a partially-applied one — replay drops a torn tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync after every commit record
    Always,
    /// OS write-through; fsync on close
    #[default]
    Standard,
}

impl DurabilityMode {
    /// Whether every append must be followed by an fsync
    pub const fn sync_each_append(&self) -> bool {
        matches!(self, DurabilityMode::Always)
    }

    /// The config-file spelling of this mode
    pub const fn as_str(&self) -> &'static str {
        match self {
            DurabilityMode::Always => "always",
            DurabilityMode::Standard => "standard",
        }
    }
}

impl FromStr for DurabilityMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(DurabilityMode::Always),
            "standard" => Ok(DurabilityMode::Standard),
            other => Err(Error::Serialization(format!(
                "unknown durability mode '{}' (expected 'always' or 'standard')",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!(
            "always".parse::<DurabilityMode>().unwrap(),
            DurabilityMode::Always
        );
        assert_eq!(
            "standard".parse::<DurabilityMode>().unwrap(),
            DurabilityMode::Standard
        );
        assert!("cache".parse::<DurabilityMode>().is_err());
    }

    #[test]
    fn test_mode_round_trip() {
        for mode in [DurabilityMode::Always, DurabilityMode::Standard] {
            assert_eq!(mode.as_str().parse::<DurabilityMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_sync_each_append() {
        assert!(DurabilityMode::Always.sync_each_append());
        assert!(!DurabilityMode::Standard.sync_each_append());
    }
}
