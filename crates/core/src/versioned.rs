//! Generic versioned wrapper type
//!
//! Every read operation returns data wrapped in `Versioned<T>`: the value
//! together with the commit version that produced it and the time that
//! commit completed. Writes return the `Version` that was created.

use crate::{Timestamp, Version};
use serde::{Deserialize, Serialize};

/// A value with its version information
///
/// ## Invariants
///
/// - `version` always matches the commit that produced this data
/// - `timestamp` is the completion time of that commit
/// - The value is never modified after publication (immutable versions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// The actual value
    pub value: T,
    /// Commit version that produced the value
    pub version: Version,
    /// Completion time of that commit
    pub timestamp: Timestamp,
}

impl<T> Versioned<T> {
    /// Wrap a value with version information, stamped now
    pub fn new(value: T, version: Version) -> Self {
        Versioned {
            value,
            version,
            timestamp: Timestamp::now(),
        }
    }

    /// Wrap a value with an explicit timestamp
    pub fn with_timestamp(value: T, version: Version, timestamp: Timestamp) -> Self {
        Versioned {
            value,
            version,
            timestamp,
        }
    }

    /// Map the inner value to a new type, keeping version information
    pub fn map<U, F>(self, f: F) -> Versioned<U>
    where
        F: FnOnce(T) -> U,
    {
        Versioned {
            value: f(self.value),
            version: self.version,
            timestamp: self.timestamp,
        }
    }
}
