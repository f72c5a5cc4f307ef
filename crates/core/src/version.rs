//! Commit version type
//!
//! Every committed write produces a version. Versions are strictly
//! increasing with no gaps within a checkpoint: if version `n` is visible,
//! every version `1..=n` was committed (or finalized as aborted and never
//! became visible, in which case `n` was never assigned to a later write).
//!
//! Version 0 is reserved for "nothing committed yet" and is never carried
//! by visible data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic per-checkpoint commit version
///
/// ## Invariants
///
/// - Assigned under the checkpoint's commit sequencer, strictly increasing
/// - No gaps: an aborted write surrenders its slot only if nothing later
///   was assigned, which the sequencer guarantees by assigning under lock
/// - Comparison is total; versions from different checkpoints are not
///   meaningfully comparable
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Version(u64);

impl Version {
    /// The "nothing committed" version
    pub const ZERO: Version = Version(0);

    /// Wrap a raw version number
    pub const fn new(v: u64) -> Self {
        Version(v)
    }

    /// The numeric value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The immediately following version
    pub const fn next(&self) -> Self {
        Version(self.0 + 1)
    }

    /// Whether this is the "nothing committed" version
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
