//! Commit records and the per-write state machine
//!
//! Every writer commit produces a `CommitRecord`. The record starts
//! `Staged` and moves to exactly one terminal state:
//!
//! ```text
//! Staged -> Committed   (payload durable and published)
//! Staged -> Aborted     (persistence failed; nothing became visible)
//! ```
//!
//! A record never re-enters `Staged`, and a terminal record never changes
//! state again. The completion flag readers rely on is `is_complete()`:
//! a record is visible to readers only once it reports complete.

use crate::types::SectionId;
use crate::version::Version;
use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// State of a single writer commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitState {
    /// Update assigned a version and being persisted; not yet visible
    Staged,
    /// Commit finished; visible to readers
    Committed,
    /// Persistence failed; the version never became visible
    Aborted {
        /// What failed during staging
        reason: String,
    },
}

impl CommitState {
    /// Whether this state is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CommitState::Staged)
    }
}

/// Record of one writer commit
///
/// ## Invariants
///
/// - `version` is assigned once, under the commit sequencer, and never reused
/// - `sections` lists every section id updated by this commit
/// - `completed_at` is set exactly when the record becomes `Committed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Version this commit publishes
    pub version: Version,
    /// Section ids updated by this commit
    pub sections: Vec<SectionId>,
    /// Current state of the commit
    pub state: CommitState,
    /// When the commit completed, if it did
    pub completed_at: Option<Timestamp>,
}

impl CommitRecord {
    /// Create a staged record for a freshly assigned version
    pub fn staged(version: Version, sections: Vec<SectionId>) -> Self {
        CommitRecord {
            version,
            sections,
            state: CommitState::Staged,
            completed_at: None,
        }
    }

    /// The completion flag: whether readers may observe this commit
    pub fn is_complete(&self) -> bool {
        matches!(self.state, CommitState::Committed)
    }

    /// Flip the completion flag
    ///
    /// Only a `Staged` record can complete; calling this on a terminal
    /// record is a protocol bug and leaves the record unchanged.
    pub fn complete(&mut self, at: Timestamp) {
        debug_assert!(
            !self.state.is_terminal(),
            "complete() on a terminal commit record"
        );
        if let CommitState::Staged = self.state {
            self.state = CommitState::Committed;
            self.completed_at = Some(at);
        }
    }

    /// Finalize the record as aborted
    ///
    /// Only a `Staged` record can abort; a terminal record is left
    /// unchanged.
    pub fn abort(&mut self, reason: impl Into<String>) {
        debug_assert!(
            !self.state.is_terminal(),
            "abort() on a terminal commit record"
        );
        if let CommitState::Staged = self.state {
            self.state = CommitState::Aborted {
                reason: reason.into(),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged() -> CommitRecord {
        CommitRecord::staged(Version::new(1), vec![SectionId::from("11")])
    }

    #[test]
    fn test_staged_is_not_complete() {
        let rec = staged();
        assert!(!rec.is_complete());
        assert!(!rec.state.is_terminal());
        assert!(rec.completed_at.is_none());
    }

    #[test]
    fn test_complete_is_terminal() {
        let mut rec = staged();
        rec.complete(Timestamp::from_secs(1));
        assert!(rec.is_complete());
        assert!(rec.state.is_terminal());
        assert_eq!(rec.completed_at, Some(Timestamp::from_secs(1)));
    }

    #[test]
    fn test_abort_is_terminal_and_incomplete() {
        let mut rec = staged();
        rec.abort("disk full");
        assert!(!rec.is_complete());
        assert!(rec.state.is_terminal());
        assert_eq!(
            rec.state,
            CommitState::Aborted {
                reason: "disk full".to_string()
            }
        );
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_terminal_record_never_changes() {
        let mut rec = staged();
        rec.abort("first");
        rec.complete(Timestamp::from_secs(2));
        assert!(!rec.is_complete());
        rec.abort("second");
        assert_eq!(
            rec.state,
            CommitState::Aborted {
                reason: "first".to_string()
            }
        );
    }
}
