//! Session identity
//!
//! A session is one process's attachment to one checkpoint, in one role.
//! Sessions reference a checkpoint by name; they never own its state.

use std::fmt;

use uuid::Uuid;

use syncpoint_core::{CheckpointName, ProcessId, Role, Timestamp};

/// Unique identifier of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session id
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One process's attachment to a checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Session id
    pub id: SessionId,
    /// Checkpoint the session is attached to
    pub checkpoint: CheckpointName,
    /// Role held by the session
    pub role: Role,
    /// Process behind the session
    pub process: ProcessId,
    /// When the session attached
    pub attached_at: Timestamp,
}

impl Session {
    /// Create a session attaching now
    pub fn new(checkpoint: CheckpointName, role: Role, process: ProcessId) -> Self {
        Session {
            id: SessionId::new(),
            checkpoint,
            role,
            process,
            attached_at: Timestamp::now(),
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} (pid {})",
            self.role, self.id, self.checkpoint, self.process
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_session_fields() {
        let name = CheckpointName::new("demo").unwrap();
        let s = Session::new(name.clone(), Role::Writer, ProcessId::from_raw(42));
        assert_eq!(s.checkpoint, name);
        assert_eq!(s.role, Role::Writer);
        assert_eq!(s.process.as_raw(), 42);
        assert!(s.attached_at > Timestamp::EPOCH);
    }

    #[test]
    fn test_session_display_mentions_role_and_pid() {
        let s = Session::new(
            CheckpointName::new("demo").unwrap(),
            Role::Reader,
            ProcessId::from_raw(7),
        );
        let text = s.to_string();
        assert!(text.contains("reader"));
        assert!(text.contains("pid 7"));
    }
}
