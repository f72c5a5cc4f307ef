//! Liveness probe implementations
//!
//! The session manager decides through a [`LivenessProbe`] whether the
//! process behind a session still exists. Two implementations live here:
//! the OS process-table probe used in production and a deterministic
//! probe for tests.

use std::collections::HashSet;

use parking_lot::Mutex;

use syncpoint_core::{LivenessProbe, ProcessId};

/// Probe backed by the OS process table
///
/// On Linux a process is alive when `/proc/<pid>` exists. On other
/// platforms the probe is conservative and reports every process alive,
/// leaving cleanup to explicit detach (the writer slot's advisory lock
/// still frees itself on crash regardless).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessProbe;

impl LivenessProbe for OsProcessProbe {
    #[cfg(target_os = "linux")]
    fn is_alive(&self, process: ProcessId) -> bool {
        std::path::Path::new(&format!("/proc/{}", process.as_raw())).exists()
    }

    #[cfg(not(target_os = "linux"))]
    fn is_alive(&self, _process: ProcessId) -> bool {
        true
    }
}

/// Deterministic probe for tests
///
/// Every process is alive until explicitly marked dead.
#[derive(Debug, Default)]
pub struct TestProbe {
    dead: Mutex<HashSet<u32>>,
}

impl TestProbe {
    /// Create a probe with no dead processes
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a process as terminated
    pub fn mark_dead(&self, process: ProcessId) {
        self.dead.lock().insert(process.as_raw());
    }

    /// Mark a process as running again
    pub fn mark_alive(&self, process: ProcessId) {
        self.dead.lock().remove(&process.as_raw());
    }
}

impl LivenessProbe for TestProbe {
    fn is_alive(&self, process: ProcessId) -> bool {
        !self.dead.lock().contains(&process.as_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn test_os_probe_sees_self() {
        assert!(OsProcessProbe.is_alive(ProcessId::current()));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_os_probe_rejects_impossible_pid() {
        // Above the default pid_max on any reasonable system.
        assert!(!OsProcessProbe.is_alive(ProcessId::from_raw(u32::MAX - 1)));
    }

    #[test]
    fn test_test_probe_toggles() {
        let probe = TestProbe::new();
        let pid = ProcessId::from_raw(99);
        assert!(probe.is_alive(pid));
        probe.mark_dead(pid);
        assert!(!probe.is_alive(pid));
        probe.mark_alive(pid);
        assert!(probe.is_alive(pid));
    }
}
