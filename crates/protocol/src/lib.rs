//! Sync protocol engine
//!
//! Turns a writer's sequence of section updates into a linear,
//! monotonically versioned history that readers consume safely:
//!
//! ```text
//! assign version -> stage -> durable append -> publish -> complete
//! ```
//!
//! Version assignment and publication order are guarded by a
//! per-checkpoint commit sequencer; payload encoding and I/O for
//! different checkpoints proceed independently, and readers never take
//! the sequencer at all.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod handle;

pub use engine::{SectionWrite, SyncEngine};
pub use handle::CheckpointHandle;
