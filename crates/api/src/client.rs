//! Two-operation client facade
//!
//! The entry point a thin CLI (or any embedding process) uses: attach a
//! session in the requested role, perform exactly one write or one read
//! of the facade section, detach, and return the result or the
//! propagated error. Errors from the store and engine pass through
//! unmodified; nothing here retries.

use std::sync::Arc;

use syncpoint_core::{
    CheckpointName, CommitRecord, CreationAttributes, Result, SectionId, Versioned,
};
use syncpoint_protocol::SectionWrite;

use crate::service::CheckpointService;

/// Client bound to one checkpoint and one section
pub struct Client {
    service: Arc<CheckpointService>,
    checkpoint: CheckpointName,
    section: SectionId,
    attrs: CreationAttributes,
}

impl Client {
    /// A client targeting the facade checkpoint from the service config
    pub fn new(service: Arc<CheckpointService>) -> Result<Self> {
        let checkpoint = service.config().facade_checkpoint()?;
        let section = SectionId::from(service.config().facade.section.as_str());
        let attrs = service.config().facade.attrs;
        Ok(Client {
            service,
            checkpoint,
            section,
            attrs,
        })
    }

    /// A client targeting an explicit checkpoint and section
    pub fn with_target(
        service: Arc<CheckpointService>,
        checkpoint: CheckpointName,
        section: SectionId,
        attrs: CreationAttributes,
    ) -> Self {
        Client {
            service,
            checkpoint,
            section,
            attrs,
        }
    }

    /// The checkpoint this client targets
    pub fn checkpoint(&self) -> &CheckpointName {
        &self.checkpoint
    }

    /// Attach as Writer, commit one payload, detach
    ///
    /// Creates the checkpoint on first use. Returns the commit record of
    /// the published version.
    pub fn run_as_writer(&self, payload: &[u8]) -> Result<CommitRecord> {
        let session = self.service.attach_writer(&self.checkpoint, self.attrs)?;
        let written = self.service.write(
            &session,
            vec![SectionWrite::new(self.section.clone(), payload.to_vec())],
        );
        let detached = self.service.detach(&session);
        let record = written?;
        detached?;
        Ok(record)
    }

    /// Attach as Reader, read the facade section once, detach
    ///
    /// Fails with `NotFound` if no writer has created the checkpoint
    /// yet.
    pub fn run_as_reader(&self) -> Result<Versioned<Vec<u8>>> {
        let session = self.service.attach_reader(&self.checkpoint)?;
        let read = self.service.read(&session, &self.section);
        let detached = self.service.detach(&session);
        let payload = read?;
        detached?;
        Ok(payload)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("checkpoint", &self.checkpoint)
            .field("section", &self.section)
            .finish()
    }
}
