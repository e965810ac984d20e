//! LSF implementation of the backend interface.

use crate::{bjobs, bkill, bsub};
use drover_core::{
    Backend, BackendError, BackendKind, JobId, JobSpec, ScriptSettings, Status, Submitted,
};

/// Submits through bsub, queries through bjobs, cancels through bkill.
#[derive(Debug, Clone)]
pub struct LsfBackend {
    settings: ScriptSettings,
}

impl LsfBackend {
    pub fn new(settings: ScriptSettings) -> Self {
        Self { settings }
    }
}

impl Backend for LsfBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Lsf
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submitted, BackendError> {
        bsub::submit(spec, &self.settings).await
    }

    async fn query_status(&self, id: &JobId) -> Result<Status, BackendError> {
        bjobs::query_status(id).await
    }

    async fn cancel(&self, id: &JobId) {
        bkill::cancel(id).await
    }

    async fn list_dependencies(&self, id: &JobId) -> Result<Vec<JobId>, BackendError> {
        bjobs::query_dependencies(id).await
    }
}
