//! SLURM implementation of the backend interface.

use crate::{sbatch, scancel, scontrol};
use drover_core::{
    Backend, BackendError, BackendKind, JobId, JobSpec, ScriptSettings, Status, Submitted,
};

/// Submits through sbatch, queries through scontrol, cancels through scancel.
#[derive(Debug, Clone)]
pub struct SlurmBackend {
    settings: ScriptSettings,
}

impl SlurmBackend {
    pub fn new(settings: ScriptSettings) -> Self {
        Self { settings }
    }
}

impl Backend for SlurmBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Slurm
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submitted, BackendError> {
        sbatch::submit(spec, &self.settings).await
    }

    async fn query_status(&self, id: &JobId) -> Result<Status, BackendError> {
        scontrol::query_status(id).await
    }

    async fn cancel(&self, id: &JobId) {
        scancel::cancel(id).await
    }

    async fn list_dependencies(&self, id: &JobId) -> Result<Vec<JobId>, BackendError> {
        scontrol::query_dependencies(id).await
    }
}
