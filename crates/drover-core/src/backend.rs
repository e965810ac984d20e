//! The capability interface every queueing backend implements.

use crate::types::{JobId, JobSpec, Status, Submitted};
use drover_parsers::CommandError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("{command} failed (exit code {code:?})\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    Submit {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("{command} returned no job id\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    MissingJobId {
        command: String,
        stdout: String,
        stderr: String,
    },
    #[error("{command} failed for job {job_id}: {stderr}")]
    Query {
        command: String,
        job_id: JobId,
        stderr: String,
    },
    #[error("Failed to write batch script: {0}")]
    Script(#[from] std::io::Error),
}

/// Which queueing system a backend talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Slurm,
    Lsf,
    /// No queueing system; commands run in the foreground.
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slurm => f.write_str("slurm"),
            Self::Lsf => f.write_str("lsf"),
            Self::Local => f.write_str("local"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slurm" => Ok(Self::Slurm),
            "lsf" => Ok(Self::Lsf),
            "local" | "none" => Ok(Self::Local),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

/// Submission, status and cancellation against one queueing system.
///
/// Implementations shell out to the scheduler's own commands. A backend is
/// chosen once at startup and the orchestrator is generic over it.
#[allow(async_fn_in_trait)]
pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Submit a job. Dependencies in `spec` are passed through as-is.
    async fn submit(&self, spec: &JobSpec) -> Result<Submitted, BackendError>;

    /// Query the current status of a job.
    async fn query_status(&self, id: &JobId) -> Result<Status, BackendError>;

    /// Request cancellation without waiting for it to take effect.
    async fn cancel(&self, id: &JobId);

    /// Ids the job depends on; empty if none or the id is unknown.
    async fn list_dependencies(&self, id: &JobId) -> Result<Vec<JobId>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("SLURM".parse::<BackendKind>(), Ok(BackendKind::Slurm));
        assert_eq!("lsf".parse::<BackendKind>(), Ok(BackendKind::Lsf));
        assert_eq!("none".parse::<BackendKind>(), Ok(BackendKind::Local));
        assert!("pbs".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_submit_error_carries_diagnostics() {
        let err = BackendError::Submit {
            command: "sbatch".to_string(),
            code: Some(1),
            stdout: String::new(),
            stderr: "sbatch: error: invalid account".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("sbatch failed"));
        assert!(text.contains("invalid account"));
    }
}
