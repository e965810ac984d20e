//! Fallback backend for machines without a queueing system.
//!
//! Jobs run synchronously through `sh -c` at submission time, so by the
//! time a caller sees an id the job has already finished.

use drover_core::{Backend, BackendError, BackendKind, JobId, JobSpec, Status, Submitted};
use drover_parsers::{CommandError, run_command};
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Shell line running every stage, stopping at the first failure.
pub fn shell_line(spec: &JobSpec) -> String {
    format!("set -e ; {}", spec.command_lines().join(" ; "))
}

impl Backend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submitted, BackendError> {
        let line = shell_line(spec);

        let child = Command::new("sh")
            .args(["-c", &line])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CommandError::Execution {
                command: "sh".to_string(),
                error: e.to_string(),
            })?;

        // The pid is only available before the child is reaped
        let pid = child.id();
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CommandError::Execution {
                command: "sh".to_string(),
                error: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(BackendError::Submit {
                command: line,
                code: output.status.code(),
                stdout,
                stderr,
            });
        }

        let id = pid.ok_or_else(|| BackendError::MissingJobId {
            command: line.clone(),
            stdout: stdout.clone(),
            stderr: stderr.clone(),
        })?;
        tracing::debug!("local job {} finished\nstdout:\n{}", id, stdout);

        Ok(Submitted {
            id: JobId::new(id.to_string()),
            script_path: None,
            log_path: None,
        })
    }

    async fn query_status(&self, _id: &JobId) -> Result<Status, BackendError> {
        Ok(Status::Done)
    }

    async fn cancel(&self, id: &JobId) {
        let mut cmd = Command::new("kill");
        cmd.arg(id.as_str());

        if let Err(e) = run_command(&mut cmd, "kill").await {
            tracing::warn!("kill {} failed: {}", id, e);
        }
    }

    async fn list_dependencies(&self, _id: &JobId) -> Result<Vec<JobId>, BackendError> {
        Ok(Vec::new())
    }
}
