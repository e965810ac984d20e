//! Query individual jobs via `scontrol show job`.

use crate::types::SlurmJobState;
use drover_core::{BackendError, JobId, Status};
use drover_parsers::{CommandOutput, capture_command, non_empty_string, split_key_values};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tokio::process::Command;

/// stderr when SLURM has forgotten a job (or never knew it).
const INVALID_JOB_ID: &str = "slurm_load_jobs error: Invalid job id specified";

/// stderr when the controller is too busy to answer; worth asking again.
const SOCKET_TIMEOUT: &str = "slurm_load_jobs error: Socket timed out on send/recv operation";

/// Extra attempts after a socket timeout before giving up.
const TIMEOUT_RETRIES: usize = 1;

/// Leading job id of a dependency term such as `123(unfulfilled)` or `123_*`.
static DEPENDENCY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)").expect("dependency id pattern is valid"));

/// One `scontrol show job` answer.
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Record(HashMap<String, String>),
    UnknownJob,
    TimedOut,
    Error(String),
}

fn classify(output: &CommandOutput) -> Reply {
    let stderr = output.stderr.trim();

    if stderr.contains(INVALID_JOB_ID) {
        return Reply::UnknownJob;
    }
    if stderr.contains(SOCKET_TIMEOUT) {
        return Reply::TimedOut;
    }
    if !output.success() {
        return Reply::Error(stderr.to_string());
    }

    Reply::Record(split_key_values(&output.stdout))
}

/// Fetch the key=value record for a job; `None` if SLURM no longer knows it.
pub async fn show_job(id: &JobId) -> Result<Option<HashMap<String, String>>, BackendError> {
    show_job_with(id, || async move {
        let mut cmd = Command::new("scontrol");
        cmd.args(["show", "job", id.as_str()]);
        capture_command(&mut cmd, "scontrol")
            .await
            .map_err(BackendError::from)
    })
    .await
}

/// [`show_job`] over any runner producing `scontrol show job` output.
async fn show_job_with<F, Fut>(
    id: &JobId,
    mut run: F,
) -> Result<Option<HashMap<String, String>>, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<CommandOutput, BackendError>>,
{
    let mut timeouts = 0;

    loop {
        let output = run().await?;

        match classify(&output) {
            Reply::Record(record) => return Ok(Some(record)),
            Reply::UnknownJob => return Ok(None),
            Reply::TimedOut if timeouts < TIMEOUT_RETRIES => {
                timeouts += 1;
                tracing::warn!("scontrol timed out for job {}, retrying", id);
            }
            Reply::TimedOut => {
                return Err(BackendError::Query {
                    command: "scontrol show job".to_string(),
                    job_id: id.clone(),
                    stderr: output.stderr,
                });
            }
            Reply::Error(stderr) => {
                return Err(BackendError::Query {
                    command: "scontrol show job".to_string(),
                    job_id: id.clone(),
                    stderr,
                });
            }
        }
    }
}

/// Status from a job record.
fn record_status(id: &JobId, record: &HashMap<String, String>) -> Result<Status, BackendError> {
    let state = record.get("JobState").ok_or_else(|| BackendError::Query {
        command: "scontrol show job".to_string(),
        job_id: id.clone(),
        stderr: "no JobState in scontrol output".to_string(),
    })?;
    Ok(SlurmJobState::parse(state).to_status())
}

/// Dependency ids from a job record's `Dependency` field.
///
/// Handles `afterok:1:2`, `afterok:1(unfulfilled),afterany:2_*` and `(null)`.
fn record_dependencies(record: &HashMap<String, String>) -> Vec<JobId> {
    let Some(field) = record.get("Dependency").and_then(|d| non_empty_string(d)) else {
        return Vec::new();
    };

    field
        .split([',', '?', '&'])
        .flat_map(|term| term.split(':').skip(1))
        .filter_map(|piece| DEPENDENCY_ID.captures(piece))
        .map(|caps| JobId::from(&caps[1]))
        .collect()
}

/// Query a job's status.
pub async fn query_status(id: &JobId) -> Result<Status, BackendError> {
    match show_job(id).await? {
        Some(record) => record_status(id, &record),
        None => Ok(Status::Vanished),
    }
}

/// Query a job's dependency ids.
pub async fn query_dependencies(id: &JobId) -> Result<Vec<JobId>, BackendError> {
    Ok(show_job(id)
        .await?
        .map(|record| record_dependencies(&record))
        .unwrap_or_default())
}
