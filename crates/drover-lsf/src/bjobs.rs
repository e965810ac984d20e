//! Query individual jobs via bjobs.

use crate::types::LsfJobState;
use drover_core::{BackendError, JobId, Status};
use drover_parsers::{CommandOutput, capture_command, non_empty_string, split_delimited};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

/// Fields requested from bjobs: state, then the dependency expression.
const BJOBS_FORMAT: &str = "stat dependency delimiter='|'";

/// bjobs reply for ids LSF has already purged from its records.
const NOT_FOUND: &str = "is not found";

/// Job id inside a dependency term such as `done(123)` or `ended(45)`.
static DEPENDENCY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+\((\d+)\)").expect("dependency pattern is valid"));

/// One parsed bjobs line.
#[derive(Debug, PartialEq, Eq)]
struct BjobsRecord {
    state: LsfJobState,
    dependencies: Vec<JobId>,
}

fn parse_line(line: &str) -> Result<BjobsRecord, String> {
    let fields = split_delimited(line, 2)?;

    let dependencies = non_empty_string(fields[1])
        .map(|expr| {
            DEPENDENCY_ID
                .captures_iter(&expr)
                .map(|caps| JobId::from(&caps[1]))
                .collect()
        })
        .unwrap_or_default();

    Ok(BjobsRecord {
        state: LsfJobState::parse(fields[0]),
        dependencies,
    })
}

/// Fetch the bjobs record for a job; `None` if LSF no longer knows it.
async fn show_job(id: &JobId) -> Result<Option<BjobsRecord>, BackendError> {
    let mut cmd = Command::new("bjobs");
    cmd.args(["-noheader", "-o", BJOBS_FORMAT, id.as_str()]);
    let output = capture_command(&mut cmd, "bjobs").await?;
    interpret(id, &output)
}

fn interpret(id: &JobId, output: &CommandOutput) -> Result<Option<BjobsRecord>, BackendError> {
    if output.stdout.contains(NOT_FOUND) || output.stderr.contains(NOT_FOUND) {
        return Ok(None);
    }

    let query_error = |stderr: String| BackendError::Query {
        command: "bjobs".to_string(),
        job_id: id.clone(),
        stderr,
    };

    if !output.success() {
        return Err(query_error(output.stderr.trim().to_string()));
    }

    let line = output
        .stdout
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| query_error("empty bjobs output".to_string()))?;

    parse_line(line).map(Some).map_err(query_error)
}

/// Query a job's status.
pub async fn query_status(id: &JobId) -> Result<Status, BackendError> {
    Ok(match show_job(id).await? {
        Some(record) => record.state.to_status(),
        None => Status::Vanished,
    })
}

/// Query a job's dependency ids.
pub async fn query_dependencies(id: &JobId) -> Result<Vec<JobId>, BackendError> {
    Ok(show_job(id)
        .await?
        .map(|record| record.dependencies)
        .unwrap_or_default())
}
