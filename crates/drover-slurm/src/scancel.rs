//! Cancel jobs via scancel.

use drover_core::JobId;
use drover_parsers::run_command;
use tokio::process::Command;

/// Ask SLURM to cancel a job. Failures are logged, never returned.
pub async fn cancel(id: &JobId) {
    let mut cmd = Command::new("scancel");
    cmd.arg(id.as_str());

    if let Err(e) = run_command(&mut cmd, "scancel").await {
        tracing::warn!("scancel {} failed: {}", id, e);
    }
}
