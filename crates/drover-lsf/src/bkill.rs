//! Cancel jobs via bkill.

use drover_core::JobId;
use drover_parsers::run_command;
use tokio::process::Command;

/// Ask LSF to kill a job. Failures are logged, never returned.
pub async fn cancel(id: &JobId) {
    let mut cmd = Command::new("bkill");
    cmd.arg(id.as_str());

    if let Err(e) = run_command(&mut cmd, "bkill").await {
        tracing::warn!("bkill {} failed: {}", id, e);
    }
}
