//! Picking a backend when none is configured.

use drover_core::BackendKind;
use tokio::process::Command;

/// Whether `program` runs and exits successfully with `arg`.
async fn responds(program: &str, arg: &str) -> bool {
    Command::new(program)
        .arg(arg)
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Detect the available queueing system, falling back to the local shell.
pub async fn detect_backend() -> BackendKind {
    // Try SLURM first
    if responds("sbatch", "--version").await {
        return BackendKind::Slurm;
    }

    // Try LSF
    if responds("bjobs", "-V").await {
        return BackendKind::Lsf;
    }

    tracing::info!("no queueing system found, running jobs in the local shell");
    BackendKind::Local
}
