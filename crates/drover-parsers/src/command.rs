//! Command execution utilities for scheduler calls.

use thiserror::Error;
use tokio::process::Command;

/// Error type for command execution.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to execute {command}: {error}")]
    Execution { command: String, error: String },
    #[error("Command {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Everything a finished command produced.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Execute a command and capture stdout, stderr and the exit code.
///
/// Only a failure to spawn is an error; callers decide what a non-zero
/// exit or particular stderr text means.
pub async fn capture_command(cmd: &mut Command, name: &str) -> Result<CommandOutput, CommandError> {
    let output = cmd.output().await.map_err(|e| CommandError::Execution {
        command: name.to_string(),
        error: e.to_string(),
    })?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Execute a command and return stdout as a string.
///
/// A non-zero exit is reported as [`CommandError::Failed`] with stderr attached.
pub async fn run_command(cmd: &mut Command, name: &str) -> Result<String, CommandError> {
    let output = capture_command(cmd, name).await?;

    if !output.success() {
        return Err(CommandError::Failed {
            command: name.to_string(),
            stderr: output.stderr,
        });
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_success() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        let result = run_command(&mut cmd, "echo").await.unwrap();
        assert_eq!(result.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_command_not_found() {
        let mut cmd = Command::new("nonexistent_command_12345");
        let result = run_command(&mut cmd, "nonexistent").await;
        assert!(matches!(result, Err(CommandError::Execution { .. })));
    }

    #[tokio::test]
    async fn test_capture_command_keeps_stderr_and_code() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo oops >&2; exit 3"]);
        let output = capture_command(&mut cmd, "sh").await.unwrap();
        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_run_command_failure_reports_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 1"]);
        match run_command(&mut cmd, "sh").await {
            Err(CommandError::Failed { stderr, .. }) => assert_eq!(stderr.trim(), "broken"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
