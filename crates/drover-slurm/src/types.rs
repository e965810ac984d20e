//! SLURM job types.

use drover_core::Status;

/// SLURM job state as reported in `JobState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlurmJobState {
    Pending,
    Configuring,
    Requeued,
    Running,
    Suspended,
    /// Finished, with epilogs or node cleanup still in progress
    Completing,
    StageOut,
    Completed,
    Failed,
    Cancelled,
    Timeout,
    OutOfMemory,
    NodeFail,
    BootFail,
    Deadline,
    Preempted,
    Unknown(String),
}

impl SlurmJobState {
    /// Parse a SLURM state string, long or compact form.
    pub fn parse(s: &str) -> Self {
        // "CANCELLED by 12345" and "CANCELLED+" both occur
        let base = s.split_whitespace().next().unwrap_or(s);
        let base = base.trim_end_matches('+');

        match base.to_uppercase().as_str() {
            "PENDING" | "PD" => Self::Pending,
            "CONFIGURING" | "CF" => Self::Configuring,
            "REQUEUED" | "RQ" | "REQUEUE_HOLD" | "REQUEUE_FED" => Self::Requeued,
            "RUNNING" | "R" => Self::Running,
            "SUSPENDED" | "S" => Self::Suspended,
            "COMPLETING" | "CG" => Self::Completing,
            "STAGE_OUT" | "SO" => Self::StageOut,
            "COMPLETED" | "CD" => Self::Completed,
            "FAILED" | "F" => Self::Failed,
            "CANCELLED" | "CA" => Self::Cancelled,
            "TIMEOUT" | "TO" => Self::Timeout,
            "OUT_OF_MEMORY" | "OOM" => Self::OutOfMemory,
            "NODE_FAIL" | "NF" => Self::NodeFail,
            "BOOT_FAIL" | "BF" => Self::BootFail,
            "DEADLINE" | "DL" => Self::Deadline,
            "PREEMPTED" | "PR" => Self::Preempted,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Map onto the orchestrator's status set.
    pub fn to_status(&self) -> Status {
        match self {
            Self::Pending | Self::Configuring | Self::Requeued => Status::Pending,
            Self::Running | Self::Suspended => Status::Running,
            Self::Completing | Self::StageOut => Status::Transitional,
            Self::Completed => Status::Done,
            Self::Failed
            | Self::Cancelled
            | Self::Timeout
            | Self::OutOfMemory
            | Self::NodeFail
            | Self::BootFail
            | Self::Deadline
            | Self::Preempted => Status::Failed,
            Self::Unknown(raw) => Status::Unrecognized(raw.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert_eq!(SlurmJobState::parse("RUNNING"), SlurmJobState::Running);
        assert_eq!(SlurmJobState::parse("R"), SlurmJobState::Running);
        assert_eq!(SlurmJobState::parse("PENDING"), SlurmJobState::Pending);
        assert_eq!(SlurmJobState::parse("COMPLETING"), SlurmJobState::Completing);
        assert_eq!(
            SlurmJobState::parse("CANCELLED by 12345"),
            SlurmJobState::Cancelled
        );
        assert_eq!(SlurmJobState::parse("CANCELLED+"), SlurmJobState::Cancelled);
        assert_eq!(
            SlurmJobState::parse("SPECIAL_EXIT"),
            SlurmJobState::Unknown("SPECIAL_EXIT".to_string())
        );
    }

    #[test]
    fn test_to_status() {
        assert_eq!(SlurmJobState::Completed.to_status(), Status::Done);
        assert_eq!(SlurmJobState::Completing.to_status(), Status::Transitional);
        assert_eq!(SlurmJobState::Timeout.to_status(), Status::Failed);
        assert_eq!(SlurmJobState::OutOfMemory.to_status(), Status::Failed);
        assert_eq!(SlurmJobState::Cancelled.to_status(), Status::Failed);
        assert_eq!(SlurmJobState::Requeued.to_status(), Status::Pending);
        assert_eq!(
            SlurmJobState::Unknown("SPECIAL_EXIT".into()).to_status(),
            Status::Unrecognized("SPECIAL_EXIT".into())
        );
    }
}
