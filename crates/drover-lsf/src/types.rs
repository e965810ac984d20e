//! LSF job types.

use drover_core::Status;

/// LSF job status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LsfJobState {
    /// PEND - Job is pending
    Pending,
    /// RUN - Job is running
    Running,
    /// DONE - Job completed successfully
    Done,
    /// EXIT - Job exited with non-zero status or was killed
    Exit,
    /// PSUSP - Job suspended by user while pending
    UserSuspendedPending,
    /// USUSP - Job suspended by user while running
    UserSuspended,
    /// SSUSP - Job suspended by system
    SystemSuspended,
    /// ZOMBI - Job killed, cleanup not yet confirmed
    Zombie,
    /// Unknown state
    Unknown(String),
}

impl LsfJobState {
    /// Parse LSF state string.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PEND" => Self::Pending,
            "RUN" => Self::Running,
            "DONE" => Self::Done,
            "EXIT" => Self::Exit,
            "PSUSP" => Self::UserSuspendedPending,
            "USUSP" => Self::UserSuspended,
            "SSUSP" => Self::SystemSuspended,
            "ZOMBI" => Self::Zombie,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Map onto the orchestrator's status set.
    pub fn to_status(&self) -> Status {
        match self {
            Self::Pending | Self::UserSuspendedPending => Status::Pending,
            Self::Running | Self::UserSuspended | Self::SystemSuspended => Status::Running,
            Self::Done => Status::Done,
            Self::Exit => Status::Failed,
            Self::Zombie => Status::Transitional,
            Self::Unknown(raw) => Status::Unrecognized(raw.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert_eq!(LsfJobState::parse("PEND"), LsfJobState::Pending);
        assert_eq!(LsfJobState::parse("RUN"), LsfJobState::Running);
        assert_eq!(LsfJobState::parse("DONE"), LsfJobState::Done);
        assert_eq!(LsfJobState::parse(" EXIT "), LsfJobState::Exit);
        assert_eq!(
            LsfJobState::parse("UNKWN"),
            LsfJobState::Unknown("UNKWN".to_string())
        );
    }

    #[test]
    fn test_to_status() {
        assert_eq!(LsfJobState::Done.to_status(), Status::Done);
        assert_eq!(LsfJobState::Exit.to_status(), Status::Failed);
        assert_eq!(LsfJobState::Zombie.to_status(), Status::Transitional);
        assert_eq!(LsfJobState::SystemSuspended.to_status(), Status::Running);
        assert_eq!(LsfJobState::UserSuspendedPending.to_status(), Status::Pending);
    }
}
