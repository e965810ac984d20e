//! Turning wait and submission outcomes into process-level exits.

use crate::manager::TaskManager;
use crate::waiter::WaitReport;
use drover_core::Backend;
use drover_parsers::format_duration;
use thiserror::Error;

/// Why the driving process has to stop.
///
/// The exit codes are read by external resubmission drivers: 43 means
/// "ran out of queue time, resubmit me", anything else is a real failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    #[error("a job or the backend failed; remaining jobs were drained")]
    HardFailure,
    #[error("the run exceeded its time budget; remaining jobs were drained")]
    OutOfTime,
}

impl Termination {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::HardFailure => 1,
            Self::OutOfTime => 43,
        }
    }
}

/// Result of an escalating manager call.
pub type Outcome<T> = Result<T, Termination>;

impl<B: Backend> TaskManager<B> {
    /// Drain every tracked job without escalating.
    pub async fn closeout(&mut self) -> WaitReport {
        if !self.registry().is_empty() {
            tracing::info!("waiting on remaining jobs");
        }
        self.wait_on_jobs(None, 0).await
    }

    /// Continue, or drain and decide how the process ends.
    pub(crate) async fn escalate(&mut self, ok: bool, time_exceeded: bool) -> Outcome<()> {
        if !ok {
            self.closeout().await;
            tracing::error!("exiting after failure");
            return Err(Termination::HardFailure);
        }

        if time_exceeded {
            tracing::warn!(
                "queue timer expired after {}",
                format_duration(self.limits().max_runtime.as_secs())
            );
            let drained = self.closeout().await;
            if !drained.ok {
                tracing::error!("exiting after failure");
                return Err(Termination::HardFailure);
            }
            return Err(Termination::OutOfTime);
        }

        Ok(())
    }

    /// Drain after a fatal error and report a hard failure.
    pub(crate) async fn abort(&mut self) -> Termination {
        match self.escalate(false, false).await {
            Err(termination) => termination,
            Ok(()) => Termination::HardFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, job_spec};
    use drover_core::{Limits, Status};
    use std::time::Duration;

    fn quick_limits() -> Limits {
        Limits {
            poll_interval: Duration::ZERO,
            transitional_delay: Duration::ZERO,
            ..Limits::default()
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Termination::HardFailure.exit_code(), 1);
        assert_eq!(Termination::OutOfTime.exit_code(), 43);
    }

    #[tokio::test]
    async fn test_ok_within_budget_continues() {
        let mut manager = TaskManager::new(ScriptedBackend::new(), quick_limits());
        assert_eq!(manager.escalate(true, false).await, Ok(()));
    }

    #[tokio::test]
    async fn test_not_ok_drains_then_hard_failure() {
        let backend = ScriptedBackend::new();
        backend.queue_script(vec![Status::Running, Status::Done]);
        let mut manager = TaskManager::new(backend, quick_limits());
        manager.submit(job_spec("calc.py")).await.unwrap();

        assert_eq!(
            manager.escalate(false, false).await,
            Err(Termination::HardFailure)
        );
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_time_exceeded_with_clean_drain_is_out_of_time() {
        let mut manager = TaskManager::new(ScriptedBackend::new(), quick_limits());
        manager.submit(job_spec("calc.py")).await.unwrap();

        assert_eq!(
            manager.escalate(true, true).await,
            Err(Termination::OutOfTime)
        );
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_time_exceeded_with_failed_drain_is_hard_failure() {
        let backend = ScriptedBackend::new();
        backend.queue_script(vec![Status::Failed]);
        let mut manager = TaskManager::new(backend, quick_limits());
        manager.submit(job_spec("calc.py")).await.unwrap();

        assert_eq!(
            manager.escalate(true, true).await,
            Err(Termination::HardFailure)
        );
    }
}
