//! The task manager: submission, admission control and status settling.

use crate::escalation::Outcome;
use crate::registry::{Registry, TrackedJob};
use drover_core::{Backend, BackendError, JobId, JobSpec, Limits, Status};
use std::time::Instant;

/// Submits jobs to one backend and tracks them until they finish.
///
/// The manager owns its registry; nothing else mutates it. Calls that can
/// escalate return [`Outcome`], whose error side tells the caller how the
/// process has to end.
#[derive(Debug)]
pub struct TaskManager<B> {
    backend: B,
    limits: Limits,
    registry: Registry,
    /// Every job seen failing, across all waits
    failed: Vec<JobId>,
    started: Instant,
}

impl<B: Backend> TaskManager<B> {
    pub fn new(backend: B, limits: Limits) -> Self {
        Self {
            backend,
            limits,
            registry: Registry::new(),
            failed: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Jobs that have failed since the manager was created.
    pub fn failed(&self) -> &[JobId] {
        &self.failed
    }

    pub(crate) fn record_failure(&mut self, id: &JobId) {
        if !self.failed.contains(id) {
            self.failed.push(id.clone());
        }
    }

    /// Whether the run has used up its time budget.
    pub fn time_exceeded(&self) -> bool {
        self.started.elapsed() >= self.limits.max_runtime
    }

    /// Hours since the manager was created.
    pub fn elapsed_hours(&self) -> f64 {
        self.started.elapsed().as_secs_f64() / 3600.0
    }

    /// Submit a job and start tracking it.
    ///
    /// At the job ceiling every tracked job is drained first. Dependencies
    /// the backend no longer knows are dropped before submitting.
    pub async fn submit(&mut self, spec: JobSpec) -> Outcome<JobId> {
        if self.registry.len() >= self.limits.max_jobs {
            tracing::info!(
                "job count at threshold ({}), draining before submitting",
                self.limits.max_jobs
            );
            self.wait(None, 0).await?;
        }

        let culled = self.cull_dependencies(&spec.dependencies).await;
        let dependencies = match culled {
            Ok(dependencies) => dependencies,
            Err(e) => {
                tracing::error!("could not check dependencies: {}", e);
                return Err(self.abort().await);
            }
        };
        let spec = spec.with_dependencies(dependencies);

        let result = self.backend.submit(&spec).await;
        let submitted = match result {
            Ok(submitted) => submitted,
            Err(e) => {
                tracing::error!("{} submit failed: {}", self.backend.kind(), e);
                return Err(self.abort().await);
            }
        };

        tracing::info!("submitted job {} ({})", submitted.id, spec.job_name());
        if let Some(script) = &submitted.script_path {
            tracing::debug!("job {} script: {}", submitted.id, script);
        }
        if !self
            .registry
            .track(TrackedJob::new(submitted.id.clone(), submitted.log_path))
        {
            tracing::warn!("job {} was already tracked", submitted.id);
        }

        let time_exceeded = self.time_exceeded();
        self.escalate(true, time_exceeded).await?;
        Ok(submitted.id)
    }

    /// Drop dependency ids the backend reports as vanished.
    async fn cull_dependencies(&self, ids: &[JobId]) -> Result<Vec<JobId>, BackendError> {
        let mut kept = Vec::with_capacity(ids.len());
        for id in ids {
            match self.backend.query_status(id).await? {
                Status::Vanished => {
                    tracing::warn!("dependency {} no longer known to the backend, dropping it", id)
                }
                _ => kept.push(id.clone()),
            }
        }
        Ok(kept)
    }

    /// Query a job's status, re-polling while it is transitional.
    ///
    /// A job still transitional after the configured retries is FAILED.
    pub async fn status(&self, id: &JobId) -> Result<Status, BackendError> {
        let mut status = self.backend.query_status(id).await?;
        let mut attempts = 0;

        while status == Status::Transitional && attempts < self.limits.transitional_retries {
            tokio::time::sleep(self.limits.transitional_delay).await;
            status = self.backend.query_status(id).await?;
            attempts += 1;
        }

        if status == Status::Transitional {
            tracing::warn!(
                "job {} still transitional after {} checks, treating it as failed",
                id,
                attempts
            );
            return Ok(Status::Failed);
        }
        Ok(status)
    }

    /// Ask the backend to cancel a job.
    pub async fn kill(&self, id: &JobId) {
        tracing::info!("cancelling job {}", id);
        self.backend.cancel(id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::Termination;
    use crate::testing::{ScriptedBackend, job_spec};
    use std::time::Duration;

    fn quick_limits() -> Limits {
        Limits {
            poll_interval: Duration::ZERO,
            transitional_delay: Duration::ZERO,
            ..Limits::default()
        }
    }

    #[tokio::test]
    async fn test_submit_tracks_job() {
        let backend = ScriptedBackend::new();
        backend.queue_script(vec![Status::Running]);
        let mut manager = TaskManager::new(backend, quick_limits());

        let id = manager.submit(job_spec("calc.py")).await.unwrap();
        assert_eq!(manager.registry().ids(), vec![id]);
    }

    #[tokio::test]
    async fn test_submit_at_ceiling_drains_first() {
        let backend = ScriptedBackend::new();
        for _ in 0..3 {
            backend.queue_script(vec![Status::Running, Status::Running, Status::Done]);
        }
        let limits = Limits {
            max_jobs: 3,
            ..quick_limits()
        };
        let mut manager = TaskManager::new(backend, limits);

        for _ in 0..3 {
            manager.submit(job_spec("calc.py")).await.unwrap();
        }
        assert_eq!(manager.registry().len(), 3);

        let id = manager.submit(job_spec("calc.py")).await.unwrap();
        assert_eq!(manager.registry().len(), 1);
        assert_eq!(manager.registry().ids(), vec![id]);
    }

    #[tokio::test]
    async fn test_vanished_dependencies_are_culled() {
        let backend = ScriptedBackend::new();
        backend.script("77", vec![Status::Running]);
        let mut manager = TaskManager::new(backend, quick_limits());

        let spec = job_spec("join").with_dependencies(vec![JobId::from("77"), JobId::from("78")]);
        manager.submit(spec).await.unwrap();

        let (_, submitted) = &manager.backend().submitted()[0];
        assert_eq!(submitted.dependencies, vec![JobId::from("77")]);
    }

    #[tokio::test]
    async fn test_failed_submit_is_hard_failure() {
        let backend = ScriptedBackend::new();
        backend.queue_script(vec![Status::Running, Status::Done]);
        let mut manager = TaskManager::new(backend, quick_limits());
        manager.submit(job_spec("first")).await.unwrap();

        manager.backend().fail_next_submit();
        assert_eq!(
            manager.submit(job_spec("second")).await,
            Err(Termination::HardFailure)
        );
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_dependency_query_error_is_hard_failure() {
        let backend = ScriptedBackend::new();
        backend.fail_queries("9");
        let mut manager = TaskManager::new(backend, quick_limits());

        let spec = job_spec("join").with_dependencies(vec![JobId::from("9")]);
        assert_eq!(manager.submit(spec).await, Err(Termination::HardFailure));
        assert!(manager.backend().submitted().is_empty());
    }

    #[tokio::test]
    async fn test_submit_past_time_budget_is_out_of_time() {
        let limits = Limits {
            max_runtime: Duration::ZERO,
            ..quick_limits()
        };
        let mut manager = TaskManager::new(ScriptedBackend::new(), limits);

        assert_eq!(
            manager.submit(job_spec("calc.py")).await,
            Err(Termination::OutOfTime)
        );
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_transitional_settles() {
        let backend = ScriptedBackend::new();
        backend.script(
            "3",
            vec![Status::Transitional, Status::Transitional, Status::Done],
        );
        let manager = TaskManager::new(backend, quick_limits());

        assert_eq!(manager.status(&JobId::from("3")).await.unwrap(), Status::Done);
        assert_eq!(manager.backend().query_count(&JobId::from("3")), 3);
    }

    #[tokio::test]
    async fn test_stuck_transitional_becomes_failed() {
        let backend = ScriptedBackend::new();
        backend.script("3", vec![Status::Transitional]);
        let limits = Limits {
            transitional_retries: 5,
            ..quick_limits()
        };
        let manager = TaskManager::new(backend, limits);

        assert_eq!(
            manager.status(&JobId::from("3")).await.unwrap(),
            Status::Failed
        );
        assert_eq!(manager.backend().query_count(&JobId::from("3")), 6);
    }

    #[tokio::test]
    async fn test_kill_cancels() {
        let manager = TaskManager::new(ScriptedBackend::new(), quick_limits());
        manager.kill(&JobId::from("12")).await;
        assert_eq!(manager.backend().cancelled(), vec![JobId::from("12")]);
    }
}
