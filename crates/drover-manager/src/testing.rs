//! An in-memory backend whose job statuses are scripted up front.
//!
//! Each job carries a list of statuses. Every query pops the front entry
//! until one is left, which then repeats forever. Ids the backend never
//! handed out report VANISHED, the way a real queue answers for purged
//! jobs.

use drover_core::{
    Backend, BackendError, BackendKind, EnvBootstrap, JobId, JobSpec, Resources, Status,
    Submitted,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// First id handed out by [`ScriptedBackend::submit`].
const FIRST_ID: u64 = 1000;

#[derive(Debug, Default)]
struct Inner {
    submissions: u64,
    scripts: HashMap<JobId, VecDeque<Status>>,
    upcoming: VecDeque<Vec<Status>>,
    dependencies: HashMap<JobId, Vec<JobId>>,
    failing_queries: HashSet<JobId>,
    fail_next_submit: bool,
    submitted: Vec<(JobId, JobSpec)>,
    cancelled: Vec<JobId>,
    queries: Vec<JobId>,
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    inner: Mutex<Inner>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Script the statuses of an existing id.
    pub fn script(&self, id: impl Into<JobId>, statuses: Vec<Status>) {
        self.inner().scripts.insert(id.into(), statuses.into());
    }

    /// Script the statuses of the next job submitted. Unscripted jobs are DONE.
    pub fn queue_script(&self, statuses: Vec<Status>) {
        self.inner().upcoming.push_back(statuses);
    }

    /// Make every status or dependency query for `id` fail.
    pub fn fail_queries(&self, id: impl Into<JobId>) {
        self.inner().failing_queries.insert(id.into());
    }

    /// Reject the next submission.
    pub fn fail_next_submit(&self) {
        self.inner().fail_next_submit = true;
    }

    /// Every accepted submission, in order.
    pub fn submitted(&self) -> Vec<(JobId, JobSpec)> {
        self.inner().submitted.clone()
    }

    pub fn cancelled(&self) -> Vec<JobId> {
        self.inner().cancelled.clone()
    }

    /// How many status queries `id` has received.
    pub fn query_count(&self, id: &JobId) -> usize {
        self.inner().queries.iter().filter(|q| *q == id).count()
    }

    fn query_error(id: &JobId) -> BackendError {
        BackendError::Query {
            command: "scripted query".to_string(),
            job_id: id.clone(),
            stderr: "scripted query failure".to_string(),
        }
    }
}

impl Backend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submitted, BackendError> {
        let mut inner = self.inner();

        if inner.fail_next_submit {
            inner.fail_next_submit = false;
            return Err(BackendError::Submit {
                command: "scripted submit".to_string(),
                code: Some(1),
                stdout: String::new(),
                stderr: "submission refused".to_string(),
            });
        }

        let id = JobId::new((FIRST_ID + inner.submissions).to_string());
        inner.submissions += 1;

        let script = inner
            .upcoming
            .pop_front()
            .filter(|statuses| !statuses.is_empty())
            .unwrap_or_else(|| vec![Status::Done]);
        inner.scripts.insert(id.clone(), script.into());
        inner
            .dependencies
            .insert(id.clone(), spec.dependencies.clone());
        inner.submitted.push((id.clone(), spec.clone()));

        Ok(Submitted {
            id,
            script_path: None,
            log_path: None,
        })
    }

    async fn query_status(&self, id: &JobId) -> Result<Status, BackendError> {
        let mut inner = self.inner();
        inner.queries.push(id.clone());

        if inner.failing_queries.contains(id) {
            return Err(Self::query_error(id));
        }

        let Some(script) = inner.scripts.get_mut(id) else {
            return Ok(Status::Vanished);
        };
        let status = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        Ok(status.unwrap_or(Status::Vanished))
    }

    async fn cancel(&self, id: &JobId) {
        let mut inner = self.inner();
        inner.cancelled.push(id.clone());
        if let Some(script) = inner.scripts.get_mut(id) {
            *script = VecDeque::from([Status::Failed]);
        }
    }

    async fn list_dependencies(&self, id: &JobId) -> Result<Vec<JobId>, BackendError> {
        let inner = self.inner();
        if inner.failing_queries.contains(id) {
            return Err(Self::query_error(id));
        }
        Ok(inner.dependencies.get(id).cloned().unwrap_or_default())
    }
}

/// A minimal single-stage job.
pub fn job_spec(command: &str) -> JobSpec {
    JobSpec {
        commands: vec![command.split_whitespace().map(String::from).collect()],
        resources: Resources {
            partition: "dav".to_string(),
            account: "TEST0001".to_string(),
            time_limit: Duration::from_secs(3600),
            memory_mb: 1024,
            constraint: None,
        },
        env: EnvBootstrap::default(),
        dependencies: Vec::new(),
        notify: false,
        name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_pops_then_repeats() {
        let backend = ScriptedBackend::new();
        backend.script("5", vec![Status::Pending, Status::Running, Status::Done]);
        let id = JobId::from("5");

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(backend.query_status(&id).await.unwrap());
        }
        assert_eq!(
            seen,
            vec![Status::Pending, Status::Running, Status::Done, Status::Done]
        );
        assert_eq!(backend.query_count(&id), 4);
    }

    #[tokio::test]
    async fn test_unknown_ids_vanish() {
        let backend = ScriptedBackend::new();
        assert_eq!(
            backend.query_status(&JobId::from("404")).await.unwrap(),
            Status::Vanished
        );
    }

    #[tokio::test]
    async fn test_submit_assigns_sequential_ids_and_records_dependencies() {
        let backend = ScriptedBackend::new();
        let first = backend.submit(&job_spec("a")).await.unwrap();
        let second = backend
            .submit(&job_spec("b").with_dependencies(vec![first.id.clone()]))
            .await
            .unwrap();

        assert_eq!(first.id.as_str(), "1000");
        assert_eq!(second.id.as_str(), "1001");
        assert_eq!(
            backend.list_dependencies(&second.id).await.unwrap(),
            vec![first.id]
        );
    }

    #[tokio::test]
    async fn test_cancel_turns_job_failed() {
        let backend = ScriptedBackend::new();
        backend.queue_script(vec![Status::Running]);
        let job = backend.submit(&job_spec("a")).await.unwrap();

        backend.cancel(&job.id).await;
        assert_eq!(backend.query_status(&job.id).await.unwrap(), Status::Failed);
        assert_eq!(backend.cancelled(), vec![job.id]);
    }

    #[tokio::test]
    async fn test_fail_next_submit_is_one_shot() {
        let backend = ScriptedBackend::new();
        backend.fail_next_submit();
        assert!(backend.submit(&job_spec("a")).await.is_err());
        assert!(backend.submit(&job_spec("a")).await.is_ok());
    }
}
