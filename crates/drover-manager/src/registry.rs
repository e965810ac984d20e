//! Bookkeeping of jobs the manager has submitted and not yet seen finish.

use camino::Utf8PathBuf;
use drover_core::{JobId, Status};

/// One tracked job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedJob {
    pub id: JobId,
    pub log_path: Option<Utf8PathBuf>,
    /// Most recent status seen by the waiter, if it has polled the job yet
    pub last_status: Option<Status>,
}

impl TrackedJob {
    pub fn new(id: JobId, log_path: Option<Utf8PathBuf>) -> Self {
        Self {
            id,
            log_path,
            last_status: None,
        }
    }
}

/// Ordered set of jobs not yet confirmed terminal.
///
/// Submission order is preserved and an id is never tracked twice.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    jobs: Vec<TrackedJob>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a job. Returns false if the id is already tracked.
    pub fn track(&mut self, job: TrackedJob) -> bool {
        if self.contains(&job.id) {
            return false;
        }
        self.jobs.push(job);
        true
    }

    /// Stop tracking a job, returning its entry if it was tracked.
    pub fn remove(&mut self, id: &JobId) -> Option<TrackedJob> {
        let index = self.jobs.iter().position(|job| &job.id == id)?;
        Some(self.jobs.remove(index))
    }

    /// Remember the latest status of a tracked job. Untracked ids are ignored.
    pub fn record_status(&mut self, id: &JobId, status: Status) {
        if let Some(job) = self.jobs.iter_mut().find(|job| &job.id == id) {
            job.last_status = Some(status);
        }
    }

    pub fn get(&self, id: &JobId) -> Option<&TrackedJob> {
        self.jobs.iter().find(|job| &job.id == id)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.get(id).is_some()
    }

    /// Tracked ids in submission order.
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|job| job.id.clone()).collect()
    }

    pub fn jobs(&self) -> &[TrackedJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> TrackedJob {
        TrackedJob::new(JobId::from(id), None)
    }

    #[test]
    fn test_track_rejects_duplicates() {
        let mut registry = Registry::new();
        assert!(registry.track(job("1")));
        assert!(registry.track(job("2")));
        assert!(!registry.track(job("1")));
        assert_eq!(registry.ids(), vec![JobId::from("1"), JobId::from("2")]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut registry = Registry::new();
        for id in ["1", "2", "3"] {
            registry.track(job(id));
        }
        assert!(registry.remove(&JobId::from("2")).is_some());
        assert!(registry.remove(&JobId::from("2")).is_none());
        assert_eq!(registry.ids(), vec![JobId::from("1"), JobId::from("3")]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_record_status() {
        let mut registry = Registry::new();
        registry.track(job("7"));
        registry.record_status(&JobId::from("7"), Status::Running);
        registry.record_status(&JobId::from("8"), Status::Done);

        assert_eq!(
            registry.get(&JobId::from("7")).unwrap().last_status,
            Some(Status::Running)
        );
        assert!(!registry.contains(&JobId::from("8")));
    }
}
