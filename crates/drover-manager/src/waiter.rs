//! The poll loop that waits for tracked jobs to finish.

use crate::escalation::Outcome;
use crate::manager::TaskManager;
use drover_core::{Backend, BackendError, JobId, Status};
use std::collections::HashMap;

/// What a wait observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitReport {
    /// False if any job failed or a status could not be determined
    pub ok: bool,
    /// Whether the time budget was spent, checked before and after waiting
    pub time_exceeded: bool,
    /// Jobs seen FAILED, in the order they were seen
    pub failed: Vec<JobId>,
    /// Jobs cancelled because a dependency failed
    pub cancelled: Vec<JobId>,
    /// Jobs still active when the wait returned
    pub remaining: usize,
}

impl Default for WaitReport {
    fn default() -> Self {
        Self {
            ok: true,
            time_exceeded: false,
            failed: Vec::new(),
            cancelled: Vec::new(),
            remaining: 0,
        }
    }
}

/// Fate of one active job after a poll.
enum Poll {
    Active,
    Finished,
    Failed,
    Anomaly,
}

impl<B: Backend> TaskManager<B> {
    /// Wait until at most `target` of `ids` are active, then escalate.
    ///
    /// With `ids` of `None` every tracked job is waited on.
    pub async fn wait(&mut self, ids: Option<Vec<JobId>>, target: usize) -> Outcome<WaitReport> {
        let report = self.wait_on_jobs(ids, target).await;
        self.escalate(report.ok, report.time_exceeded).await?;
        Ok(report)
    }

    /// Wait until at most `target` of `ids` are active. Never escalates.
    pub async fn wait_on_jobs(&mut self, ids: Option<Vec<JobId>>, target: usize) -> WaitReport {
        let mut report = WaitReport {
            time_exceeded: self.check_time(),
            ..WaitReport::default()
        };

        let mut active = ids.unwrap_or_else(|| self.registry().ids());
        if active.len() <= target {
            report.remaining = active.len();
            return report;
        }

        tracing::info!("waiting on {} jobs", active.len());
        if target == 0 {
            let listed: Vec<&str> = active.iter().map(JobId::as_str).collect();
            tracing::info!("job ids: {}", listed.join(" "));
        }

        let mut last_seen: HashMap<JobId, Status> = HashMap::new();
        loop {
            let mut stop = false;
            let mut still_active = Vec::with_capacity(active.len());

            for id in active {
                let polled = self.poll_job(&id, &mut last_seen, &mut report).await;
                match polled {
                    Ok(Poll::Active) => {
                        still_active.push(id);
                        continue;
                    }
                    Ok(Poll::Finished) => {}
                    Ok(Poll::Failed) => {
                        let log = self.registry().get(&id).and_then(|j| j.log_path.as_ref());
                        if let Some(log) = log {
                            tracing::error!("job {} failed, log: {}", id, log);
                        }
                        report.ok = false;
                        report.failed.push(id.clone());
                        self.record_failure(&id);
                    }
                    Ok(Poll::Anomaly) => report.ok = false,
                    Err(e) => {
                        tracing::error!("could not query job {}: {}", id, e);
                        report.ok = false;
                        stop = true;
                    }
                }
                self.registry_mut().remove(&id);
            }

            active = still_active;
            if stop || active.len() <= target {
                break;
            }
            tokio::time::sleep(self.limits().poll_interval).await;
        }

        report.time_exceeded = self.check_time();
        report.remaining = active.len();

        if !report.failed.is_empty() {
            let listed: Vec<&str> = report.failed.iter().map(JobId::as_str).collect();
            tracing::error!("failed jobs: {}", listed.join(" "));
        } else {
            tracing::info!("Done waiting.");
        }
        if report.remaining > 0 {
            tracing::info!("{} jobs still active", report.remaining);
        }

        report
    }

    /// Poll one job and cancel it if something it depends on has failed.
    async fn poll_job(
        &mut self,
        id: &JobId,
        last_seen: &mut HashMap<JobId, Status>,
        report: &mut WaitReport,
    ) -> Result<Poll, BackendError> {
        let status = self.status(id).await?;

        if last_seen.get(id) != Some(&status) {
            tracing::info!("job {}: {}", id, status);
            last_seen.insert(id.clone(), status.clone());
        }
        self.registry_mut().record_status(id, status.clone());

        Ok(match status {
            Status::Pending | Status::Running => {
                if !self.failed().is_empty() && !report.cancelled.contains(id) {
                    let dependencies = self.backend().list_dependencies(id).await?;
                    if let Some(failed) = dependencies.iter().find(|d| self.failed().contains(d)) {
                        tracing::warn!(
                            "job {} depends on failed job {}, cancelling it",
                            id,
                            failed
                        );
                        self.kill(id).await;
                        report.cancelled.push(id.clone());
                    }
                }
                Poll::Active
            }
            Status::Done => Poll::Finished,
            Status::Vanished => {
                // A purged id is indistinguishable from a finished one
                tracing::debug!("job {} is no longer known, counting it as done", id);
                Poll::Finished
            }
            Status::Failed => Poll::Failed,
            Status::Transitional | Status::Unrecognized(_) => {
                tracing::warn!("job {} has unexpected status {}", id, status);
                Poll::Anomaly
            }
        })
    }

    /// Time budget check, logged when spent.
    fn check_time(&self) -> bool {
        let exceeded = self.time_exceeded();
        if exceeded {
            tracing::info!("total elapsed time: {:.4} h", self.elapsed_hours());
        }
        exceeded
    }
}
