//! Job registry and the single-flight lock
//!
//! Deploy and database reset both mutate the same live environment, so they
//! share one lock: at most one mutating procedure executes at any instant,
//! across both kinds. There is no queue; a submission while the lock is held
//! is rejected and the caller retries later.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

use crate::jobs::job::{Job, JobKind, JobView};

/// The single-flight lock is held by another job
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("another operation is already in progress")]
pub struct Busy;

/// Owns the id-to-job map and the single-flight slot shared by both
/// operation kinds.
pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, Arc<Job>>>,
    slot: Arc<Semaphore>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Submit a job for asynchronous execution.
    ///
    /// Attempts a non-blocking acquisition of the single-flight slot; on
    /// contention returns [`Busy`] without creating a job. On success the job
    /// is registered in `queued` state, the procedure is spawned onto the
    /// runtime, and the job id is returned immediately.
    ///
    /// The acquired permit moves into the spawned task and is released when
    /// the task finishes, so the lock is freed exactly once on success,
    /// failure, or panic of the procedure.
    pub fn submit<F, Fut, E>(
        &self,
        kind: JobKind,
        branch: Option<String>,
        procedure: F,
    ) -> Result<Uuid, Busy>
    where
        F: FnOnce(Arc<Job>) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display,
    {
        let permit = self.slot.clone().try_acquire_owned().map_err(|_| Busy)?;

        let job = Arc::new(Job::new(kind, branch));
        let id = job.id();
        self.jobs.lock().insert(id, job.clone());

        let fut = procedure(job.clone());
        tokio::spawn(async move {
            // Held until the task finishes, success or failure
            let _slot = permit;

            job.mark_running();
            match fut.await {
                Ok(()) => {
                    info!(job_id = %job.id(), "Job finished successfully");
                    job.succeed();
                }
                Err(e) => {
                    error!(job_id = %job.id(), "Job failed: {}", e);
                    job.fail(e.to_string());
                }
            }
        });

        Ok(id)
    }

    /// Snapshot a job's current state. Never blocks on a running procedure.
    pub fn poll(&self, id: Uuid) -> Option<JobView> {
        self.jobs.lock().get(&id).map(|job| job.view())
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::job::JobState;
    use std::time::Duration;
    use tokio::sync::oneshot;

    /// Poll until the job reaches a terminal state.
    async fn await_terminal(registry: &JobRegistry, id: Uuid) -> JobView {
        for _ in 0..500 {
            let view = registry.poll(id).expect("job must stay registered");
            if view.state.is_terminal() {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never reached a terminal state", id);
    }

    #[tokio::test]
    async fn test_submit_registers_and_runs() {
        let registry = JobRegistry::new();
        let id = registry
            .submit(JobKind::Deploy, Some("feature/x".to_string()), |_job| async {
                Ok::<(), Busy>(())
            })
            .unwrap();

        // Immediately resolvable, queued or already running
        let view = registry.poll(id).unwrap();
        assert!(matches!(view.state, JobState::Queued | JobState::Running));
        assert_eq!(view.branch.as_deref(), Some("feature/x"));

        let view = await_terminal(&registry, id).await;
        assert_eq!(view.state, JobState::Success);
        assert_eq!(view.step, "done");
        assert_eq!(view.error, None);
    }

    #[tokio::test]
    async fn test_busy_while_lock_held_creates_no_job() {
        let registry = JobRegistry::new();
        let (release, held) = oneshot::channel::<()>();

        let first = registry
            .submit(JobKind::Deploy, Some("feature/x".to_string()), |_job| async {
                let _ = held.await;
                Ok::<(), Busy>(())
            })
            .unwrap();

        // Second deploy and a reset are both rejected while the slot is held
        let second = registry.submit(JobKind::Deploy, Some("feature/y".to_string()), |_job| async {
            Ok::<(), Busy>(())
        });
        assert_eq!(second.unwrap_err(), Busy);

        let reset = registry.submit(JobKind::DatabaseReset, None, |_job| async {
            Ok::<(), Busy>(())
        });
        assert_eq!(reset.unwrap_err(), Busy);

        // No job was created for the rejected submissions
        assert_eq!(registry.jobs.lock().len(), 1);

        // The original job is unaffected by the rejections
        let view = registry.poll(first).unwrap();
        assert!(!view.state.is_terminal());

        release.send(()).unwrap();
        let view = await_terminal(&registry, first).await;
        assert_eq!(view.state, JobState::Success);
    }

    #[tokio::test]
    async fn test_lock_released_after_failure() {
        let registry = JobRegistry::new();
        let id = registry
            .submit(JobKind::Deploy, Some("feature/x".to_string()), |_job| async {
                Err::<(), String>("command `docker image rm beta-app` exited with code 1".to_string())
            })
            .unwrap();

        let view = await_terminal(&registry, id).await;
        assert_eq!(view.state, JobState::Error);
        let error = view.error.unwrap();
        assert!(error.contains("docker image rm"));
        assert!(error.contains("exited with code 1"));

        // A subsequent submission of either kind succeeds
        let reset = registry
            .submit(JobKind::DatabaseReset, None, |_job| async { Ok::<(), Busy>(()) })
            .unwrap();
        await_terminal(&registry, reset).await;
    }

    #[tokio::test]
    async fn test_job_ids_are_unique() {
        let registry = JobRegistry::new();
        let first = registry
            .submit(JobKind::Deploy, Some("a".to_string()), |_job| async { Ok::<(), Busy>(()) })
            .unwrap();
        await_terminal(&registry, first).await;

        let second = registry
            .submit(JobKind::Deploy, Some("b".to_string()), |_job| async { Ok::<(), Busy>(()) })
            .unwrap();
        assert_ne!(first, second);

        // Finished jobs stay pollable for the process lifetime
        assert!(registry.poll(first).is_some());
        assert!(registry.poll(second).is_some());
    }

    #[tokio::test]
    async fn test_poll_unknown_id() {
        let registry = JobRegistry::new();
        assert!(registry.poll(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn test_procedure_observes_step_updates() {
        let registry = JobRegistry::new();
        let (step_set_tx, step_set_rx) = oneshot::channel::<()>();
        let (release, held) = oneshot::channel::<()>();

        let id = registry
            .submit(JobKind::Deploy, Some("feature/x".to_string()), |job| async move {
                job.set_step("stopping application stack");
                step_set_tx.send(()).unwrap();
                let _ = held.await;
                Ok::<(), Busy>(())
            })
            .unwrap();

        step_set_rx.await.unwrap();
        let view = registry.poll(id).unwrap();
        assert_eq!(view.state, JobState::Running);
        assert_eq!(view.step, "stopping application stack");

        release.send(()).unwrap();
        await_terminal(&registry, id).await;
    }
}
