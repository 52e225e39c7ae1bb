//! Job records and lifecycle

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

/// Which procedure owns a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Deploy,
    DatabaseReset,
}

/// Job lifecycle state.
///
/// Transitions are monotonic and one-directional:
/// `queued -> running -> success | error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Success,
    Error,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Error)
    }
}

/// One tracked instance of a long-running mutating operation.
///
/// The progress fields sit behind their own fine-grained lock so a poller
/// reads a snapshot without contending with the procedure task for anything
/// beyond a brief read lock.
pub struct Job {
    id: Uuid,
    kind: JobKind,
    branch: Option<String>,
    created_at: DateTime<Utc>,
    progress: RwLock<Progress>,
}

#[derive(Debug)]
struct Progress {
    state: JobState,
    step: String,
    error: Option<String>,
    finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub(crate) fn new(kind: JobKind, branch: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            branch,
            created_at: Utc::now(),
            progress: RwLock::new(Progress {
                state: JobState::Queued,
                step: "waiting for slot".to_string(),
                error: None,
                finished_at: None,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Describe the phase the procedure is about to execute.
    pub fn set_step(&self, step: impl Into<String>) {
        let mut progress = self.progress.write();
        if !progress.state.is_terminal() {
            progress.step = step.into();
        }
    }

    pub(crate) fn mark_running(&self) {
        let mut progress = self.progress.write();
        if progress.state == JobState::Queued {
            progress.state = JobState::Running;
        }
    }

    pub(crate) fn succeed(&self) {
        let mut progress = self.progress.write();
        if !progress.state.is_terminal() {
            progress.state = JobState::Success;
            progress.step = "done".to_string();
            progress.finished_at = Some(Utc::now());
        }
    }

    pub(crate) fn fail(&self, error: String) {
        let mut progress = self.progress.write();
        if !progress.state.is_terminal() {
            progress.state = JobState::Error;
            progress.error = Some(error);
            progress.finished_at = Some(Utc::now());
        }
    }

    /// Immutable snapshot for pollers.
    pub fn view(&self) -> JobView {
        let progress = self.progress.read();
        JobView {
            id: self.id,
            kind: self.kind,
            branch: self.branch.clone(),
            state: progress.state,
            step: progress.step.clone(),
            error: progress.error.clone(),
            created_at: self.created_at,
            finished_at: progress.finished_at,
        }
    }
}

/// Snapshot of a job, as returned to pollers
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: Uuid,
    pub kind: JobKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub state: JobState,
    pub step: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
