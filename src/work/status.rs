//! Public status taxonomy and its mapping from native job states.

use async_trait::async_trait;
use futures::StreamExt as _;
use futures::stream::BoxStream;

use super::processor::WorkProcessor;
use crate::error::{Error, Result};
use crate::runner::{JobId, JobState};

/// Caller-visible status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkStatus {
    /// Waiting to run, possibly behind other jobs.
    Queued,
    Running,
    /// Completed without errors reported to the runner.
    Finished,
    /// Failed or cancelled; may or may not have had its effect.
    Failed,
}

impl From<JobState> for WorkStatus {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Enqueued | JobState::Blocked => WorkStatus::Queued,
            JobState::Running => WorkStatus::Running,
            JobState::Succeeded => WorkStatus::Finished,
            JobState::Failed | JobState::Cancelled => WorkStatus::Failed,
        }
    }
}

impl std::fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkStatus::Queued => "queued",
            WorkStatus::Running => "running",
            WorkStatus::Finished => "finished",
            WorkStatus::Failed => "failed",
        };
        f.pad(s)
    }
}

#[async_trait]
pub trait WorkStatusProvider: Send + Sync {
    /// # Errors
    ///
    /// `Error::NotFound` if the runner has no job with this id.
    async fn status_by_id(&self, id: JobId) -> Result<WorkStatus>;

    /// Current status, then each change. Consecutive repeats are dropped.
    fn status_by_id_stream(&self, id: JobId) -> BoxStream<'static, WorkStatus>;
}

#[async_trait]
impl WorkStatusProvider for WorkProcessor {
    async fn status_by_id(&self, id: JobId) -> Result<WorkStatus> {
        self.work_by_id(id)
            .await?
            .map(|info| WorkStatus::from(info.state))
            .ok_or_else(|| Error::NotFound(format!("job {id}")))
    }

    fn status_by_id_stream(&self, id: JobId) -> BoxStream<'static, WorkStatus> {
        let mut last = None;
        self.work_by_id_stream(id)
            .filter_map(move |info| {
                let status = WorkStatus::from(info.state);
                let changed = last != Some(status);
                last = Some(status);
                futures::future::ready(changed.then_some(status))
            })
            .boxed()
    }
}
