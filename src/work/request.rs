//! Work items: what to run, with which payload, in which chain.

use std::time::Duration;

use crate::error::Result;
use crate::runner::{BackoffCriteria, BackoffPolicy, Constraints, JobId, JobRequest, WorkData};

/// Chain shared by every item that doesn't name its own.
pub const DEFAULT_UNIQUE_WORK_NAME: &str = "SdkWorker";

/// Base delay for both backoff policies unless overridden.
pub const DEFAULT_BACKOFF_DELAY: Duration = Duration::from_secs(60);

/// A durable unit of work, described as pure data.
///
/// Items sharing a [`unique_work_name`](WorkRequest::unique_work_name) run one
/// after the other in submission order. Without an override every item lands
/// in the single [`DEFAULT_UNIQUE_WORK_NAME`] chain, so implementors that want
/// independent parallelism key the name by their entity (e.g. by email).
pub trait WorkRequest: Send + Sync {
    /// Handler identity the runner resolves in its
    /// [`WorkerRegistry`](crate::runner::WorkerRegistry).
    fn worker_name(&self) -> &str;

    /// Payload handed to the worker.
    fn work_parameters(&self) -> Result<Option<WorkData>> {
        Ok(None)
    }

    fn unique_work_name(&self) -> String {
        DEFAULT_UNIQUE_WORK_NAME.to_string()
    }

    /// Chains this item should queue behind if they have active work. Only
    /// the first name with active work is used.
    fn preceding_work_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn requires_network(&self) -> bool {
        true
    }

    fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::Exponential
    }

    fn backoff_delay(&self) -> Duration {
        DEFAULT_BACKOFF_DELAY
    }

    /// Assemble the job description the runner consumes.
    fn build_request(&self, id: JobId) -> Result<JobRequest> {
        Ok(JobRequest {
            id,
            worker: self.worker_name().to_string(),
            input: self.work_parameters()?.unwrap_or_default(),
            constraints: Constraints {
                requires_network: self.requires_network(),
            },
            backoff: BackoffCriteria {
                policy: self.backoff_policy(),
                delay: self.backoff_delay(),
            },
        })
    }
}
