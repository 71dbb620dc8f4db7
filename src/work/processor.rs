//! Submission and lookup of work items against a [`JobRunner`].

use std::sync::Arc;

use futures::stream::BoxStream;
use opentelemetry::KeyValue;
use tracing::{debug, info, warn};

use super::request::WorkRequest;
use crate::error::Result;
use crate::runner::{ExistingWorkPolicy, JobId, JobInfo, JobRunner, Operation};
use crate::telemetry::metrics;

/// Resolves the effective chain for each item and appends it there.
///
/// Holds no state of its own: every decision queries the runner live.
#[derive(Clone)]
pub struct WorkProcessor {
    runner: Arc<dyn JobRunner>,
}

impl WorkProcessor {
    pub fn new(runner: Arc<dyn JobRunner>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &Arc<dyn JobRunner> {
        &self.runner
    }

    /// Submit `request`, returning its id immediately. The job runs
    /// asynchronously; submission problems are reported in the [`Operation`].
    pub async fn submit_work(&self, request: &dyn WorkRequest) -> (JobId, Operation) {
        let id = JobId::new();
        let handler = request.worker_name().to_string();

        let job = match request.build_request(id) {
            Ok(job) => job,
            Err(e) => {
                warn!(%id, handler = %handler, error = %e, "failed to build job");
                record_submission(&handler, false);
                return (id, Operation::failure(e.to_string()));
            }
        };

        let name = self.resolve_queue_name(request).await;
        let operation = self
            .runner
            .enqueue_unique(&name, ExistingWorkPolicy::Append, job)
            .await;

        match operation.error() {
            None => info!(%id, handler = %handler, queue = %name, "work submitted"),
            Some(e) => warn!(%id, handler = %handler, queue = %name, error = e, "work submission failed"),
        }
        record_submission(&handler, operation.is_success());
        (id, operation)
    }

    /// First preceding name with unfinished work, else the item's own name.
    async fn resolve_queue_name(&self, request: &dyn WorkRequest) -> String {
        for name in request.preceding_work_names() {
            match self.runner.jobs_by_name(&name).await {
                Ok(jobs) if jobs.iter().any(|job| !job.state.is_finished()) => {
                    debug!(queue = %name, "queueing behind active preceding work");
                    return name;
                }
                Ok(_) => {}
                Err(e) => warn!(queue = %name, error = %e, "could not inspect preceding work"),
            }
        }
        request.unique_work_name()
    }

    pub async fn work_by_id(&self, id: JobId) -> Result<Option<JobInfo>> {
        self.runner.job(id).await
    }

    pub fn work_by_id_stream(&self, id: JobId) -> BoxStream<'static, JobInfo> {
        self.runner.watch_job(id)
    }

    /// Every job under `name`, active or historical.
    pub async fn work_by_name(&self, name: &str) -> Result<Vec<JobInfo>> {
        self.runner.jobs_by_name(name).await
    }

    pub fn work_by_name_stream(&self, name: &str) -> BoxStream<'static, Vec<JobInfo>> {
        self.runner.watch_jobs_by_name(name)
    }
}

fn record_submission(handler: &str, ok: bool) {
    metrics::work_submitted().add(
        1,
        &[
            KeyValue::new("handler", handler.to_string()),
            KeyValue::new("result", if ok { "ok" } else { "error" }),
        ],
    );
}
