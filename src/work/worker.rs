//! The worker execution shell.
//!
//! A [`Worker`] classifies one attempt into a [`Response`]. [`run_attempt`]
//! wraps that call: it contains errors and panics, applies the retry ceiling
//! and reduces the four-way response to the runner's [`JobResult`].

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt as _;
use opentelemetry::KeyValue;
use tracing::{Instrument, debug, warn};

use crate::error::Result;
use crate::runner::{JobResult, WorkerParameters};
use crate::telemetry::{metrics, work};

/// Attempts that may end in [`Response::Retry`] before the ceiling applies.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Outcome of one attempt as the worker sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Response {
    Success,
    /// Reschedule per the job's backoff criteria.
    Retry,
    /// Fail this job and every job queued behind it in the chain.
    FailureEndChain,
    /// The operation failed but the chain continues. Reported to the runner
    /// as success.
    FailureContinueChain,
}

impl Response {
    pub fn as_str(self) -> &'static str {
        match self {
            Response::Success => "success",
            Response::Retry => "retry",
            Response::FailureEndChain => "failure_end_chain",
            Response::FailureContinueChain => "failure_continue_chain",
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Response> for JobResult {
    fn from(response: Response) -> Self {
        match response {
            Response::Retry => JobResult::Retry,
            Response::FailureEndChain => JobResult::Failure,
            Response::FailureContinueChain | Response::Success => JobResult::Success,
        }
    }
}

/// Handler for one kind of job. Implementors only classify; retry policy
/// lives in the shell.
#[async_trait]
pub trait Worker: Send + Sync {
    fn max_retries(&self) -> u32 {
        DEFAULT_MAX_RETRIES
    }

    /// Replaces a `Retry` once the attempt count reaches
    /// [`max_retries`](Worker::max_retries).
    fn on_retry_limit_reached(&self) -> Response {
        Response::FailureContinueChain
    }

    /// Used when [`perform_work`](Worker::perform_work) errors or panics.
    fn on_error(&self) -> Response {
        Response::Retry
    }

    /// Perform the job's single operation and classify the outcome.
    async fn perform_work(&self, params: &WorkerParameters) -> Result<Response>;
}

/// Apply the retry ceiling to a classified response.
pub fn apply_retry_ceiling(worker: &dyn Worker, response: Response, run_attempt_count: u32) -> Response {
    if response == Response::Retry && run_attempt_count >= worker.max_retries() {
        worker.on_retry_limit_reached()
    } else {
        response
    }
}

/// Run one attempt of `worker`. Never panics and never returns an error.
pub async fn run_attempt(handler: &str, worker: &dyn Worker, params: &WorkerParameters) -> JobResult {
    let span = work::start_attempt_span(handler, &params.id, params.run_attempt_count);
    let started = Instant::now();

    let response = async {
        debug!("starting to perform work");
        let classified = match AssertUnwindSafe(worker.perform_work(params))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => {
                debug!(%response, "finished work");
                response
            }
            Ok(Err(e)) => {
                warn!(error = %e, "work failed");
                worker.on_error()
            }
            Err(_) => {
                warn!("worker panicked");
                worker.on_error()
            }
        };
        apply_retry_ceiling(worker, classified, params.run_attempt_count)
    }
    .instrument(span.clone())
    .await;

    span.record("work.response", response.as_str());
    metrics::worker_responses().add(
        1,
        &[
            KeyValue::new("handler", handler.to_string()),
            KeyValue::new("response", response.as_str()),
        ],
    );
    metrics::worker_attempt_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("handler", handler.to_string())],
    );

    response.into()
}
