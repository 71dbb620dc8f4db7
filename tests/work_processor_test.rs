//! Tests for submission, queue-name resolution and status mapping.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use audience_rs::error::{Error, Result};
use audience_rs::runner::{
    BackoffPolicy, ExistingWorkPolicy, JobId, JobInfo, JobRequest, JobRunner, JobState,
    LocalJobRunner, NetworkMonitor, Operation, WorkData, WorkerRegistry,
};
use audience_rs::work::{
    DEFAULT_BACKOFF_DELAY, DEFAULT_UNIQUE_WORK_NAME, Response, WorkProcessor, WorkRequest,
    WorkStatus, WorkStatusProvider,
};
use chrono::Utc;
use common::{ScriptedWorker, fast_runner_config};
use futures::StreamExt as _;
use futures::stream::{self, BoxStream};

const WORKER: &str = "test";

/// Chained per email, like contact updates.
struct TestWorkRequest1 {
    email: String,
}

impl TestWorkRequest1 {
    fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
        }
    }
}

impl WorkRequest for TestWorkRequest1 {
    fn worker_name(&self) -> &str {
        WORKER
    }

    fn unique_work_name(&self) -> String {
        format!("Test1:{}", self.email)
    }
}

/// Its own chain, but queued behind active `Test1` work for the same email.
struct TestWorkRequest2 {
    email: String,
    extra_preceding: Vec<String>,
}

impl WorkRequest for TestWorkRequest2 {
    fn worker_name(&self) -> &str {
        WORKER
    }

    fn unique_work_name(&self) -> String {
        format!("Test2:{}", self.email)
    }

    fn preceding_work_names(&self) -> Vec<String> {
        let mut names = self.extra_preceding.clone();
        names.push(format!("Test1:{}", self.email));
        names
    }
}

/// Uses every default.
struct DefaultRequest;

impl WorkRequest for DefaultRequest {
    fn worker_name(&self) -> &str {
        WORKER
    }
}

struct BrokenRequest;

impl WorkRequest for BrokenRequest {
    fn worker_name(&self) -> &str {
        WORKER
    }

    fn work_parameters(&self) -> Result<Option<WorkData>> {
        Err(Error::Other("cannot encode".to_string()))
    }
}

/// Processor over a runner that never gets to run anything.
async fn offline_processor() -> WorkProcessor {
    let registry = WorkerRegistry::new().register(WORKER, ScriptedWorker::always(Response::Success));
    let runner = LocalJobRunner::start(
        fast_runner_config(),
        registry,
        NetworkMonitor::new(false),
        None,
    )
    .await
    .unwrap();
    WorkProcessor::new(Arc::new(runner))
}

async fn state(processor: &WorkProcessor, id: JobId) -> JobState {
    processor.work_by_id(id).await.unwrap().unwrap().state
}

// ---------------------------------------------------------------------------
// Work item defaults
// ---------------------------------------------------------------------------

#[test]
fn request_defaults_build_a_network_bound_exponential_job() {
    let id = JobId::new();
    let job = DefaultRequest.build_request(id).unwrap();

    assert_eq!(job.id, id);
    assert_eq!(job.worker, WORKER);
    assert!(job.input.is_empty());
    assert!(job.constraints.requires_network);
    assert_eq!(job.backoff.policy, BackoffPolicy::Exponential);
    assert_eq!(job.backoff.delay, DEFAULT_BACKOFF_DELAY);
    assert_eq!(DEFAULT_BACKOFF_DELAY, Duration::from_secs(60));
    assert_eq!(DefaultRequest.unique_work_name(), DEFAULT_UNIQUE_WORK_NAME);
    assert!(DefaultRequest.preceding_work_names().is_empty());
}

// ---------------------------------------------------------------------------
// Submission against the local runner
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_work_enqueues_under_the_unique_name() {
    let processor = offline_processor().await;
    let work = TestWorkRequest1::new("test@test.com");

    let (id, op) = processor.submit_work(&work).await;
    assert!(op.is_success());

    let jobs = processor.work_by_name(&work.unique_work_name()).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, id);
    assert_eq!(jobs[0].state, JobState::Enqueued);
}

#[tokio::test]
async fn same_name_submissions_are_chained() {
    let processor = offline_processor().await;
    let (one, _) = processor.submit_work(&TestWorkRequest1::new("test@test.com")).await;
    let (two, _) = processor.submit_work(&TestWorkRequest1::new("test@test.com")).await;

    let jobs = processor.work_by_name("Test1:test@test.com").await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(state(&processor, one).await, JobState::Enqueued);
    assert_eq!(state(&processor, two).await, JobState::Blocked);
}

#[tokio::test]
async fn different_names_are_independent() {
    let processor = offline_processor().await;
    processor.submit_work(&TestWorkRequest1::new("test@test.com")).await;
    processor
        .submit_work(&TestWorkRequest1::new("test@mailchimp.com"))
        .await;

    for name in ["Test1:test@test.com", "Test1:test@mailchimp.com"] {
        let jobs = processor.work_by_name(name).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].state, JobState::Enqueued);
    }
}

#[tokio::test]
async fn active_preceding_work_becomes_the_queue() {
    let processor = offline_processor().await;
    let (user, _) = processor.submit_work(&TestWorkRequest1::new("test@test.com")).await;
    let (tag, _) = processor
        .submit_work(&TestWorkRequest2 {
            email: "test@test.com".to_string(),
            extra_preceding: Vec::new(),
        })
        .await;

    let jobs = processor.work_by_name("Test1:test@test.com").await.unwrap();
    let ids: Vec<JobId> = jobs.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![user, tag]);
    assert_eq!(state(&processor, user).await, JobState::Enqueued);
    assert_eq!(state(&processor, tag).await, JobState::Blocked);
    assert!(processor.work_by_name("Test2:test@test.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn without_active_preceding_work_the_own_name_is_used() {
    let processor = offline_processor().await;
    let (id, _) = processor
        .submit_work(&TestWorkRequest2 {
            email: "test@test.com".to_string(),
            extra_preceding: Vec::new(),
        })
        .await;

    let jobs = processor.work_by_name("Test2:test@test.com").await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, id);
}

#[tokio::test]
async fn build_failure_is_reported_in_the_operation() {
    let processor = offline_processor().await;
    let (id, op) = processor.submit_work(&BrokenRequest).await;

    assert!(!op.is_success());
    assert!(op.error().unwrap().contains("cannot encode"));
    assert!(processor.work_by_id(id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Resolution order, observed through a recording runner
// ---------------------------------------------------------------------------

/// Answers name lookups from a fixed table and records enqueues.
#[derive(Default)]
struct RecordingRunner {
    active: HashMap<String, JobState>,
    lookups: Mutex<Vec<String>>,
    enqueued: Mutex<Vec<String>>,
}

fn info(name: &str, state: JobState) -> JobInfo {
    JobInfo {
        id: JobId::new(),
        unique_name: name.to_string(),
        worker: WORKER.to_string(),
        state,
        run_attempt_count: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl JobRunner for RecordingRunner {
    async fn enqueue_unique(
        &self,
        name: &str,
        _policy: ExistingWorkPolicy,
        _request: JobRequest,
    ) -> Operation {
        self.enqueued.lock().unwrap().push(name.to_string());
        Operation::success()
    }

    async fn job(&self, _id: JobId) -> Result<Option<JobInfo>> {
        Ok(None)
    }

    fn watch_job(&self, _id: JobId) -> BoxStream<'static, JobInfo> {
        stream::empty().boxed()
    }

    async fn jobs_by_name(&self, name: &str) -> Result<Vec<JobInfo>> {
        self.lookups.lock().unwrap().push(name.to_string());
        Ok(self
            .active
            .get(name)
            .map(|state| vec![info(name, *state)])
            .unwrap_or_default())
    }

    fn watch_jobs_by_name(&self, _name: &str) -> BoxStream<'static, Vec<JobInfo>> {
        stream::empty().boxed()
    }
}

#[tokio::test]
async fn first_preceding_name_with_active_work_wins() {
    let runner = Arc::new(RecordingRunner {
        active: HashMap::from([
            ("Done".to_string(), JobState::Succeeded),
            ("First".to_string(), JobState::Running),
            ("Test1:a@b.com".to_string(), JobState::Blocked),
        ]),
        ..Default::default()
    });
    let processor = WorkProcessor::new(runner.clone());

    processor
        .submit_work(&TestWorkRequest2 {
            email: "a@b.com".to_string(),
            extra_preceding: vec!["Done".to_string(), "First".to_string()],
        })
        .await;

    assert_eq!(*runner.enqueued.lock().unwrap(), vec!["First".to_string()]);
    assert_eq!(
        *runner.lookups.lock().unwrap(),
        vec!["Done".to_string(), "First".to_string()]
    );
}

#[tokio::test]
async fn finished_preceding_work_is_ignored() {
    let runner = Arc::new(RecordingRunner {
        active: HashMap::from([
            ("Test1:a@b.com".to_string(), JobState::Failed),
            ("Other".to_string(), JobState::Cancelled),
        ]),
        ..Default::default()
    });
    let processor = WorkProcessor::new(runner.clone());

    processor
        .submit_work(&TestWorkRequest2 {
            email: "a@b.com".to_string(),
            extra_preceding: vec!["Other".to_string()],
        })
        .await;

    assert_eq!(
        *runner.enqueued.lock().unwrap(),
        vec!["Test2:a@b.com".to_string()]
    );
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn status_mapping_covers_every_native_state() {
    let table = [
        (JobState::Enqueued, WorkStatus::Queued),
        (JobState::Blocked, WorkStatus::Queued),
        (JobState::Running, WorkStatus::Running),
        (JobState::Succeeded, WorkStatus::Finished),
        (JobState::Failed, WorkStatus::Failed),
        (JobState::Cancelled, WorkStatus::Failed),
    ];
    for (state, status) in table {
        assert_eq!(WorkStatus::from(state), status, "{state}");
    }
}

#[tokio::test]
async fn status_of_an_unknown_job_is_not_found() {
    let processor = offline_processor().await;
    let err = processor.status_by_id(JobId::new()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn blocked_and_enqueued_both_read_as_queued() {
    let processor = offline_processor().await;
    let (one, _) = processor.submit_work(&TestWorkRequest1::new("q@q.com")).await;
    let (two, _) = processor.submit_work(&TestWorkRequest1::new("q@q.com")).await;

    assert_eq!(processor.status_by_id(one).await.unwrap(), WorkStatus::Queued);
    assert_eq!(processor.status_by_id(two).await.unwrap(), WorkStatus::Queued);

    let first = processor.status_by_id_stream(two).next().await;
    assert_eq!(first, Some(WorkStatus::Queued));
}
