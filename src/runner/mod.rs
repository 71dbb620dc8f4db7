//! Job Runner contract.
//!
//! The runner owns scheduling, persistence and execution of jobs across
//! attempts. The work core describes jobs ([`JobRequest`]), submits them under
//! a chain name, queries their native state ([`JobState`]) and is invoked one
//! attempt at a time through a registered [`Worker`].
//!
//! [`LocalJobRunner`] is the in-process implementation shipped with the crate.

pub mod local;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::work::worker::Worker;

pub use local::LocalJobRunner;

/// String-keyed, string-valued payload bag attached to a job.
pub type WorkData = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Identity + state
// ---------------------------------------------------------------------------

/// Identifier of a job, returned to callers at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(JobId)
            .map_err(|e| Error::Other(format!("invalid job id {s:?}: {e}")))
    }
}

/// Native lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Ready to run once its constraints and backoff allow.
    Enqueued,
    /// Waiting on an unfinished predecessor in its chain.
    Blocked,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Enqueued => "enqueued",
            JobState::Blocked => "blocked",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.pad(s)
    }
}

impl std::str::FromStr for JobState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enqueued" => Ok(JobState::Enqueued),
            "blocked" => Ok(JobState::Blocked),
            "running" => Ok(JobState::Running),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            "cancelled" => Ok(JobState::Cancelled),
            other => Err(Error::Other(format!("unknown job state: {other}"))),
        }
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: JobId,
    /// Chain the job was enqueued under.
    pub unique_name: String,
    /// Handler identity the runner invokes.
    pub worker: String,
    pub state: JobState,
    /// Number of attempts that ended in a retry.
    pub run_attempt_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Job description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffPolicy {
    Linear,
    Exponential,
}

/// How long to wait before the next attempt after a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffCriteria {
    pub policy: BackoffPolicy,
    pub delay: Duration,
}

impl BackoffCriteria {
    /// Delay before the `retry`-th retry (1-based), capped at `max`.
    ///
    /// Linear grows as `delay * retry`, exponential as `delay * 2^(retry - 1)`.
    pub fn delay_for_retry(&self, retry: u32, max: Duration) -> Duration {
        let retry = retry.max(1);
        let factor = match self.policy {
            BackoffPolicy::Linear => retry,
            BackoffPolicy::Exponential => 2u32.checked_pow(retry - 1).unwrap_or(u32::MAX),
        };
        self.delay.saturating_mul(factor).min(max)
    }
}

/// Preconditions for running an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub requires_network: bool,
}

/// A job as handed to the runner. Built once from a work request, never
/// mutated after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub id: JobId,
    pub worker: String,
    pub input: WorkData,
    pub constraints: Constraints,
    pub backoff: BackoffCriteria,
}

/// What to do when a chain with the requested name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingWorkPolicy {
    /// Run after every unfinished job of the chain; start a new chain if none.
    Append,
}

/// Result of a submission. Failures are reported here rather than raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    error: Option<String>,
}

impl Operation {
    pub fn success() -> Self {
        Self { error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Signal a worker attempt returns to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobResult {
    Success,
    /// Terminal failure; dependents in the chain fail too.
    Failure,
    /// Reschedule per the job's backoff criteria.
    Retry,
}

/// What a worker receives for one attempt.
#[derive(Debug, Clone)]
pub struct WorkerParameters {
    pub id: JobId,
    pub input: WorkData,
    /// Zero on the first attempt.
    pub run_attempt_count: u32,
}

// ---------------------------------------------------------------------------
// Runner contract
// ---------------------------------------------------------------------------

#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn enqueue_unique(
        &self,
        name: &str,
        policy: ExistingWorkPolicy,
        request: JobRequest,
    ) -> Operation;

    async fn job(&self, id: JobId) -> Result<Option<JobInfo>>;

    /// Current snapshot first, then one item per transition.
    fn watch_job(&self, id: JobId) -> BoxStream<'static, JobInfo>;

    /// Every job recorded under `name`, in submission order.
    async fn jobs_by_name(&self, name: &str) -> Result<Vec<JobInfo>>;

    fn watch_jobs_by_name(&self, name: &str) -> BoxStream<'static, Vec<JobInfo>>;
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Everything needed to resume a job after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub info: JobInfo,
    pub request: JobRequest,
    /// Jobs that must succeed before this one may run.
    pub prerequisites: Vec<JobId>,
    /// Earliest time of the next attempt.
    pub next_run_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save(&self, record: &JobRecord) -> Result<()>;

    async fn load_all(&self) -> Result<Vec<JobRecord>>;

    async fn remove(&self, ids: &[JobId]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Maps handler identities to worker instances. Workers receive their
/// dependencies at construction, so the runner needs nothing else to invoke them.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, worker: Arc<dyn Worker>) -> Self {
        self.workers.insert(name.into(), worker);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Worker>> {
        self.workers.get(name).cloned()
    }
}

/// Connectivity flag consulted for jobs that require the network.
#[derive(Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
    pub fn new(connected: bool) -> Self {
        let (tx, _rx) = watch::channel(connected);
        Self { tx: Arc::new(tx) }
    }

    pub fn set_connected(&self, connected: bool) {
        self.tx.send_replace(connected);
    }

    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
