//! In-process job runner on tokio.
//!
//! Jobs live in memory behind one async mutex and are optionally written
//! through to a [`JobStore`]. A dispatcher task starts every `Enqueued` job
//! whose backoff has elapsed and whose constraints hold, up to
//! `max_concurrent` at a time. Jobs in one chain are linked through
//! prerequisites, so at most one of them is ever `Enqueued` or `Running`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt as _;
use futures::stream::BoxStream;
use opentelemetry::KeyValue;
use tokio::sync::{Mutex, Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    ExistingWorkPolicy, JobId, JobInfo, JobRecord, JobRequest, JobResult, JobRunner, JobState,
    JobStore, NetworkMonitor, Operation, WorkerParameters, WorkerRegistry,
};
use crate::config::RunnerConfig;
use crate::error::{Error, Result};
use crate::telemetry::{metrics, work};
use crate::work::worker::{Response, apply_retry_ceiling, run_attempt};

const UPDATE_CHANNEL_CAPACITY: usize = 1024;
const IDLE_WAKE: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct LocalJobRunner {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<RunnerState>,
    registry: WorkerRegistry,
    network: NetworkMonitor,
    store: Option<Arc<dyn JobStore>>,
    config: RunnerConfig,
    wake: Notify,
    updates: broadcast::Sender<JobInfo>,
    shutdown: watch::Sender<bool>,
    dispatcher: std::sync::Mutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct RunnerState {
    jobs: HashMap<JobId, JobRecord>,
    /// Job ids per chain name, in submission order.
    chains: HashMap<String, Vec<JobId>>,
    running: usize,
}

impl RunnerState {
    fn chain(&self, name: &str) -> impl Iterator<Item = &JobRecord> {
        self.chains
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.jobs.get(id))
    }

    fn insert(&mut self, record: JobRecord) {
        self.chains
            .entry(record.info.unique_name.clone())
            .or_default()
            .push(record.info.id);
        self.jobs.insert(record.info.id, record);
    }

    /// Unfinished jobs that (transitively) require `root`.
    fn dependents_of(&self, root: JobId) -> Vec<JobId> {
        let mut found = Vec::new();
        let mut seen = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            for record in self.jobs.values() {
                let dependent = record.info.id;
                if !record.info.state.is_finished()
                    && record.prerequisites.contains(&id)
                    && seen.insert(dependent)
                {
                    found.push(dependent);
                    queue.push_back(dependent);
                }
            }
        }
        found
    }

    /// A prerequisite that has been pruned already counts as met.
    fn prerequisites_met(&self, record: &JobRecord) -> bool {
        record.prerequisites.iter().all(|id| {
            self.jobs
                .get(id)
                .is_none_or(|p| p.info.state == JobState::Succeeded)
        })
    }
}

impl LocalJobRunner {
    /// Restore any persisted jobs and start the dispatcher.
    pub async fn start(
        config: RunnerConfig,
        registry: WorkerRegistry,
        network: NetworkMonitor,
        store: Option<Arc<dyn JobStore>>,
    ) -> Result<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(Inner {
            state: Mutex::new(RunnerState::default()),
            registry,
            network,
            store,
            config,
            wake: Notify::new(),
            updates,
            shutdown,
            dispatcher: std::sync::Mutex::new(None),
        });

        inner.restore().await?;

        let handle = tokio::spawn(dispatch_loop(inner.clone(), shutdown_rx));
        if let Ok(mut slot) = inner.dispatcher.lock() {
            *slot = Some(handle);
        }

        Ok(Self { inner })
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.inner.network
    }

    /// Cancel an unfinished job and everything queued behind it. Cancelling
    /// a finished job does nothing.
    pub async fn cancel(&self, id: JobId) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        let record = state
            .jobs
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("job {id}")))?;
        if record.info.state.is_finished() {
            return Ok(());
        }

        let mut affected = vec![id];
        affected.extend(state.dependents_of(id));
        for job in &affected {
            self.inner.transition(&mut state, *job, JobState::Cancelled);
        }
        for job in &affected {
            self.inner.commit(&state, *job).await;
        }
        info!(%id, cascaded = affected.len() - 1, "job cancelled");
        Ok(())
    }

    /// Drop finished jobs older than the configured retention. Returns how
    /// many were removed. A chain poisoned by a failure accepts new work
    /// again once its failed jobs are gone.
    pub async fn prune(&self) -> Result<usize> {
        let cutoff = chrono::Duration::from_std(self.inner.config.retention())
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut state = self.inner.state.lock().await;
        let pruned: Vec<JobId> = state
            .jobs
            .values()
            .filter(|r| r.info.state.is_finished() && r.info.updated_at <= cutoff)
            .map(|r| r.info.id)
            .collect();
        if pruned.is_empty() {
            return Ok(0);
        }

        // Memory follows the store, so a failed delete prunes nothing.
        if let Some(store) = &self.inner.store {
            store.remove(&pruned).await?;
        }

        for id in &pruned {
            state.jobs.remove(id);
        }
        let RunnerState { jobs, chains, .. } = &mut *state;
        chains.retain(|_, ids| {
            ids.retain(|id| jobs.contains_key(id));
            !ids.is_empty()
        });

        info!(count = pruned.len(), "pruned finished jobs");
        Ok(pruned.len())
    }

    /// Stop the dispatcher. Attempts already running are left to finish.
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        let handle = self
            .inner
            .dispatcher
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Inner {
    async fn restore(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let mut records = store.load_all().await?;
        records.sort_by_key(|r| r.info.created_at);

        let mut state = self.state.lock().await;
        let mut interrupted = Vec::new();
        for mut record in records {
            if record.info.state == JobState::Running {
                record.info.state = JobState::Enqueued;
                record.info.updated_at = Utc::now();
                interrupted.push(record.info.id);
            }
            state.insert(record);
        }

        let settled = self.settle_blocked(&mut state);
        for id in interrupted.iter().chain(&settled) {
            self.commit(&state, *id).await;
        }
        info!(
            jobs = state.jobs.len(),
            interrupted = interrupted.len(),
            settled = settled.len(),
            "restored jobs"
        );
        Ok(())
    }

    /// Re-evaluate `Blocked` jobs whose prerequisites finished without the
    /// dependent's own transition being recorded. Returns the jobs changed.
    fn settle_blocked(&self, state: &mut RunnerState) -> Vec<JobId> {
        let blocked: Vec<JobId> = state
            .jobs
            .values()
            .filter(|r| r.info.state == JobState::Blocked)
            .map(|r| r.info.id)
            .collect();

        let mut changed = Vec::new();
        for id in blocked {
            let Some(record) = state.jobs.get(&id) else {
                continue;
            };
            // A cascade from an earlier job may have settled this one already.
            if record.info.state != JobState::Blocked {
                continue;
            }
            let prerequisite_states: Vec<JobState> = record
                .prerequisites
                .iter()
                .filter_map(|p| state.jobs.get(p))
                .map(|p| p.info.state)
                .collect();

            let to = if prerequisite_states.contains(&JobState::Failed) {
                JobState::Failed
            } else if prerequisite_states.contains(&JobState::Cancelled) {
                JobState::Cancelled
            } else if state.prerequisites_met(record) {
                JobState::Enqueued
            } else {
                continue;
            };

            let mut affected = vec![id];
            if to != JobState::Enqueued {
                affected.extend(state.dependents_of(id));
            }
            for job in affected {
                self.transition(state, job, to);
                changed.push(job);
            }
        }
        if !changed.is_empty() {
            warn!(count = changed.len(), "settled blocked jobs left behind by an interrupted run");
        }
        changed
    }

    /// Change a job's state in memory. Callers follow up with [`commit`](Self::commit).
    fn transition(&self, state: &mut RunnerState, id: JobId, to: JobState) {
        let Some(record) = state.jobs.get_mut(&id) else {
            return;
        };
        let from = record.info.state;
        record.info.state = to;
        record.info.updated_at = Utc::now();

        work::record_state_transition(&tracing::Span::current(), &from.to_string(), &to.to_string());
        metrics::job_state_transitions().add(
            1,
            &[
                KeyValue::new("from", from.to_string()),
                KeyValue::new("to", to.to_string()),
            ],
        );
        debug!(%id, %from, %to, "job state changed");
    }

    /// Publish the job's current view and write it through to the store.
    async fn commit(&self, state: &RunnerState, id: JobId) {
        let Some(record) = state.jobs.get(&id) else {
            return;
        };
        let _ = self.updates.send(record.info.clone());
        if let Some(store) = &self.store {
            if let Err(e) = store.save(record).await {
                warn!(%id, error = %e, "failed to persist job");
            }
        }
    }

    /// Start every runnable job. Returns when the next backed-off job becomes due.
    async fn dispatch_ready(self: &Arc<Self>) -> Option<DateTime<Utc>> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let connected = self.network.is_connected();
        let mut next_due: Option<DateTime<Utc>> = None;

        let mut ready: Vec<(DateTime<Utc>, JobId)> = Vec::new();
        for record in state.jobs.values() {
            if record.info.state != JobState::Enqueued {
                continue;
            }
            if record.request.constraints.requires_network && !connected {
                continue;
            }
            match record.next_run_at {
                Some(at) if at > now => {
                    next_due = Some(next_due.map_or(at, |due| due.min(at)));
                }
                _ => ready.push((record.info.created_at, record.info.id)),
            }
        }
        ready.sort();

        for (_, id) in ready {
            if state.running >= self.config.max_concurrent {
                break;
            }
            self.start_attempt(&mut state, id).await;
        }
        next_due
    }

    async fn start_attempt(self: &Arc<Self>, state: &mut RunnerState, id: JobId) {
        self.transition(state, id, JobState::Running);
        state.running += 1;
        self.commit(state, id).await;

        let Some(record) = state.jobs.get(&id) else {
            return;
        };
        let handler = record.request.worker.clone();
        let params = WorkerParameters {
            id,
            input: record.request.input.clone(),
            run_attempt_count: record.info.run_attempt_count,
        };

        let inner = self.clone();
        tokio::spawn(async move {
            let result = inner.execute(&handler, &params).await;
            inner.complete(id, result).await;
        });
    }

    async fn execute(&self, handler: &str, params: &WorkerParameters) -> JobResult {
        let Some(worker) = self.registry.get(handler) else {
            warn!(id = %params.id, handler, "{}", Error::UnknownWorker(handler.to_string()));
            return JobResult::Failure;
        };

        match tokio::time::timeout(
            self.config.attempt_timeout(),
            run_attempt(handler, worker.as_ref(), params),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(id = %params.id, handler, "attempt timed out");
                apply_retry_ceiling(worker.as_ref(), Response::Retry, params.run_attempt_count)
                    .into()
            }
        }
    }

    async fn complete(&self, id: JobId, result: JobResult) {
        let mut state = self.state.lock().await;
        state.running = state.running.saturating_sub(1);

        let Some(record) = state.jobs.get(&id) else {
            return;
        };
        if record.info.state != JobState::Running {
            // Cancelled mid-attempt.
            self.wake.notify_one();
            return;
        }

        match result {
            JobResult::Success => {
                self.transition(&mut state, id, JobState::Succeeded);
                self.commit(&state, id).await;

                let unblocked: Vec<JobId> = state
                    .jobs
                    .values()
                    .filter(|r| {
                        r.info.state == JobState::Blocked
                            && r.prerequisites.contains(&id)
                            && state.prerequisites_met(r)
                    })
                    .map(|r| r.info.id)
                    .collect();
                for next in unblocked {
                    self.transition(&mut state, next, JobState::Enqueued);
                    self.commit(&state, next).await;
                }
            }
            JobResult::Failure => {
                self.transition(&mut state, id, JobState::Failed);
                self.commit(&state, id).await;

                let dependents = state.dependents_of(id);
                if !dependents.is_empty() {
                    info!(%id, count = dependents.len(), "failing dependent jobs");
                }
                for dependent in dependents {
                    self.transition(&mut state, dependent, JobState::Failed);
                    self.commit(&state, dependent).await;
                }
            }
            JobResult::Retry => {
                let max_backoff = self.config.max_backoff();
                if let Some(record) = state.jobs.get_mut(&id) {
                    record.info.run_attempt_count += 1;
                    let delay = record
                        .request
                        .backoff
                        .delay_for_retry(record.info.run_attempt_count, max_backoff);
                    record.next_run_at = chrono::Duration::from_std(delay)
                        .ok()
                        .and_then(|d| Utc::now().checked_add_signed(d));
                    info!(
                        %id,
                        attempt = record.info.run_attempt_count,
                        delay_ms = delay.as_millis() as u64,
                        "retry scheduled"
                    );
                }
                self.transition(&mut state, id, JobState::Enqueued);
                self.commit(&state, id).await;
            }
        }

        self.wake.notify_one();
    }

    async fn snapshot(&self, id: JobId) -> Option<JobInfo> {
        self.state.lock().await.jobs.get(&id).map(|r| r.info.clone())
    }

    async fn snapshot_chain(&self, name: &str) -> Vec<JobInfo> {
        self.state
            .lock()
            .await
            .chain(name)
            .map(|r| r.info.clone())
            .collect()
    }
}

async fn dispatch_loop(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let mut network = inner.network.subscribe();
    debug!("dispatcher started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let next_due = inner.dispatch_ready().await;
        let wait = next_due
            .map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
            .unwrap_or(IDLE_WAKE);

        tokio::select! {
            _ = inner.wake.notified() => {}
            _ = tokio::time::sleep(wait) => {}
            Ok(()) = network.changed() => {
                debug!(connected = *network.borrow(), "network changed");
            }
            _ = shutdown.changed() => {}
        }
    }

    debug!("dispatcher stopped");
}

#[async_trait]
impl JobRunner for LocalJobRunner {
    async fn enqueue_unique(
        &self,
        name: &str,
        policy: ExistingWorkPolicy,
        request: JobRequest,
    ) -> Operation {
        let ExistingWorkPolicy::Append = policy;
        let id = request.id;

        let mut state = self.inner.state.lock().await;
        if state.jobs.contains_key(&id) {
            return Operation::failure(format!("job {id} already exists"));
        }

        let (initial, prerequisites) = {
            let chain: Vec<&JobRecord> = state.chain(name).collect();
            if chain.iter().any(|r| r.info.state == JobState::Failed) {
                (JobState::Failed, Vec::new())
            } else if chain.iter().any(|r| r.info.state == JobState::Cancelled) {
                (JobState::Cancelled, Vec::new())
            } else {
                let unfinished: Vec<JobId> = chain
                    .iter()
                    .filter(|r| !r.info.state.is_finished())
                    .map(|r| r.info.id)
                    .collect();
                if unfinished.is_empty() {
                    (JobState::Enqueued, unfinished)
                } else {
                    (JobState::Blocked, unfinished)
                }
            }
        };

        let now = Utc::now();
        let record = JobRecord {
            info: JobInfo {
                id,
                unique_name: name.to_string(),
                worker: request.worker.clone(),
                state: initial,
                run_attempt_count: 0,
                created_at: now,
                updated_at: now,
            },
            request,
            prerequisites,
            next_run_at: None,
        };

        let persisted = match &self.inner.store {
            Some(store) => store.save(&record).await,
            None => Ok(()),
        };
        let info = record.info.clone();
        state.insert(record);
        let _ = self.inner.updates.send(info);
        drop(state);

        debug!(%id, queue = name, state = %initial, "job enqueued");
        self.inner.wake.notify_one();

        match persisted {
            Ok(()) => Operation::success(),
            Err(e) => Operation::failure(format!("job {id} is not durable: {e}")),
        }
    }

    async fn job(&self, id: JobId) -> Result<Option<JobInfo>> {
        Ok(self.inner.snapshot(id).await)
    }

    fn watch_job(&self, id: JobId) -> BoxStream<'static, JobInfo> {
        let weak = Arc::downgrade(&self.inner);
        async_stream::stream! {
            let Some((snapshot, mut rx)) = subscribe(&weak, |state| {
                state.jobs.get(&id).map(|r| r.info.clone())
            }).await else {
                return;
            };

            let mut last = snapshot.clone();
            if let Some(info) = snapshot {
                yield info;
            }

            loop {
                let next = match rx.recv().await {
                    Ok(info) if info.id == id => Some(info),
                    Ok(_) => None,
                    Err(broadcast::error::RecvError::Lagged(_)) => match weak.upgrade() {
                        Some(inner) => inner.snapshot(id).await,
                        None => break,
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if let Some(info) = next {
                    if last.as_ref() != Some(&info) {
                        last = Some(info.clone());
                        yield info;
                    }
                }
            }
        }
        .boxed()
    }

    async fn jobs_by_name(&self, name: &str) -> Result<Vec<JobInfo>> {
        Ok(self.inner.snapshot_chain(name).await)
    }

    fn watch_jobs_by_name(&self, name: &str) -> BoxStream<'static, Vec<JobInfo>> {
        let weak = Arc::downgrade(&self.inner);
        let name = name.to_string();
        async_stream::stream! {
            let Some((snapshot, mut rx)) = subscribe(&weak, |state| {
                state.chain(&name).map(|r| r.info.clone()).collect::<Vec<_>>()
            }).await else {
                return;
            };

            let mut last = snapshot.clone();
            yield snapshot;

            loop {
                match rx.recv().await {
                    Ok(info) if info.unique_name != name => continue,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let jobs = inner.snapshot_chain(&name).await;
                if jobs != last {
                    last = jobs.clone();
                    yield jobs;
                }
            }
        }
        .boxed()
    }
}

/// Take a snapshot and subscribe under the same lock, so the receiver only
/// sees updates newer than the snapshot.
async fn subscribe<T>(
    weak: &Weak<Inner>,
    read: impl FnOnce(&RunnerState) -> T,
) -> Option<(T, broadcast::Receiver<JobInfo>)> {
    let inner = weak.upgrade()?;
    let state = inner.state.lock().await;
    let rx = inner.updates.subscribe();
    Some((read(&state), rx))
}
