//! Shared fixtures: an in-memory audience backend and scripted workers.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use audience_rs::api::{ApiContact, ApiMergeFieldValue, ApiResponse, AudienceApi};
use audience_rs::config::{RunnerConfig, SdkConfiguration};
use audience_rs::error::{Error, Result};
use audience_rs::model::{ContactEvent, TagStatus};
use audience_rs::runner::{
    BackoffCriteria, BackoffPolicy, Constraints, JobId, JobInfo, JobRequest, JobRunner, WorkData,
    WorkerParameters,
};
use audience_rs::work::{Response, Worker};
use audience_rs::{Sdk, SdkBuilder};
use futures::StreamExt as _;

/// Contact as the backend has merged it so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredContact {
    pub merge_fields: BTreeMap<String, ApiMergeFieldValue>,
    pub tags: BTreeMap<String, TagStatus>,
    pub marketing_permissions: BTreeMap<String, bool>,
}

/// Merges updates into per-email records, the way the real API applies them.
/// Statuses can be scripted; unscripted calls answer 200.
#[derive(Default)]
pub struct MockAudienceBackend {
    contacts: Mutex<HashMap<String, StoredContact>>,
    events: Mutex<Vec<ContactEvent>>,
    scripted: Mutex<VecDeque<u16>>,
    fail_transport: Mutex<u32>,
    calls: Mutex<u32>,
}

impl MockAudienceBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer the next calls with these statuses, in order.
    pub fn respond_with(&self, statuses: impl IntoIterator<Item = u16>) {
        self.scripted.lock().unwrap().extend(statuses);
    }

    /// Fail the next `count` calls before any response is produced.
    pub fn fail_transport(&self, count: u32) {
        *self.fail_transport.lock().unwrap() = count;
    }

    pub fn contact(&self, email: &str) -> Option<StoredContact> {
        self.contacts.lock().unwrap().get(email).cloned()
    }

    pub fn events(&self) -> Vec<ContactEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }

    fn next_status(&self) -> Result<u16> {
        *self.calls.lock().unwrap() += 1;
        let mut failing = self.fail_transport.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(Error::Other("connection refused".to_string()));
        }
        Ok(self.scripted.lock().unwrap().pop_front().unwrap_or(200))
    }
}

#[async_trait]
impl AudienceApi for MockAudienceBackend {
    async fn update_contact(&self, contact: &ApiContact) -> Result<ApiResponse> {
        let status = self.next_status()?;
        if (200..300).contains(&status) {
            let mut contacts = self.contacts.lock().unwrap();
            let stored = contacts.entry(contact.email_address.clone()).or_default();
            for (key, value) in contact.merge_fields.clone().unwrap_or_default() {
                stored.merge_fields.insert(key, value);
            }
            for tag in contact.tags.clone().unwrap_or_default() {
                stored.tags.insert(tag.name, tag.status);
            }
            for permission in contact.marketing_permissions.clone().unwrap_or_default() {
                stored
                    .marketing_permissions
                    .insert(permission.id, permission.enabled);
            }
        }
        Ok(ApiResponse::new(status))
    }

    async fn add_contact_event(&self, event: &ContactEvent) -> Result<ApiResponse> {
        let status = self.next_status()?;
        if (200..300).contains(&status) {
            self.events.lock().unwrap().push(event.clone());
        }
        Ok(ApiResponse::new(status))
    }
}

/// What one scripted attempt does.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Respond(Response),
    Error,
    Panic,
    /// Sleep, then respond.
    Slow(Duration, Response),
}

#[derive(Debug, Clone)]
pub struct Attempt {
    pub id: JobId,
    pub run_attempt_count: u32,
    pub input: WorkData,
}

/// Worker that plays back a script; once exhausted it repeats `fallback`.
pub struct ScriptedWorker {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    max_retries: u32,
    attempts: Mutex<Vec<Attempt>>,
}

impl ScriptedWorker {
    pub fn new(steps: impl IntoIterator<Item = Step>, fallback: Step) -> Arc<Self> {
        Self::with_max_retries(steps, fallback, audience_rs::work::DEFAULT_MAX_RETRIES)
    }

    pub fn with_max_retries(
        steps: impl IntoIterator<Item = Step>,
        fallback: Step,
        max_retries: u32,
    ) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            fallback,
            max_retries,
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn always(response: Response) -> Arc<Self> {
        Self::always_step(Step::Respond(response))
    }

    pub fn always_step(step: Step) -> Arc<Self> {
        Self::new([], step)
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    async fn perform_work(&self, params: &WorkerParameters) -> Result<Response> {
        self.attempts.lock().unwrap().push(Attempt {
            id: params.id,
            run_attempt_count: params.run_attempt_count,
            input: params.input.clone(),
        });
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match step {
            Step::Respond(response) => Ok(response),
            Step::Error => Err(Error::Other("scripted failure".to_string())),
            Step::Panic => panic!("scripted panic"),
            Step::Slow(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
        }
    }
}

/// Runner settings with short timeouts and backoff caps.
pub fn fast_runner_config() -> RunnerConfig {
    RunnerConfig {
        max_concurrent: 4,
        attempt_timeout_secs: 5,
        max_backoff_secs: 1,
        retention_secs: 0,
    }
}

pub fn job_request(worker: &str) -> JobRequest {
    JobRequest {
        id: JobId::new(),
        worker: worker.to_string(),
        input: WorkData::new(),
        constraints: Constraints {
            requires_network: false,
        },
        backoff: BackoffCriteria {
            policy: BackoffPolicy::Linear,
            delay: Duration::from_millis(10),
        },
    }
}

/// Wait until the job reaches a finished state.
pub async fn wait_finished(runner: &dyn JobRunner, id: JobId) -> JobInfo {
    let mut updates = runner.watch_job(id);
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(info) = updates.next().await {
            if info.state.is_finished() {
                return info;
            }
        }
        panic!("job stream for {id} ended before the job finished");
    })
    .await
    .expect("job did not finish in time")
}

pub fn sdk_configuration() -> SdkConfiguration {
    SdkConfiguration::builder("sdkKey-us1")
        .build()
        .expect("valid sdk key")
}

/// SDK backed by `backend` with fast runner settings.
pub fn sdk_builder(backend: Arc<MockAudienceBackend>) -> SdkBuilder {
    Sdk::builder(sdk_configuration())
        .runner_config(fast_runner_config())
        .api(backend)
}
