//! Contact events: sent right away, retried linearly.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::AudienceApi;
use crate::error::Result;
use crate::model::ContactEvent;
use crate::runner::{BackoffPolicy, WorkData, WorkerParameters};
use crate::work::{Response, Worker, WorkRequest, decode_payload, encode_payload};

/// Payload key holding the JSON event.
pub const KEY_INPUT_EVENT_REQUEST: &str = "key_input_event_request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    event: ContactEvent,
}

impl EventRequest {
    pub fn new(event: ContactEvent) -> Self {
        Self { event }
    }

    pub fn event(&self) -> &ContactEvent {
        &self.event
    }

    pub fn work_name(email: &str) -> String {
        format!("EventWorkRequest:{email}")
    }
}

impl WorkRequest for EventRequest {
    fn worker_name(&self) -> &str {
        EventWorker::NAME
    }

    fn work_parameters(&self) -> Result<Option<WorkData>> {
        encode_payload(KEY_INPUT_EVENT_REQUEST, &self.event).map(Some)
    }

    fn unique_work_name(&self) -> String {
        Self::work_name(&self.event.email_address)
    }

    fn requires_network(&self) -> bool {
        false
    }

    fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::Linear
    }
}

/// Sends one event. Every non-2xx outcome is retried.
pub struct EventWorker {
    api: Arc<dyn AudienceApi>,
}

impl EventWorker {
    pub const NAME: &'static str = "EventWorker";

    pub fn new(api: Arc<dyn AudienceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Worker for EventWorker {
    async fn perform_work(&self, params: &WorkerParameters) -> Result<Response> {
        let event: ContactEvent = decode_payload(&params.input, KEY_INPUT_EVENT_REQUEST)?;
        let response = self.api.add_contact_event(&event).await?;

        if response.is_successful() {
            debug!(email = %event.email_address, event = %event.event_name, "event sent");
            Ok(Response::Success)
        } else {
            info!(
                email = %event.email_address,
                event = %event.event_name,
                status = response.status,
                "event failed, will retry"
            );
            Ok(Response::Retry)
        }
    }
}
