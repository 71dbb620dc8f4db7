//! Contact updates: one request type, one worker.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::{ApiContact, AudienceApi};
use crate::error::Result;
use crate::model::Contact;
use crate::runner::{WorkData, WorkerParameters};
use crate::work::{Response, Worker, WorkRequest, decode_payload, encode_payload};

/// Payload key holding the JSON contact.
pub const KEY_INPUT_CONTACT: &str = "contact";

/// Status codes that will not succeed on retry: malformed request, bad credentials.
const PERMANENT_FAILURE_CODES: [u16; 2] = [400, 401];

/// Work item carrying one contact change-set. Chained per email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactUpdateRequest {
    contact: Contact,
}

impl ContactUpdateRequest {
    pub fn new(contact: Contact) -> Self {
        Self { contact }
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    /// Chain name for updates to `email`.
    pub fn work_name(email: &str) -> String {
        format!("AudienceWorkRequest:{email}")
    }
}

impl WorkRequest for ContactUpdateRequest {
    fn worker_name(&self) -> &str {
        ContactUpdateWorker::NAME
    }

    fn work_parameters(&self) -> Result<Option<WorkData>> {
        encode_payload(KEY_INPUT_CONTACT, &self.contact).map(Some)
    }

    fn unique_work_name(&self) -> String {
        Self::work_name(&self.contact.email_address)
    }
}

/// Sends one contact update.
///
/// 2xx is a success; 400 and 401 fail without retrying and without holding
/// up the chain; anything else, transport errors included, is retried.
pub struct ContactUpdateWorker {
    api: Arc<dyn AudienceApi>,
}

impl ContactUpdateWorker {
    pub const NAME: &'static str = "ContactUpdateWorker";

    pub fn new(api: Arc<dyn AudienceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Worker for ContactUpdateWorker {
    async fn perform_work(&self, params: &WorkerParameters) -> Result<Response> {
        let contact: Contact = decode_payload(&params.input, KEY_INPUT_CONTACT)?;
        let email = &contact.email_address;
        let response = self.api.update_contact(&ApiContact::from(&contact)).await?;

        if response.is_successful() {
            debug!(%email, "contact update succeeded");
            Ok(Response::Success)
        } else if PERMANENT_FAILURE_CODES.contains(&response.status) {
            info!(%email, status = response.status, "contact update rejected, will not retry");
            Ok(Response::FailureContinueChain)
        } else {
            info!(
                %email,
                status = response.status,
                attempt = params.run_attempt_count,
                "contact update failed, will retry"
            );
            Ok(Response::Retry)
        }
    }
}
