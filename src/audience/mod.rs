//! Audience facade.
//!
//! Every mutation builds a contact holding only the requested delta, wraps
//! it in a [`ContactUpdateRequest`] chained by email, submits it and returns
//! the job id. Events are validated up front; an invalid event yields no id
//! and no job.

pub mod contact;
pub mod event;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::error;

use crate::config::{DeviceClass, SdkConfiguration};
use crate::error::Result;
use crate::model::{Contact, ContactEvent, MergeFieldValue};
use crate::runner::JobId;
use crate::work::{WorkProcessor, WorkRequest, WorkStatus, WorkStatusProvider};

pub use contact::{ContactUpdateRequest, ContactUpdateWorker};
pub use event::{EventRequest, EventWorker};

/// Automatic tagging applied by [`Audience::create_or_update_contact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoTagging {
    pub enabled: bool,
    pub platform_tag: String,
    pub device_class: DeviceClass,
}

impl From<&SdkConfiguration> for AutoTagging {
    fn from(config: &SdkConfiguration) -> Self {
        Self {
            enabled: config.auto_tagging,
            platform_tag: config.platform_tag.clone(),
            device_class: config.device_class,
        }
    }
}

#[derive(Clone)]
pub struct Audience {
    processor: WorkProcessor,
    auto_tagging: Arc<AutoTagging>,
}

impl Audience {
    pub fn new(processor: WorkProcessor, auto_tagging: AutoTagging) -> Self {
        Self {
            processor,
            auto_tagging: Arc::new(auto_tagging),
        }
    }

    pub fn processor(&self) -> &WorkProcessor {
        &self.processor
    }

    /// Create the contact or update it if it exists. Auto tags are added
    /// here only, when enabled.
    pub async fn create_or_update_contact(&self, contact: Contact) -> JobId {
        let contact = if self.auto_tagging.enabled {
            self.apply_auto_tags(contact)
        } else {
            contact
        };
        self.submit_update(contact).await
    }

    /// Creates the contact and the tag if either is missing.
    pub async fn add_tag(&self, email: &str, tag: &str) -> JobId {
        self.submit_update(Contact::builder(email).add_tag(tag).build())
            .await
    }

    pub async fn add_tags<I, S>(&self, email: &str, tags: I) -> JobId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let builder = tags
            .into_iter()
            .fold(Contact::builder(email), |builder, tag| builder.add_tag(tag));
        self.submit_update(builder.build()).await
    }

    pub async fn remove_tag(&self, email: &str, tag: &str) -> JobId {
        self.submit_update(Contact::builder(email).remove_tag(tag).build())
            .await
    }

    pub async fn remove_tags<I, S>(&self, email: &str, tags: I) -> JobId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let builder = tags
            .into_iter()
            .fold(Contact::builder(email), |builder, tag| builder.remove_tag(tag));
        self.submit_update(builder.build()).await
    }

    /// Set a merge field (name without vertical bars, e.g. `FNAME`) to a
    /// string or an [`Address`](crate::model::Address).
    pub async fn set_merge_field(
        &self,
        email: &str,
        key: &str,
        value: impl Into<MergeFieldValue>,
    ) -> JobId {
        self.submit_update(Contact::builder(email).merge_field(key, value).build())
            .await
    }

    pub async fn set_marketing_permission(&self, email: &str, id: &str, granted: bool) -> JobId {
        self.submit_update(
            Contact::builder(email)
                .marketing_permission(id, granted)
                .build(),
        )
        .await
    }

    /// Queue an event for the contact. Returns `None`, without submitting
    /// anything, if the name is too long or a property key is invalid.
    pub async fn add_contact_event(
        &self,
        email: &str,
        event_name: &str,
        properties: Option<BTreeMap<String, String>>,
    ) -> Option<JobId> {
        let event = match ContactEvent::new(email, event_name, properties) {
            Ok(event) => event,
            Err(e) => {
                error!(%email, error = %e, "event rejected");
                return None;
            }
        };
        Some(self.submit(&EventRequest::new(event)).await)
    }

    async fn submit_update(&self, contact: Contact) -> JobId {
        self.submit(&ContactUpdateRequest::new(contact)).await
    }

    async fn submit(&self, request: &dyn WorkRequest) -> JobId {
        let (id, _operation) = self.processor.submit_work(request).await;
        id
    }

    fn apply_auto_tags(&self, contact: Contact) -> Contact {
        contact
            .to_builder()
            .add_tag(self.auto_tagging.platform_tag.as_str())
            .add_tag(self.auto_tagging.device_class.tag())
            .build()
    }
}

#[async_trait]
impl WorkStatusProvider for Audience {
    async fn status_by_id(&self, id: JobId) -> Result<WorkStatus> {
        self.processor.status_by_id(id).await
    }

    fn status_by_id_stream(&self, id: JobId) -> BoxStream<'static, WorkStatus> {
        self.processor.status_by_id_stream(id)
    }
}
