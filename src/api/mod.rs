//! Remote audience API: wire types and the transport seam.
//!
//! Workers only ever see [`AudienceApi`]. The production transport is
//! [`HttpAudienceApi`]; tests substitute in-memory backends.

pub mod http;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    Address, Contact, ContactEvent, ContactStatus, MarketingPermission, MergeFieldValue, Tag,
};

pub use http::HttpAudienceApi;

/// Outcome of one request against the remote API, classified by status code only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        Self { status }
    }

    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One authenticated request per call. Transport failures (connect, timeout)
/// are returned as errors; any HTTP response, including 4xx/5xx, is `Ok`.
#[async_trait]
pub trait AudienceApi: Send + Sync {
    async fn update_contact(&self, contact: &ApiContact) -> Result<ApiResponse>;

    async fn add_contact_event(&self, event: &ContactEvent) -> Result<ApiResponse>;
}

/// Wire form of a contact update.
///
/// Merge fields travel as a flat map: string values as plain strings,
/// addresses as objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiContact {
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_fields: Option<BTreeMap<String, ApiMergeFieldValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_permissions: Option<Vec<MarketingPermission>>,
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub contact_status: Option<ContactStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiMergeFieldValue {
    Text(String),
    Address(Address),
}

impl From<&Contact> for ApiContact {
    fn from(contact: &Contact) -> Self {
        let merge_fields = contact.merge_fields.as_ref().map(|fields| {
            fields
                .iter()
                .map(|field| {
                    let value = match &field.value {
                        MergeFieldValue::String { value } => ApiMergeFieldValue::Text(value.clone()),
                        MergeFieldValue::Address(address) => {
                            ApiMergeFieldValue::Address(address.clone())
                        }
                    };
                    (field.key.clone(), value)
                })
                .collect()
        });

        Self {
            email_address: contact.email_address.clone(),
            merge_fields,
            tags: contact.tags.clone(),
            marketing_permissions: contact.marketing_permissions.clone(),
            contact_status: contact.contact_status,
        }
    }
}
