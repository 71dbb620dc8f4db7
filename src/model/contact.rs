//! Contacts and the change-set builder.
//!
//! A [`Contact`] is identified by its email address (kept exactly as given)
//! and carries only the edits to apply. The builder keys every edit list by
//! its natural key, so setting the same merge field twice, or adding and then
//! removing the same tag, leaves exactly one entry holding the last write.
//! Entries keep the position of their first write.

use serde::{Deserialize, Serialize};

use super::merge_field::{MergeField, MergeFieldValue};

/// Tag marking the contact's platform.
pub const ANDROID_TAG: &str = "Android";
/// Tag marking a phone user.
pub const PHONE_TAG: &str = "Phone";
/// Tag marking a tablet user.
pub const TABLET_TAG: &str = "Tablet";

/// A change-set for one member of the audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_fields: Option<Vec<MergeField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_permissions: Option<Vec<MarketingPermission>>,
    /// Only honored by the server when the contact is first created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_status: Option<ContactStatus>,
}

impl Contact {
    pub fn builder(email_address: impl Into<String>) -> ContactBuilder {
        ContactBuilder {
            email_address: email_address.into(),
            merge_fields: Vec::new(),
            tags: Vec::new(),
            marketing_permissions: Vec::new(),
            contact_status: None,
        }
    }

    /// Start a new builder seeded with this contact's edits.
    pub fn to_builder(&self) -> ContactBuilder {
        ContactBuilder::from(self.clone())
    }
}

/// A tag edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub status: TagStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
    Active,
    Inactive,
}

/// A marketing permission edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketingPermission {
    #[serde(rename = "marketing_permission_id")]
    pub id: String,
    pub enabled: bool,
}

/// Subscription status, applied server-side only on first creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    /// Receives marketing campaigns.
    Subscribed,
    /// Receives transactional messages only.
    Transactional,
}

/// Builds a [`Contact`], last write wins per merge field key, tag name and
/// permission id.
#[derive(Debug, Clone)]
pub struct ContactBuilder {
    email_address: String,
    merge_fields: Vec<MergeField>,
    tags: Vec<Tag>,
    marketing_permissions: Vec<MarketingPermission>,
    contact_status: Option<ContactStatus>,
}

impl From<Contact> for ContactBuilder {
    fn from(contact: Contact) -> Self {
        let mut builder = Contact::builder(contact.email_address);
        for field in contact.merge_fields.unwrap_or_default() {
            upsert(&mut builder.merge_fields, field, |a, b| a.key == b.key);
        }
        for tag in contact.tags.unwrap_or_default() {
            upsert(&mut builder.tags, tag, |a, b| a.name == b.name);
        }
        for permission in contact.marketing_permissions.unwrap_or_default() {
            upsert(&mut builder.marketing_permissions, permission, |a, b| a.id == b.id);
        }
        builder.contact_status = contact.contact_status;
        builder
    }
}

impl ContactBuilder {
    /// Set a merge field to a string or [`Address`](super::Address) value.
    pub fn merge_field(mut self, key: impl Into<String>, value: impl Into<MergeFieldValue>) -> Self {
        let field = MergeField {
            key: key.into(),
            value: value.into(),
        };
        upsert(&mut self.merge_fields, field, |a, b| a.key == b.key);
        self
    }

    pub fn add_tag(self, name: impl Into<String>) -> Self {
        self.tag(name.into(), TagStatus::Active)
    }

    pub fn remove_tag(self, name: impl Into<String>) -> Self {
        self.tag(name.into(), TagStatus::Inactive)
    }

    fn tag(mut self, name: String, status: TagStatus) -> Self {
        upsert(&mut self.tags, Tag { name, status }, |a, b| a.name == b.name);
        self
    }

    pub fn marketing_permission(mut self, id: impl Into<String>, enabled: bool) -> Self {
        let permission = MarketingPermission {
            id: id.into(),
            enabled,
        };
        upsert(&mut self.marketing_permissions, permission, |a, b| a.id == b.id);
        self
    }

    pub fn contact_status(mut self, status: Option<ContactStatus>) -> Self {
        self.contact_status = status;
        self
    }

    pub fn build(self) -> Contact {
        Contact {
            email_address: self.email_address,
            merge_fields: non_empty(self.merge_fields),
            tags: non_empty(self.tags),
            marketing_permissions: non_empty(self.marketing_permissions),
            contact_status: self.contact_status,
        }
    }
}

/// Replace the entry with the same key in place, or append.
fn upsert<T>(entries: &mut Vec<T>, entry: T, same_key: impl Fn(&T, &T) -> bool) {
    match entries.iter_mut().find(|existing| same_key(existing, &entry)) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

fn non_empty<T>(entries: Vec<T>) -> Option<Vec<T>> {
    if entries.is_empty() { None } else { Some(entries) }
}
