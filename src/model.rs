//! Audience data model.
//!
//! A contact change-set is a delta: only the fields that are set travel to the
//! remote API. Events are fire-and-forget behavioral records for a contact.
//! Both are immutable once built and serialize into the payload bag of a job.

pub mod contact;
pub mod country;
pub mod event;
pub mod merge_field;

pub use contact::{
    ANDROID_TAG, Contact, ContactBuilder, ContactStatus, MarketingPermission, PHONE_TAG, TABLET_TAG,
    Tag, TagStatus,
};
pub use country::Country;
pub use event::{ContactEvent, EventValidationError};
pub use merge_field::{Address, AddressBuilder, MergeField, MergeFieldValue};
