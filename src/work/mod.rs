//! The work core: items, the execution shell, submission and status.

pub mod processor;
pub mod request;
pub mod status;
pub mod worker;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::runner::WorkData;

pub use processor::WorkProcessor;
pub use request::{DEFAULT_BACKOFF_DELAY, DEFAULT_UNIQUE_WORK_NAME, WorkRequest};
pub use status::{WorkStatus, WorkStatusProvider};
pub use worker::{DEFAULT_MAX_RETRIES, Response, Worker, run_attempt};

/// Store `value` as JSON under `key` in a fresh payload bag.
pub fn encode_payload<T: Serialize>(key: &str, value: &T) -> Result<WorkData> {
    let mut data = WorkData::new();
    data.insert(key.to_string(), serde_json::to_string(value)?);
    Ok(data)
}

/// Read the JSON value stored under `key`.
pub fn decode_payload<T: DeserializeOwned>(data: &WorkData, key: &str) -> Result<T> {
    let json = data
        .get(key)
        .ok_or_else(|| Error::Other(format!("payload has no {key:?} entry")))?;
    Ok(serde_json::from_str(json)?)
}
