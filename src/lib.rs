//! # audience-rs
//!
//! Durable, retryable background updates to a marketing audience API.
//!
//! Callers mutate contacts and record events through the [`audience::Audience`]
//! facade. Each call becomes a work item that the job runner executes in a
//! per-contact chain, retrying with backoff and reporting a coarse
//! [`work::WorkStatus`] that can be polled or streamed.

pub mod api;
pub mod audience;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod runner;
pub mod sdk;
pub mod telemetry;
pub mod work;

pub use sdk::{Sdk, SdkBuilder};
