//! Metric instrument factories for audience-rs.
//!
//! Instruments come from the `"audience-rs"` meter on the globally
//! registered `MeterProvider`; without an OTLP endpoint they are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("audience-rs")
}

/// Counter: work items submitted to the runner.
/// Labels: `handler`, `result` ("ok" | "error").
pub fn work_submitted() -> Counter<u64> {
    meter()
        .u64_counter("audience.work.submitted")
        .with_description("Number of work items submitted")
        .build()
}

/// Counter: native job state transitions.
/// Labels: `from`, `to`.
pub fn job_state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("audience.job.state_transitions")
        .with_description("Number of job state transitions")
        .build()
}

/// Counter: classified worker responses.
/// Labels: `handler`, `response`.
pub fn worker_responses() -> Counter<u64> {
    meter()
        .u64_counter("audience.worker.responses")
        .with_description("Worker responses by classification")
        .build()
}

/// Histogram: wall time of one worker attempt.
/// Labels: `handler`.
pub fn worker_attempt_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("audience.worker.attempt_duration_ms")
        .with_description("Worker attempt duration in milliseconds")
        .with_unit("ms")
        .build()
}
