//! Work execution span helpers.
//!
//! One span per worker attempt; state transitions are emitted as events
//! inside it.

use tracing::Span;

use crate::runner::JobId;

/// Start a span for a single worker attempt.
///
/// `work.response` is declared empty and filled in once the shell has
/// classified the attempt.
pub fn start_attempt_span(handler: &str, job_id: &JobId, attempt: u32) -> Span {
    tracing::info_span!(
        "work.attempt",
        "work.handler" = handler,
        "work.id" = %job_id,
        "work.attempt" = attempt,
        "work.response" = tracing::field::Empty,
    )
}

/// Record a job state transition as an event scoped to `span`.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
