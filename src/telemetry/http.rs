//! Spans for outbound requests to the audience API.

use tracing::Span;

/// Start a client span for one request. `http.response.status_code` is
/// filled in by [`record_response_status`] once the server answers.
pub fn start_request_span(method: &str, route: &str) -> Span {
    tracing::info_span!(
        "audience.request",
        "http.request.method" = method,
        "url.path" = route,
        "http.response.status_code" = tracing::field::Empty,
        "otel.kind" = "client",
    )
}

pub fn record_response_status(span: &Span, status: u16) {
    span.record("http.response.status_code", status);
}
