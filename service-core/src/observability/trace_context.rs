//! W3C trace context propagation for outbound HTTP calls.
//!
//! Outbound requests to upstream backends carry the current span's
//! `traceparent` (and `tracestate` when present) plus the inbound request ID,
//! so a single generation can be followed across the service boundary.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the trace headers for the current span.
///
/// Returns an empty map when no OpenTelemetry span is active.
pub fn trace_headers(request_id: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let context = Span::current().context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        let traceparent = format!(
            "00-{}-{}-{:02x}",
            span_context.trace_id(),
            span_context.span_id(),
            span_context.trace_flags().to_u8()
        );
        if let Ok(value) = HeaderValue::from_str(&traceparent) {
            headers.insert(TRACEPARENT_HEADER, value);
        }

        let tracestate = span_context.trace_state().header();
        if !tracestate.is_empty()
            && let Ok(value) = HeaderValue::from_str(&tracestate)
        {
            headers.insert(TRACESTATE_HEADER, value);
        }
    }

    if let Some(id) = request_id
        && let Ok(value) = HeaderValue::from_str(id)
    {
        headers.insert(REQUEST_ID_HEADER, value);
    }

    headers
}

/// Extension for attaching trace headers to a `reqwest` request.
pub trait TracedRequestExt {
    /// Add the current span's trace context and, when given, the inbound
    /// request ID.
    fn with_trace_context(self, request_id: Option<&str>) -> Self;
}

impl TracedRequestExt for reqwest::RequestBuilder {
    fn with_trace_context(self, request_id: Option<&str>) -> Self {
        self.headers(trace_headers(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_active_span_yields_no_trace_headers() {
        let headers = trace_headers(None);
        assert!(headers.get(TRACEPARENT_HEADER).is_none());
        assert!(headers.is_empty());
    }

    #[test]
    fn request_id_is_forwarded() {
        let headers = trace_headers(Some("req-42"));
        assert_eq!(
            headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()),
            Some("req-42")
        );
    }

    #[test]
    fn request_builder_carries_request_id() {
        let request = reqwest::Client::new()
            .get("http://localhost/v1/models")
            .with_trace_context(Some("req-7"))
            .build()
            .unwrap();
        assert_eq!(
            request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("req-7")
        );
    }

    #[test]
    fn invalid_request_id_is_dropped() {
        let headers = trace_headers(Some("bad\nid"));
        assert!(headers.get(REQUEST_ID_HEADER).is_none());
    }
}
