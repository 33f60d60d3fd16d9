//! Distributed trace context: extraction, propagation and span lifecycle.
//!
//! The gateway participates in traces via a single `traceparent` header,
//! `00-<trace-id>-<span-id>-<flags>`. Inbound requests either continue the
//! caller's trace (a child span) or start a new root; the active context is
//! injected into the outbound request so the backend can continue the same
//! trace. The codec is symmetric: whatever [`RequestSpan::inject`] writes,
//! [`SpanContext::parse`] decodes.
//!
//! A [`RequestSpan`] is an explicit value owned by the request task rather
//! than a process-global tracer. It is finished exactly once per request;
//! finishing emits a structured `tracing` event carrying the span's timing,
//! tags and final status.
use std::time::{Duration, Instant};

use http::{HeaderMap, HeaderValue};
use rand::Rng;

/// Header carrying the serialized trace context across hops.
pub const TRACEPARENT_HEADER: &str = "traceparent";

const TRACEPARENT_VERSION: &str = "00";
const FLAG_SAMPLED: u8 = 0x01;

/// Identifiers linking one span to its trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanContext {
    /// 32 lowercase hex characters, never all zero.
    pub trace_id: String,
    /// 16 lowercase hex characters, never all zero.
    pub span_id: String,
    pub sampled: bool,
}

impl SpanContext {
    /// A fresh root context with a new trace id.
    pub fn new_root() -> Self {
        Self {
            trace_id: generate_trace_id(),
            span_id: generate_span_id(),
            sampled: true,
        }
    }

    /// A child context continuing this trace with a new span id.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: generate_span_id(),
            sampled: self.sampled,
        }
    }

    /// Decode a `traceparent` header value. Malformed input yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;

        if parts.next().is_some() || version != TRACEPARENT_VERSION {
            return None;
        }
        if !is_hex_id(trace_id, 32) || !is_hex_id(span_id, 16) {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id: trace_id.to_ascii_lowercase(),
            span_id: span_id.to_ascii_lowercase(),
            sampled: flags & FLAG_SAMPLED != 0,
        })
    }

    /// Encode this context as a `traceparent` header value.
    pub fn to_header_value(&self) -> String {
        let flags = if self.sampled { FLAG_SAMPLED } else { 0 };
        format!(
            "{TRACEPARENT_VERSION}-{}-{}-{flags:02x}",
            self.trace_id, self.span_id
        )
    }
}

/// Non-zero hex string of the expected width.
fn is_hex_id(value: &str, len: usize) -> bool {
    value.len() == len
        && value.bytes().all(|b| b.is_ascii_hexdigit())
        && value.bytes().any(|b| b != b'0')
}

/// Generate a 128-bit trace id.
pub fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generate a 64-bit span id.
pub fn generate_span_id() -> String {
    let mut rng = rand::rng();
    loop {
        let id: u64 = rng.random();
        if id != 0 {
            return format!("{id:016x}");
        }
    }
}

/// A timed, tagged record of one request's lifetime through the gateway.
#[derive(Debug)]
pub struct RequestSpan {
    operation: String,
    context: SpanContext,
    parent: Option<SpanContext>,
    tags: Vec<(&'static str, String)>,
    start: Instant,
    finished: bool,
}

impl RequestSpan {
    /// Continue the trace found in `headers`, or start a new root when the
    /// context header is absent or malformed.
    pub fn extract_or_create(headers: &HeaderMap, operation: impl Into<String>) -> Self {
        let parent = headers
            .get(TRACEPARENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(SpanContext::parse);
        let context = parent
            .as_ref()
            .map(SpanContext::child)
            .unwrap_or_else(SpanContext::new_root);

        Self {
            operation: operation.into(),
            context,
            parent,
            tags: Vec::new(),
            start: Instant::now(),
            finished: false,
        }
    }

    /// Rename the span once the matched route is known.
    pub fn set_operation(&mut self, operation: impl Into<String>) {
        self.operation = operation.into();
    }

    /// Attach or overwrite a tag.
    pub fn set_tag(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.tags.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.tags.push((key, value));
        }
    }

    pub fn context(&self) -> &SpanContext {
        &self.context
    }

    pub fn parent(&self) -> Option<&SpanContext> {
        self.parent.as_ref()
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Time elapsed since the span was opened.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Serialize this span's context into an outbound header set.
    pub fn inject(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.context.to_header_value()) {
            headers.insert(TRACEPARENT_HEADER, value);
        }
    }

    /// Close the span with the final response status. Tags the span as an
    /// error for 5xx outcomes and emits the span record.
    pub fn finish(mut self, status: http::StatusCode) {
        self.set_tag("http.status_code", status.as_u16().to_string());
        if status.is_server_error() {
            self.set_tag("error", "true");
        }
        self.finished = true;
        self.emit();
    }

    fn emit(&self) {
        tracing::info!(
            target: "portico::span",
            trace_id = %self.context.trace_id,
            span_id = %self.context.span_id,
            parent_span_id = self.parent.as_ref().map(|p| p.span_id.as_str()),
            operation = %self.operation,
            duration_ms = self.start.elapsed().as_millis() as u64,
            tags = ?self.tags,
            "span finished"
        );
    }
}

impl Drop for RequestSpan {
    fn drop(&mut self) {
        // Backstop: a span abandoned without finish() still gets reported once.
        if !self.finished {
            self.finished = true;
            self.emit();
        }
    }
}
