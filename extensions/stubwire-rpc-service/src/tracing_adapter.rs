//! The seam between stubs and whatever tracing backend the process uses.
//!
//! Stubs only ever extend a trace that is already active: without a valid
//! parent in the [`CallContext`] no span is started and no tracer method is
//! called.

use crate::CallContext;
use std::error::Error;
use stubwire::utils::increment_u64_id;

#[cfg(feature = "test-util")]
mod recording;
#[cfg(feature = "test-util")]
pub use recording::{RecordedSpan, RecordingTracer};

/// Identity of a span, as propagated between stubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceContext {
    pub trace_id: u128,
    pub span_id: u64,
}

impl TraceContext {
    pub const fn new(trace_id: u128, span_id: u64) -> Self {
        Self { trace_id, span_id }
    }

    /// A context with a fresh trace id, for starting a trace at a process edge.
    pub fn new_root() -> Self {
        let hi = increment_u64_id() as u128;
        Self {
            trace_id: (hi << 64) | increment_u64_id() as u128,
            span_id: increment_u64_id(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.trace_id != 0 && self.span_id != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// An in-process call through a local stub.
    Internal,
    /// An outbound call through a client stub.
    Client,
    /// An inbound call handled by a server stub.
    Server,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Internal => "internal",
            SpanKind::Client => "client",
            SpanKind::Server => "server",
        }
    }
}

pub trait StubSpan: Send {
    fn context(&self) -> TraceContext;
    fn record_error(&mut self, err: &dyn Error);
    fn set_failed(&mut self, description: &str);
    fn end(&mut self);
}

pub trait Tracer: Send + Sync {
    fn start_child(&self, parent: TraceContext, name: &str, kind: SpanKind) -> Box<dyn StubSpan>;
}

/// Owns the span of one call, if any, and ends it exactly once.
///
/// The span is ended on drop, so it also closes when the call's future is
/// dropped or unwinds.
pub struct ActiveSpan {
    span: Option<Box<dyn StubSpan>>,
}

impl ActiveSpan {
    pub fn start(tracer: &dyn Tracer, ctx: &CallContext, name: &str, kind: SpanKind) -> Self {
        Self {
            span: ctx
                .parent_trace()
                .map(|parent| tracer.start_child(parent, name, kind)),
        }
    }

    pub fn none() -> Self {
        Self { span: None }
    }

    pub fn is_recording(&self) -> bool {
        self.span.is_some()
    }

    pub fn context(&self) -> Option<TraceContext> {
        self.span.as_ref().map(|s| s.context())
    }

    /// The context to hand to the next hop: `ctx` re-parented on this span
    /// when one is open, otherwise `ctx` unchanged.
    pub fn child_context(&self, ctx: &CallContext) -> CallContext {
        match self.context() {
            Some(trace) => ctx.child(Some(trace)),
            None => ctx.clone(),
        }
    }

    /// Records `err` and marks the span failed.
    pub fn fail(&mut self, err: &dyn Error) {
        if let Some(span) = self.span.as_mut() {
            span.record_error(err);
            span.set_failed(&err.to_string());
        }
    }

    pub fn fail_with(&mut self, description: &str) {
        if let Some(span) = self.span.as_mut() {
            span.set_failed(description);
        }
    }

    pub fn end(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(mut span) = self.span.take() {
            span.end();
        }
    }
}

impl Drop for ActiveSpan {
    fn drop(&mut self) {
        self.close();
    }
}

/// Emits one `tracing` span per stub span.
///
/// The trace identity lives in span fields (`trace_id`, `span_id`,
/// `parent_span_id`) so that any subscriber can correlate calls across
/// processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

impl Tracer for TracingTracer {
    fn start_child(&self, parent: TraceContext, name: &str, kind: SpanKind) -> Box<dyn StubSpan> {
        let context = TraceContext::new(parent.trace_id, increment_u64_id());
        let span = tracing::info_span!(
            "stub_call",
            otel.name = name,
            otel.kind = kind.as_str(),
            otel.status_code = tracing::field::Empty,
            otel.status_message = tracing::field::Empty,
            trace_id = %format!("{:032x}", context.trace_id),
            span_id = %format!("{:016x}", context.span_id),
            parent_span_id = %format!("{:016x}", parent.span_id),
        );
        Box::new(TracingSpan {
            span,
            context,
            ended: false,
        })
    }
}

struct TracingSpan {
    span: tracing::Span,
    context: TraceContext,
    ended: bool,
}

impl StubSpan for TracingSpan {
    fn context(&self) -> TraceContext {
        self.context
    }

    fn record_error(&mut self, err: &dyn Error) {
        self.span.in_scope(|| tracing::debug!(error = %err, "stub call failed"));
    }

    fn set_failed(&mut self, description: &str) {
        self.span.record("otel.status_code", "ERROR");
        self.span.record("otel.status_message", description);
    }

    fn end(&mut self) {
        if !self.ended {
            self.ended = true;
            self.span = tracing::Span::none();
        }
    }
}

/// Starts spans that do nothing but carry their parent's identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn start_child(&self, parent: TraceContext, _name: &str, _kind: SpanKind) -> Box<dyn StubSpan> {
        Box::new(NoopSpan(parent))
    }
}

struct NoopSpan(TraceContext);

impl StubSpan for NoopSpan {
    fn context(&self) -> TraceContext {
        self.0
    }

    fn record_error(&mut self, _err: &dyn Error) {}

    fn set_failed(&mut self, _description: &str) {}

    fn end(&mut self) {}
}
