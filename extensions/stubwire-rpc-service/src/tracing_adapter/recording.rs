use super::{SpanKind, StubSpan, TraceContext, Tracer};
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stubwire::utils::increment_u64_id;

/// Everything a [`RecordingTracer`] saw happen to one span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSpan {
    pub name: String,
    pub kind: SpanKind,
    pub parent: TraceContext,
    pub context: TraceContext,
    pub errors: Vec<String>,
    pub failure: Option<String>,
    /// Number of times `end` was called; a well-behaved stub ends each span once.
    pub end_calls: u32,
}

/// An in-memory tracer for asserting on span lifecycles in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    spans: Arc<Mutex<Vec<RecordedSpan>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedSpan>> {
        self.spans.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn spans(&self) -> Vec<RecordedSpan> {
        self.lock().clone()
    }

    pub fn started(&self) -> usize {
        self.lock().len()
    }

    /// Total `end` calls across all spans.
    pub fn ended(&self) -> u32 {
        self.lock().iter().map(|s| s.end_calls).sum()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Tracer for RecordingTracer {
    fn start_child(&self, parent: TraceContext, name: &str, kind: SpanKind) -> Box<dyn StubSpan> {
        let context = TraceContext::new(parent.trace_id, increment_u64_id());
        self.lock().push(RecordedSpan {
            name: name.to_string(),
            kind,
            parent,
            context,
            errors: Vec::new(),
            failure: None,
            end_calls: 0,
        });
        Box::new(RecordingSpan {
            context,
            tracer: self.clone(),
        })
    }
}

/// Finds its record by span id, so records cleared in the meantime are
/// never mistaken for it.
struct RecordingSpan {
    context: TraceContext,
    tracer: RecordingTracer,
}

impl RecordingSpan {
    fn update(&self, f: impl FnOnce(&mut RecordedSpan)) {
        let mut spans = self.tracer.lock();
        if let Some(span) = spans
            .iter_mut()
            .find(|s| s.context.span_id == self.context.span_id)
        {
            f(span);
        }
    }
}

impl StubSpan for RecordingSpan {
    fn context(&self) -> TraceContext {
        self.context
    }

    fn record_error(&mut self, err: &dyn Error) {
        let msg = err.to_string();
        self.update(|s| s.errors.push(msg));
    }

    fn set_failed(&mut self, description: &str) {
        self.update(|s| s.failure = Some(description.to_string()));
    }

    fn end(&mut self) {
        self.update(|s| s.end_calls += 1);
    }
}
