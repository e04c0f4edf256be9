use crate::{
    ActiveSpan, CallContext, InterfaceDescriptor, MethodOrdinal, SpanKind, StubResult, Tracer,
};
use std::future::Future;
use std::sync::Arc;

/// The shared half of every local stub: the in-process implementation plus
/// per-method span names.
///
/// Local calls are not encoded and not metered; they only get an `Internal`
/// span when the caller is being traced.
pub struct LocalStub<I: ?Sized> {
    inner: Arc<I>,
    tracer: Arc<dyn Tracer>,
    interface: &'static InterfaceDescriptor,
    span_names: Vec<String>,
}

impl<I: ?Sized + Send + Sync> LocalStub<I> {
    pub fn new(
        interface: &'static InterfaceDescriptor,
        inner: Arc<I>,
        tracer: Arc<dyn Tracer>,
    ) -> Self {
        Self {
            span_names: interface
                .methods
                .iter()
                .map(|m| interface.span_name(m))
                .collect(),
            inner,
            tracer,
            interface,
        }
    }

    pub fn inner(&self) -> &Arc<I> {
        &self.inner
    }

    /// Runs `body` against the implementation under the method's span.
    pub async fn call<R, F, Fut>(
        &self,
        ctx: &CallContext,
        ordinal: MethodOrdinal,
        body: F,
    ) -> StubResult<R>
    where
        F: FnOnce(Arc<I>, CallContext) -> Fut,
        Fut: Future<Output = StubResult<R>>,
    {
        let name = self
            .span_names
            .get(ordinal as usize)
            .map(String::as_str)
            .unwrap_or(self.interface.name);
        call_local(self.tracer.as_ref(), ctx, name, |ctx| {
            body(self.inner.clone(), ctx)
        })
        .await
    }
}

/// Runs `body` under an `Internal` span named `span_name`, when `ctx` carries
/// a valid parent trace.
pub async fn call_local<R, F, Fut>(
    tracer: &dyn Tracer,
    ctx: &CallContext,
    span_name: &str,
    body: F,
) -> StubResult<R>
where
    F: FnOnce(CallContext) -> Fut,
    Fut: Future<Output = StubResult<R>>,
{
    let mut span = ActiveSpan::start(tracer, ctx, span_name, SpanKind::Internal);
    let result = body(span.child_context(ctx)).await;
    if let Err(err) = &result {
        span.fail(err);
    }
    span.end();
    result
}
