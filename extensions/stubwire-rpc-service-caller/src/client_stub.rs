use std::io;
use std::time::Instant;
use stubwire::{Decoder, Encoder, Marshal, Unmarshal, constants::DEFAULT_ENCODER_CAPACITY};
use stubwire_rpc_service::fault::catch_fault;
use stubwire_rpc_service::{
    ActiveSpan, AppError, CallContext, DispatchError, InterfaceDescriptor, MethodDescriptor,
    MethodLabels, MethodMetrics, MethodOrdinal, RemoteCallError, RemoteHandle, ShardKey, SpanKind,
    StubError, StubResult, Tracer,
};

/// The shared half of every client stub.
///
/// Typed stubs hold one of these and forward each method to [`ClientStub::call`]
/// with the method's ordinal, its shard key and its arguments as a tuple.
pub struct ClientStub {
    handle: RemoteHandle,
    interface: &'static InterfaceDescriptor,
    caller: String,
    methods: Vec<MethodState>,
}

struct MethodState {
    descriptor: &'static MethodDescriptor,
    span_name: String,
    metrics: MethodMetrics,
}

impl ClientStub {
    /// Creates the stub and every method's instruments up front.
    pub fn new(handle: RemoteHandle, interface: &'static InterfaceDescriptor, caller: &str) -> Self {
        let methods = interface
            .methods
            .iter()
            .map(|m| MethodState {
                descriptor: m,
                span_name: interface.span_name(m),
                metrics: MethodMetrics::new(
                    handle.metrics.as_ref(),
                    MethodLabels::new(caller, interface.name, m.name),
                ),
            })
            .collect();
        Self {
            handle,
            interface,
            caller: caller.to_string(),
            methods,
        }
    }

    pub fn interface(&self) -> &'static InterfaceDescriptor {
        self.interface
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    pub fn method_metrics(&self, ordinal: MethodOrdinal) -> Option<&MethodMetrics> {
        self.methods.get(ordinal as usize).map(|m| &m.metrics)
    }

    /// Performs one remote call.
    ///
    /// Counts the call, opens a `Client` span when `ctx` is traced, encodes
    /// `args`, invokes the transport, and decodes the result and the trailing
    /// error slot. Whatever the outcome, the span is closed, failures are
    /// counted and the latency is recorded exactly once.
    pub async fn call<A, R>(
        &self,
        ctx: &CallContext,
        ordinal: MethodOrdinal,
        shard_key: ShardKey,
        args: &A,
    ) -> StubResult<R>
    where
        A: Marshal + Sync + ?Sized,
        R: Unmarshal,
    {
        let Some(method) = self.methods.get(ordinal as usize) else {
            tracing::error!(
                interface = self.interface.name,
                ordinal,
                "client stub called with unknown ordinal"
            );
            return Err(RemoteCallError::Fault(format!(
                "{} has no method with ordinal {ordinal}",
                self.interface.name
            ))
            .into());
        };

        let mut call = InFlight::start(method, self.handle.tracer.as_ref(), ctx);
        let outbound = call.span.child_context(ctx);
        let result = self
            .roundtrip(&outbound, method, shard_key, args)
            .await;
        call.settle(&result);
        result
    }

    async fn roundtrip<A, R>(
        &self,
        ctx: &CallContext,
        method: &MethodState,
        shard_key: ShardKey,
        args: &A,
    ) -> StubResult<R>
    where
        A: Marshal + Sync + ?Sized,
        R: Unmarshal,
    {
        let request = catch_fault("client encode", || {
            let mut enc =
                Encoder::with_capacity(args.size_hint().unwrap_or(DEFAULT_ENCODER_CAPACITY));
            enc.put(args);
            enc.into_bytes()
        })
        .map_err(RemoteCallError::Fault)?;
        method.metrics.bytes_request.record(request.len() as f64);

        let reply = self
            .handle
            .transport
            .invoke(
                ctx,
                self.interface.name,
                method.descriptor.ordinal,
                request,
                shard_key,
            )
            .await
            .map_err(classify_transport_error)?;
        method.metrics.bytes_reply.record(reply.len() as f64);

        catch_fault("client decode", || decode_reply::<R>(&reply)).map_err(RemoteCallError::Fault)?
    }
}

/// Decodes a reply: the result, then the error slot, then nothing.
pub fn decode_reply<R: Unmarshal>(reply: &[u8]) -> StubResult<R> {
    let mut dec = Decoder::new(reply);
    let value = R::unmarshal(&mut dec);
    let app_error = dec.error_slot();
    dec.finish()?;
    match app_error {
        Some(message) => Err(AppError::new(message).into()),
        None => Ok(value),
    }
}

/// A fault reported by the serving side arrives as the payload of the
/// transport error; everything else is a plain transport failure.
fn classify_transport_error(err: io::Error) -> RemoteCallError {
    match err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<DispatchError>())
    {
        Some(DispatchError::Fault(message)) => RemoteCallError::Fault(message.clone()),
        _ => RemoteCallError::Transport(err),
    }
}

/// Bookkeeping for one call in progress.
///
/// Dropping it without [`InFlight::settle`] means the caller abandoned the
/// call mid-flight; that still counts as a failed call.
struct InFlight<'a> {
    metrics: &'a MethodMetrics,
    span: ActiveSpan,
    started: Instant,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn start(
        method: &'a MethodState,
        tracer: &dyn Tracer,
        ctx: &CallContext,
    ) -> Self {
        let started = Instant::now();
        method.metrics.count.add(1);
        Self {
            metrics: &method.metrics,
            span: ActiveSpan::start(tracer, ctx, &method.span_name, SpanKind::Client),
            started,
            settled: false,
        }
    }

    fn settle<R>(&mut self, result: &StubResult<R>) {
        if let Err(err) = result {
            self.fail(err);
        }
        self.settled = true;
    }

    fn fail(&mut self, err: &StubError) {
        tracing::debug!(
            component = %self.metrics.labels.component,
            method = %self.metrics.labels.method,
            error = %err,
            "remote call failed"
        );
        self.span.fail(err);
        self.metrics.error_count.add(1);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.span.fail_with("call abandoned");
            self.metrics.error_count.add(1);
        }
        self.metrics
            .latency_micros
            .record(self.started.elapsed().as_micros() as f64);
        // `span` is dropped right after this, which ends it.
    }
}
