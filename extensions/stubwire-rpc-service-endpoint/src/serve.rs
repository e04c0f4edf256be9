use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use stubwire::constants::{DEFAULT_ENCODER_CAPACITY, PRESENCE_SIZE};
use stubwire::{DecodeError, Decoder, Encoder, Marshal, Unmarshal};
use stubwire_rpc_service::fault::{catch_fault, catch_fault_async};
use stubwire_rpc_service::{
    CallContext, DispatchError, LoadReporter, MethodDescriptor, ShardKey, StubHandler, StubResult,
};

/// Picks the shard key of a routed call from its decoded arguments.
pub type RouteFn<A> = fn(&A) -> ShardKey;

/// Builds the handler for one method.
///
/// The handler decodes the argument tuple `A`, runs `implementation`, and
/// encodes its result followed by the error slot. An application error is
/// sent as `R::default()` plus the error's message. Panics while decoding,
/// running the implementation or encoding are caught and reported as
/// [`DispatchError::Fault`].
pub fn serve_method<A, R, F, Fut>(method: &'static MethodDescriptor, implementation: F) -> StubHandler
where
    A: Unmarshal + Send + 'static,
    R: Marshal + Default + Send + 'static,
    F: Fn(CallContext, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StubResult<R>> + Send + 'static,
{
    serve(method, None, implementation)
}

/// Like [`serve_method`], and also reports one unit of load for the shard
/// the call was routed by.
pub fn serve_routed_method<A, R, F, Fut>(
    method: &'static MethodDescriptor,
    route: RouteFn<A>,
    load_reporter: LoadReporter,
    implementation: F,
) -> StubHandler
where
    A: Unmarshal + Send + 'static,
    R: Marshal + Default + Send + 'static,
    F: Fn(CallContext, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StubResult<R>> + Send + 'static,
{
    serve(method, Some((route, load_reporter)), implementation)
}

fn serve<A, R, F, Fut>(
    method: &'static MethodDescriptor,
    routing: Option<(RouteFn<A>, LoadReporter)>,
    implementation: F,
) -> StubHandler
where
    A: Unmarshal + Send + 'static,
    R: Marshal + Default + Send + 'static,
    F: Fn(CallContext, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StubResult<R>> + Send + 'static,
{
    let implementation = Arc::new(implementation);
    Arc::new(move |ctx: CallContext, bytes: Vec<u8>| {
        let implementation = implementation.clone();
        let routing = routing.clone();
        Box::pin(async move {
            let args = catch_fault("server decode", || decode_args::<A>(&bytes))
                .map_err(DispatchError::Fault)?
                .map_err(|err| {
                    tracing::debug!(method = method.name, error = %err, "rejecting undecodable arguments");
                    DispatchError::Decode(err)
                })?;

            if let Some((route, report_load)) = &routing {
                let shard = catch_fault("server route", || route(&args))
                    .map_err(DispatchError::Fault)?;
                report_load(shard, 1.0);
            }

            let outcome = catch_fault_async("server implementation", async move {
                implementation(ctx, args).await
            })
            .await
            .map_err(DispatchError::Fault)?;

            if let Err(err) = &outcome {
                tracing::debug!(method = method.name, error = %err, "method returned an error");
            }
            catch_fault("server encode", || encode_reply(outcome)).map_err(DispatchError::Fault)
        }) as Pin<Box<dyn Future<Output = Result<Vec<u8>, DispatchError>> + Send>>
    })
}

/// Decodes a complete argument list; leftover bytes are an error.
pub fn decode_args<A: Unmarshal>(bytes: &[u8]) -> Result<A, DecodeError> {
    let mut dec = Decoder::new(bytes);
    let args = A::unmarshal(&mut dec);
    dec.finish()?;
    Ok(args)
}

/// Encodes a reply: the result, or `R::default()` on error, then the error slot.
pub fn encode_reply<R: Marshal + Default>(outcome: StubResult<R>) -> Vec<u8> {
    let (value, err) = match outcome {
        Ok(value) => (value, None),
        Err(err) => (R::default(), Some(err)),
    };
    let capacity = value
        .size_hint()
        .map_or(DEFAULT_ENCODER_CAPACITY, |n| n + PRESENCE_SIZE);
    let mut enc = Encoder::with_capacity(capacity);
    enc.put(&value);
    enc.error(err.as_ref());
    enc.into_bytes()
}
