use futures::FutureExt;
use std::error::Error;
use std::io;
use std::sync::{Arc, Mutex};
use stubwire::{DecodeError, Encoder, Marshal};
use stubwire_rpc_service::constants::{
    METHOD_BYTES_REPLY, METHOD_BYTES_REQUEST, METHOD_COUNT, METHOD_ERROR_COUNT,
    METHOD_LATENCY_MICROS,
};
use stubwire_rpc_service::tracing_adapter::RecordingTracer;
use stubwire_rpc_service::{
    CallContext, DispatchError, InProcessMetrics, InterfaceDescriptor, MethodDescriptor,
    MethodLabels, MethodOrdinal, RemoteCallError, RemoteHandle, ShardKey, SpanKind, StubError,
    StubSpan, StubTransport, TraceContext, Tracer, routing,
};
use stubwire_rpc_service_caller::ClientStub;

static INVENTORY: InterfaceDescriptor = InterfaceDescriptor {
    name: "test.Inventory",
    methods: &[
        MethodDescriptor::new("count_items", 0),
        MethodDescriptor::routed("reserve", 1),
    ],
};

#[derive(Debug, Clone)]
struct Invocation {
    interface: &'static str,
    ordinal: MethodOrdinal,
    args: Vec<u8>,
    shard_key: ShardKey,
    trace: Option<TraceContext>,
}

/// Answers every call with the same reply bytes, or the same error.
struct ScriptedTransport {
    reply: Box<dyn Fn() -> io::Result<Vec<u8>> + Send + Sync>,
    seen: Mutex<Vec<Invocation>>,
}

impl ScriptedTransport {
    fn replying(bytes: Vec<u8>) -> Arc<Self> {
        Self::with(move || Ok(bytes.clone()))
    }

    fn failing(kind: io::ErrorKind) -> Arc<Self> {
        Self::with(move || Err(io::Error::new(kind, "connection refused by peer")))
    }

    fn with(reply: impl Fn() -> io::Result<Vec<u8>> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn invocations(&self) -> Vec<Invocation> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StubTransport for ScriptedTransport {
    async fn invoke(
        &self,
        ctx: &CallContext,
        interface: &'static str,
        ordinal: MethodOrdinal,
        args: Vec<u8>,
        shard_key: ShardKey,
    ) -> io::Result<Vec<u8>> {
        self.seen.lock().unwrap().push(Invocation {
            interface,
            ordinal,
            args,
            shard_key,
            trace: ctx.parent_trace(),
        });
        (self.reply)()
    }
}

/// Never answers until the call is cancelled.
struct StalledTransport;

#[async_trait::async_trait]
impl StubTransport for StalledTransport {
    async fn invoke(
        &self,
        ctx: &CallContext,
        _interface: &'static str,
        _ordinal: MethodOrdinal,
        _args: Vec<u8>,
        _shard_key: ShardKey,
    ) -> io::Result<Vec<u8>> {
        ctx.cancellation().cancelled().await;
        ctx.check().map(|_| Vec::new())
    }
}

struct Harness {
    stub: ClientStub,
    metrics: Arc<InProcessMetrics>,
    tracer: RecordingTracer,
}

fn harness(transport: Arc<dyn StubTransport>) -> Harness {
    let metrics = Arc::new(InProcessMetrics::new());
    let tracer = RecordingTracer::new();
    let handle = RemoteHandle {
        transport,
        tracer: Arc::new(tracer.clone()),
        metrics: metrics.clone(),
    };
    Harness {
        stub: ClientStub::new(handle, &INVENTORY, "frontend"),
        metrics,
        tracer,
    }
}

fn labels(method: &str) -> MethodLabels {
    MethodLabels::new("frontend", "test.Inventory", method)
}

fn reply<T: Marshal>(value: &T, err: Option<&str>) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.put(value);
    enc.error(err);
    enc.into_bytes()
}

fn traced() -> CallContext {
    CallContext::new().with_trace(TraceContext::new(0xabc, 0x11))
}

struct Explosive;

impl Marshal for Explosive {
    fn marshal(&self, _enc: &mut Encoder) {
        panic!("cannot marshal Explosive");
    }
}

#[tokio::test]
async fn test_successful_call_decodes_and_meters() {
    let transport = ScriptedTransport::replying(reply(&42u64, None));
    let h = harness(transport.clone());

    let args = ("warehouse-7".to_string(), 3u32);
    let count: u64 = h
        .stub
        .call(&CallContext::new(), 0, 0, &args)
        .await
        .unwrap();
    assert_eq!(count, 42);

    let seen = transport.invocations();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].interface, "test.Inventory");
    assert_eq!(seen[0].ordinal, 0);
    assert_eq!(seen[0].shard_key, 0);
    let mut expected = Encoder::new();
    expected.put(&args);
    assert_eq!(seen[0].args, expected.into_bytes());

    let l = labels("count_items");
    assert_eq!(h.metrics.counter_value(METHOD_COUNT, &l), Some(1));
    assert_eq!(h.metrics.counter_value(METHOD_ERROR_COUNT, &l), Some(0));
    let request = h.metrics.distribution_snapshot(METHOD_BYTES_REQUEST, &l).unwrap();
    assert_eq!(request.count, 1);
    assert_eq!(request.sum, (4 + 11 + 4) as f64);
    let reply_size = h.metrics.distribution_snapshot(METHOD_BYTES_REPLY, &l).unwrap();
    assert_eq!(reply_size.sum, 9.0);
    assert_eq!(
        h.metrics
            .distribution_snapshot(METHOD_LATENCY_MICROS, &l)
            .unwrap()
            .count,
        1
    );

    // No parent trace: no span operations at all.
    assert_eq!(h.tracer.started(), 0);
    assert_eq!(seen[0].trace, None);
}

#[tokio::test]
async fn test_no_argument_method_sends_empty_request() {
    let transport = ScriptedTransport::replying(reply(&7u64, None));
    let h = harness(transport.clone());

    let _: u64 = h.stub.call(&CallContext::new(), 0, 0, &()).await.unwrap();

    assert!(transport.invocations()[0].args.is_empty());
    let request = h
        .metrics
        .distribution_snapshot(METHOD_BYTES_REQUEST, &labels("count_items"))
        .unwrap();
    assert_eq!((request.count, request.sum), (1, 0.0));
}

#[tokio::test]
async fn test_traced_call_opens_one_client_span() {
    let transport = ScriptedTransport::replying(reply(&1u64, None));
    let h = harness(transport.clone());
    let ctx = traced();

    let _: u64 = h.stub.call(&ctx, 0, 0, &()).await.unwrap();

    let spans = h.tracer.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "test.Inventory.count_items");
    assert_eq!(spans[0].kind, SpanKind::Client);
    assert_eq!(spans[0].parent, TraceContext::new(0xabc, 0x11));
    assert_eq!(spans[0].end_calls, 1);
    assert_eq!(spans[0].failure, None);

    // The transport is handed the client span as the new parent.
    assert_eq!(transport.invocations()[0].trace, Some(spans[0].context));
}

#[tokio::test]
async fn test_application_error_round_trips_message() {
    let transport = ScriptedTransport::replying(reply(&0u64, Some("warehouse-7 is closed")));
    let h = harness(transport);

    let err = h
        .stub
        .call::<_, u64>(&traced(), 0, 0, &("warehouse-7".to_string(),))
        .await
        .unwrap_err();

    assert!(!err.is_remote_call_failure());
    assert_eq!(err.to_string(), "warehouse-7 is closed");
    assert_eq!(
        h.metrics
            .counter_value(METHOD_ERROR_COUNT, &labels("count_items")),
        Some(1)
    );
    let spans = h.tracer.spans();
    assert_eq!(spans[0].errors, vec!["warehouse-7 is closed".to_string()]);
    assert!(spans[0].failure.is_some());
    assert_eq!(spans[0].end_calls, 1);
}

#[tokio::test]
async fn test_connection_refused_surfaces_original_error() {
    let h = harness(ScriptedTransport::failing(io::ErrorKind::ConnectionRefused));

    let err = h
        .stub
        .call::<_, u64>(&traced(), 0, 0, &())
        .await
        .unwrap_err();

    assert!(err.is_remote_call_failure());
    let original = err
        .source()
        .and_then(|e| e.source())
        .and_then(|e| e.downcast_ref::<io::Error>())
        .expect("io::Error in the source chain");
    assert_eq!(original.kind(), io::ErrorKind::ConnectionRefused);

    let l = labels("count_items");
    assert_eq!(h.metrics.counter_value(METHOD_ERROR_COUNT, &l), Some(1));
    // Nothing came back, so no reply size is recorded.
    assert_eq!(
        h.metrics.distribution_snapshot(METHOD_BYTES_REPLY, &l).unwrap().count,
        0
    );
    assert_eq!(h.tracer.started(), 1);
    assert_eq!(h.tracer.ended(), 1);
}

#[tokio::test]
async fn test_truncated_reply_is_decode_error() {
    let mut bytes = reply(&"a longer product name".to_string(), None);
    bytes.truncate(10);
    let h = harness(ScriptedTransport::replying(bytes));

    let err = h
        .stub
        .call::<_, String>(&CallContext::new(), 0, 0, &())
        .await
        .unwrap_err();
    assert!(matches!(err, StubError::Decode(DecodeError::Truncated { .. })));
}

#[tokio::test]
async fn test_trailing_reply_bytes_are_decode_error() {
    let mut bytes = reply(&5u64, None);
    bytes.push(0);
    let h = harness(ScriptedTransport::replying(bytes));

    let err = h
        .stub
        .call::<_, u64>(&CallContext::new(), 0, 0, &())
        .await
        .unwrap_err();
    assert!(matches!(err, StubError::Decode(DecodeError::TrailingBytes(1))));
}

#[tokio::test]
async fn test_panicking_marshal_becomes_fault_without_invoking_transport() {
    let transport = ScriptedTransport::replying(reply(&1u64, None));
    let h = harness(transport.clone());

    let err = h
        .stub
        .call::<_, u64>(&traced(), 0, 0, &(Explosive,))
        .await
        .unwrap_err();

    match err {
        StubError::RemoteCall(RemoteCallError::Fault(msg)) => {
            assert_eq!(msg, "cannot marshal Explosive")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(transport.invocations().is_empty());
    assert_eq!(
        h.metrics
            .counter_value(METHOD_ERROR_COUNT, &labels("count_items")),
        Some(1)
    );
    assert_eq!(h.tracer.ended(), 1);
}

#[tokio::test]
async fn test_remote_dispatch_fault_is_classified_as_fault() {
    let h = harness(ScriptedTransport::with(|| {
        Err(DispatchError::Fault("index out of bounds".into()).into())
    }));

    let err = h
        .stub
        .call::<_, u64>(&CallContext::new(), 0, 0, &())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StubError::RemoteCall(RemoteCallError::Fault(ref msg)) if msg == "index out of bounds"
    ));
}

#[tokio::test]
async fn test_metrics_after_mixed_calls() {
    let calls = Arc::new(Mutex::new(0u32));
    let h = harness(ScriptedTransport::with({
        let calls = calls.clone();
        move || {
            let mut n = calls.lock().unwrap();
            *n += 1;
            if *n % 3 == 0 {
                Err(io::ErrorKind::BrokenPipe.into())
            } else {
                Ok(reply(&true, None))
            }
        }
    }));

    let mut failures = 0;
    for _ in 0..7 {
        if h
            .stub
            .call::<_, bool>(&CallContext::new(), 1, 9, &("sku".to_string(),))
            .await
            .is_err()
        {
            failures += 1;
        }
    }

    let l = labels("reserve");
    assert_eq!(failures, 2);
    assert_eq!(h.metrics.counter_value(METHOD_COUNT, &l), Some(7));
    assert_eq!(h.metrics.counter_value(METHOD_ERROR_COUNT, &l), Some(2));
    for name in [METHOD_LATENCY_MICROS, METHOD_BYTES_REQUEST] {
        assert_eq!(h.metrics.distribution_snapshot(name, &l).unwrap().count, 7);
    }
    assert_eq!(
        h.metrics.distribution_snapshot(METHOD_BYTES_REPLY, &l).unwrap().count,
        5
    );
    // The other method's instruments exist but were never touched.
    assert_eq!(
        h.metrics.counter_value(METHOD_COUNT, &labels("count_items")),
        Some(0)
    );
}

#[tokio::test]
async fn test_shard_key_is_forwarded_verbatim() {
    let transport = ScriptedTransport::replying(reply(&true, None));
    let h = harness(transport.clone());

    let key = routing::route("sku-1");
    let _: bool = h
        .stub
        .call(&CallContext::new(), 1, key, &("sku-1".to_string(),))
        .await
        .unwrap();
    assert_eq!(transport.invocations()[0].shard_key, key);
}

#[tokio::test]
async fn test_cancelled_call_fails_through_transport_path() {
    let h = Arc::new(harness(Arc::new(StalledTransport)));
    let ctx = CallContext::new();

    let call = tokio::spawn({
        let h = h.clone();
        let ctx = ctx.clone();
        async move { h.stub.call::<_, u64>(&ctx, 0, 0, &()).await }
    });
    tokio::task::yield_now().await;
    ctx.cancel();

    let err = call.await.unwrap().unwrap_err();
    assert_eq!(
        err.transport_error().map(io::Error::kind),
        Some(io::ErrorKind::Interrupted)
    );
    assert_eq!(
        h.metrics
            .counter_value(METHOD_ERROR_COUNT, &labels("count_items")),
        Some(1)
    );
}

#[tokio::test]
async fn test_abandoned_call_is_still_recorded_once() {
    let h = harness(Arc::new(StalledTransport));

    let pending = h.stub.call::<_, u64>(&traced(), 0, 0, &()).now_or_never();
    assert!(pending.is_none());

    let l = labels("count_items");
    assert_eq!(h.metrics.counter_value(METHOD_COUNT, &l), Some(1));
    assert_eq!(h.metrics.counter_value(METHOD_ERROR_COUNT, &l), Some(1));
    assert_eq!(
        h.metrics
            .distribution_snapshot(METHOD_LATENCY_MICROS, &l)
            .unwrap()
            .count,
        1
    );
    let spans = h.tracer.spans();
    assert_eq!(spans[0].end_calls, 1);
    assert_eq!(spans[0].failure.as_deref(), Some("call abandoned"));
}

#[tokio::test]
async fn test_unknown_ordinal_is_a_fault() {
    let transport = ScriptedTransport::replying(Vec::new());
    let h = harness(transport.clone());

    let err = h
        .stub
        .call::<_, u64>(&CallContext::new(), 9, 0, &())
        .await
        .unwrap_err();
    assert!(err.is_remote_call_failure());
    assert!(transport.invocations().is_empty());
}

#[test]
fn test_recorded_span_outliving_clear_leaves_new_records_alone() {
    let tracer = RecordingTracer::new();
    let root = TraceContext::new_root();

    let mut stale = tracer.start_child(root, "test.Inventory/stock", SpanKind::Client);
    tracer.clear();
    let mut fresh = tracer.start_child(root, "test.Inventory/reserve", SpanKind::Client);

    stale.set_failed("late failure");
    stale.end();

    let spans = tracer.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "test.Inventory/reserve");
    assert_eq!(spans[0].failure, None);
    assert_eq!(spans[0].end_calls, 0);

    fresh.end();
    assert_eq!(tracer.spans()[0].end_calls, 1);
}
