use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stubwire::{Encoder, Marshal};
use stubwire_rpc_service::routing::route;
use stubwire_rpc_service::tracing_adapter::RecordingTracer;
use stubwire_rpc_service::{
    AppError, CallContext, DispatchError, InterfaceDescriptor, LoadReporter, MethodDescriptor,
    ServerStub, ShardKey, SpanKind, StubError, TraceContext, ignore_load,
};
use stubwire_rpc_service_caller::decode_reply;
use stubwire_rpc_service_endpoint::error::EndpointError;
use stubwire_rpc_service_endpoint::{
    DispatchTable, StubEndpoint, encode_reply, serve_method, serve_routed_method,
};

static CALCULATOR: InterfaceDescriptor = InterfaceDescriptor {
    name: "test.Calculator",
    methods: &[
        MethodDescriptor::new("add", 0),
        MethodDescriptor::routed("divide", 1),
        MethodDescriptor::new("echo", 2),
    ],
};

fn encode<T: Marshal + ?Sized>(value: &T) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.put(value);
    enc.into_bytes()
}

/// Counts how often each implementation actually ran.
#[derive(Default)]
struct Calls {
    add: AtomicUsize,
    divide: AtomicUsize,
}

fn calculator(calls: Arc<Calls>, load_reporter: LoadReporter) -> Arc<dyn ServerStub> {
    let add_calls = calls.clone();
    let divide_calls = calls;

    DispatchTable::new(&CALCULATOR)
        .with(
            "add",
            serve_method(
                &CALCULATOR.methods[0],
                move |_ctx: CallContext, (a, b): (i64, i64)| {
                    add_calls.add.fetch_add(1, Ordering::SeqCst);
                    async move {
                        a.checked_add(b)
                            .ok_or_else(|| StubError::from(AppError::new("add overflowed")))
                    }
                },
            ),
        )
        .unwrap()
        .with(
            "divide",
            serve_routed_method(
                &CALCULATOR.methods[1],
                |(a, _): &(i64, i64)| route(a),
                load_reporter,
                move |_ctx: CallContext, (a, b): (i64, i64)| {
                    divide_calls.divide.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if b == 0 {
                            panic!("cannot divide {a} by zero");
                        }
                        Ok::<_, StubError>(a / b)
                    }
                },
            ),
        )
        .unwrap()
        .with(
            "echo",
            serve_method(
                &CALCULATOR.methods[2],
                |_ctx: CallContext, (text,): (String,)| async move { Ok::<_, StubError>(text) },
            ),
        )
        .unwrap()
        .build()
        .unwrap()
}

async fn endpoint_with(tracer: RecordingTracer) -> (StubEndpoint, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let endpoint = StubEndpoint::new(Arc::new(tracer));
    endpoint
        .host(calculator(calls.clone(), ignore_load()))
        .await
        .unwrap();
    (endpoint, calls)
}

#[tokio::test]
async fn test_dispatch_by_ordinal_and_by_name() {
    let (endpoint, _) = endpoint_with(RecordingTracer::new()).await;
    let ctx = CallContext::new();

    let reply = endpoint
        .dispatch(&ctx, "test.Calculator", 0, encode(&(2i64, 3i64)))
        .await
        .unwrap();
    assert_eq!(decode_reply::<i64>(&reply).unwrap(), 5);

    let reply = endpoint
        .dispatch_named(&ctx, "test.Calculator", "echo", encode(&("hi",)))
        .await
        .unwrap();
    assert_eq!(decode_reply::<String>(&reply).unwrap(), "hi");
}

#[tokio::test]
async fn test_unknown_method_or_interface_is_reported_not_fatal() {
    let (endpoint, _) = endpoint_with(RecordingTracer::new()).await;
    let ctx = CallContext::new();

    let server = endpoint.server("test.Calculator").await.unwrap();
    assert!(server.lookup("subtract").is_none());
    assert!(server.lookup_ordinal(7).is_none());
    assert!(server.lookup_ordinal(1).is_some());

    let err = endpoint
        .dispatch(&ctx, "test.Calculator", 7, Vec::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::MethodNotFound {
            interface: "test.Calculator".into(),
            method: "#7".into(),
        }
    );

    let err = endpoint
        .dispatch_named(&ctx, "test.Calculator", "subtract", Vec::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::MethodNotFound {
            interface: "test.Calculator".into(),
            method: "subtract".into(),
        }
    );

    assert!(endpoint.server("test.Missing").await.is_none());
    let err = endpoint
        .dispatch(&ctx, "test.Missing", 0, Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::UnknownInterface("test.Missing".into()));

    // Still serving.
    let reply = endpoint
        .dispatch(&ctx, "test.Calculator", 0, encode(&(1i64, 1i64)))
        .await
        .unwrap();
    assert_eq!(decode_reply::<i64>(&reply).unwrap(), 2);
}

#[tokio::test]
async fn test_truncated_arguments_never_reach_the_implementation() {
    let (endpoint, calls) = endpoint_with(RecordingTracer::new()).await;
    let ctx = CallContext::new();
    let args = encode(&(2i64, 3i64));

    let err = endpoint
        .dispatch(&ctx, "test.Calculator", 0, args[..11].to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Decode(_)), "{err:?}");

    let mut padded = args.clone();
    padded.push(0);
    let err = endpoint
        .dispatch(&ctx, "test.Calculator", 0, padded)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Decode(_)), "{err:?}");

    assert_eq!(calls.add.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn implementation_panic_is_recovered_as_fault() {
    let (endpoint, calls) = endpoint_with(RecordingTracer::new()).await;
    let ctx = CallContext::new();

    let err = endpoint
        .dispatch(&ctx, "test.Calculator", 1, encode(&(7i64, 0i64)))
        .await
        .unwrap_err();
    match err {
        DispatchError::Fault(message) => assert_eq!(message, "cannot divide 7 by zero"),
        other => panic!("expected a fault, got {other:?}"),
    }
    assert_eq!(calls.divide.load(Ordering::SeqCst), 1);

    let reply = endpoint
        .dispatch(&ctx, "test.Calculator", 1, encode(&(8i64, 2i64)))
        .await
        .unwrap();
    assert_eq!(decode_reply::<i64>(&reply).unwrap(), 4);
}

#[tokio::test]
async fn test_application_error_travels_in_the_error_slot() {
    let (endpoint, calls) = endpoint_with(RecordingTracer::new()).await;

    let reply = endpoint
        .dispatch(
            &CallContext::new(),
            "test.Calculator",
            0,
            encode(&(i64::MAX, 1i64)),
        )
        .await
        .unwrap();

    assert_eq!(reply, encode_reply::<i64>(Err(AppError::new("add overflowed").into())));

    let mut expected = encode(&0i64);
    expected.push(1);
    expected.extend_from_slice(&encode("add overflowed"));
    assert_eq!(reply, expected);

    match decode_reply::<i64>(&reply) {
        Err(StubError::Application(app)) => assert_eq!(app.message(), "add overflowed"),
        other => panic!("expected an application error, got {other:?}"),
    }
    assert_eq!(calls.add.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_routed_method_reports_load_for_its_shard() {
    let load: Arc<Mutex<Vec<(ShardKey, f64)>>> = Arc::default();
    let reporter: LoadReporter = {
        let load = load.clone();
        Arc::new(move |shard, units| load.lock().unwrap().push((shard, units)))
    };
    let endpoint = StubEndpoint::default();
    endpoint
        .host(calculator(Arc::default(), reporter))
        .await
        .unwrap();
    let ctx = CallContext::new();

    endpoint
        .dispatch(&ctx, "test.Calculator", 1, encode(&(10i64, 2i64)))
        .await
        .unwrap();
    endpoint
        .dispatch(&ctx, "test.Calculator", 0, encode(&(10i64, 2i64)))
        .await
        .unwrap();

    let load = load.lock().unwrap().clone();
    assert_eq!(load, vec![(route(&10i64), 1.0)]);
    assert_ne!(load[0].0, 0);
}

#[tokio::test]
async fn test_dispatch_table_must_match_its_descriptor() {
    let echo = || {
        serve_method(
            &CALCULATOR.methods[2],
            |_ctx: CallContext, (s,): (String,)| async move { Ok::<_, StubError>(s) },
        )
    };

    let err = DispatchTable::new(&CALCULATOR)
        .with("echo", echo())
        .unwrap()
        .with("echo", echo())
        .err()
        .unwrap();
    assert_eq!(
        err,
        EndpointError::DuplicateMethod {
            interface: "test.Calculator",
            method: "echo".into(),
        }
    );

    let mut table = DispatchTable::new(&CALCULATOR);
    assert_eq!(
        table.register("subtract", echo()).unwrap_err(),
        EndpointError::UnknownMethod {
            interface: "test.Calculator",
            method: "subtract".into(),
        }
    );

    table.register("echo", echo()).unwrap();
    assert_eq!(
        table.build().err().unwrap(),
        EndpointError::MissingHandler {
            interface: "test.Calculator",
            method: "add",
        }
    );
}

#[tokio::test]
async fn test_an_interface_is_hosted_once() {
    let (endpoint, calls) = endpoint_with(RecordingTracer::new()).await;

    let err = endpoint
        .host(calculator(calls, ignore_load()))
        .await
        .unwrap_err();
    assert_eq!(err, EndpointError::DuplicateInterface("test.Calculator"));
}

#[tokio::test]
async fn test_server_span_per_traced_dispatch() {
    let tracer = RecordingTracer::new();
    let (endpoint, _) = endpoint_with(tracer.clone()).await;

    endpoint
        .dispatch(&CallContext::new(), "test.Calculator", 0, encode(&(1i64, 2i64)))
        .await
        .unwrap();
    assert_eq!(tracer.started(), 0);

    let root = TraceContext::new_root();
    let ctx = CallContext::new().with_trace(root);
    endpoint
        .dispatch(&ctx, "test.Calculator", 0, encode(&(1i64, 2i64)))
        .await
        .unwrap();
    endpoint
        .dispatch(&ctx, "test.Calculator", 1, encode(&(1i64, 0i64)))
        .await
        .unwrap_err();

    let spans = tracer.spans();
    assert_eq!(spans.len(), 2);
    assert!(spans.iter().all(|s| s.kind == SpanKind::Server && s.parent == root));
    assert_eq!(spans[0].name, "test.Calculator.add");
    assert_eq!(spans[0].failure, None);
    assert_eq!(spans[1].name, "test.Calculator.divide");
    assert_eq!(
        spans[1].failure.as_deref(),
        Some("dispatch fault: cannot divide 1 by zero")
    );
    assert_eq!(tracer.ended(), 2);
}
