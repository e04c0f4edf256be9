use std::sync::Arc;
use stubwire_rpc_service::constants::{
    LATENCY_BUCKETS_MICROS, METHOD_COUNT, METHOD_ERROR_COUNT, METHOD_LATENCY_MICROS,
};
use stubwire_rpc_service::{InProcessMetrics, MethodLabels, MethodMetrics, MetricsProvider};

fn labels() -> MethodLabels {
    MethodLabels::new("frontend", "shop.ProductCatalog", "get_product")
}

#[test]
fn test_method_metrics_are_shared_per_label_set() {
    let metrics = InProcessMetrics::new();
    let first = MethodMetrics::new(&metrics, labels());
    let second = MethodMetrics::new(&metrics, labels());

    first.count.add(1);
    second.count.add(2);
    first.error_count.add(1);

    assert_eq!(metrics.counter_value(METHOD_COUNT, &labels()), Some(3));
    assert_eq!(metrics.counter_value(METHOD_ERROR_COUNT, &labels()), Some(1));

    let other = MethodLabels::new("checkout", "shop.ProductCatalog", "get_product");
    assert_eq!(metrics.counter_value(METHOD_COUNT, &other), None);
}

#[test]
fn test_distribution_buckets_are_inclusive_upper_bounds() {
    let metrics = InProcessMetrics::new();
    let latency = metrics.distribution(METHOD_LATENCY_MICROS, LATENCY_BUCKETS_MICROS, &labels());

    latency.record(10.0);
    latency.record(11.0);
    latency.record(1e12);

    let snapshot = metrics
        .distribution_snapshot(METHOD_LATENCY_MICROS, &labels())
        .expect("registered");
    assert_eq!(snapshot.count, 3);
    assert_eq!(snapshot.buckets.len(), LATENCY_BUCKETS_MICROS.len() + 1);
    assert_eq!(snapshot.buckets[0], 1);
    assert_eq!(snapshot.buckets[1], 1);
    assert_eq!(*snapshot.buckets.last().unwrap(), 1);
    assert_eq!(snapshot.sum, 10.0 + 11.0 + 1e12);
}

#[test]
fn test_concurrent_updates_are_not_lost() {
    let metrics = Arc::new(InProcessMetrics::new());
    let method = Arc::new(MethodMetrics::new(metrics.as_ref(), labels()));

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let method = method.clone();
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    method.count.add(1);
                    method.bytes_request.record(4.0);
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(metrics.counter_value(METHOD_COUNT, &labels()), Some(8_000));
    let snapshot = metrics.snapshot();
    let (_, _, bytes) = snapshot
        .distributions
        .iter()
        .find(|(name, _, _)| *name == "stubwire_method_bytes_request")
        .unwrap();
    assert_eq!(bytes.count, 8_000);
    assert_eq!(bytes.mean(), Some(4.0));
}
