use crate::constants::{
    BYTE_SIZE_BUCKETS, LATENCY_BUCKETS_MICROS, METHOD_BYTES_REPLY, METHOD_BYTES_REQUEST,
    METHOD_COUNT, METHOD_ERROR_COUNT, METHOD_LATENCY_MICROS,
};
use std::sync::Arc;

mod in_process;
pub use in_process::{DistributionSnapshot, InProcessMetrics, MetricsSnapshot};

pub trait Counter: Send + Sync {
    fn add(&self, delta: u64);
}

pub trait Distribution: Send + Sync {
    fn record(&self, value: f64);
}

/// Creates instruments; called once per instrument, never on the call path.
pub trait MetricsProvider: Send + Sync {
    fn counter(&self, name: &'static str, labels: &MethodLabels) -> Arc<dyn Counter>;

    /// `buckets` are the inclusive upper bounds of the histogram buckets.
    fn distribution(
        &self,
        name: &'static str,
        buckets: &'static [f64],
        labels: &MethodLabels,
    ) -> Arc<dyn Distribution>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodLabels {
    /// The component making the call.
    pub caller: String,
    /// The interface being called.
    pub component: String,
    pub method: String,
}

impl MethodLabels {
    pub fn new(
        caller: impl Into<String>,
        component: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            caller: caller.into(),
            component: component.into(),
            method: method.into(),
        }
    }
}

/// The five live instruments of one (caller, component, method).
#[derive(Clone)]
pub struct MethodMetrics {
    pub labels: MethodLabels,
    pub count: Arc<dyn Counter>,
    pub error_count: Arc<dyn Counter>,
    pub latency_micros: Arc<dyn Distribution>,
    pub bytes_request: Arc<dyn Distribution>,
    pub bytes_reply: Arc<dyn Distribution>,
}

impl MethodMetrics {
    pub fn new(provider: &dyn MetricsProvider, labels: MethodLabels) -> Self {
        Self {
            count: provider.counter(METHOD_COUNT, &labels),
            error_count: provider.counter(METHOD_ERROR_COUNT, &labels),
            latency_micros: provider.distribution(
                METHOD_LATENCY_MICROS,
                LATENCY_BUCKETS_MICROS,
                &labels,
            ),
            bytes_request: provider.distribution(METHOD_BYTES_REQUEST, BYTE_SIZE_BUCKETS, &labels),
            bytes_reply: provider.distribution(METHOD_BYTES_REPLY, BYTE_SIZE_BUCKETS, &labels),
            labels,
        }
    }
}

impl std::fmt::Debug for MethodMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodMetrics")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}
