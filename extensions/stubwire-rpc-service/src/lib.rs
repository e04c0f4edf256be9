mod call_context;
pub use call_context::*;
pub mod constants;
pub use constants::CODEGEN_VERSION;
mod descriptor;
pub use descriptor::*;
mod error;
pub use error::*;
pub mod fault;
mod local_stub;
pub use local_stub::*;
pub mod method_metrics;
pub use method_metrics::{
    Counter, Distribution, InProcessMetrics, MethodLabels, MethodMetrics, MetricsProvider,
};
mod registry;
pub use registry::*;
pub mod routing;
mod runtime;
pub use runtime::*;
mod server_interface;
pub use server_interface::*;
pub mod tracing_adapter;
pub use tracing_adapter::{ActiveSpan, SpanKind, StubSpan, TraceContext, Tracer};
mod transport;
pub use transport::*;
