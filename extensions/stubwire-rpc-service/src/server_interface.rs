use crate::{CallContext, DispatchError, InterfaceDescriptor, MethodOrdinal, ShardKey};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Decodes a call's arguments, runs the implementation and returns the
/// encoded reply.
pub type StubHandler = Arc<
    dyn Fn(CallContext, Vec<u8>) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, DispatchError>> + Send>>
        + Send
        + Sync,
>;

/// Receives one unit of load per routed call served, keyed by shard.
pub type LoadReporter = Arc<dyn Fn(ShardKey, f64) + Send + Sync>;

/// A load reporter that discards everything.
pub fn ignore_load() -> LoadReporter {
    Arc::new(|_, _| {})
}

/// The server side of one interface: a total map from its methods to handlers.
pub trait ServerStub: Send + Sync {
    fn interface(&self) -> &'static InterfaceDescriptor;

    /// The handler for `method`, or `None` if the interface has no such method.
    fn lookup(&self, method: &str) -> Option<StubHandler>;

    fn lookup_ordinal(&self, ordinal: MethodOrdinal) -> Option<StubHandler> {
        self.interface()
            .method(ordinal)
            .and_then(|m| self.lookup(m.name))
    }
}
