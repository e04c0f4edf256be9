use crate::error::EndpointError;
use crate::with_servers_trait::WithServers;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use stubwire_rpc_service::tracing_adapter::NoopTracer;
use stubwire_rpc_service::{
    ActiveSpan, CallContext, DispatchError, InterfaceDescriptor, MethodDescriptor,
    MethodOrdinal, ServerStub, SpanKind, StubHandler, Tracer,
};

// --- Conditionally Alias the Mutex Implementation ---
#[cfg(not(feature = "tokio_support"))]
use std::sync::Mutex;
#[cfg(feature = "tokio_support")]
use tokio::sync::Mutex;

pub type ServerMap = HashMap<&'static str, Arc<dyn ServerStub>>;

/// Hosts server stubs by interface name and routes inbound calls to them.
///
/// Every dispatched call runs under a `Server` span when the inbound context
/// carries a trace.
pub struct StubEndpoint {
    servers: Arc<Mutex<ServerMap>>,
    tracer: Arc<dyn Tracer>,
}

impl Default for StubEndpoint {
    fn default() -> Self {
        Self::new(Arc::new(NoopTracer))
    }
}

impl StubEndpoint {
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self {
            servers: Arc::new(Mutex::new(HashMap::new())),
            tracer,
        }
    }

    pub async fn host(&self, server: Arc<dyn ServerStub>) -> Result<(), EndpointError> {
        let name = server.interface().name;
        self.servers
            .with_servers(|servers| match servers.entry(name) {
                Entry::Occupied(_) => Err(EndpointError::DuplicateInterface(name)),
                Entry::Vacant(entry) => {
                    tracing::debug!(interface = name, "hosting server stub");
                    entry.insert(server);
                    Ok(())
                }
            })
            .await
    }

    pub async fn server(&self, interface: &str) -> Option<Arc<dyn ServerStub>> {
        self.servers
            .with_servers(|servers| servers.get(interface).cloned())
            .await
    }

    /// Serves one call addressed by method ordinal, as it arrives off the wire.
    pub async fn dispatch(
        &self,
        ctx: &CallContext,
        interface: &str,
        ordinal: MethodOrdinal,
        args: Vec<u8>,
    ) -> Result<Vec<u8>, DispatchError> {
        let server = self.resolve(interface).await?;
        let descriptor = server.interface();
        let resolved = descriptor
            .method(ordinal)
            .and_then(|m| Some((m, server.lookup(m.name)?)));
        match resolved {
            Some((method, handler)) => self.run(ctx, descriptor, method, handler, args).await,
            None => Err(method_not_found(descriptor, format!("#{ordinal}"))),
        }
    }

    /// Serves one call addressed by method name.
    pub async fn dispatch_named(
        &self,
        ctx: &CallContext,
        interface: &str,
        method: &str,
        args: Vec<u8>,
    ) -> Result<Vec<u8>, DispatchError> {
        let server = self.resolve(interface).await?;
        let descriptor = server.interface();
        let resolved = descriptor
            .method_by_name(method)
            .and_then(|m| Some((m, server.lookup(m.name)?)));
        match resolved {
            Some((m, handler)) => self.run(ctx, descriptor, m, handler, args).await,
            None => Err(method_not_found(descriptor, method.to_string())),
        }
    }

    async fn resolve(&self, interface: &str) -> Result<Arc<dyn ServerStub>, DispatchError> {
        self.server(interface).await.ok_or_else(|| {
            tracing::debug!(interface, "call for unknown interface");
            DispatchError::UnknownInterface(interface.to_string())
        })
    }

    async fn run(
        &self,
        ctx: &CallContext,
        interface: &'static InterfaceDescriptor,
        method: &'static MethodDescriptor,
        handler: StubHandler,
        args: Vec<u8>,
    ) -> Result<Vec<u8>, DispatchError> {
        let mut span = ActiveSpan::start(
            self.tracer.as_ref(),
            ctx,
            &interface.span_name(method),
            SpanKind::Server,
        );
        let result = handler(span.child_context(ctx), args).await;
        if let Err(err) = &result {
            tracing::warn!(
                interface = interface.name,
                method = method.name,
                error = %err,
                "dispatch failed"
            );
            span.fail(err);
        }
        span.end();
        result
    }
}

fn method_not_found(interface: &InterfaceDescriptor, method: String) -> DispatchError {
    tracing::debug!(interface = interface.name, method = %method, "call for unknown method");
    DispatchError::MethodNotFound {
        interface: interface.name.to_string(),
        method,
    }
}
