use crate::tracing_adapter::NoopTracer;
use crate::{
    InProcessMetrics, LoadReporter, MetricsProvider, Registration, RegistryError, ServerStub,
    StubRegistry, StubTransport, Tracer, downcast_component, erase,
};
use std::fmt;
use std::sync::Arc;

/// What a client stub needs to reach a remote component.
#[derive(Clone)]
pub struct RemoteHandle {
    pub transport: Arc<dyn StubTransport>,
    pub tracer: Arc<dyn Tracer>,
    pub metrics: Arc<dyn MetricsProvider>,
}

impl fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHandle").finish_non_exhaustive()
    }
}

/// Process-wide stub state: the registry plus the tracing and metrics
/// backends every stub built through it shares.
pub struct RuntimeContext {
    registry: StubRegistry,
    tracer: Arc<dyn Tracer>,
    metrics: Arc<dyn MetricsProvider>,
}

impl RuntimeContext {
    pub fn builder() -> RuntimeContextBuilder {
        RuntimeContextBuilder::default()
    }

    pub fn registry(&self) -> &StubRegistry {
        &self.registry
    }

    pub fn tracer(&self) -> &Arc<dyn Tracer> {
        &self.tracer
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsProvider> {
        &self.metrics
    }

    pub fn remote_handle(&self, transport: Arc<dyn StubTransport>) -> RemoteHandle {
        RemoteHandle {
            transport,
            tracer: self.tracer.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Wraps an in-process implementation of `I` in its local stub.
    pub fn local_stub<I: ?Sized + Send + Sync + 'static>(
        &self,
        implementation: Arc<I>,
    ) -> Result<Arc<I>, RegistryError> {
        let registration = self.registry.find_for::<I>()?;
        let stub = (registration.local_stub_fn)(erase(implementation), self.tracer.clone())?;
        downcast_component::<I>(&stub)
    }

    /// A client stub for `I` that calls through `transport` on behalf of
    /// `caller`.
    pub fn client_stub<I: ?Sized + Send + Sync + 'static>(
        &self,
        transport: Arc<dyn StubTransport>,
        caller: &str,
    ) -> Result<Arc<I>, RegistryError> {
        let registration = self.registry.find_for::<I>()?;
        let stub = (registration.client_stub_fn)(self.remote_handle(transport), caller);
        downcast_component::<I>(&stub)
    }

    /// The server stub dispatching inbound calls to `implementation`.
    pub fn server_stub<I: ?Sized + Send + Sync + 'static>(
        &self,
        implementation: Arc<I>,
        load_reporter: LoadReporter,
    ) -> Result<Arc<dyn ServerStub>, RegistryError> {
        let registration = self.registry.find_for::<I>()?;
        (registration.server_stub_fn)(erase(implementation), load_reporter)
    }
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct RuntimeContextBuilder {
    registry: StubRegistry,
    tracer: Option<Arc<dyn Tracer>>,
    metrics: Option<Arc<dyn MetricsProvider>>,
}

impl RuntimeContextBuilder {
    pub fn register(mut self, registration: Registration) -> Result<Self, RegistryError> {
        self.registry.register(registration)?;
        Ok(self)
    }

    /// Defaults to [`NoopTracer`].
    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Defaults to a fresh [`InProcessMetrics`].
    pub fn metrics(mut self, metrics: Arc<dyn MetricsProvider>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> RuntimeContext {
        RuntimeContext {
            registry: self.registry,
            tracer: self.tracer.unwrap_or_else(|| Arc::new(NoopTracer)),
            metrics: self
                .metrics
                .unwrap_or_else(|| Arc::new(InProcessMetrics::new())),
        }
    }
}
