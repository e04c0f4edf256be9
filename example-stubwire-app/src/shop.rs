use example_stubwire_service_definition::{
    Currency, FixedRateCurrency, InMemoryCatalog, ProductCatalog, registrations,
};
use std::error::Error;
use std::sync::Arc;
use stubwire_rpc_service::{
    InProcessMetrics, LoadReporter, RuntimeContext, ShardKey, Tracer, ignore_load,
};
use stubwire_rpc_service_endpoint::{LoopbackTransport, StubEndpoint};

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Both sample services hosted behind one endpoint, plus the client stubs a
/// frontend and a checkout component would use to reach them.
pub struct Shop {
    pub runtime: RuntimeContext,
    pub metrics: Arc<InProcessMetrics>,
    pub endpoint: Arc<StubEndpoint>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub currency: Arc<dyn Currency>,
}

impl Shop {
    pub async fn start(tracer: Arc<dyn Tracer>) -> Result<Self, BoxError> {
        let metrics = Arc::new(InProcessMetrics::new());
        let mut builder = RuntimeContext::builder()
            .tracer(tracer.clone())
            .metrics(metrics.clone());
        for registration in registrations() {
            builder = builder.register(registration)?;
        }
        let runtime = builder.build();

        let endpoint = Arc::new(StubEndpoint::new(tracer));
        endpoint
            .host(runtime.server_stub::<dyn ProductCatalog>(
                Arc::new(InMemoryCatalog::sample()),
                log_load(),
            )?)
            .await?;
        endpoint
            .host(
                runtime
                    .server_stub::<dyn Currency>(Arc::new(FixedRateCurrency::sample()), ignore_load())?,
            )
            .await?;

        let transport = Arc::new(LoopbackTransport::new(endpoint.clone()));
        let catalog = runtime.client_stub::<dyn ProductCatalog>(transport.clone(), "frontend")?;
        let currency = runtime.client_stub::<dyn Currency>(transport, "checkout")?;

        tracing::info!(interfaces = runtime.registry().len(), "shop started");
        Ok(Self {
            runtime,
            metrics,
            endpoint,
            catalog,
            currency,
        })
    }
}

fn log_load() -> LoadReporter {
    Arc::new(|shard: ShardKey, load: f64| {
        tracing::trace!(shard, load, "routed call served");
    })
}
