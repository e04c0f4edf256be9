use example_stubwire_app::{BoxError, Shop};
use example_stubwire_service_definition::{Currency, ProductCatalog};
use std::sync::Arc;
use std::time::Duration;
use stubwire_rpc_service::constants::{METHOD_COUNT, METHOD_ERROR_COUNT, METHOD_LATENCY_MICROS};
use stubwire_rpc_service::tracing_adapter::TracingTracer;
use stubwire_rpc_service::{CallContext, TraceContext};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let shop = Shop::start(Arc::new(TracingTracer)).await?;

    // One traced request, as a frontend would issue it.
    let ctx = CallContext::new()
        .with_trace(TraceContext::new_root())
        .with_timeout(Duration::from_secs(5));

    for product in shop.catalog.list_products(&ctx).await? {
        let price = shop.currency.convert(&ctx, &product.price, "EUR").await?;
        tracing::info!(
            id = %product.id,
            name = %product.name,
            price = %format!("{}.{:02} {}", price.units, price.nanos / 10_000_000, price.currency_code),
            "product"
        );
    }

    let hits = shop.catalog.search_products(&ctx, "outfits").await?;
    tracing::info!(query = "outfits", hits = hits.len(), "search");

    if let Err(err) = shop.catalog.get_product(&ctx, "NOPE").await {
        tracing::warn!(error = %err, remote = err.is_remote_call_failure(), "lookup failed");
    }

    let snapshot = shop.metrics.snapshot();
    for (name, labels, value) in &snapshot.counters {
        if *value > 0 && (*name == METHOD_COUNT || *name == METHOD_ERROR_COUNT) {
            tracing::info!(
                metric = name,
                caller = %labels.caller,
                component = %labels.component,
                method = %labels.method,
                value,
            );
        }
    }
    for (name, labels, distribution) in &snapshot.distributions {
        if *name == METHOD_LATENCY_MICROS {
            if let Some(mean) = distribution.mean() {
                tracing::info!(
                    component = %labels.component,
                    method = %labels.method,
                    calls = distribution.count,
                    mean_micros = mean,
                    "latency"
                );
            }
        }
    }

    Ok(())
}
