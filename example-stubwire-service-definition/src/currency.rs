use crate::Money;
use std::sync::Arc;
use stubwire_rpc_service::constants::NO_SHARD_KEY;
use stubwire_rpc_service::{
    AnyComponent, CallContext, InterfaceDescriptor, LoadReporter, LocalStub, MethodDescriptor,
    MethodOrdinal, Registration, RegistryError, RemoteHandle, ServerStub, StubResult, Tracer,
    downcast_component, erase,
};
use stubwire_rpc_service_caller::ClientStub;
use stubwire_rpc_service_endpoint::error::EndpointError;
use stubwire_rpc_service_endpoint::{DispatchTable, serve_method};

#[async_trait::async_trait]
pub trait Currency: Send + Sync {
    /// Converts `from` into `to_code`. Unknown codes are an application error.
    async fn convert(&self, ctx: &CallContext, from: &Money, to_code: &str) -> StubResult<Money>;

    async fn get_supported_currencies(&self, ctx: &CallContext) -> StubResult<Vec<String>>;
}

pub const CONVERT: MethodOrdinal = 0;
pub const GET_SUPPORTED_CURRENCIES: MethodOrdinal = 1;

pub static CURRENCY: InterfaceDescriptor = InterfaceDescriptor {
    name: "shop.Currency",
    methods: &[
        MethodDescriptor::new("convert", CONVERT),
        MethodDescriptor::new("get_supported_currencies", GET_SUPPORTED_CURRENCIES),
    ],
};

pub struct CurrencyLocalStub {
    stub: LocalStub<dyn Currency>,
}

impl CurrencyLocalStub {
    pub fn new(inner: Arc<dyn Currency>, tracer: Arc<dyn Tracer>) -> Self {
        Self {
            stub: LocalStub::new(&CURRENCY, inner, tracer),
        }
    }
}

#[async_trait::async_trait]
impl Currency for CurrencyLocalStub {
    async fn convert(&self, ctx: &CallContext, from: &Money, to_code: &str) -> StubResult<Money> {
        self.stub
            .call(ctx, CONVERT, |inner, ctx| async move {
                inner.convert(&ctx, from, to_code).await
            })
            .await
    }

    async fn get_supported_currencies(&self, ctx: &CallContext) -> StubResult<Vec<String>> {
        self.stub
            .call(ctx, GET_SUPPORTED_CURRENCIES, |inner, ctx| async move {
                inner.get_supported_currencies(&ctx).await
            })
            .await
    }
}

pub struct CurrencyClientStub {
    stub: ClientStub,
}

impl CurrencyClientStub {
    pub fn new(handle: RemoteHandle, caller: &str) -> Self {
        Self {
            stub: ClientStub::new(handle, &CURRENCY, caller),
        }
    }
}

#[async_trait::async_trait]
impl Currency for CurrencyClientStub {
    async fn convert(&self, ctx: &CallContext, from: &Money, to_code: &str) -> StubResult<Money> {
        self.stub
            .call(ctx, CONVERT, NO_SHARD_KEY, &(from, to_code))
            .await
    }

    async fn get_supported_currencies(&self, ctx: &CallContext) -> StubResult<Vec<String>> {
        self.stub
            .call(ctx, GET_SUPPORTED_CURRENCIES, NO_SHARD_KEY, &())
            .await
    }
}

pub fn currency_server(implementation: Arc<dyn Currency>) -> Result<Arc<dyn ServerStub>, EndpointError> {
    let convert = implementation.clone();
    let supported = implementation;

    DispatchTable::new(&CURRENCY)
        .with(
            "convert",
            serve_method(
                &CURRENCY.methods[CONVERT as usize],
                move |ctx: CallContext, (from, to_code): (Money, String)| {
                    let convert = convert.clone();
                    async move { convert.convert(&ctx, &from, &to_code).await }
                },
            ),
        )?
        .with(
            "get_supported_currencies",
            serve_method(
                &CURRENCY.methods[GET_SUPPORTED_CURRENCIES as usize],
                move |ctx: CallContext, (): ()| {
                    let supported = supported.clone();
                    async move { supported.get_supported_currencies(&ctx).await }
                },
            ),
        )?
        .build()
}

pub fn currency_registration() -> Registration {
    Registration::new::<dyn Currency>(&CURRENCY, local_stub, client_stub, server_stub)
}

fn local_stub(
    component: AnyComponent,
    tracer: Arc<dyn Tracer>,
) -> Result<AnyComponent, RegistryError> {
    let inner = downcast_component::<dyn Currency>(&component)?;
    let stub: Arc<dyn Currency> = Arc::new(CurrencyLocalStub::new(inner, tracer));
    Ok(erase(stub))
}

fn client_stub(handle: RemoteHandle, caller: &str) -> AnyComponent {
    let stub: Arc<dyn Currency> = Arc::new(CurrencyClientStub::new(handle, caller));
    erase(stub)
}

// Currency has no routed methods, so there is no load to report.
fn server_stub(
    component: AnyComponent,
    _load_reporter: LoadReporter,
) -> Result<Arc<dyn ServerStub>, RegistryError> {
    let inner = downcast_component::<dyn Currency>(&component)?;
    Ok(currency_server(inner)?)
}
