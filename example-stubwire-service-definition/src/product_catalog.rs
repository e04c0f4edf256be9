use crate::Money;
use std::sync::Arc;
use stubwire::{Decoder, Encoder, Marshal, Unmarshal};
use stubwire_rpc_service::constants::NO_SHARD_KEY;
use stubwire_rpc_service::routing::route;
use stubwire_rpc_service::{
    AnyComponent, CallContext, InterfaceDescriptor, LoadReporter, LocalStub, MethodDescriptor,
    MethodOrdinal, Registration, RegistryError, RemoteHandle, ServerStub, StubResult, Tracer,
    downcast_component, erase,
};
use stubwire_rpc_service_caller::ClientStub;
use stubwire_rpc_service_endpoint::error::EndpointError;
use stubwire_rpc_service_endpoint::{DispatchTable, serve_method, serve_routed_method};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub picture: String,
    pub price: Money,
    pub categories: Vec<String>,
}

impl Marshal for Product {
    fn marshal(&self, enc: &mut Encoder) {
        enc.string(&self.id);
        enc.string(&self.name);
        enc.string(&self.description);
        enc.string(&self.picture);
        enc.put(&self.price);
        enc.put(&self.categories);
    }
}

impl Unmarshal for Product {
    fn unmarshal(dec: &mut Decoder<'_>) -> Self {
        Self {
            id: dec.string(),
            name: dec.string(),
            description: dec.string(),
            picture: dec.string(),
            price: dec.get(),
            categories: dec.get(),
        }
    }
}

#[async_trait::async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fails with an application error when no product has `id`.
    async fn get_product(&self, ctx: &CallContext, id: &str) -> StubResult<Product>;

    async fn list_products(&self, ctx: &CallContext) -> StubResult<Vec<Product>>;

    /// Products whose name or description contains `query`, ignoring case.
    async fn search_products(&self, ctx: &CallContext, query: &str) -> StubResult<Vec<Product>>;
}

pub const GET_PRODUCT: MethodOrdinal = 0;
pub const LIST_PRODUCTS: MethodOrdinal = 1;
pub const SEARCH_PRODUCTS: MethodOrdinal = 2;

pub static PRODUCT_CATALOG: InterfaceDescriptor = InterfaceDescriptor {
    name: "shop.ProductCatalog",
    methods: &[
        MethodDescriptor::routed("get_product", GET_PRODUCT),
        MethodDescriptor::new("list_products", LIST_PRODUCTS),
        MethodDescriptor::new("search_products", SEARCH_PRODUCTS),
    ],
};

fn method(ordinal: MethodOrdinal) -> &'static MethodDescriptor {
    &PRODUCT_CATALOG.methods[ordinal as usize]
}

pub struct ProductCatalogLocalStub {
    stub: LocalStub<dyn ProductCatalog>,
}

impl ProductCatalogLocalStub {
    pub fn new(inner: Arc<dyn ProductCatalog>, tracer: Arc<dyn Tracer>) -> Self {
        Self {
            stub: LocalStub::new(&PRODUCT_CATALOG, inner, tracer),
        }
    }
}

#[async_trait::async_trait]
impl ProductCatalog for ProductCatalogLocalStub {
    async fn get_product(&self, ctx: &CallContext, id: &str) -> StubResult<Product> {
        self.stub
            .call(ctx, GET_PRODUCT, |inner, ctx| async move {
                inner.get_product(&ctx, id).await
            })
            .await
    }

    async fn list_products(&self, ctx: &CallContext) -> StubResult<Vec<Product>> {
        self.stub
            .call(ctx, LIST_PRODUCTS, |inner, ctx| async move {
                inner.list_products(&ctx).await
            })
            .await
    }

    async fn search_products(&self, ctx: &CallContext, query: &str) -> StubResult<Vec<Product>> {
        self.stub
            .call(ctx, SEARCH_PRODUCTS, |inner, ctx| async move {
                inner.search_products(&ctx, query).await
            })
            .await
    }
}

pub struct ProductCatalogClientStub {
    stub: ClientStub,
}

impl ProductCatalogClientStub {
    pub fn new(handle: RemoteHandle, caller: &str) -> Self {
        Self {
            stub: ClientStub::new(handle, &PRODUCT_CATALOG, caller),
        }
    }

    pub fn stub(&self) -> &ClientStub {
        &self.stub
    }
}

#[async_trait::async_trait]
impl ProductCatalog for ProductCatalogClientStub {
    async fn get_product(&self, ctx: &CallContext, id: &str) -> StubResult<Product> {
        self.stub.call(ctx, GET_PRODUCT, route(id), &(id,)).await
    }

    async fn list_products(&self, ctx: &CallContext) -> StubResult<Vec<Product>> {
        self.stub.call(ctx, LIST_PRODUCTS, NO_SHARD_KEY, &()).await
    }

    async fn search_products(&self, ctx: &CallContext, query: &str) -> StubResult<Vec<Product>> {
        self.stub
            .call(ctx, SEARCH_PRODUCTS, NO_SHARD_KEY, &(query,))
            .await
    }
}

/// Builds the dispatch table serving `implementation`. `get_product` is
/// routed by product id.
pub fn product_catalog_server(
    implementation: Arc<dyn ProductCatalog>,
    load_reporter: LoadReporter,
) -> Result<Arc<dyn ServerStub>, EndpointError> {
    let get = implementation.clone();
    let list = implementation.clone();
    let search = implementation;

    DispatchTable::new(&PRODUCT_CATALOG)
        .with(
            "get_product",
            serve_routed_method(
                method(GET_PRODUCT),
                |(id,): &(String,)| route(id),
                load_reporter,
                move |ctx: CallContext, (id,): (String,)| {
                    let get = get.clone();
                    async move { get.get_product(&ctx, &id).await }
                },
            ),
        )?
        .with(
            "list_products",
            serve_method(method(LIST_PRODUCTS), move |ctx: CallContext, (): ()| {
                let list = list.clone();
                async move { list.list_products(&ctx).await }
            }),
        )?
        .with(
            "search_products",
            serve_method(
                method(SEARCH_PRODUCTS),
                move |ctx: CallContext, (query,): (String,)| {
                    let search = search.clone();
                    async move { search.search_products(&ctx, &query).await }
                },
            ),
        )?
        .build()
}

pub fn product_catalog_registration() -> Registration {
    Registration::new::<dyn ProductCatalog>(&PRODUCT_CATALOG, local_stub, client_stub, server_stub)
}

fn local_stub(
    component: AnyComponent,
    tracer: Arc<dyn Tracer>,
) -> Result<AnyComponent, RegistryError> {
    let inner = downcast_component::<dyn ProductCatalog>(&component)?;
    let stub: Arc<dyn ProductCatalog> = Arc::new(ProductCatalogLocalStub::new(inner, tracer));
    Ok(erase(stub))
}

fn client_stub(handle: RemoteHandle, caller: &str) -> AnyComponent {
    let stub: Arc<dyn ProductCatalog> = Arc::new(ProductCatalogClientStub::new(handle, caller));
    erase(stub)
}

fn server_stub(
    component: AnyComponent,
    load_reporter: LoadReporter,
) -> Result<Arc<dyn ServerStub>, RegistryError> {
    let inner = downcast_component::<dyn ProductCatalog>(&component)?;
    Ok(product_catalog_server(inner, load_reporter)?)
}
