use crate::{Currency, Money, Product, ProductCatalog};
use std::collections::BTreeMap;
use stubwire_rpc_service::{AppError, CallContext, StubResult};

/// A fixed product list held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Vec<Product>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// A small catalog for demos and tests.
    pub fn sample() -> Self {
        Self::new(vec![
            Product {
                id: "OLJCESPC7Z".into(),
                name: "Sunglasses".into(),
                description: "Add a modern touch to your outfits with these sleek aviator sunglasses."
                    .into(),
                picture: "/static/img/products/sunglasses.jpg".into(),
                price: Money::new("USD", 19, 990_000_000),
                categories: vec!["accessories".into()],
            },
            Product {
                id: "66VCHSJNUP".into(),
                name: "Tank Top".into(),
                description: "Perfectly cropped cotton tank, with a scooped neckline.".into(),
                picture: "/static/img/products/tank-top.jpg".into(),
                price: Money::new("USD", 18, 990_000_000),
                categories: vec!["clothing".into(), "tops".into()],
            },
            Product {
                id: "1YMWWN1N4O".into(),
                name: "Watch".into(),
                description: "This gold-tone stainless steel watch will work with most of your outfits."
                    .into(),
                picture: "/static/img/products/watch.jpg".into(),
                price: Money::new("USD", 109, 990_000_000),
                categories: vec!["accessories".into()],
            },
        ])
    }
}

#[async_trait::async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_product(&self, _ctx: &CallContext, id: &str) -> StubResult<Product> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| AppError::new(format!("no product with id \"{id}\"")).into())
    }

    async fn list_products(&self, _ctx: &CallContext) -> StubResult<Vec<Product>> {
        Ok(self.products.clone())
    }

    async fn search_products(&self, _ctx: &CallContext, query: &str) -> StubResult<Vec<Product>> {
        let query = query.to_lowercase();
        Ok(self
            .products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&query)
                    || p.description.to_lowercase().contains(&query)
            })
            .cloned()
            .collect())
    }
}

/// Converts through fixed rates, each expressed as units of that currency
/// per one unit of a common base.
#[derive(Debug, Clone)]
pub struct FixedRateCurrency {
    rates: BTreeMap<String, f64>,
}

impl FixedRateCurrency {
    pub fn new<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            rates: rates
                .into_iter()
                .map(|(code, rate)| (code.into(), rate))
                .collect(),
        }
    }

    /// Euro-based rates for demos and tests.
    pub fn sample() -> Self {
        Self::new([("EUR", 1.0), ("USD", 1.1305), ("JPY", 126.40), ("GBP", 0.85970)])
    }

    fn rate(&self, code: &str) -> StubResult<f64> {
        self.rates
            .get(code)
            .copied()
            .ok_or_else(|| AppError::new(format!("unsupported currency code \"{code}\"")).into())
    }
}

#[async_trait::async_trait]
impl Currency for FixedRateCurrency {
    async fn convert(&self, _ctx: &CallContext, from: &Money, to_code: &str) -> StubResult<Money> {
        let from_rate = self.rate(&from.currency_code)?;
        let to_rate = self.rate(to_code)?;
        let total = (from.total_nanos() as f64 / from_rate * to_rate).round();
        // `as i128` saturates, so anything past the i128 range is rejected here.
        let converted = if total.is_finite() && total.abs() < i128::MAX as f64 {
            Money::from_total_nanos(to_code, total as i128)
        } else {
            None
        };
        let converted = converted.ok_or_else(|| AppError::new("amount out of range"))?;
        tracing::debug!(from = %from.currency_code, to = to_code, "converted amount");
        Ok(converted)
    }

    async fn get_supported_currencies(&self, _ctx: &CallContext) -> StubResult<Vec<String>> {
        Ok(self.rates.keys().cloned().collect())
    }
}
