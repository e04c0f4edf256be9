mod currency;
mod in_memory;
mod money;
mod product_catalog;

pub use currency::*;
pub use in_memory::*;
pub use money::*;
pub use product_catalog::*;

/// Every sample interface, ready for [`stubwire_rpc_service::RuntimeContextBuilder::register`].
pub fn registrations() -> [stubwire_rpc_service::Registration; 2] {
    [product_catalog_registration(), currency_registration()]
}
