mod dispatch_table;
pub use dispatch_table::*;

mod endpoint;
pub use endpoint::*;

pub mod error;

mod loopback;
pub use loopback::*;

mod serve;
pub use serve::*;

mod with_servers_trait;
pub use with_servers_trait::*;
