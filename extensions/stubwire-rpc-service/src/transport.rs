use crate::{CallContext, MethodOrdinal};
use std::io;
use std::sync::Arc;

/// Opaque routing hint forwarded to the transport; `0` means no preference.
pub type ShardKey = u64;

/// Moves encoded arguments to wherever the interface is served and brings the
/// reply bytes back.
///
/// Implementations must return promptly with `Interrupted` once the context is
/// cancelled and with `TimedOut` once its deadline passes.
#[async_trait::async_trait]
pub trait StubTransport: Send + Sync {
    async fn invoke(
        &self,
        ctx: &CallContext,
        interface: &'static str,
        ordinal: MethodOrdinal,
        args: Vec<u8>,
        shard_key: ShardKey,
    ) -> io::Result<Vec<u8>>;
}

#[async_trait::async_trait]
impl<T: StubTransport + ?Sized> StubTransport for Arc<T> {
    async fn invoke(
        &self,
        ctx: &CallContext,
        interface: &'static str,
        ordinal: MethodOrdinal,
        args: Vec<u8>,
        shard_key: ShardKey,
    ) -> io::Result<Vec<u8>> {
        (**self)
            .invoke(ctx, interface, ordinal, args, shard_key)
            .await
    }
}
