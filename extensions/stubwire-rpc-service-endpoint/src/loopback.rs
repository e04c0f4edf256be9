use crate::StubEndpoint;
use futures::future::{Either, select};
use std::io;
use std::pin::pin;
use std::sync::Arc;
use stubwire_rpc_service::{CallContext, MethodOrdinal, ShardKey, StubTransport};

/// A transport that hands calls straight to a [`StubEndpoint`] in the same
/// process, for co-located components and tests.
///
/// Arguments and replies still go through the full encode/decode path, so a
/// loopback call behaves like a remote one minus the network. The shard key
/// is ignored: there is only one replica.
#[derive(Clone)]
pub struct LoopbackTransport {
    endpoint: Arc<StubEndpoint>,
}

impl LoopbackTransport {
    pub fn new(endpoint: Arc<StubEndpoint>) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Arc<StubEndpoint> {
        &self.endpoint
    }

    async fn dispatch_until_cancelled(
        &self,
        ctx: &CallContext,
        interface: &'static str,
        ordinal: MethodOrdinal,
        args: Vec<u8>,
    ) -> io::Result<Vec<u8>> {
        let dispatch = pin!(self.endpoint.dispatch(ctx, interface, ordinal, args));
        match select(dispatch, ctx.cancellation().cancelled()).await {
            Either::Left((reply, _)) => reply.map_err(io::Error::from),
            Either::Right(_) => Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "call cancelled",
            )),
        }
    }
}

#[async_trait::async_trait]
impl StubTransport for LoopbackTransport {
    async fn invoke(
        &self,
        ctx: &CallContext,
        interface: &'static str,
        ordinal: MethodOrdinal,
        args: Vec<u8>,
        _shard_key: ShardKey,
    ) -> io::Result<Vec<u8>> {
        ctx.check()?;

        #[cfg(feature = "tokio_support")]
        if let Some(remaining) = ctx.remaining() {
            return tokio::time::timeout(
                remaining,
                self.dispatch_until_cancelled(ctx, interface, ordinal, args),
            )
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "call deadline exceeded"))?;
        }

        self.dispatch_until_cancelled(ctx, interface, ordinal, args)
            .await
    }
}
