use crate::endpoint::ServerMap;
use std::sync::PoisonError;

/// A generic, asynchronous way to reach the map of hosted server stubs
/// behind whichever mutex the build uses.
///
/// With `tokio_support` the map sits behind `tokio::sync::Mutex`; otherwise
/// behind the standard library's blocking mutex, which is never held across
/// an `.await`.
#[async_trait::async_trait]
pub trait WithServers: Send + Sync {
    /// Executes a closure with exclusive access to the server map.
    async fn with_servers<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ServerMap) -> R + Send,
        R: Send;
}

#[cfg(feature = "tokio_support")]
#[async_trait::async_trait]
impl WithServers for tokio::sync::Mutex<ServerMap> {
    async fn with_servers<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ServerMap) -> R + Send,
        R: Send,
    {
        let mut guard = self.lock().await;
        f(&mut guard)
    }
}

#[async_trait::async_trait]
impl WithServers for std::sync::Mutex<ServerMap> {
    async fn with_servers<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ServerMap) -> R + Send,
        R: Send,
    {
        let mut guard = self.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
