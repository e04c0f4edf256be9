//! Fault boundaries.
//!
//! Stubs run codec and implementation code inside these so that a panic in a
//! `Marshal` impl, a decoder misuse, or a buggy method body becomes an error
//! for the one call instead of taking down the task.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Runs `f`, converting a panic into its message.
pub fn catch_fault<T>(site: &'static str, f: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| recovered(site, payload))
}

/// Polls `fut` to completion, converting a panic at any poll into its message.
pub async fn catch_fault_async<F: Future>(site: &'static str, fut: F) -> Result<F::Output, String> {
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| recovered(site, payload))
}

/// Extracts the message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn recovered(site: &'static str, payload: Box<dyn Any + Send>) -> String {
    let message = panic_message(payload.as_ref());
    tracing::warn!(site, fault = %message, "recovered fault in stub");
    message
}
