use crate::tracing_adapter::TraceContext;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Per-call state carried from the caller through the stub, the transport and
/// into the remote implementation.
///
/// The stub layer never interprets the deadline or the cancellation flag; it
/// only forwards them. Clones share the same cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    trace: Option<TraceContext>,
    deadline: Option<Instant>,
    cancellation: Cancellation,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Shares an existing cancellation flag, e.g. one owned by a request scope.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// A copy of this context whose trace is replaced by `trace`.
    ///
    /// Used by stubs to hand the span they opened down to the next hop.
    pub fn child(&self, trace: Option<TraceContext>) -> Self {
        Self {
            trace,
            deadline: self.deadline,
            cancellation: self.cancellation.clone(),
        }
    }

    /// The trace to parent new spans on, if one is present and valid.
    pub fn parent_trace(&self) -> Option<TraceContext> {
        self.trace.filter(TraceContext::is_valid)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `Some(Duration::ZERO)` once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fails with `Interrupted` when cancelled and `TimedOut` when the deadline
    /// has passed.
    pub fn check(&self) -> io::Result<()> {
        if self.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "call cancelled"));
        }
        if self.remaining() == Some(Duration::ZERO) {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "call deadline exceeded",
            ));
        }
        Ok(())
    }
}

/// A shared, one-way cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    inner: Arc<CancellationInner>,
}

#[derive(Debug, Default)]
struct CancellationInner {
    cancelled: AtomicBool,
    wakers: Mutex<Vec<Waker>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let wakers = std::mem::take(
            &mut *self
                .inner
                .wakers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for waker in wakers {
            waker.wake();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once [`Cancellation::cancel`] has been called.
    pub fn cancelled(&self) -> Cancelled {
        Cancelled {
            inner: self.inner.clone(),
        }
    }
}

/// Future returned by [`Cancellation::cancelled`].
#[derive(Debug)]
pub struct Cancelled {
    inner: Arc<CancellationInner>,
}

impl Future for Cancelled {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return Poll::Ready(());
        }
        let mut wakers = self
            .inner
            .wakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Re-check under the lock so a concurrent cancel cannot slip between
        // the load above and registering the waker.
        if self.inner.cancelled.load(Ordering::Acquire) {
            return Poll::Ready(());
        }
        if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
            wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
