use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};

/// A simple process-wide counter which is initialized at 1 so that `0` stays
/// free to mean "unset".
static GLOBAL_ID_COUNTER: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(1));

/// Returns a process-unique, non-zero identifier.
#[inline]
pub fn increment_u64_id() -> u64 {
    GLOBAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}
