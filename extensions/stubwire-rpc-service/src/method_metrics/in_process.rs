use super::{Counter, Distribution, MethodLabels, MetricsProvider};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

type Key = (&'static str, MethodLabels);

/// A metrics backend that keeps every instrument in memory.
///
/// Instruments are created under a lock when stubs are built; updates are
/// plain atomic operations. Asking for the same (name, labels) twice returns
/// the same instrument, so two stubs for one method share their counts.
#[derive(Debug, Default)]
pub struct InProcessMetrics {
    counters: RwLock<BTreeMap<Key, Arc<AtomicCounter>>>,
    distributions: RwLock<BTreeMap<Key, Arc<AtomicHistogram>>>,
}

impl InProcessMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter_value(&self, name: &str, labels: &MethodLabels) -> Option<u64> {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|((n, l), _)| *n == name && l == labels)
            .map(|(_, c)| c.value.load(Ordering::Relaxed))
    }

    pub fn distribution_snapshot(
        &self,
        name: &str,
        labels: &MethodLabels,
    ) -> Option<DistributionSnapshot> {
        self.distributions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|((n, l), _)| *n == name && l == labels)
            .map(|(_, h)| h.snapshot())
    }

    /// A point-in-time copy of every instrument, for collectors.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|((name, labels), c)| (*name, labels.clone(), c.value.load(Ordering::Relaxed)))
            .collect();
        let distributions = self
            .distributions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|((name, labels), h)| (*name, labels.clone(), h.snapshot()))
            .collect();
        MetricsSnapshot {
            counters,
            distributions,
        }
    }
}

impl MetricsProvider for InProcessMetrics {
    fn counter(&self, name: &'static str, labels: &MethodLabels) -> Arc<dyn Counter> {
        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        counters
            .entry((name, labels.clone()))
            .or_insert_with(|| Arc::new(AtomicCounter::default()))
            .clone()
    }

    fn distribution(
        &self,
        name: &'static str,
        buckets: &'static [f64],
        labels: &MethodLabels,
    ) -> Arc<dyn Distribution> {
        let mut distributions = self
            .distributions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        distributions
            .entry((name, labels.clone()))
            .or_insert_with(|| Arc::new(AtomicHistogram::new(buckets)))
            .clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, MethodLabels, u64)>,
    pub distributions: Vec<(&'static str, MethodLabels, DistributionSnapshot)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSnapshot {
    pub count: u64,
    pub sum: f64,
    pub bounds: &'static [f64],
    /// One count per bound, plus a final overflow bucket.
    pub buckets: Vec<u64>,
}

impl DistributionSnapshot {
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Default)]
struct AtomicCounter {
    value: AtomicU64,
}

impl Counter for AtomicCounter {
    fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct AtomicHistogram {
    bounds: &'static [f64],
    buckets: Box<[AtomicU64]>,
    count: AtomicU64,
    // f64 bits, updated with a CAS loop.
    sum: AtomicU64,
}

impl AtomicHistogram {
    fn new(bounds: &'static [f64]) -> Self {
        Self {
            bounds,
            buckets: (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0f64.to_bits()),
        }
    }

    fn snapshot(&self) -> DistributionSnapshot {
        DistributionSnapshot {
            count: self.count.load(Ordering::Relaxed),
            sum: f64::from_bits(self.sum.load(Ordering::Relaxed)),
            bounds: self.bounds,
            buckets: self
                .buckets
                .iter()
                .map(|b| b.load(Ordering::Relaxed))
                .collect(),
        }
    }
}

impl Distribution for AtomicHistogram {
    fn record(&self, value: f64) {
        let idx = self.bounds.partition_point(|&bound| bound < value);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let mut current = self.sum.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self.sum.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}
