//! Statistics and diagnostics types.

#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-shard mutex statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardOps {
    /// Number of times the shard mutex was acquired (0 when metrics disabled).
    pub acquisitions: u64,
    /// Acquisitions that found the mutex already held (0 when metrics disabled).
    pub contended: u64,
    /// Cumulative lock wait time in nanoseconds (0 when lock-timing disabled).
    pub lock_wait_nanos: u64,
}

/// Thread-safe statistics tracker for a single shard mutex.
#[cfg(feature = "metrics")]
pub(crate) struct ShardStats {
    acquisitions: AtomicU64,
    contended: AtomicU64,
    #[cfg(feature = "lock-timing")]
    lock_wait_nanos: AtomicU64,
}

#[cfg(feature = "metrics")]
impl ShardStats {
    pub fn new() -> Self {
        Self {
            acquisitions: AtomicU64::new(0),
            contended: AtomicU64::new(0),
            #[cfg(feature = "lock-timing")]
            lock_wait_nanos: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_acquisition(&self, contended: bool) {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        if contended {
            self.contended.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[cfg(feature = "lock-timing")]
    #[inline]
    pub fn record_lock_wait(&self, nanos: u64) {
        self.lock_wait_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ShardOps {
        ShardOps {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            #[cfg(feature = "lock-timing")]
            lock_wait_nanos: self.lock_wait_nanos.load(Ordering::Relaxed),
            #[cfg(not(feature = "lock-timing"))]
            lock_wait_nanos: 0,
        }
    }
}

/// Zero-sized placeholder when metrics are disabled.
#[cfg(not(feature = "metrics"))]
pub(crate) struct ShardStats;

#[cfg(not(feature = "metrics"))]
impl ShardStats {
    pub fn new() -> Self {
        ShardStats
    }

    #[inline]
    pub fn record_acquisition(&self, _contended: bool) {}

    #[cfg(feature = "lock-timing")]
    #[inline]
    pub fn record_lock_wait(&self, _nanos: u64) {}

    pub fn snapshot(&self) -> ShardOps {
        ShardOps::default()
    }
}

impl Default for ShardStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Acquisition counters for the global latch.
#[cfg(feature = "metrics")]
pub(crate) struct GlobalStats {
    shared: AtomicU64,
    exclusive: AtomicU64,
}

#[cfg(feature = "metrics")]
impl GlobalStats {
    pub fn new() -> Self {
        Self {
            shared: AtomicU64::new(0),
            exclusive: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_shared(&self) {
        self.shared.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_exclusive(&self) {
        self.exclusive.fetch_add(1, Ordering::Relaxed);
    }

    pub fn shared(&self) -> u64 {
        self.shared.load(Ordering::Relaxed)
    }

    pub fn exclusive(&self) -> u64 {
        self.exclusive.load(Ordering::Relaxed)
    }
}

/// Zero-sized placeholder when metrics are disabled.
#[cfg(not(feature = "metrics"))]
pub(crate) struct GlobalStats;

#[cfg(not(feature = "metrics"))]
impl GlobalStats {
    pub fn new() -> Self {
        GlobalStats
    }

    #[inline]
    pub fn record_shared(&self) {}

    #[inline]
    pub fn record_exclusive(&self) {}

    pub fn shared(&self) -> u64 {
        0
    }

    pub fn exclusive(&self) -> u64 {
        0
    }
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate statistics for a [`Latches`](crate::Latches) instance.
#[derive(Debug, Clone)]
pub struct LatchStats {
    /// Per-shard statistics of the page shard mutexes.
    pub page_shards: Vec<ShardOps>,
    /// Per-shard statistics of the table shard mutexes.
    pub table_shards: Vec<ShardOps>,
    /// Shared acquisitions of the global latch (0 when metrics disabled).
    pub shared_acquisitions: u64,
    /// Exclusive acquisitions of the global latch (0 when metrics disabled).
    pub exclusive_acquisitions: u64,
}

impl LatchStats {
    /// Total shard mutex acquisitions over page and table shards.
    pub fn shard_acquisitions(&self) -> u64 {
        self.page_shards
            .iter()
            .chain(self.table_shards.iter())
            .map(|ops| ops.acquisitions)
            .sum()
    }

    /// Fraction of shard mutex acquisitions that had to wait, or 0.0 if there
    /// were none.
    pub fn contention_ratio(&self) -> f64 {
        let total = self.shard_acquisitions();
        if total == 0 {
            return 0.0;
        }
        let contended: u64 = self
            .page_shards
            .iter()
            .chain(self.table_shards.iter())
            .map(|ops| ops.contended)
            .sum();
        contended as f64 / total as f64
    }
}
