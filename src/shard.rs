use crate::selector::ShardCount;
use crate::stats::{ShardOps, ShardStats};
use crossbeam::utils::CachePadded;
use parking_lot::{Mutex, MutexGuard};

/// A single shard mutex with its statistics.
pub(crate) struct ShardMutex {
    mutex: Mutex<()>,
    stats: ShardStats,
}

impl ShardMutex {
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            stats: ShardStats::new(),
        }
    }

    /// Lock the mutex, recording whether the caller had to wait for it.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        if let Some(guard) = self.mutex.try_lock() {
            self.stats.record_acquisition(false);
            return guard;
        }

        #[cfg(feature = "lock-timing")]
        let started = std::time::Instant::now();
        let guard = self.mutex.lock();
        #[cfg(feature = "lock-timing")]
        self.stats
            .record_lock_wait(started.elapsed().as_nanos().min(u64::MAX as u128) as u64);
        self.stats.record_acquisition(true);
        guard
    }
}

/// A fixed array of `N` independent shard mutexes.
///
/// Each mutex sits on its own cache line so that threads working on
/// neighbouring shards don't share one. The array is never resized.
pub(crate) struct MutexShards<const N: usize> {
    shards: Box<[CachePadded<ShardMutex>]>,
}

impl<const N: usize> MutexShards<N> {
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = ShardCount::<N>::NONZERO;

        let shards: Vec<_> = (0..N).map(|_| CachePadded::new(ShardMutex::new())).collect();
        Self {
            shards: shards.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn get(&self, shard: usize) -> &ShardMutex {
        &self.shards[shard]
    }

    #[inline]
    pub fn get_mutex(&self, shard: usize) -> &Mutex<()> {
        &self.shards[shard].mutex
    }

    #[inline]
    pub fn get_mutex_mut(&mut self, shard: usize) -> &mut Mutex<()> {
        &mut self.shards[shard].mutex
    }

    pub fn stats(&self) -> Vec<ShardOps> {
        self.shards.iter().map(|s| s.stats.snapshot()).collect()
    }
}

impl<const N: usize> Default for MutexShards<N> {
    fn default() -> Self {
        Self::new()
    }
}
