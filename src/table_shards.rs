use crate::ids::TableHandle;
use crate::selector;
use crate::shard::{MutexShards, ShardMutex};
use crate::stats::ShardOps;
use parking_lot::Mutex;

/// Mutexes partitioning the table-lock lists by table id.
pub struct TableShards<const N: usize> {
    mutexes: MutexShards<N>,
}

impl<const N: usize> TableShards<N> {
    /// Create `N` table shard mutexes.
    pub fn new() -> Self {
        Self {
            mutexes: MutexShards::new(),
        }
    }

    /// Index of the shard guarding `table`.
    #[inline]
    pub fn get_shard<T: TableHandle + ?Sized>(table: &T) -> usize {
        selector::shard_for_table::<N, T>(table)
    }

    /// The mutex guarding `table`'s shard.
    #[inline]
    pub fn get_mutex<T: TableHandle + ?Sized>(&self, table: &T) -> &Mutex<()> {
        self.mutexes.get_mutex(Self::get_shard(table))
    }

    /// Mutable access to the mutex guarding `table`'s shard; the same mutex
    /// [`get_mutex`](Self::get_mutex) returns.
    #[inline]
    pub fn get_mutex_mut<T: TableHandle + ?Sized>(&mut self, table: &T) -> &mut Mutex<()> {
        self.mutexes.get_mutex_mut(Self::get_shard(table))
    }

    pub(crate) fn shard(&self, shard: usize) -> &ShardMutex {
        self.mutexes.get(shard)
    }

    pub(crate) fn stats(&self) -> Vec<ShardOps> {
        self.mutexes.stats()
    }
}

impl<const N: usize> Default for TableShards<N> {
    fn default() -> Self {
        Self::new()
    }
}
