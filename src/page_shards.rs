use crate::ids::PageId;
use crate::lock_hash::LockHashCells;
use crate::selector;
use crate::shard::{MutexShards, ShardMutex};
use crate::stats::ShardOps;
use parking_lot::Mutex;
use std::sync::Arc;

/// Mutexes partitioning the page-keyed lock hash space.
///
/// A page's record, predicate and predicate-page locks are all guarded by the
/// same mutex, chosen from the page's cell in the record lock hash table.
/// This type only hands out mutexes; it never locks them itself.
pub struct PageShards<const N: usize> {
    mutexes: MutexShards<N>,
    cells: Arc<dyn LockHashCells>,
}

impl<const N: usize> PageShards<N> {
    /// Create `N` page shard mutexes over the given lock hash tables.
    pub fn new(cells: Arc<dyn LockHashCells>) -> Self {
        Self {
            mutexes: MutexShards::new(),
            cells,
        }
    }

    /// Index of the shard guarding `page_id`.
    #[inline]
    pub fn get_shard(&self, page_id: PageId) -> usize {
        selector::shard_for_page::<N>(&*self.cells, page_id)
    }

    /// The mutex guarding `page_id`'s shard.
    #[inline]
    pub fn get_mutex(&self, page_id: PageId) -> &Mutex<()> {
        self.mutexes.get_mutex(self.get_shard(page_id))
    }

    /// Mutable access to the mutex guarding `page_id`'s shard; the same
    /// mutex [`get_mutex`](Self::get_mutex) returns.
    #[inline]
    pub fn get_mutex_mut(&mut self, page_id: PageId) -> &mut Mutex<()> {
        let shard = self.get_shard(page_id);
        self.mutexes.get_mutex_mut(shard)
    }

    /// The lock hash tables page shards are computed from.
    pub fn cells(&self) -> &Arc<dyn LockHashCells> {
        &self.cells
    }

    pub(crate) fn shard_hint(&self, page_id: PageId) -> usize {
        selector::page_shard_hint::<N>(&*self.cells, page_id)
    }

    pub(crate) fn shard(&self, shard: usize) -> &ShardMutex {
        self.mutexes.get(shard)
    }

    pub(crate) fn stats(&self) -> Vec<ShardOps> {
        self.mutexes.stats()
    }
}
