use crate::config::{create_hasher, CellsConfig, Config, DEFAULT_LOCK_HASH_CELLS};
use crate::error::Error;
use crate::global::{ExclusiveGuard, GlobalLatch, ShardTier, SharedGuard};
use crate::hash::ShardHasher;
use crate::ids::{PageId, TableHandle};
use crate::lock_hash::{check_same_size, LockHashCells, LockHashGeometry};
use crate::page_shards::PageShards;
use crate::stats::LatchStats;
use crate::table_shards::TableShards;
use parking_lot::MutexGuard;
use std::sync::Arc;

/// Number of page shards and table shards used by default.
pub const SHARDS_COUNT: usize = 512;

/// The lock system's latches: one global readers-writer latch plus `N` page
/// shard mutexes and `N` table shard mutexes.
///
/// Work on one page or one table takes the global latch shared and then the
/// shard mutex; work on the whole lock system takes the global latch
/// exclusively and no shard mutex at all. Because every path takes the global
/// latch before any shard mutex, the two kinds of latch can never deadlock
/// against each other.
///
/// # Example
///
/// ```rust
/// use lockshard::{Latches, PageId, TableId};
///
/// let latches: Latches = Latches::new();
///
/// let granted = latches.with_page_shard(PageId::new(0, 7), || {
///     // touch the record lock hash cell of page 7
///     true
/// });
/// assert!(granted);
///
/// latches.with_table_shard(&TableId(12), || {
///     // touch the table-lock list of table 12
/// });
///
/// latches.with_exclusive_access(|_exclusive| {
///     // sweep the whole lock system
/// });
/// ```
pub struct Latches<const N: usize = SHARDS_COUNT> {
    global: GlobalLatch,
    page_shards: PageShards<N>,
    table_shards: TableShards<N>,
    geometry: Option<Arc<LockHashGeometry>>,
}

impl<const N: usize> Latches<N> {
    /// Create latches with defaults (ahash, 4096 lock hash cells, 64 reader
    /// slots).
    pub fn new() -> Self {
        let geometry = Arc::new(LockHashGeometry::with_cells(
            ShardHasher::default(),
            DEFAULT_LOCK_HASH_CELLS,
        ));
        Self::from_parts(GlobalLatch::new(), geometry.clone(), Some(geometry))
    }

    /// Create latches with custom config.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        if config.lock_hash_cells == 0 {
            return Err(Error::InvalidCellCount);
        }
        let global = GlobalLatch::with_reader_slots(config.reader_slots)?;

        let (cells, geometry) = match config.cells {
            CellsConfig::Geometry => {
                let geometry = Arc::new(LockHashGeometry::with_cells(
                    create_hasher(config.hash_function),
                    config.lock_hash_cells,
                ));
                let cells: Arc<dyn LockHashCells> = geometry.clone();
                (cells, Some(geometry))
            }
            CellsConfig::Custom(cells) => {
                if check_same_size(&*cells)? == 0 {
                    return Err(Error::InvalidCellCount);
                }
                (cells, None)
            }
        };

        Ok(Self::from_parts(global, cells, geometry))
    }

    fn from_parts(
        global: GlobalLatch,
        cells: Arc<dyn LockHashCells>,
        geometry: Option<Arc<LockHashGeometry>>,
    ) -> Self {
        tracing::debug!(
            shards = N,
            reader_slots = global.reader_slots(),
            "created lock-system latches"
        );
        Self {
            global,
            page_shards: PageShards::new(cells),
            table_shards: TableShards::new(),
            geometry,
        }
    }

    /// Number of page shards, and of table shards.
    pub const fn shards(&self) -> usize {
        N
    }

    /// The global latch.
    pub fn global(&self) -> &GlobalLatch {
        &self.global
    }

    /// The page shard mutexes.
    pub fn page_shards(&self) -> &PageShards<N> {
        &self.page_shards
    }

    /// The table shard mutexes.
    pub fn table_shards(&self) -> &TableShards<N> {
        &self.table_shards
    }

    /// The built-in lock hash geometry, unless the latches were configured
    /// with the lock manager's own hash tables.
    pub fn geometry(&self) -> Option<&Arc<LockHashGeometry>> {
        self.geometry.as_ref()
    }

    /// Take the global latch shared and then the mutex of `page_id`'s shard.
    ///
    /// The shard is recomputed once the global latch is held; if a resize of
    /// the lock hash tables moved the page in the meantime, the latch is
    /// released and the acquisition starts over.
    pub fn page_shard_guard(&self, page_id: PageId) -> ShardLatchGuard<'_> {
        loop {
            let hint = self.page_shards.shard_hint(page_id);
            let global = self.global.acquire_shared(hint);
            let shard = self.page_shards.get_shard(page_id);
            if shard == hint {
                let mutex = self.page_shards.shard(shard).lock();
                self.global.mark_entered(Some(ShardTier::Page));
                return ShardLatchGuard {
                    _mutex: mutex,
                    global,
                };
            }
            drop(global);
        }
    }

    /// Take the global latch shared and then the mutex of `table`'s shard.
    pub fn table_shard_guard<T: TableHandle + ?Sized>(&self, table: &T) -> ShardLatchGuard<'_> {
        let shard = TableShards::<N>::get_shard(table);
        let global = self.global.acquire_shared(shard);
        let mutex = self.table_shards.shard(shard).lock();
        self.global.mark_entered(Some(ShardTier::Table));
        ShardLatchGuard {
            _mutex: mutex,
            global,
        }
    }

    /// Take the global latch exclusively.
    pub fn exclusive_guard(&self) -> ExclusiveGuard<'_> {
        self.global.acquire_exclusive()
    }

    /// Run `f` holding `page_id`'s shard.
    ///
    /// Both latches are released before this returns, whether `f` returns
    /// normally, returns an error, or panics.
    pub fn with_page_shard<F, R>(&self, page_id: PageId, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.page_shard_guard(page_id);
        f()
    }

    /// Run `f` holding `table`'s shard.
    pub fn with_table_shard<T, F, R>(&self, table: &T, f: F) -> R
    where
        T: TableHandle + ?Sized,
        F: FnOnce() -> R,
    {
        let _guard = self.table_shard_guard(table);
        f()
    }

    /// Run `f` holding the global latch exclusively.
    ///
    /// No shard mutex is taken: while the guard passed to `f` lives, no other
    /// thread can be inside any shard.
    pub fn with_exclusive_access<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ExclusiveGuard<'_>) -> R,
    {
        let guard = self.exclusive_guard();
        f(&guard)
    }

    /// Whether the current thread may touch `page_id`'s locks: it holds the
    /// global latch exclusively, or holds it shared for this page's shard with
    /// the shard mutex locked by this thread.
    pub fn owns_page_shard(&self, page_id: PageId) -> bool {
        if self.global.owns_exclusive() {
            return true;
        }
        let shard = self.page_shards.get_shard(page_id);
        self.global.owns_shard(ShardTier::Page, shard)
    }

    /// Whether the current thread may touch `table`'s table-lock list.
    pub fn owns_table_shard<T: TableHandle + ?Sized>(&self, table: &T) -> bool {
        if self.global.owns_exclusive() {
            return true;
        }
        let shard = TableShards::<N>::get_shard(table);
        self.global.owns_shard(ShardTier::Table, shard)
    }

    /// Get latch acquisition statistics (all zeros without the `metrics`
    /// feature).
    pub fn stats(&self) -> LatchStats {
        LatchStats {
            page_shards: self.page_shards.stats(),
            table_shards: self.table_shards.stats(),
            shared_acquisitions: self.global.shared_acquisitions(),
            exclusive_acquisitions: self.global.exclusive_acquisitions(),
        }
    }
}

impl<const N: usize> Default for Latches<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> std::fmt::Debug for Latches<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latches")
            .field("shards", &N)
            .field("global", &self.global)
            .finish()
    }
}

/// Shared hold on the global latch plus the mutex of one shard.
///
/// Dropping it releases the shard mutex first and the global latch second.
#[must_use = "the latches are released as soon as the guard is dropped"]
pub struct ShardLatchGuard<'a> {
    // Declared before `global` so it is dropped first.
    _mutex: MutexGuard<'a, ()>,
    global: SharedGuard<'a>,
}

impl ShardLatchGuard<'_> {
    /// The shard this guard holds.
    pub fn shard(&self) -> usize {
        self.global.shard()
    }
}

impl Drop for ShardLatchGuard<'_> {
    fn drop(&mut self) {
        // Runs before the fields drop: the mutex goes, then the global latch.
        self.global.latch().mark_entered(None);
    }
}

impl std::fmt::Debug for ShardLatchGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardLatchGuard")
            .field("shard", &self.shard())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TableId;
    use crate::lock_hash::LockHashKind;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn page_shard_is_released_after_closure() {
        let latches = Latches::<4>::new();
        let page = PageId::new(1, 1);
        latches.with_page_shard(page, || {
            assert!(latches.owns_page_shard(page));
            assert!(latches.page_shards().get_mutex(page).is_locked());
        });
        assert!(!latches.owns_page_shard(page));
        assert!(!latches.page_shards().get_mutex(page).is_locked());
        assert_eq!(latches.global().declared_shard(), None);
    }

    #[test]
    fn table_shard_declares_the_table_shard() {
        let latches = Latches::<4>::new();
        let table = TableId(10);
        latches.with_table_shard(&table, || {
            assert_eq!(latches.global().declared_shard(), Some(2));
            assert!(latches.owns_table_shard(&table));
            assert!(!latches.owns_table_shard(&TableId(11)));
        });
    }

    #[test]
    fn errors_pass_through_and_release() {
        let latches = Latches::<4>::new();
        let table = TableId(3);
        let result: Result<(), &str> = latches.with_table_shard(&table, || Err("no such lock"));
        assert_eq!(result, Err("no such lock"));
        assert!(!latches.table_shards().get_mutex(&table).is_locked());
        assert!(!latches.global().owns_shared());
    }

    #[test]
    fn panics_release_both_latches() {
        let latches = Latches::<4>::new();
        let page = PageId::new(0, 3);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            latches.with_page_shard(page, || panic!("lock queue corrupted"));
        }));
        assert!(outcome.is_err());
        assert!(!latches.page_shards().get_mutex(page).is_locked());
        assert_eq!(latches.global().declared_shard(), None);
        // exclusive access is possible again
        latches.with_exclusive_access(|_| ());
    }

    #[test]
    fn ownership_follows_the_shard_tier() {
        let latches = Latches::<4>::new();
        let table = TableId(1);
        let shard = TableShards::<4>::get_shard(&table);
        let page = (0..)
            .map(|page_no| PageId::new(0, page_no))
            .find(|page| latches.page_shards().get_shard(*page) == shard)
            .unwrap();

        latches.with_table_shard(&table, || {
            assert!(latches.owns_table_shard(&table));
            assert!(!latches.owns_page_shard(page));
        });
        latches.with_page_shard(page, || {
            assert!(latches.owns_page_shard(page));
            assert!(!latches.owns_table_shard(&table));
        });
    }

    #[test]
    fn declaring_a_shard_alone_is_not_ownership() {
        let latches = Latches::<4>::new();
        let page = PageId::new(0, 5);
        let shard = latches.page_shards().get_shard(page);
        let _global = latches.global().acquire_shared(shard);
        assert_eq!(latches.global().declared_shard(), Some(shard));
        assert!(!latches.owns_page_shard(page));
    }

    #[test]
    fn exclusive_access_owns_every_shard() {
        let latches = Latches::<4>::new();
        latches.with_exclusive_access(|exclusive| {
            assert!(exclusive.latch().owns_exclusive());
            assert!(latches.owns_page_shard(PageId::new(9, 9)));
            assert!(latches.owns_table_shard(&TableId(1)));
        });
        assert!(!latches.owns_table_shard(&TableId(1)));
    }

    #[test]
    fn resize_under_exclusive_access() {
        let latches = Latches::<8>::new();
        let geometry = latches.geometry().unwrap().clone();
        latches
            .with_exclusive_access(|exclusive| geometry.resize(exclusive, 2))
            .unwrap();
        for kind in LockHashKind::ALL {
            assert_eq!(geometry.n_cells(kind), 2);
        }
        // with two cells only shards 0 and 1 are reachable
        for page_no in 0..64 {
            let guard = latches.page_shard_guard(PageId::new(0, page_no));
            assert!(guard.shard() < 2);
        }
    }

    #[test]
    fn resize_to_zero_cells_is_rejected() {
        let latches = Latches::<8>::new();
        let geometry = latches.geometry().unwrap().clone();
        let result = latches.with_exclusive_access(|exclusive| geometry.resize(exclusive, 0));
        assert_eq!(result, Err(Error::InvalidCellCount));
        assert_eq!(geometry.n_cells(LockHashKind::Record), DEFAULT_LOCK_HASH_CELLS);
        // page shards are still computable
        let page = PageId::new(0, 17);
        latches.with_page_shard(page, || assert!(latches.owns_page_shard(page)));
    }

    #[test]
    fn custom_cells_must_agree() {
        struct Uneven;
        impl LockHashCells for Uneven {
            fn n_cells(&self, kind: LockHashKind) -> usize {
                if kind == LockHashKind::Predicate {
                    10
                } else {
                    20
                }
            }
            fn rec_hash(&self, page_id: PageId) -> usize {
                page_id.page_no as usize % 20
            }
        }

        let result = crate::LatchesBuilder::new()
            .hash_cells(Arc::new(Uneven))
            .build::<4>();
        assert!(matches!(
            result,
            Err(Error::CellCountMismatch {
                rec: 20,
                prdt: 10,
                prdt_page: 20
            })
        ));
    }
}
