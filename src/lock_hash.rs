//! The lock hash tables' side of page shard selection.
//!
//! Record locks, predicate locks and predicate-page locks live in three hash
//! tables owned by the lock manager. This crate never touches their contents;
//! it only needs to know how many cells they have and which cell a page hashes
//! to, so it can place the page in the right shard.

use crate::global::ExclusiveGuard;
use crate::hash::ShardHasher;
use crate::ids::PageId;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The three lock hash tables a page can have locks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockHashKind {
    /// Record locks.
    Record,
    /// Predicate locks.
    Predicate,
    /// Predicate-page locks.
    PredicatePage,
}

impl LockHashKind {
    /// All three tables.
    pub const ALL: [LockHashKind; 3] = [
        LockHashKind::Record,
        LockHashKind::Predicate,
        LockHashKind::PredicatePage,
    ];
}

/// Cell-count and hashing queries answered by the lock hash tables.
///
/// Page shard selection always goes through [`rec_hash`](Self::rec_hash), even
/// for predicate locks. That is only sound while all three tables have the
/// same number of cells, which implementors must maintain.
pub trait LockHashCells: Send + Sync {
    /// Number of cells in the given lock hash table.
    fn n_cells(&self, kind: LockHashKind) -> usize;

    /// Cell of the record lock hash table that `page_id` hashes to.
    fn rec_hash(&self, page_id: PageId) -> usize;
}

/// Built-in [`LockHashCells`] that mirrors the size of the lock manager's
/// hash tables and folds page ids with a [`ShardHasher`].
#[derive(Debug)]
pub struct LockHashGeometry {
    hasher: ShardHasher,
    rec_cells: AtomicUsize,
    prdt_cells: AtomicUsize,
    prdt_page_cells: AtomicUsize,
}

impl LockHashGeometry {
    /// Geometry where all three tables have `n_cells` cells.
    pub fn new(hasher: ShardHasher, n_cells: usize) -> Result<Self, crate::Error> {
        if n_cells == 0 {
            return Err(crate::Error::InvalidCellCount);
        }
        Ok(Self::with_cells(hasher, n_cells))
    }

    pub(crate) fn with_cells(hasher: ShardHasher, n_cells: usize) -> Self {
        Self {
            hasher,
            rec_cells: AtomicUsize::new(n_cells),
            prdt_cells: AtomicUsize::new(n_cells),
            prdt_page_cells: AtomicUsize::new(n_cells),
        }
    }

    /// Resize all three tables to `n_cells` cells.
    ///
    /// Pages move between shards when the cell count changes, so this is only
    /// allowed while the global latch is held exclusively. A count of zero is
    /// rejected and leaves the geometry unchanged.
    pub fn resize(
        &self,
        exclusive: &ExclusiveGuard<'_>,
        n_cells: usize,
    ) -> Result<(), crate::Error> {
        if n_cells == 0 {
            return Err(crate::Error::InvalidCellCount);
        }
        debug_assert!(exclusive.latch().owns_exclusive());
        // Ordered by the global latch: readers look at the counts only while
        // holding it shared.
        self.rec_cells.store(n_cells, Ordering::Relaxed);
        self.prdt_cells.store(n_cells, Ordering::Relaxed);
        self.prdt_page_cells.store(n_cells, Ordering::Relaxed);
        tracing::debug!(n_cells, "resized lock hash geometry");
        Ok(())
    }
}

impl LockHashCells for LockHashGeometry {
    fn n_cells(&self, kind: LockHashKind) -> usize {
        match kind {
            LockHashKind::Record => self.rec_cells.load(Ordering::Relaxed),
            LockHashKind::Predicate => self.prdt_cells.load(Ordering::Relaxed),
            LockHashKind::PredicatePage => self.prdt_page_cells.load(Ordering::Relaxed),
        }
    }

    fn rec_hash(&self, page_id: PageId) -> usize {
        let cells = self.rec_cells.load(Ordering::Relaxed) as u64;
        (self.hasher.fold(&page_id) % cells) as usize
    }
}

/// Check that the three lock hash tables have the same size.
pub(crate) fn check_same_size(cells: &dyn LockHashCells) -> Result<usize, crate::Error> {
    let rec = cells.n_cells(LockHashKind::Record);
    let prdt = cells.n_cells(LockHashKind::Predicate);
    let prdt_page = cells.n_cells(LockHashKind::PredicatePage);
    if rec != prdt || rec != prdt_page {
        return Err(crate::Error::CellCountMismatch {
            rec,
            prdt,
            prdt_page,
        });
    }
    Ok(rec)
}
