//! Mapping from pages and tables to shard indexes.
//!
//! Every shard table of a [`Latches`](crate::Latches) instance uses the same
//! shard count `N`, so one selector per key type serves all of them.

use crate::ids::{PageId, TableHandle};
use crate::lock_hash::{LockHashCells, LockHashKind};

/// Compile-time check on a shard count.
pub(crate) struct ShardCount<const N: usize>;

impl<const N: usize> ShardCount<N> {
    /// Evaluating this fails the build when `N` is zero.
    pub(crate) const NONZERO: () = assert!(N > 0, "shard count must be greater than 0");
}

/// Shard guarding `page_id`'s locks in all three lock hash tables.
///
/// The record lock hash is used regardless of which table the lock actually
/// lives in. Panics in debug builds if the three tables differ in size.
///
/// A shard count of zero is rejected at compile time:
///
/// ```compile_fail
/// use lockshard::{shard_for_page, LockHashGeometry, PageId};
/// use lockshard::hash::ShardHasher;
///
/// let geometry = LockHashGeometry::new(ShardHasher::default(), 64).unwrap();
/// shard_for_page::<0>(&geometry, PageId::new(0, 1));
/// ```
#[inline]
pub fn shard_for_page<const N: usize>(cells: &dyn LockHashCells, page_id: PageId) -> usize {
    debug_assert_eq!(
        cells.n_cells(LockHashKind::Record),
        cells.n_cells(LockHashKind::Predicate),
        "record and predicate lock hash tables differ in size"
    );
    debug_assert_eq!(
        cells.n_cells(LockHashKind::Record),
        cells.n_cells(LockHashKind::PredicatePage),
        "record and predicate-page lock hash tables differ in size"
    );
    page_shard_hint::<N>(cells, page_id)
}

/// Same mapping as [`shard_for_page`] without the size check.
///
/// Used before the global latch is held, when a concurrent resize may be
/// halfway through updating the three tables.
#[inline]
pub(crate) fn page_shard_hint<const N: usize>(cells: &dyn LockHashCells, page_id: PageId) -> usize {
    #[allow(clippy::let_unit_value)]
    let () = ShardCount::<N>::NONZERO;
    cells.rec_hash(page_id) % N
}

/// Shard guarding `table`'s table-lock list: its id modulo `N`.
///
/// ```compile_fail
/// lockshard::shard_for_table::<0, _>(&lockshard::TableId(1));
/// ```
#[inline]
pub fn shard_for_table<const N: usize, T: TableHandle + ?Sized>(table: &T) -> usize {
    #[allow(clippy::let_unit_value)]
    let () = ShardCount::<N>::NONZERO;
    (table.table_id().0 % N as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ShardHasher;
    use crate::ids::TableId;
    use crate::lock_hash::LockHashGeometry;

    #[test]
    fn table_shard_is_id_modulo_count() {
        assert_eq!(shard_for_table::<4, _>(&TableId(0)), 0);
        assert_eq!(shard_for_table::<4, _>(&TableId(7)), 3);
        assert_eq!(shard_for_table::<512, _>(&TableId(1025)), 1);
        assert_eq!(shard_for_table::<1, _>(&TableId(u64::MAX)), 0);
    }

    #[test]
    fn page_shard_follows_rec_hash() {
        let geometry = LockHashGeometry::new(ShardHasher::default(), 4096).unwrap();
        for page_no in 0..256 {
            let page = PageId::new(5, page_no);
            assert_eq!(
                shard_for_page::<16>(&geometry, page),
                geometry.rec_hash(page) % 16
            );
        }
    }

    struct Lopsided;

    impl LockHashCells for Lopsided {
        fn n_cells(&self, kind: LockHashKind) -> usize {
            match kind {
                LockHashKind::Predicate => 32,
                _ => 64,
            }
        }

        fn rec_hash(&self, page_id: PageId) -> usize {
            page_id.page_no as usize % 64
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "differ in size")]
    fn mismatched_tables_trip_the_assertion() {
        shard_for_page::<4>(&Lopsided, PageId::new(0, 1));
    }
}
