//! Identifiers of the things the lock manager latches on.

/// Identifies one page: a tablespace id and a page number within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    /// Tablespace the page belongs to.
    pub space_id: u32,
    /// Page number within the tablespace.
    pub page_no: u32,
}

impl PageId {
    /// Create a page identifier.
    pub const fn new(space_id: u32, page_no: u32) -> Self {
        Self { space_id, page_no }
    }
}

/// Unique numeric identifier of a table.
///
/// Table ids are handed out sequentially, which already spreads them evenly
/// over the table shards without hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u64);

/// Anything that can name the table it refers to.
///
/// Implemented by the lock manager's table descriptor; [`TableId`] implements
/// it too so callers holding only an id can latch.
pub trait TableHandle {
    /// The table's unique identifier.
    fn table_id(&self) -> TableId;
}

impl TableHandle for TableId {
    #[inline]
    fn table_id(&self) -> TableId {
        *self
    }
}

impl<T: TableHandle + ?Sized> TableHandle for &T {
    #[inline]
    fn table_id(&self) -> TableId {
        (**self).table_id()
    }
}
