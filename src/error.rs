/// Errors that can occur when configuring a set of lock-system latches.
///
/// Latching itself never fails: acquisitions block until granted, and
/// discipline violations are debug assertions rather than error values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A lock hash table cell count of zero was requested.
    InvalidCellCount,
    /// The global latch must have at least one reader slot.
    InvalidReaderSlots,
    /// The record, predicate and predicate-page lock hash tables disagree on
    /// their number of cells, so a single page shard selector cannot serve
    /// all three.
    CellCountMismatch {
        /// Cells in the record lock hash table.
        rec: usize,
        /// Cells in the predicate lock hash table.
        prdt: usize,
        /// Cells in the predicate-page lock hash table.
        prdt_page: usize,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidCellCount => write!(f, "lock hash cell count must be greater than 0"),
            Error::InvalidReaderSlots => {
                write!(f, "global latch reader slot count must be greater than 0")
            }
            Error::CellCountMismatch {
                rec,
                prdt,
                prdt_page,
            } => write!(
                f,
                "lock hash tables differ in size (rec: {}, prdt: {}, prdt_page: {})",
                rec, prdt, prdt_page
            ),
        }
    }
}

impl std::error::Error for Error {}
