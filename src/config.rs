use crate::error::Error;
use crate::global::DEFAULT_READER_SLOTS;
use crate::hash::ShardHasher;
use crate::lock_hash::LockHashCells;
use std::sync::Arc;

/// Default number of cells in each lock hash table.
pub const DEFAULT_LOCK_HASH_CELLS: usize = 4096;

/// Which hash function folds page ids into lock hash cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// Use ahash (default, fast and well-distributed).
    #[default]
    AHash,
    /// Use fxhash (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
}

/// Where page shard selection gets its lock hash table sizes from.
#[derive(Default)]
pub enum CellsConfig {
    /// A built-in [`LockHashGeometry`](crate::LockHashGeometry) sized by
    /// [`Config::lock_hash_cells`].
    #[default]
    Geometry,
    /// The lock manager's own hash tables.
    Custom(Arc<dyn LockHashCells>),
}

impl std::fmt::Debug for CellsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellsConfig::Geometry => write!(f, "CellsConfig::Geometry"),
            CellsConfig::Custom(_) => write!(f, "CellsConfig::Custom(...)"),
        }
    }
}

/// Configuration for a [`Latches`](crate::Latches) instance.
///
/// The shard count is not part of it: that is the `N` parameter of
/// `Latches<N>`, fixed at compile time.
#[derive(Debug)]
pub struct Config {
    pub(crate) hash_function: HashFunction,
    pub(crate) lock_hash_cells: usize,
    pub(crate) reader_slots: usize,
    pub(crate) cells: CellsConfig,
}

impl Config {
    /// Create a new config with defaults (ahash, 4096 cells, 64 reader slots).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.hash_function = hash_fn;
        self
    }

    /// Set the initial cell count of the built-in lock hash geometry. Must be
    /// greater than 0.
    pub fn lock_hash_cells(mut self, cells: usize) -> Result<Self, Error> {
        if cells == 0 {
            return Err(Error::InvalidCellCount);
        }
        self.lock_hash_cells = cells;
        Ok(self)
    }

    /// Set the number of reader slots of the global latch. Must be greater
    /// than 0.
    pub fn reader_slots(mut self, slots: usize) -> Result<Self, Error> {
        if slots == 0 {
            return Err(Error::InvalidReaderSlots);
        }
        self.reader_slots = slots;
        Ok(self)
    }

    /// Take lock hash table sizes from the lock manager's tables instead of
    /// the built-in geometry.
    pub fn hash_cells(mut self, cells: Arc<dyn LockHashCells>) -> Self {
        self.cells = CellsConfig::Custom(cells);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_function: HashFunction::AHash,
            lock_hash_cells: DEFAULT_LOCK_HASH_CELLS,
            reader_slots: DEFAULT_READER_SLOTS,
            cells: CellsConfig::Geometry,
        }
    }
}

/// Builder for creating [`Latches`](crate::Latches) with custom configuration.
pub struct LatchesBuilder {
    config: Config,
}

impl LatchesBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.config = self.config.hash_function(hash_fn);
        self
    }

    /// Set the initial cell count of the built-in lock hash geometry.
    pub fn lock_hash_cells(mut self, cells: usize) -> Result<Self, Error> {
        self.config = self.config.lock_hash_cells(cells)?;
        Ok(self)
    }

    /// Set the number of reader slots of the global latch.
    pub fn reader_slots(mut self, slots: usize) -> Result<Self, Error> {
        self.config = self.config.reader_slots(slots)?;
        Ok(self)
    }

    /// Use the lock manager's own hash tables for page shard selection.
    pub fn hash_cells(mut self, cells: Arc<dyn LockHashCells>) -> Self {
        self.config = self.config.hash_cells(cells);
        self
    }

    /// Build latches with `N` page shards and `N` table shards.
    pub fn build<const N: usize>(self) -> Result<crate::Latches<N>, Error> {
        crate::Latches::with_config(self.config)
    }
}

impl Default for LatchesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a hash function instance based on the configuration.
pub(crate) fn create_hasher(hash_fn: HashFunction) -> ShardHasher {
    match hash_fn {
        HashFunction::AHash => ShardHasher::AHash,
        #[cfg(feature = "fxhash")]
        HashFunction::FxHash => ShardHasher::FxHash,
    }
}
