//! # lockshard
//!
//! Latching for an in-memory lock manager.
//!
//! The structures that record which transactions hold which record, predicate
//! and table locks are protected by two tiers of latches:
//!
//! - one **global readers-writer latch**, held shared by threads working on a
//!   single partition and exclusively by threads that need the whole lock
//!   system to themselves (deadlock sweeps, resizing the lock hash tables);
//! - `N` **page shard mutexes** and `N` **table shard mutexes**, partitioning
//!   the lock hash cells (by page) and the table-lock lists (by table id), so
//!   that work on different partitions never contends.
//!
//! Shard work always takes the global latch first and the shard mutex second;
//! exclusive work takes only the global latch. With one fixed order between
//! the two kinds of latch, they cannot deadlock against each other.
//!
//! Every shared acquisition of the global latch declares the shard the thread
//! will work on, and a thread may hold at most one such declaration per latch.
//! Breaking that rule is a programmer error caught by debug assertions.
//!
//! ## Example
//!
//! ```rust
//! use lockshard::{LatchesBuilder, PageId, TableId};
//!
//! let latches = LatchesBuilder::new()
//!     .lock_hash_cells(1024)?
//!     .reader_slots(16)?
//!     .build::<64>()?;
//!
//! // Localized work: one page's lock hash cell.
//! latches.with_page_shard(PageId::new(3, 42), || {
//!     // enqueue a record lock
//! });
//!
//! // Localized work: one table's lock list.
//! latches.with_table_shard(&TableId(7), || {
//!     // grant a table lock
//! });
//!
//! // Global work: nobody else is inside any shard.
//! let geometry = latches.geometry().unwrap().clone();
//! latches.with_exclusive_access(|exclusive| geometry.resize(exclusive, 2048))?;
//! # Ok::<(), lockshard::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Configuration and builder types.
pub mod config;
/// Error types.
pub mod error;
/// The global readers-writer latch.
pub mod global;
/// Hash function implementations.
pub mod hash;
/// Page and table identifiers.
pub mod ids;
/// The facade combining global latch and shard mutexes.
pub mod latches;
/// Lock hash table sizing.
pub mod lock_hash;
/// Page shard mutexes.
pub mod page_shards;
/// Shard selection functions.
pub mod selector;
/// Internal shard mutex array.
mod shard;
/// Statistics and metrics collection.
pub mod stats;
/// Table shard mutexes.
pub mod table_shards;

// Re-export main types
pub use config::{Config, HashFunction, LatchesBuilder};
pub use error::Error;
pub use global::{ExclusiveGuard, GlobalLatch, SharedGuard};
pub use ids::{PageId, TableHandle, TableId};
pub use latches::{Latches, ShardLatchGuard, SHARDS_COUNT};
pub use lock_hash::{LockHashCells, LockHashGeometry, LockHashKind};
pub use page_shards::PageShards;
pub use selector::{shard_for_page, shard_for_table};
pub use stats::{LatchStats, ShardOps};
pub use table_shards::TableShards;
