//! The global lock-system latch.
//!
//! Threads doing localized work (one shard) hold it shared; threads that must
//! see or change the whole lock system hold it exclusively.
//!
//! # Reader slots
//!
//! Internally the latch is split into a number of cache-padded readers-writer
//! locks ("reader slots"). A shared holder locks only the slot its declared
//! shard maps to, so readers working on different shards don't bounce one
//! cache line between cores. An exclusive holder locks every slot in
//! ascending order. Seen from outside it behaves as one readers-writer latch.
//!
//! # Declared shard
//!
//! Every shared acquisition names the shard the thread is going to work on.
//! The latch records it in thread-local state keyed by latch instance, which
//! lets it assert that a thread never holds the latch shared under two
//! identities at once, and lets the lock manager ask what the current thread
//! holds. Violations are programmer errors and trip `debug_assert!`s.
//!
//! # Fairness
//!
//! Each slot is a `parking_lot::RwLock`, which is task-fair: once a writer is
//! queued on a slot, new readers of that slot queue behind it. A pending
//! exclusive acquisition therefore cannot be starved by a stream of shared
//! holders.

use crate::error::Error;
use crate::stats::GlobalStats;
use crossbeam::utils::CachePadded;
use hashbrown::HashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of reader slots.
pub const DEFAULT_READER_SLOTS: usize = 64;

static NEXT_LATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Which family of shard mutexes a thread entered under its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShardTier {
    Page,
    Table,
}

/// What a thread holds on one latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hold {
    /// `entered` is set while the thread also holds the declared shard's mutex.
    Shared {
        shard: usize,
        entered: Option<ShardTier>,
    },
    Exclusive,
}

thread_local! {
    // Latches absent from the map are not in use by this thread.
    static HOLDS: RefCell<HashMap<u64, Hold>> = RefCell::new(HashMap::new());
}

fn current_hold(latch: u64) -> Option<Hold> {
    HOLDS.with(|holds| holds.borrow().get(&latch).copied())
}

fn set_hold(latch: u64, hold: Hold) {
    HOLDS.with(|holds| {
        holds.borrow_mut().insert(latch, hold);
    });
}

fn clear_hold(latch: u64) -> Option<Hold> {
    HOLDS.with(|holds| holds.borrow_mut().remove(&latch))
}

/// Readers-writer latch guarding the lock system as a whole.
pub struct GlobalLatch {
    id: u64,
    slots: Box<[CachePadded<RwLock<()>>]>,
    stats: GlobalStats,
}

impl GlobalLatch {
    /// Create a latch with [`DEFAULT_READER_SLOTS`] reader slots.
    pub fn new() -> Self {
        Self::build(DEFAULT_READER_SLOTS)
    }

    /// Create a latch split into `reader_slots` reader slots. One slot gives a
    /// plain readers-writer lock.
    pub fn with_reader_slots(reader_slots: usize) -> Result<Self, Error> {
        if reader_slots == 0 {
            return Err(Error::InvalidReaderSlots);
        }
        Ok(Self::build(reader_slots))
    }

    fn build(reader_slots: usize) -> Self {
        let slots: Vec<_> = (0..reader_slots)
            .map(|_| CachePadded::new(RwLock::new(())))
            .collect();
        let id = NEXT_LATCH_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(latch = id, reader_slots, "created global lock-system latch");
        Self {
            id,
            slots: slots.into_boxed_slice(),
            stats: GlobalStats::new(),
        }
    }

    /// Number of reader slots the latch is split into.
    pub fn reader_slots(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot(&self, shard: usize) -> &RwLock<()> {
        &self.slots[shard % self.slots.len()]
    }

    fn assert_not_held(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        match current_hold(self.id) {
            None => {}
            Some(Hold::Shared { shard: declared, .. }) => panic!(
                "thread already declared shard {} on global latch {}",
                declared, self.id
            ),
            Some(Hold::Exclusive) => panic!(
                "thread already holds global latch {} exclusively",
                self.id
            ),
        }
    }

    /// Acquire the latch in shared mode, declaring `shard` as the one shard
    /// this thread is going to work on.
    ///
    /// Blocks while another thread holds the latch exclusively. The calling
    /// thread must not already hold this latch in any mode.
    pub fn acquire_shared(&self, shard: usize) -> SharedGuard<'_> {
        self.assert_not_held();
        let guard = self.slot(shard).read();
        self.shared_guard(shard, guard)
    }

    /// Like [`acquire_shared`](Self::acquire_shared), but returns `None`
    /// instead of blocking.
    pub fn try_acquire_shared(&self, shard: usize) -> Option<SharedGuard<'_>> {
        self.assert_not_held();
        let guard = self.slot(shard).try_read()?;
        Some(self.shared_guard(shard, guard))
    }

    fn shared_guard<'a>(&'a self, shard: usize, guard: RwLockReadGuard<'a, ()>) -> SharedGuard<'a> {
        self.stats.record_shared();
        set_hold(
            self.id,
            Hold::Shared {
                shard,
                entered: None,
            },
        );
        SharedGuard {
            latch: self,
            shard,
            _guard: guard,
            _not_send: PhantomData,
        }
    }

    /// Release a shared hold. Equivalent to dropping the guard.
    pub fn release_shared(&self, guard: SharedGuard<'_>) {
        debug_assert!(std::ptr::eq(guard.latch, self));
        drop(guard);
    }

    /// Acquire the latch exclusively.
    ///
    /// Blocks until no other thread holds it in any mode, then keeps every new
    /// shared or exclusive acquirer out until the guard is dropped.
    pub fn acquire_exclusive(&self) -> ExclusiveGuard<'_> {
        self.assert_not_held();
        let guards: Vec<_> = self.slots.iter().map(|slot| slot.write()).collect();
        self.exclusive_guard(guards)
    }

    /// Like [`acquire_exclusive`](Self::acquire_exclusive), but returns `None`
    /// instead of blocking. Slots already taken are released again on failure.
    pub fn try_acquire_exclusive(&self) -> Option<ExclusiveGuard<'_>> {
        self.assert_not_held();
        let mut guards = Vec::with_capacity(self.slots.len());
        for slot in self.slots.iter() {
            guards.push(slot.try_write()?);
        }
        Some(self.exclusive_guard(guards))
    }

    fn exclusive_guard<'a>(&'a self, guards: Vec<RwLockWriteGuard<'a, ()>>) -> ExclusiveGuard<'a> {
        self.stats.record_exclusive();
        set_hold(self.id, Hold::Exclusive);
        tracing::trace!(latch = self.id, "global latch acquired exclusively");
        ExclusiveGuard {
            latch: self,
            _guards: guards,
            _not_send: PhantomData,
        }
    }

    /// Release an exclusive hold. Equivalent to dropping the guard.
    pub fn release_exclusive(&self, guard: ExclusiveGuard<'_>) {
        debug_assert!(std::ptr::eq(guard.latch, self));
        drop(guard);
    }

    /// The shard the current thread declared when acquiring this latch in
    /// shared mode, or `None` if it doesn't hold it shared.
    pub fn declared_shard(&self) -> Option<usize> {
        match current_hold(self.id) {
            Some(Hold::Shared { shard, .. }) => Some(shard),
            _ => None,
        }
    }

    /// Record that the current thread locked (`Some`) or is about to unlock
    /// (`None`) the mutex of its declared shard.
    pub(crate) fn mark_entered(&self, entered: Option<ShardTier>) {
        HOLDS.with(|holds| {
            let mut holds = holds.borrow_mut();
            if let Some(Hold::Shared { entered: slot, .. }) = holds.get_mut(&self.id) {
                *slot = entered;
            }
        });
    }

    /// Whether the current thread holds this latch shared for `shard` and
    /// also holds that shard's mutex in the given tier.
    pub(crate) fn owns_shard(&self, tier: ShardTier, shard: usize) -> bool {
        current_hold(self.id)
            == Some(Hold::Shared {
                shard,
                entered: Some(tier),
            })
    }

    /// Whether the current thread holds this latch in shared mode.
    pub fn owns_shared(&self) -> bool {
        self.declared_shard().is_some()
    }

    /// Whether the current thread holds this latch exclusively.
    pub fn owns_exclusive(&self) -> bool {
        current_hold(self.id) == Some(Hold::Exclusive)
    }

    /// Whether any thread holds any reader slot exclusively. Racy; meant for
    /// diagnostics only.
    pub fn is_exclusively_locked(&self) -> bool {
        self.slots.iter().any(|slot| slot.is_locked_exclusive())
    }

    pub(crate) fn shared_acquisitions(&self) -> u64 {
        self.stats.shared()
    }

    pub(crate) fn exclusive_acquisitions(&self) -> u64 {
        self.stats.exclusive()
    }
}

impl Default for GlobalLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GlobalLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalLatch")
            .field("id", &self.id)
            .field("reader_slots", &self.slots.len())
            .finish()
    }
}

/// Shared hold on a [`GlobalLatch`] under one declared shard. Releases the
/// latch and clears the declaration when dropped.
#[must_use = "the latch is released as soon as the guard is dropped"]
pub struct SharedGuard<'a> {
    latch: &'a GlobalLatch,
    shard: usize,
    _guard: RwLockReadGuard<'a, ()>,
    // The declaration lives in the acquiring thread's local state.
    _not_send: PhantomData<*const ()>,
}

impl<'a> SharedGuard<'a> {
    /// The shard declared for this hold.
    pub fn shard(&self) -> usize {
        self.shard
    }

    /// The latch this guard holds.
    pub fn latch(&self) -> &'a GlobalLatch {
        self.latch
    }
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        let released = clear_hold(self.latch.id);
        debug_assert!(
            matches!(released, Some(Hold::Shared { shard, .. }) if shard == self.shard),
            "shared release of global latch {} does not match the declared shard",
            self.latch.id
        );
    }
}

impl std::fmt::Debug for SharedGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedGuard")
            .field("latch", &self.latch.id)
            .field("shard", &self.shard)
            .finish()
    }
}

/// Exclusive hold on a [`GlobalLatch`]. Releases it when dropped.
///
/// Holding one is proof that no other thread is working on any shard, so
/// whole-structure operations take `&ExclusiveGuard` as an argument.
#[must_use = "the latch is released as soon as the guard is dropped"]
pub struct ExclusiveGuard<'a> {
    latch: &'a GlobalLatch,
    _guards: Vec<RwLockWriteGuard<'a, ()>>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> ExclusiveGuard<'a> {
    /// The latch this guard holds.
    pub fn latch(&self) -> &'a GlobalLatch {
        self.latch
    }
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        let released = clear_hold(self.latch.id);
        debug_assert_eq!(released, Some(Hold::Exclusive));
        tracing::trace!(latch = self.latch.id, "global latch released");
    }
}

impl std::fmt::Debug for ExclusiveGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExclusiveGuard")
            .field("latch", &self.latch.id)
            .finish()
    }
}
