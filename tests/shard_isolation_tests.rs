use lockshard::hash::ShardHasher;
use lockshard::{Latches, LockHashGeometry, PageId, PageShards, TableId, TableShards};
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn page_shards<const N: usize>() -> PageShards<N> {
    PageShards::new(Arc::new(LockHashGeometry::new(ShardHasher::default(), 4096).unwrap()))
}

#[test]
fn test_page_mutex_identity() {
    let mut shards = page_shards::<4>();

    for page_no in 0..100 {
        let page = PageId::new(7, page_no);
        let first: *const Mutex<()> = shards.get_mutex(page);
        let second: *const Mutex<()> = shards.get_mutex(page);
        assert_eq!(first, second);

        let mutable: *const Mutex<()> = shards.get_mutex_mut(page);
        assert_eq!(first, mutable);
    }
}

#[test]
fn test_pages_in_one_shard_share_a_mutex() {
    let shards = page_shards::<4>();
    let anchor = PageId::new(0, 0);
    let anchor_shard = shards.get_shard(anchor);

    for page_no in 1..200 {
        let page = PageId::new(0, page_no);
        let same_mutex = std::ptr::eq(shards.get_mutex(anchor), shards.get_mutex(page));
        assert_eq!(same_mutex, shards.get_shard(page) == anchor_shard);
    }
}

#[test]
fn test_table_mutex_identity() {
    let mut shards = TableShards::<4>::new();

    for id in 0..100 {
        let table = TableId(id);
        let first: *const Mutex<()> = shards.get_mutex(&table);
        assert!(std::ptr::eq(first, shards.get_mutex(&TableId(id))));

        let mutable: *const Mutex<()> = shards.get_mutex_mut(&table);
        assert_eq!(first, mutable);
    }
}

#[test]
fn test_holding_one_shard_mutex_leaves_others_free() {
    let shards = Arc::new(TableShards::<4>::new());
    let held = shards.get_mutex(&TableId(0)).lock();

    let other = Arc::clone(&shards);
    let acquired = thread::spawn(move || {
        let free = other.get_mutex(&TableId(1)).try_lock().is_some();
        free
    })
    .join()
    .unwrap();
    assert!(acquired);

    let same = Arc::clone(&shards);
    let blocked = thread::spawn(move || {
        let busy = same.get_mutex(&TableId(4)).try_lock().is_none();
        busy
    })
    .join()
    .unwrap();
    assert!(blocked);

    drop(held);
}

#[test]
fn test_different_table_shards_do_not_block() {
    let latches = Arc::new(Latches::<4>::new());
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let holder = {
        let latches = Arc::clone(&latches);
        thread::spawn(move || {
            latches.with_table_shard(&TableId(0), || {
                entered_tx.send(()).unwrap();
                let _ = release_rx.recv_timeout(Duration::from_secs(10));
            });
        })
    };
    entered_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("holder never entered shard 0");

    let (done_tx, done_rx) = mpsc::channel();
    let other = {
        let latches = Arc::clone(&latches);
        thread::spawn(move || {
            latches.with_table_shard(&TableId(1), || ());
            done_tx.send(()).unwrap();
        })
    };

    // Shard 1 is free while shard 0 is held.
    let finished = done_rx.recv_timeout(Duration::from_secs(5));
    release_tx.send(()).unwrap();
    holder.join().unwrap();
    other.join().unwrap();
    assert!(finished.is_ok(), "shard 1 was blocked by a holder of shard 0");
}
