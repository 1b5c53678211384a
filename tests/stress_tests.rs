//! One load test: shard work from many threads racing with exclusive resizes.

use lockshard::{Latches, PageId, TableId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const SHARDS: usize = 8;

#[test]
fn test_shard_work_under_resizes() {
    let latches = Arc::new(Latches::<SHARDS>::new());
    let inside: Arc<Vec<AtomicUsize>> = Arc::new((0..SHARDS).map(|_| AtomicUsize::new(0)).collect());
    let violations = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));
    let mut handles = vec![];

    for t in 0..6u32 {
        let latches = Arc::clone(&latches);
        let inside = Arc::clone(&inside);
        let violations = Arc::clone(&violations);
        handles.push(thread::spawn(move || {
            for i in 0..2000u32 {
                let page = PageId::new(t, i);
                let guard = latches.page_shard_guard(page);
                let shard = guard.shard();
                if !latches.owns_page_shard(page) {
                    violations.fetch_add(1, Ordering::SeqCst);
                }
                if inside[shard].fetch_add(1, Ordering::SeqCst) != 0 {
                    violations.fetch_add(1, Ordering::SeqCst);
                }
                inside[shard].fetch_sub(1, Ordering::SeqCst);
                drop(guard);

                let table = TableId(u64::from(i));
                latches.with_table_shard(&table, || {
                    if !latches.owns_table_shard(&table) {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        }));
    }

    let resizer = {
        let latches = Arc::clone(&latches);
        let inside = Arc::clone(&inside);
        let violations = Arc::clone(&violations);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let geometry = latches.geometry().unwrap().clone();
            let mut cells = 64;
            while !stop.load(Ordering::SeqCst) {
                latches.with_exclusive_access(|exclusive| {
                    if inside.iter().any(|n| n.load(Ordering::SeqCst) != 0) {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                    geometry.resize(exclusive, cells).unwrap();
                });
                cells = if cells == 64 { 4096 } else { 64 };
                thread::yield_now();
            }
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    resizer.join().unwrap();

    assert_eq!(violations.load(Ordering::SeqCst), 0);
    assert!(!latches.global().is_exclusively_locked());
    assert_eq!(latches.global().declared_shard(), None);
}
