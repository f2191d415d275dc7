//! Multi-threaded append, read, and write against a tracked refcount.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ratchet_core::Refcount;
use ratchet_test_utils::{cpu_count, nz, run_on_all_cpus, run_on_threads, TrackedRefcount};
use ratchet_vector::AtomicVector;

type TrackedVector = AtomicVector<NonZeroU32, Arc<TrackedRefcount>>;

fn tracked_refcount() -> Arc<TrackedRefcount> {
    Arc::new(TrackedRefcount::new(1000u32.max(cpu_count() as u32 + 1)))
}

#[test]
fn concurrent_appends_are_never_lost() {
    let rc = tracked_refcount();
    const M: usize = 1000;
    for _ in 0..12 {
        assert_eq!(rc.get(nz(1)), 0);
        let vec = TrackedVector::new(Arc::clone(&rc));
        let threads = run_on_all_cpus(|_| {
            for _ in 0..M {
                vec.append(nz(1));
            }
        });
        assert_eq!(vec.len(), M * threads);
        assert_eq!(rc.get(nz(1)), (M * threads) as i64);
    }
    rc.assert_clear();
}

#[test]
fn concurrent_writes_balance_refcounts() {
    let rc = tracked_refcount();
    for _ in 0..12 {
        assert_eq!(rc.get(nz(1)), 0);
        let vec = TrackedVector::new(Arc::clone(&rc));
        let threads = run_on_all_cpus(|_| {
            vec.append(nz(1));
        });
        assert_eq!(vec.len(), threads);
        assert_eq!(rc.get(nz(1)), threads as i64);

        run_on_all_cpus(|tid| {
            vec.write(tid, nz(tid as u32 + 1)).unwrap();
        });
        for tid in 0..threads {
            assert_eq!(rc.get(nz(tid as u32 + 1)), 1);
        }
    }
    rc.assert_clear();
}

#[test]
fn appended_indices_form_a_bijection() {
    let rc = tracked_refcount();
    let vec = TrackedVector::new(Arc::clone(&rc));
    const PER_THREAD: u32 = 250;
    let claimed = Mutex::new(Vec::new());

    let threads = run_on_all_cpus(|tid| {
        let value = nz(tid as u32 + 1);
        let mine: Vec<(usize, NonZeroU32)> =
            (0..PER_THREAD).map(|_| (vec.append(value), value)).collect();
        claimed.lock().unwrap().extend(mine);
    });

    let claimed = claimed.into_inner().unwrap();
    let total = threads * PER_THREAD as usize;
    assert_eq!(vec.len(), total);
    assert_eq!(claimed.len(), total);

    let indices: HashSet<usize> = claimed.iter().map(|&(i, _)| i).collect();
    assert_eq!(indices.len(), total);
    assert!(indices.iter().all(|&i| i < total));

    // Every index holds what its appender put there.
    for (index, value) in claimed {
        let held = vec.get(index).unwrap();
        assert_eq!(*held, value);
    }
}

#[test]
fn readers_never_see_released_values() {
    let rc = tracked_refcount();
    let vec = TrackedVector::new(Arc::clone(&rc));
    vec.append(nz(1));
    let stop = AtomicBool::new(false);
    const WRITES: u32 = 20_000;
    let readers = cpu_count().max(2);

    run_on_threads(readers + 1, |tid| {
        if tid == 0 {
            for i in 0..WRITES {
                vec.write(0, nz(i % 999 + 1)).unwrap();
            }
            stop.store(true, Ordering::Release);
        } else {
            while !stop.load(Ordering::Acquire) {
                let value = vec.read(0).unwrap();
                // The vector's own reference may already be gone, but
                // ours keeps the count positive until we release it.
                assert!(rc.get(value) >= 1, "read {value} with no live reference");
                rc.dec(value);
            }
        }
    });

    assert!(vec.appears_quiescent());
    assert_eq!(rc.total(), 1);
    drop(vec);
    rc.assert_clear();
}

#[test]
fn appends_race_reads_of_published_prefix() {
    let rc = tracked_refcount();
    let vec = TrackedVector::new(Arc::clone(&rc));
    const APPENDS: usize = 20_000;
    let done = AtomicBool::new(false);

    run_on_threads(4, |tid| match tid {
        0 => {
            for i in 0..APPENDS {
                vec.append(nz((i % 1000) as u32 + 1));
            }
            done.store(true, Ordering::Release);
        }
        _ => {
            while !done.load(Ordering::Acquire) {
                let len = vec.len();
                if len == 0 {
                    continue;
                }
                // Anything below the published size is fully written.
                let index = len - 1;
                let value = vec.read(index).unwrap();
                assert_eq!(value.get() as usize, index % 1000 + 1);
                rc.dec(value);
            }
        }
    });

    assert_eq!(vec.len(), APPENDS);
    assert_eq!(rc.total(), APPENDS as i64);
}
