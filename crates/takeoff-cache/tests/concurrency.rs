//! Concurrency behavior of the result cache: single-flight de-duplication,
//! failure sharing, and tier interaction under parallel load.

use std::convert::Infallible;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use takeoff_cache::{CacheOptions, ComputeError, ResultCache};
use takeoff_core::{AnalysisMode, Fingerprint, Industry, Region};

fn fingerprint(tag: &str) -> Fingerprint {
    Fingerprint::compute(
        tag.as_bytes(),
        &[Industry::Plumbing],
        &[Region::Australia],
        AnalysisMode::Balanced,
    )
}

fn memory_only() -> Arc<ResultCache> {
    Arc::new(ResultCache::new(CacheOptions {
        dir: None,
        ..CacheOptions::default()
    }))
}

#[test]
fn concurrent_identical_requests_compute_once() {
    let cache = memory_only();
    let key = fingerprint("shared");
    let computations = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            let computations = Arc::clone(&computations);
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.wait();
                cache
                    .get_or_compute(&key, || {
                        computations.fetch_add(1, Ordering::SeqCst);
                        // Hold the flight open long enough for the other
                        // threads to join it rather than winning their own.
                        thread::sleep(Duration::from_millis(100));
                        Ok::<_, Infallible>(vec![1, 2, 3])
                    })
                    .unwrap()
                    .to_vec()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![1, 2, 3]);
    }
    assert_eq!(computations.load(Ordering::SeqCst), 1);
}

#[test]
fn followers_observe_leader_failure_without_recomputing() {
    let cache = memory_only();
    let key = fingerprint("doomed");
    let (started_tx, started_rx) = mpsc::channel();

    let leader = {
        let cache = Arc::clone(&cache);
        let key = key.clone();
        thread::spawn(move || {
            cache.get_or_compute(&key, || {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(150));
                Err::<Vec<u8>, _>(io::Error::new(io::ErrorKind::Other, "drawing unreadable"))
            })
        })
    };
    started_rx.recv().unwrap();

    let followers: Vec<_> = (0..3)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            thread::spawn(move || {
                cache.get_or_compute(&key, || -> Result<Vec<u8>, io::Error> {
                    panic!("followers must join the in-flight computation")
                })
            })
        })
        .collect();

    let leader_err = leader.join().unwrap().unwrap_err();
    assert!(matches!(leader_err, ComputeError::Compute(_)));

    for follower in followers {
        let err = follower.join().unwrap().unwrap_err();
        match err {
            ComputeError::Shared(message) => assert!(message.contains("drawing unreadable")),
            ComputeError::Compute(_) => panic!("follower must share, not recompute"),
        }
    }

    // Nothing was cached for the failed key.
    assert!(cache.get(&key).is_none());
}

#[test]
fn key_recomputable_after_failure() {
    let cache = memory_only();
    let key = fingerprint("retry");

    let err = cache.get_or_compute(&key, || {
        Err::<Vec<u8>, _>(io::Error::new(io::ErrorKind::Other, "transient"))
    });
    assert!(err.is_err());

    let data = cache
        .get_or_compute(&key, || Ok::<_, Infallible>(vec![5]))
        .unwrap();
    assert_eq!(*data, vec![5]);
}

#[test]
fn distinct_keys_do_not_serialize_each_other() {
    let cache = memory_only();
    let gate = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let key = fingerprint(&format!("key-{i}"));
                gate.wait();
                cache
                    .get_or_compute(&key, || Ok::<_, Infallible>(vec![i as u8]))
                    .unwrap()
                    .to_vec()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), vec![i as u8]);
    }
}

#[test]
fn lru_eviction_with_disk_fallback() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = ResultCache::new(CacheOptions {
        memory_budget_bytes: 200,
        disk_budget_bytes: 100_000,
        dir: Some(tmp.path().join("cache")),
        ..CacheOptions::default()
    });

    let a = fingerprint("a");
    let b = fingerprint("b");
    let c = fingerprint("c");

    cache.put(&a, vec![0; 80]);
    cache.put(&b, vec![0; 80]);
    // Touch `a` so `b` is the least recently used.
    assert!(cache.get(&a).is_some());
    cache.put(&c, vec![0; 80]);

    // All three remain reachable; `b` now comes from disk.
    assert!(cache.get(&a).is_some());
    assert!(cache.get(&b).is_some());
    assert!(cache.get(&c).is_some());
    assert!(cache.metrics().evictions >= 1);
}

#[test]
fn parallel_mixed_load_stays_consistent() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = Arc::new(ResultCache::new(CacheOptions {
        memory_budget_bytes: 4096,
        disk_budget_bytes: 100_000,
        dir: Some(tmp.path().join("cache")),
        ..CacheOptions::default()
    }));
    let gate = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.wait();
                for round in 0..20u8 {
                    let key = fingerprint(&format!("key-{}", round % 5));
                    let data = cache
                        .get_or_compute(&key, || {
                            Ok::<_, Infallible>(vec![round % 5; 64])
                        })
                        .unwrap();
                    assert_eq!(data.len(), 64);
                    assert!(data.iter().all(|&b| b == round % 5));
                    if i == 0 && round == 10 {
                        cache.clear();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
