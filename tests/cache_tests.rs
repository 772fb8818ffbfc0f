//! End-to-end behaviour of the public cache API.

use flashcache::{Cache, CacheConfig, CacheError, Expiration, ShardedCache, SweeperState, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn lazy_cache() -> Cache {
    init_tracing();
    Cache::new(Expiration::Never, Duration::ZERO)
}

#[test]
fn never_expiring_entry_stays() {
    let cache = lazy_cache();
    cache.set("k", "v", Expiration::Never);

    assert_eq!(cache.get("k"), Some(Value::from("v")));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(cache.get("k"), Some(Value::from("v")));
}

#[test]
fn ttl_entry_disappears_after_deadline() {
    let cache = lazy_cache();
    cache.set("k", 1i64, Expiration::After(Duration::from_millis(30)));

    assert_eq!(cache.get("k"), Some(Value::I64(1)));
    thread::sleep(Duration::from_millis(60));
    assert_eq!(cache.get("k"), None);
    assert!(cache.get_with_expiration("k").is_none());

    // Lazy expiry leaves the entry counted until it is swept
    assert_eq!(cache.item_count(), 1);
    assert_eq!(cache.delete_expired(), 1);
    assert_eq!(cache.item_count(), 0);
}

#[test]
fn config_default_ttl() {
    init_tracing();
    let cache = Cache::with_config(CacheConfig::default().default_ttl(Duration::from_millis(20)));

    cache.set_default("short", "v");
    cache.set("pinned", "v", Expiration::Never);
    thread::sleep(Duration::from_millis(45));

    assert_eq!(cache.get("short"), None);
    assert_eq!(cache.get("pinned"), Some(Value::from("v")));
}

#[test]
fn second_add_fails_and_keeps_first_value() {
    let cache = lazy_cache();

    cache.add("k", "v1", Expiration::Default).unwrap();
    let err = cache.add("k", "v2", Expiration::Default).unwrap_err();

    assert!(matches!(err, CacheError::AlreadyExists { ref key } if key == "k"));
    assert_eq!(cache.get("k"), Some(Value::from("v1")));
}

#[test]
fn replace_on_absent_or_expired_does_not_insert() {
    let cache = lazy_cache();

    assert!(matches!(
        cache.replace("absent", "v", Expiration::Default),
        Err(CacheError::NotFound { .. })
    ));
    assert_eq!(cache.item_count(), 0);

    cache.set("expired", "old", Expiration::After(Duration::from_millis(5)));
    thread::sleep(Duration::from_millis(20));
    assert!(matches!(
        cache.replace("expired", "new", Expiration::Default),
        Err(CacheError::NotFound { .. })
    ));
    assert_eq!(cache.get("expired"), None);
}

#[test]
fn eviction_hook_contract() {
    let cache = lazy_cache();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    cache.on_evicted(move |k, v| sink.lock().unwrap().push((k.to_string(), v.clone())));

    // Overwrites and deletes of absent keys are silent
    cache.set("a", 1i64, Expiration::Never);
    cache.set("a", 2i64, Expiration::Never);
    cache.delete("missing");
    assert!(seen.lock().unwrap().is_empty());

    // Delete reports the last stored value
    cache.delete("a");
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("a".to_string(), Value::I64(2))]
    );

    // One call per swept entry
    cache.set("x", 10i64, Expiration::After(Duration::from_millis(5)));
    cache.set("y", 20i64, Expiration::After(Duration::from_millis(5)));
    thread::sleep(Duration::from_millis(20));
    cache.delete_expired();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    let swept: HashMap<_, _> = seen[1..].iter().cloned().collect();
    assert_eq!(swept["x"], Value::I64(10));
    assert_eq!(swept["y"], Value::I64(20));
}

#[test]
fn increment_int64_and_reject_string() {
    let cache = lazy_cache();
    cache.set("x", 40i64, Expiration::Never);
    cache.set("s", "forty", Expiration::Never);

    cache.increment("x", 2).unwrap();
    assert_eq!(cache.get("x"), Some(Value::I64(42)));

    assert!(matches!(
        cache.increment("s", 2),
        Err(CacheError::UnsupportedType { .. })
    ));
    assert_eq!(cache.get("s"), Some(Value::from("forty")));
}

#[test]
fn concurrent_adds_have_exactly_one_winner() {
    init_tracing();
    let cache = Arc::new(ShardedCache::new(Expiration::Never, Duration::ZERO, 8));

    for round in 0..20 {
        let key = format!("race:{}", round);
        let barrier = Arc::new(Barrier::new(8));
        let winners = Arc::new(AtomicUsize::new(0));
        let losers = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                let winners = Arc::clone(&winners);
                let losers = Arc::clone(&losers);
                let key = key.clone();
                thread::spawn(move || {
                    barrier.wait();
                    match cache.add(key, t as i64, Expiration::Never) {
                        Ok(()) => winners.fetch_add(1, Ordering::SeqCst),
                        Err(CacheError::AlreadyExists { .. }) => losers.fetch_add(1, Ordering::SeqCst),
                        Err(e) => panic!("unexpected error: {}", e),
                    };
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(losers.load(Ordering::SeqCst), 7);
    }
}

#[test]
fn load_merge_rule() {
    let snapshot = lazy_cache();
    snapshot.set("a", 2i64, Expiration::Never);
    snapshot.set("b", 3i64, Expiration::Never);
    let mut buf = Vec::new();
    snapshot.save(&mut buf).unwrap();

    let cache = lazy_cache();
    cache.set("a", 1i64, Expiration::Never);
    cache.load(buf.as_slice()).unwrap();

    assert_eq!(cache.get("a"), Some(Value::I64(1)));
    assert_eq!(cache.get("b"), Some(Value::I64(3)));
}

#[test]
fn save_then_load_into_fresh_cache() {
    let source = lazy_cache();
    source.set("first", 1u8, Expiration::After(Duration::from_secs(30)));
    source.set("second", 2i16, Expiration::After(Duration::from_secs(60)));
    source.set("forever", "x", Expiration::Never);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.bin");
    source.save_file(&path).unwrap();

    let restored = lazy_cache();
    assert_eq!(restored.load_file(&path).unwrap(), 3);

    assert_eq!(restored.items(), source.items());
    let (_, first) = restored.get_with_expiration("first").unwrap();
    let (_, second) = restored.get_with_expiration("second").unwrap();
    assert!(first.unwrap() < second.unwrap());
    assert_eq!(restored.decrement_i16("second", 5).unwrap(), -3);
}

#[test]
fn sharded_cache_mirrors_single_store() {
    init_tracing();
    let cache = ShardedCache::new(Expiration::After(Duration::from_millis(20)), Duration::ZERO, 4);

    cache.set_default("temp", 1i32);
    cache.set("keep", 2i32, Expiration::Never);
    cache.increment("keep", 1).unwrap();
    assert_eq!(cache.get("keep"), Some(Value::I32(3)));

    thread::sleep(Duration::from_millis(40));
    assert_eq!(cache.get("temp"), None);
    assert_eq!(cache.item_count(), 2);
    assert_eq!(cache.delete_expired(), 1);
    assert_eq!(cache.item_count(), 1);
}

#[test]
fn sweeper_runs_without_async_runtime() {
    init_tracing();
    let cache = Cache::new(Expiration::Never, Duration::from_millis(10));
    assert_eq!(cache.sweeper_state(), Some(SweeperState::Running));

    cache.set("temp", "v", Expiration::After(Duration::from_millis(5)));
    thread::sleep(Duration::from_millis(80));
    assert_eq!(cache.item_count(), 0);

    drop(cache);
}

#[test]
fn sweeper_inside_runtime() {
    init_tracing();
    tokio_test::block_on(async {
        let cache = ShardedCache::new(Expiration::Never, Duration::from_millis(10), 4);
        for i in 0..10 {
            cache.set(format!("k{}", i), i as i64, Expiration::After(Duration::from_millis(5)));
        }

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.item_count(), 0);

        cache.stop();
        assert_eq!(cache.sweeper_state(), Some(SweeperState::Stopped));
    });
}
