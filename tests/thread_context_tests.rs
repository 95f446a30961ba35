use context_data::{thread_context, SortedArrayMap};
use std::sync::Arc;
use std::thread;

#[test]
fn test_put_get_remove() {
    thread_context::clear();
    thread_context::put("user", "alice").unwrap();
    thread_context::put("request", "42").unwrap();

    assert_eq!(thread_context::len(), 2);
    assert_eq!(thread_context::get("user").as_deref(), Some("alice"));
    assert!(thread_context::contains_key("request"));

    assert_eq!(thread_context::remove("request"), Ok(true));
    assert_eq!(thread_context::remove("request"), Ok(false));
    assert!(!thread_context::contains_key("request"));

    thread_context::clear();
    assert!(thread_context::is_empty());
}

#[test]
fn test_snapshots_are_frozen_and_stable() {
    thread_context::clear();
    thread_context::put("step", "one").unwrap();
    let first = thread_context::snapshot();

    thread_context::put("step", "two").unwrap();
    let second = thread_context::snapshot();

    assert!(first.is_frozen());
    assert!(second.is_frozen());
    assert_eq!(first.get("step").map(String::as_str), Some("one"));
    assert_eq!(second.get("step").map(String::as_str), Some("two"));
}

#[test]
fn test_reads_share_the_snapshot() {
    thread_context::clear();
    thread_context::put("k", "v").unwrap();
    let a = thread_context::snapshot();
    let b = thread_context::snapshot();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_noop_changes_keep_the_snapshot() {
    thread_context::clear();
    thread_context::put("k", "v").unwrap();
    let before = thread_context::snapshot();

    assert_eq!(thread_context::remove("absent"), Ok(false));
    thread_context::put_all(&SortedArrayMap::new()).unwrap();
    assert!(Arc::ptr_eq(&before, &thread_context::snapshot()));

    thread_context::clear();
    let empty = thread_context::snapshot();
    thread_context::clear();
    assert!(Arc::ptr_eq(&empty, &thread_context::snapshot()));
}

#[test]
fn test_put_all_merges() {
    thread_context::clear();
    thread_context::put("a", "1").unwrap();

    let mut extra: SortedArrayMap<String> = SortedArrayMap::new();
    extra.put("a", "override".to_string()).unwrap();
    extra.put("b", "2".to_string()).unwrap();
    thread_context::put_all(&extra).unwrap();

    assert_eq!(thread_context::snapshot().to_string(), "{a=override, b=2}");
}

#[test]
fn test_contexts_are_per_thread() {
    thread_context::clear();
    thread_context::put("owner", "main").unwrap();

    let seen = thread::spawn(|| {
        let before = thread_context::is_empty();
        thread_context::put("owner", "worker").unwrap();
        (before, thread_context::get("owner"))
    })
    .join()
    .unwrap();

    assert_eq!(seen, (true, Some("worker".to_string())));
    assert_eq!(thread_context::get("owner").as_deref(), Some("main"));
}

#[test]
fn test_snapshot_crosses_threads() {
    thread_context::clear();
    thread_context::put("trace", "abc").unwrap();
    let snapshot = thread_context::snapshot();

    let value = thread::spawn(move || snapshot.get("trace").cloned())
        .join()
        .unwrap();
    assert_eq!(value.as_deref(), Some("abc"));
}
