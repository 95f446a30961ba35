//! Per-thread diagnostic context.
//!
//! Each thread owns a frozen [`SortedArrayMap`] snapshot behind an `Arc`.
//! Every mutation copies the current snapshot, applies the change to the copy,
//! freezes it and swaps it in. A snapshot handed out by [`snapshot`] therefore
//! never changes, and log events can hold on to it without copying.
//!
//! # Thread Safety
//!
//! The context itself is thread-local. Snapshots are frozen and can be sent
//! to and shared with other threads.
//!
//! # Examples
//!
//! ```
//! # use context_data::thread_context;
//! thread_context::put("user", "alice").unwrap();
//! let before = thread_context::snapshot();
//!
//! thread_context::put("user", "bob").unwrap();
//! assert_eq!(before.get("user").map(String::as_str), Some("alice"));
//! assert_eq!(thread_context::get("user").as_deref(), Some("bob"));
//! ```

use std::cell::RefCell;
use std::sync::Arc;

use crate::config::config;
use crate::error::MapError;
use crate::sorted_array_map::SortedArrayMap;

thread_local! {
    static CONTEXT: RefCell<Arc<SortedArrayMap<String>>> = RefCell::new(Arc::new(empty_frozen()));
}

fn empty_frozen() -> SortedArrayMap<String> {
    let mut map = SortedArrayMap::with_capacity_or_empty(0);
    map.freeze();
    map
}

/// Replaces the current snapshot with a mutated, frozen copy.
///
/// The context cell is only borrowed for the final swap. Loading the
/// configuration may emit tracing events, and subscribers are free to read
/// the context while handling them.
fn update<F>(mutate: F) -> Result<(), MapError>
where
    F: FnOnce(&mut SortedArrayMap<String>) -> Result<(), MapError>,
{
    let initial_capacity = config().thread_context_initial_capacity;
    let current = snapshot();
    let mut copy =
        SortedArrayMap::with_capacity_or_empty(initial_capacity.max(current.len() + 1));
    copy.put_all(&current)?;
    mutate(&mut copy)?;
    copy.freeze();
    CONTEXT.with(|cell| *cell.borrow_mut() = Arc::new(copy));
    Ok(())
}

/// Puts `value` under `key` in the current thread's context.
pub fn put(key: &str, value: impl Into<String>) -> Result<(), MapError> {
    let value = value.into();
    update(|map| map.put(key, value))
}

/// Merges every entry of `entries` into the current thread's context.
pub fn put_all(entries: &SortedArrayMap<String>) -> Result<(), MapError> {
    if entries.is_empty() {
        return Ok(());
    }
    update(|map| map.put_all(entries))
}

/// Removes `key` from the current thread's context.
///
/// # Returns
///
/// `true` if the key was present. Removing an absent key keeps the current
/// snapshot.
pub fn remove(key: &str) -> Result<bool, MapError> {
    if !contains_key(key) {
        return Ok(false);
    }
    update(|map| map.remove(key).map(|_| ()))?;
    Ok(true)
}

/// Empties the current thread's context.
pub fn clear() {
    CONTEXT.with(|cell| {
        let mut current = cell.borrow_mut();
        if !current.is_empty() {
            *current = Arc::new(empty_frozen());
        }
    });
}

/// Returns a copy of the value stored under `key`.
pub fn get(key: &str) -> Option<String> {
    CONTEXT.with(|cell| cell.borrow().get(key).cloned())
}

/// Returns `true` if `key` is present in the current thread's context.
pub fn contains_key(key: &str) -> bool {
    CONTEXT.with(|cell| cell.borrow().contains_key(key))
}

/// Number of entries in the current thread's context.
pub fn len() -> usize {
    CONTEXT.with(|cell| cell.borrow().len())
}

/// Returns `true` if the current thread's context is empty.
pub fn is_empty() -> bool {
    len() == 0
}

/// Returns the current frozen snapshot.
pub fn snapshot() -> Arc<SortedArrayMap<String>> {
    CONTEXT.with(|cell| Arc::clone(&cell.borrow()))
}
