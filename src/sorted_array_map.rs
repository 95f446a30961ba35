//! Sorted, array-backed context data container.
//!
//! This module provides the map that carries the diagnostic context of a
//! single log event. Keys are held in one sorted vector and values in a second
//! vector at the same index, which keeps lookups at O(log N), keeps traversal
//! in key order, and lets a whole context be copied with two slice copies.
//!
//! The map is tuned for the small N (well under 100 entries) that dominate
//! logging contexts. It is not a general purpose replacement for `HashMap` or
//! `BTreeMap`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::slice;

use crate::error::{MapError, Result};

/// Capacity used by [`SortedArrayMap::new`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 4;

/// The null key. Sorts before every other key.
pub const NULL_KEY: Option<&'static str> = None;

const FROZEN: &str = "Frozen collection cannot be modified";

/// Conversion into an owned map key.
///
/// `None` is the null key. Implemented for the string types callers usually
/// hold so that `map.put("user", value)` works without wrapping.
pub trait IntoKey {
    /// Converts self into an owned key, `None` being the null key.
    fn into_key(self) -> Option<String>;
}

impl IntoKey for &str {
    fn into_key(self) -> Option<String> {
        Some(self.to_owned())
    }
}

impl IntoKey for String {
    fn into_key(self) -> Option<String> {
        Some(self)
    }
}

impl IntoKey for &String {
    fn into_key(self) -> Option<String> {
        Some(self.clone())
    }
}

impl IntoKey for Option<&str> {
    fn into_key(self) -> Option<String> {
        self.map(str::to_owned)
    }
}

impl IntoKey for Option<String> {
    fn into_key(self) -> Option<String> {
        self
    }
}

/// A mutable map from string keys to values, kept sorted by key.
///
/// # Layout
///
/// * `keys` - sorted, duplicate-free; the null key (if present) is at index 0
/// * `values` - `values[i]` belongs to `keys[i]`; a value may itself be null
///
/// Slots past the live length are never retained: removal and clearing drop
/// the vacated keys and values immediately.
///
/// # Freezing
///
/// [`freeze`](Self::freeze) is a one-way latch. Afterwards every structural
/// mutation fails with [`MapError::Unsupported`], except removing an absent key
/// and clearing an empty map, which change nothing and therefore succeed.
/// A frozen map can be wrapped in an `Arc` and shared freely.
///
/// # Thread Safety
///
/// **Important**: the map has no internal locking. It is meant to be owned by a
/// single log event or a single thread at a time.
///
/// # Examples
///
/// ```
/// # use context_data::SortedArrayMap;
/// let mut map: SortedArrayMap<String> = SortedArrayMap::new();
/// map.put("a", "avalue".to_string()).unwrap();
/// map.put("B", "Bvalue".to_string()).unwrap();
/// map.put("3", "3value".to_string()).unwrap();
///
/// assert_eq!(map.to_string(), "{3=3value, B=Bvalue, a=avalue}");
/// assert_eq!(map.get("B").map(String::as_str), Some("Bvalue"));
/// ```
pub struct SortedArrayMap<V> {
    keys: Vec<Option<String>>,
    values: Vec<Option<V>>,
    frozen: bool,
    // bumped on every insert of a new key, removal and clear
    mod_count: u64,
}

impl<V> SortedArrayMap<V> {
    /// Creates an empty map with [`DEFAULT_INITIAL_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity_or_empty(DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates an empty map able to hold `capacity` entries before growing.
    ///
    /// This is the strict constructor: a zero capacity is rejected with
    /// [`MapError::InvalidArgument`]. Use
    /// [`with_capacity_or_empty`](Self::with_capacity_or_empty) to allow it.
    ///
    /// # Examples
    ///
    /// ```
    /// # use context_data::{SortedArrayMap, MapError};
    /// assert!(SortedArrayMap::<String>::with_capacity(8).is_ok());
    /// assert!(matches!(
    ///     SortedArrayMap::<String>::with_capacity(0),
    ///     Err(MapError::InvalidArgument(_))
    /// ));
    /// ```
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MapError::invalid_argument(
                "Initial capacity must be at least one but was 0",
            ));
        }
        Ok(Self::with_capacity_or_empty(capacity))
    }

    /// Creates an empty map, accepting a zero capacity (no backing storage
    /// until the first insert).
    pub fn with_capacity_or_empty(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            frozen: false,
            mod_count: 0,
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the number of entries the map can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.keys.capacity().min(self.values.capacity())
    }

    /// Locates `key` by binary search.
    ///
    /// # Returns
    ///
    /// * `Ok(index)` - the slot holding `key`
    /// * `Err(index)` - `key` is absent; inserting it at `index` keeps the keys sorted
    ///
    /// # Examples
    ///
    /// ```
    /// # use context_data::{SortedArrayMap, NULL_KEY};
    /// let mut map: SortedArrayMap<i32> = SortedArrayMap::new();
    /// map.put("b", 2).unwrap();
    /// map.put("d", 4).unwrap();
    ///
    /// assert_eq!(map.index_of_key("d"), Ok(1));
    /// assert_eq!(map.index_of_key("c"), Err(1));
    /// assert_eq!(map.index_of_key(NULL_KEY), Err(0));
    /// ```
    pub fn index_of_key<'k>(
        &self,
        key: impl Into<Option<&'k str>>,
    ) -> std::result::Result<usize, usize> {
        let key = key.into();
        self.keys.binary_search_by(|slot| slot.as_deref().cmp(&key))
    }

    /// Returns `true` if `key` is present, whatever its value.
    pub fn contains_key<'k>(&self, key: impl Into<Option<&'k str>>) -> bool {
        self.index_of_key(key).is_ok()
    }

    /// Returns the value stored under `key`.
    ///
    /// `None` means either that the key is absent or that it maps to a null
    /// value. Use [`get_entry`](Self::get_entry) to tell the two apart.
    pub fn get<'k>(&self, key: impl Into<Option<&'k str>>) -> Option<&V> {
        self.get_entry(key).flatten()
    }

    /// Returns the slot for `key`.
    ///
    /// * `None` - the key is absent
    /// * `Some(None)` - the key is present with a null value
    /// * `Some(Some(value))` - the key is present with a value
    pub fn get_entry<'k>(&self, key: impl Into<Option<&'k str>>) -> Option<Option<&V>> {
        let index = self.index_of_key(key).ok()?;
        Some(self.values[index].as_ref())
    }

    /// Returns the key at `index` (`None` being the null key).
    ///
    /// Fails with [`MapError::IndexOutOfBounds`] outside `[0, len)`.
    pub fn key_at(&self, index: usize) -> Result<Option<&str>> {
        self.keys
            .get(index)
            .map(Option::as_deref)
            .ok_or(MapError::IndexOutOfBounds { index, size: self.len() })
    }

    /// Returns the value at `index` (`None` being a null value).
    ///
    /// Fails with [`MapError::IndexOutOfBounds`] outside `[0, len)`.
    pub fn value_at(&self, index: usize) -> Result<Option<&V>> {
        self.values
            .get(index)
            .map(Option::as_ref)
            .ok_or(MapError::IndexOutOfBounds { index, size: self.len() })
    }

    /// Associates `value` with `key`.
    ///
    /// Overwriting the value of an existing key is not a structural change and
    /// is allowed during [`try_for_each_mut`](Self::try_for_each_mut). Inserting
    /// a new key shifts the following entries one slot to the right.
    ///
    /// Fails with [`MapError::Unsupported`] if the map is frozen.
    pub fn put(&mut self, key: impl IntoKey, value: impl Into<Option<V>>) -> Result<()> {
        self.assert_not_frozen()?;
        self.put_unchecked(key.into_key(), value.into());
        Ok(())
    }

    fn put_unchecked(&mut self, key: Option<String>, value: Option<V>) {
        match self.index_of_key(key.as_deref()) {
            Ok(index) => self.values[index] = value,
            Err(index) => self.insert_at(index, key, value),
        }
    }

    fn insert_at(&mut self, index: usize, key: Option<String>, value: Option<V>) {
        self.ensure_capacity();
        self.keys.insert(index, key);
        self.values.insert(index, value);
        self.mod_count = self.mod_count.wrapping_add(1);
    }

    /// Removes `key` and its value.
    ///
    /// Removing an absent key changes nothing and succeeds even when frozen.
    ///
    /// # Returns
    ///
    /// `true` if an entry was removed.
    pub fn remove<'k>(&mut self, key: impl Into<Option<&'k str>>) -> Result<bool> {
        let Ok(index) = self.index_of_key(key) else {
            return Ok(false);
        };
        self.assert_not_frozen()?;
        self.keys.remove(index);
        self.values.remove(index);
        self.mod_count = self.mod_count.wrapping_add(1);
        Ok(true)
    }

    /// Removes every entry, keeping the allocated capacity.
    ///
    /// Clearing an empty map succeeds even when frozen.
    pub fn clear(&mut self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.assert_not_frozen()?;
        self.keys.clear();
        self.values.clear();
        self.mod_count = self.mod_count.wrapping_add(1);
        Ok(())
    }

    /// Makes the map permanently read-only. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns `true` once [`freeze`](Self::freeze) has been called.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Visits every entry in ascending key order.
    ///
    /// The shared borrow rules out mutation during the walk. To mutate from
    /// inside a visitor use [`try_for_each_mut`](Self::try_for_each_mut).
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(Option<&str>, Option<&V>),
    {
        for (key, value) in self.keys.iter().zip(&self.values) {
            visitor(key.as_deref(), value.as_ref());
        }
    }

    /// Like [`for_each`](Self::for_each), threading a caller-supplied `state`
    /// through every call.
    ///
    /// # Examples
    ///
    /// ```
    /// # use context_data::SortedArrayMap;
    /// let mut map: SortedArrayMap<String> = SortedArrayMap::new();
    /// map.put("user", "alice".to_string()).unwrap();
    /// map.put("request", "42".to_string()).unwrap();
    ///
    /// let mut line = String::new();
    /// map.for_each_with(
    ///     |key, value, out: &mut String| {
    ///         out.push_str(key.unwrap_or("null"));
    ///         out.push(':');
    ///         out.push_str(value.map_or("null", String::as_str));
    ///         out.push(' ');
    ///     },
    ///     &mut line,
    /// );
    /// assert_eq!(line, "request:42 user:alice ");
    /// ```
    pub fn for_each_with<S, F>(&self, mut visitor: F, state: &mut S)
    where
        F: FnMut(Option<&str>, Option<&V>, &mut S),
    {
        for (key, value) in self.keys.iter().zip(&self.values) {
            visitor(key.as_deref(), value.as_ref(), state);
        }
    }

    /// Visits every entry in ascending key order with mutable access to the map.
    ///
    /// The visitor may overwrite values of existing keys. Inserting a new key,
    /// removing an existing key or clearing a non-empty map is detected after
    /// the current entry and aborts the walk with
    /// [`MapError::ConcurrentModification`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use context_data::{SortedArrayMap, MapError};
    /// let mut map: SortedArrayMap<i32> = SortedArrayMap::new();
    /// map.put("a", 1).unwrap();
    /// map.put("b", 2).unwrap();
    ///
    /// // value overwrite is fine
    /// map.try_for_each_mut(|visit| {
    ///     let doubled = visit.value().map(|v| v * 2);
    ///     visit.set_value(doubled).unwrap();
    /// }).unwrap();
    /// assert_eq!(map.get("b"), Some(&4));
    ///
    /// // removing a key is not
    /// let result = map.try_for_each_mut(|visit| {
    ///     visit.map().remove("b").unwrap();
    /// });
    /// assert_eq!(result, Err(MapError::ConcurrentModification));
    /// ```
    pub fn try_for_each_mut<F>(&mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&mut EntryVisit<'_, V>),
    {
        self.try_for_each_mut_with(|visit, _: &mut ()| visitor(visit), &mut ())
    }

    /// Like [`try_for_each_mut`](Self::try_for_each_mut), threading a
    /// caller-supplied `state` through every call.
    pub fn try_for_each_mut_with<S, F>(&mut self, mut visitor: F, state: &mut S) -> Result<()>
    where
        F: FnMut(&mut EntryVisit<'_, V>, &mut S),
    {
        let expected = self.mod_count;
        let mut index = 0;
        while index < self.len() {
            let mut visit = EntryVisit { map: &mut *self, index };
            visitor(&mut visit, state);
            if self.mod_count != expected {
                return Err(MapError::ConcurrentModification);
            }
            index += 1;
        }
        Ok(())
    }

    /// Returns an iterator over `(key, value)` pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            keys: self.keys.iter(),
            values: self.values.iter(),
        }
    }

    fn assert_not_frozen(&self) -> Result<()> {
        if self.frozen {
            return Err(MapError::Unsupported(FROZEN));
        }
        Ok(())
    }

    fn ensure_capacity(&mut self) {
        let capacity = self.capacity();
        if self.len() >= capacity {
            let grown = (capacity * 2).max(capacity + 1);
            self.reserve_total(grown);
        }
    }

    fn reserve_total(&mut self, capacity: usize) {
        let len = self.len();
        if capacity > len {
            self.keys.reserve_exact(capacity - len);
            self.values.reserve_exact(capacity - len);
        }
    }
}

impl<V: Clone> SortedArrayMap<V> {
    /// Creates an unfrozen copy of `other`, or an empty map for `None`.
    ///
    /// The frozen state is never copied.
    pub fn copy_of(other: Option<&SortedArrayMap<V>>) -> Self {
        let Some(other) = other else {
            return Self::new();
        };
        let mut copy = Self::with_capacity_or_empty(other.capacity().max(other.len()));
        copy.keys.extend_from_slice(&other.keys);
        copy.values.extend_from_slice(&other.values);
        copy
    }

    /// Merges every entry of `other` into this map. Values from `other` win
    /// on equal keys.
    ///
    /// Both key sequences are already sorted, so the merge walks them once to
    /// overwrite shared keys and count new ones, grows the storage a single
    /// time, and then fills the result from the back. The cost is O(N + M)
    /// instead of the O(N * M) shifting of repeated [`put`](Self::put) calls.
    ///
    /// Merging an empty map is a no-op, even when frozen. Merging a map into
    /// itself is rejected by the borrow checker.
    ///
    /// # Examples
    ///
    /// ```
    /// # use context_data::SortedArrayMap;
    /// let mut base: SortedArrayMap<String> = SortedArrayMap::new();
    /// base.put("a", "aORIG".to_string()).unwrap();
    /// base.put("b", "bORIG".to_string()).unwrap();
    ///
    /// let mut delta: SortedArrayMap<String> = SortedArrayMap::new();
    /// delta.put("1", "11".to_string()).unwrap();
    /// delta.put("a", "aa".to_string()).unwrap();
    ///
    /// base.put_all(&delta).unwrap();
    /// assert_eq!(base.to_string(), "{1=11, a=aa, b=bORIG}");
    /// ```
    pub fn put_all(&mut self, other: &SortedArrayMap<V>) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        self.assert_not_frozen()?;
        if self.is_empty() {
            self.reserve_total(other.len());
            self.keys.extend_from_slice(&other.keys);
            self.values.extend_from_slice(&other.values);
            self.mod_count = self.mod_count.wrapping_add(1);
        } else {
            self.merge(other);
        }
        Ok(())
    }

    fn merge(&mut self, other: &SortedArrayMap<V>) {
        let old_len = self.len();

        // forward pass: overwrite shared keys in place, count the new ones
        let mut inserts = 0;
        let (mut i, mut j) = (0, 0);
        while j < other.len() {
            if i == old_len {
                inserts += other.len() - j;
                break;
            }
            match self.keys[i].cmp(&other.keys[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => {
                    inserts += 1;
                    j += 1;
                }
                Ordering::Equal => {
                    self.values[i] = other.values[j].clone();
                    i += 1;
                    j += 1;
                }
            }
        }
        if inserts == 0 {
            return;
        }

        let new_len = old_len + inserts;
        if self.capacity() < new_len {
            self.reserve_total((old_len + other.len()).next_power_of_two());
        }
        self.keys.resize(new_len, None);
        self.values.resize_with(new_len, || None);

        // backward pass: move own entries to their final slots, fill the gaps
        let (mut i, mut j, mut k) = (old_len, other.len(), new_len);
        while j > 0 {
            k -= 1;
            if i > 0 && self.keys[i - 1] >= other.keys[j - 1] {
                if self.keys[i - 1] == other.keys[j - 1] {
                    j -= 1;
                }
                i -= 1;
                self.keys.swap(i, k);
                self.values.swap(i, k);
            } else {
                j -= 1;
                self.keys[k] = other.keys[j].clone();
                self.values[k] = other.values[j].clone();
            }
        }
        self.mod_count = self.mod_count.wrapping_add(1);
    }

    /// Copies the entries into an independent, mutable `HashMap`.
    pub fn to_map(&self) -> HashMap<Option<String>, Option<V>> {
        self.keys.iter().cloned().zip(self.values.iter().cloned()).collect()
    }
}

/// Cursor handed to the visitor of [`SortedArrayMap::try_for_each_mut`].
pub struct EntryVisit<'a, V> {
    map: &'a mut SortedArrayMap<V>,
    index: usize,
}

impl<V> EntryVisit<'_, V> {
    /// Position of the visited entry.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Key of the visited entry.
    pub fn key(&self) -> Option<&str> {
        self.map.keys.get(self.index).and_then(Option::as_deref)
    }

    /// Value of the visited entry.
    pub fn value(&self) -> Option<&V> {
        self.map.values.get(self.index).and_then(Option::as_ref)
    }

    /// Replaces the value of the visited entry without touching its key.
    pub fn set_value(&mut self, value: impl Into<Option<V>>) -> Result<()> {
        self.map.assert_not_frozen()?;
        let size = self.map.len();
        let slot = self
            .map
            .values
            .get_mut(self.index)
            .ok_or(MapError::IndexOutOfBounds { index: self.index, size })?;
        *slot = value.into();
        Ok(())
    }

    /// The map being walked. Structural changes made through it end the walk.
    pub fn map(&mut self) -> &mut SortedArrayMap<V> {
        self.map
    }
}

/// Iterator over the entries of a [`SortedArrayMap`], in key order.
pub struct Iter<'a, V> {
    keys: slice::Iter<'a, Option<String>>,
    values: slice::Iter<'a, Option<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Option<&'a str>, Option<&'a V>);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.next()?;
        let value = self.values.next()?;
        Some((key.as_deref(), value.as_ref()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let key = self.keys.next_back()?;
        let value = self.values.next_back()?;
        Some((key.as_deref(), value.as_ref()))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

impl<'a, V> IntoIterator for &'a SortedArrayMap<V> {
    type Item = (Option<&'a str>, Option<&'a V>);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: IntoKey, V> FromIterator<(K, Option<V>)> for SortedArrayMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let capacity = iter.size_hint().0.max(DEFAULT_INITIAL_CAPACITY);
        let mut map = Self::with_capacity_or_empty(capacity);
        for (key, value) in iter {
            map.put_unchecked(key.into_key(), value);
        }
        map
    }
}

impl<V> Default for SortedArrayMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Same as [`SortedArrayMap::copy_of`]: the clone starts unfrozen.
impl<V: Clone> Clone for SortedArrayMap<V> {
    fn clone(&self) -> Self {
        Self::copy_of(Some(self))
    }
}

/// Two maps are equal when they hold the same keys mapped to equal values.
/// Capacity and frozen state are ignored.
impl<V: PartialEq> PartialEq for SortedArrayMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.keys == other.keys && self.values == other.values
    }
}

impl<V: Eq> Eq for SortedArrayMap<V> {}

impl<V: Hash> Hash for SortedArrayMap<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for (key, value) in self.iter() {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<V: fmt::Display> fmt::Display for SortedArrayMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=", key.unwrap_or("null"))?;
            match value {
                Some(value) => write!(f, "{}", value)?,
                None => f.write_str("null")?,
            }
        }
        f.write_str("}")
    }
}

impl<V: fmt::Debug> fmt::Debug for SortedArrayMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
