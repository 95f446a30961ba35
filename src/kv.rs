//! Bridge from context maps to the `log` crate's structured key-values.
//!
//! Any map whose values implement `Display` can be attached to a
//! [`log::Record`] with `key_values(&map)`. Null keys are emitted as `"null"`
//! and null values as [`Value::null`].

use std::fmt::Display;

use log::kv::{self, Key, Source, Value, VisitSource};

use crate::sorted_array_map::SortedArrayMap;

impl<V: Display> Source for SortedArrayMap<V> {
    fn visit<'kvs>(&'kvs self, visitor: &mut dyn VisitSource<'kvs>) -> Result<(), kv::Error> {
        for (key, value) in self.iter() {
            let key = Key::from_str(key.unwrap_or("null"));
            let value = match value {
                Some(value) => Value::from_display(value),
                None => Value::null(),
            };
            visitor.visit_pair(key, value)?;
        }
        Ok(())
    }

    fn count(&self) -> usize {
        self.len()
    }
}
