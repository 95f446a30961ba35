//! # Context Data
//!
//! Compact key-value containers for the diagnostic context attached to log events.
//!
//! * **Sorted array storage**: keys and values live in two parallel arrays ordered
//!   by key, so lookups are a binary search and iteration is a linear scan
//! * **Freezing**: a map can be sealed once and then shared between events and threads
//! * **Linear merging**: `put_all` combines two maps in one pass with at most one
//!   reallocation
//! * **Binary frames**: maps can be persisted and rebuilt, with values that cannot
//!   be serialized degrading to null instead of failing the frame
//!
//! ## Main Components
//!
//! * `SortedArrayMap`: the sorted-array container with freeze and traversal support
//! * `ContextDataWriter` / `ContextDataReader`: binary frame codec, optionally LZ4-compressed
//! * `thread_context`: per-thread copy-on-write context
//! * `ContextDataInjector`: merges configured properties and provider data per event
//! * `config`: environment-driven settings
//!
//! ## Quick Start
//!
//! ```
//! use context_data::{SortedArrayMap, ContextDataWriter, ContextDataReader, NULL_KEY};
//!
//! let mut context: SortedArrayMap<String> = SortedArrayMap::new();
//! context.put("user", "alice".to_string()).unwrap();
//! context.put("request", "7f3a".to_string()).unwrap();
//! context.put(NULL_KEY, "anonymous".to_string()).unwrap();
//!
//! let mut extra: SortedArrayMap<String> = SortedArrayMap::new();
//! extra.put("user", "bob".to_string()).unwrap();
//! extra.put("zone", "eu".to_string()).unwrap();
//! context.put_all(&extra).unwrap();
//!
//! assert_eq!(context.to_string(), "{null=anonymous, request=7f3a, user=bob, zone=eu}");
//!
//! context.freeze();
//! assert!(context.put("late", "x".to_string()).is_err());
//!
//! let frame = ContextDataWriter::compressed().encode(&context).unwrap();
//! let copy: SortedArrayMap<String> = ContextDataReader::new(&frame).read_map().unwrap();
//! assert_eq!(copy, context);
//! ```

pub mod config;
pub mod context_injector;
pub mod context_reader;
pub mod context_value;
pub mod context_writer;
pub mod error;
pub mod kv;
pub mod loggable;
pub mod sorted_array_map;
pub mod thread_context;

pub use config::{config, ContextConfig};
pub use context_injector::{
    providers, register_provider, ContextData, ContextDataInjector, ContextDataProvider,
    InjectorMode, Property, ThreadContextProvider,
};
pub use context_reader::{decode, read_from, ContextDataReader};
pub use context_value::ContextValue;
pub use context_writer::{encode, ContextDataWriter};
pub use error::{CodecError, MapError};
pub use loggable::Loggable;
pub use sorted_array_map::{
    EntryVisit, IntoKey, Iter, SortedArrayMap, DEFAULT_INITIAL_CAPACITY, NULL_KEY,
};
