//! Merging of diagnostic context into per-event context data.
//!
//! Providers supply frozen context snapshots (the thread context being the
//! default one). Before an event is dispatched, a [`ContextDataInjector`]
//! combines configured [`Property`] values with every provider's snapshot into
//! the event's context data.
//!
//! # Thread Safety
//!
//! The provider registry is shared by all threads and guarded by a read-write
//! lock. Injectors take a copy of the registry when created, so the lock is
//! never touched on the logging path.

use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::config::config;
use crate::error::MapError;
use crate::sorted_array_map::SortedArrayMap;
use crate::thread_context;

/// Source of context data for log events.
pub trait ContextDataProvider: Send + Sync {
    /// Returns the provider's current context as a frozen map.
    fn supply_context_data(&self) -> Arc<SortedArrayMap<String>>;
}

/// Provider backed by the calling thread's [`thread_context`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadContextProvider;

impl ContextDataProvider for ThreadContextProvider {
    fn supply_context_data(&self) -> Arc<SortedArrayMap<String>> {
        thread_context::snapshot()
    }
}

lazy_static! {
    /// Process-wide list of context data providers.
    ///
    /// Starts out with the [`ThreadContextProvider`].
    static ref PROVIDERS: RwLock<Vec<Arc<dyn ContextDataProvider>>> = {
        let thread_context: Arc<dyn ContextDataProvider> = Arc::new(ThreadContextProvider);
        RwLock::new(vec![thread_context])
    };
}

/// Adds `provider` to the process-wide registry.
///
/// Only injectors created afterwards see the new provider.
pub fn register_provider(provider: Arc<dyn ContextDataProvider>) {
    let mut providers = PROVIDERS.write();
    providers.push(provider);
    tracing::debug!(providers = providers.len(), "registered context data provider");
}

/// Returns a copy of the registered providers, in registration order.
pub fn providers() -> Vec<Arc<dyn ContextDataProvider>> {
    PROVIDERS.read().clone()
}

/// A configured name/value pair added to every event's context data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Key the property is stored under.
    pub name: String,
    /// Value stored for every event.
    pub value: String,
}

impl Property {
    /// Creates a property from anything convertible to strings.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// How an injector produces an event's context data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InjectorMode {
    /// Fill the event's reusable map in place; nothing is allocated per event
    /// once the map has grown to its working size.
    Reusable,

    /// Hand out frozen shared snapshots, building a new one only when
    /// properties or several providers have to be combined.
    #[default]
    CopyOnWrite,
}

impl FromStr for InjectorMode {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reusable" | "garbage-free" => Ok(InjectorMode::Reusable),
            "copy-on-write" | "cow" => Ok(InjectorMode::CopyOnWrite),
            other => Err(MapError::invalid_argument(format!(
                "Unknown injector mode {:?}",
                other
            ))),
        }
    }
}

/// Context data produced for one event.
#[derive(Debug)]
pub enum ContextData<'a> {
    /// The event's own reusable map, filled in place.
    Reused(&'a SortedArrayMap<String>),

    /// A frozen snapshot, possibly shared with other events.
    Shared(Arc<SortedArrayMap<String>>),
}

impl Deref for ContextData<'_> {
    type Target = SortedArrayMap<String>;

    fn deref(&self) -> &Self::Target {
        match self {
            ContextData::Reused(map) => map,
            ContextData::Shared(map) => map,
        }
    }
}

/// Combines properties and provider data into event context data.
///
/// # Examples
///
/// ```
/// # use context_data::{
/// #     thread_context, ContextDataInjector, InjectorMode, Property, SortedArrayMap,
/// # };
/// # use std::sync::Arc;
/// thread_context::put("user", "alice").unwrap();
///
/// let injector = ContextDataInjector::with_providers(
///     InjectorMode::CopyOnWrite,
///     vec![Arc::new(context_data::ThreadContextProvider)],
/// );
/// let mut reusable = SortedArrayMap::new();
/// let props = [Property::new("service", "billing")];
/// let data = injector.inject_context_data(&props, &mut reusable).unwrap();
///
/// assert_eq!(data.to_string(), "{service=billing, user=alice}");
/// assert!(data.is_frozen());
/// ```
pub struct ContextDataInjector {
    mode: InjectorMode,
    providers: Vec<Arc<dyn ContextDataProvider>>,
}

impl ContextDataInjector {
    /// Creates an injector over the currently registered providers.
    pub fn new(mode: InjectorMode) -> Self {
        Self::with_providers(mode, providers())
    }

    /// Creates an injector using the mode from [`config`].
    pub fn from_config() -> Self {
        Self::new(config().injector_mode)
    }

    /// Creates an injector over an explicit provider list.
    pub fn with_providers(
        mode: InjectorMode,
        providers: Vec<Arc<dyn ContextDataProvider>>,
    ) -> Self {
        Self { mode, providers }
    }

    /// How injected maps are produced.
    pub fn mode(&self) -> InjectorMode {
        self.mode
    }

    /// Builds the context data for one event.
    ///
    /// Properties are copied first, then every provider is merged in order,
    /// so provider data wins over a property with the same name and later
    /// providers win over earlier ones.
    ///
    /// # Arguments
    ///
    /// * `props` - configured properties, may be empty
    /// * `reusable` - the event's own map; cleared and filled in
    ///   [`InjectorMode::Reusable`], untouched otherwise
    ///
    /// # Errors
    ///
    /// [`MapError::Unsupported`] if `reusable` is frozen and has to be filled.
    pub fn inject_context_data<'a>(
        &self,
        props: &[Property],
        reusable: &'a mut SortedArrayMap<String>,
    ) -> Result<ContextData<'a>, MapError> {
        match self.mode {
            InjectorMode::Reusable => {
                reusable.clear()?;
                copy_properties(props, reusable)?;
                for provider in &self.providers {
                    reusable.put_all(&provider.supply_context_data())?;
                }
                Ok(ContextData::Reused(reusable))
            }
            InjectorMode::CopyOnWrite => {
                if let ([provider], true) = (self.providers.as_slice(), props.is_empty()) {
                    return Ok(ContextData::Shared(provider.supply_context_data()));
                }
                let maps: Vec<_> = self
                    .providers
                    .iter()
                    .map(|provider| provider.supply_context_data())
                    .collect();
                let count = props.len() + maps.iter().map(|map| map.len()).sum::<usize>();
                let mut result = SortedArrayMap::with_capacity_or_empty(count);
                copy_properties(props, &mut result)?;
                for map in &maps {
                    result.put_all(map)?;
                }
                result.freeze();
                Ok(ContextData::Shared(Arc::new(result)))
            }
        }
    }

    /// The calling thread's context, without properties or other providers.
    pub fn raw_context_data(&self) -> Arc<SortedArrayMap<String>> {
        thread_context::snapshot()
    }
}

fn copy_properties(props: &[Property], map: &mut SortedArrayMap<String>) -> Result<(), MapError> {
    for prop in props {
        map.put(&prop.name, prop.value.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("reusable".parse::<InjectorMode>(), Ok(InjectorMode::Reusable));
        assert_eq!("Garbage-Free".parse::<InjectorMode>(), Ok(InjectorMode::Reusable));
        assert_eq!(" copy-on-write ".parse::<InjectorMode>(), Ok(InjectorMode::CopyOnWrite));
        assert!(matches!(
            "sometimes".parse::<InjectorMode>(),
            Err(MapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_registry_starts_with_thread_context() {
        assert!(!providers().is_empty());
    }
}
