use context_data::{
    thread_context, ContextData, ContextDataInjector, ContextDataProvider, InjectorMode, MapError,
    Property, SortedArrayMap, ThreadContextProvider,
};
use std::sync::Arc;

/// Provider returning a fixed frozen map.
struct FixedProvider(Arc<SortedArrayMap<String>>);

impl FixedProvider {
    fn new(pairs: &[(&str, &str)]) -> Arc<dyn ContextDataProvider> {
        let mut map: SortedArrayMap<String> = pairs
            .iter()
            .map(|(k, v)| (*k, Some(v.to_string())))
            .collect();
        map.freeze();
        Arc::new(Self(Arc::new(map)))
    }
}

impl ContextDataProvider for FixedProvider {
    fn supply_context_data(&self) -> Arc<SortedArrayMap<String>> {
        Arc::clone(&self.0)
    }
}

fn injector(
    mode: InjectorMode,
    providers: Vec<Arc<dyn ContextDataProvider>>,
) -> ContextDataInjector {
    ContextDataInjector::with_providers(mode, providers)
}

#[test]
fn test_copy_on_write_single_provider_shares_snapshot() {
    thread_context::clear();
    thread_context::put("user", "alice").unwrap();
    let injector = injector(InjectorMode::CopyOnWrite, vec![Arc::new(ThreadContextProvider)]);

    let mut reusable = SortedArrayMap::new();
    let data = injector.inject_context_data(&[], &mut reusable).unwrap();

    match &data {
        ContextData::Shared(map) => assert!(Arc::ptr_eq(map, &thread_context::snapshot())),
        ContextData::Reused(_) => panic!("expected a shared snapshot"),
    }
    assert!(reusable.is_empty());
}

#[test]
fn test_copy_on_write_combines_properties_and_providers() {
    let first = FixedProvider::new(&[("a", "first"), ("shared", "first")]);
    let second = FixedProvider::new(&[("b", "second"), ("shared", "second")]);
    let injector = injector(InjectorMode::CopyOnWrite, vec![first, second]);

    let props = [Property::new("a", "property"), Property::new("p", "property")];
    let mut reusable = SortedArrayMap::new();
    let data = injector.inject_context_data(&props, &mut reusable).unwrap();

    // providers win over properties, later providers over earlier ones
    assert_eq!(
        data.to_string(),
        "{a=first, b=second, p=property, shared=second}"
    );
    assert!(data.is_frozen());
    assert!(matches!(data, ContextData::Shared(_)));
}

#[test]
fn test_copy_on_write_without_providers() {
    let injector = injector(InjectorMode::CopyOnWrite, Vec::new());
    let mut reusable = SortedArrayMap::new();

    let data = injector.inject_context_data(&[], &mut reusable).unwrap();
    assert!(data.is_empty());

    let props = [Property::new("only", "prop")];
    let data = injector.inject_context_data(&props, &mut reusable).unwrap();
    assert_eq!(data.to_string(), "{only=prop}");
}

#[test]
fn test_reusable_fills_event_map() {
    let provider = FixedProvider::new(&[("user", "bob")]);
    let injector = injector(InjectorMode::Reusable, vec![provider]);

    let mut reusable: SortedArrayMap<String> = SortedArrayMap::new();
    reusable.put("stale", "from last event".to_string()).unwrap();

    let props = [Property::new("service", "billing")];
    let data = injector.inject_context_data(&props, &mut reusable).unwrap();
    assert!(matches!(data, ContextData::Reused(_)));
    assert_eq!(data.to_string(), "{service=billing, user=bob}");
    assert!(!data.is_frozen());

    // the same map is refilled for the next event
    let data = injector.inject_context_data(&[], &mut reusable).unwrap();
    assert_eq!(data.to_string(), "{user=bob}");
    assert_eq!(reusable.len(), 1);
}

#[test]
fn test_reusable_rejects_frozen_event_map() {
    let injector = injector(InjectorMode::Reusable, vec![FixedProvider::new(&[("k", "v")])]);
    let mut reusable: SortedArrayMap<String> = SortedArrayMap::new();
    reusable.put("x", "1".to_string()).unwrap();
    reusable.freeze();

    assert!(matches!(
        injector.inject_context_data(&[], &mut reusable),
        Err(MapError::Unsupported(_))
    ));
}

#[test]
fn test_raw_context_data_is_thread_context() {
    thread_context::clear();
    thread_context::put("raw", "yes").unwrap();
    let injector = injector(InjectorMode::Reusable, Vec::new());
    assert!(Arc::ptr_eq(
        &injector.raw_context_data(),
        &thread_context::snapshot()
    ));
}
