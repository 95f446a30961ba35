use std::error::Error;
use std::io;

use context_data::{
    config, thread_context, ContextDataInjector, ContextDataWriter, ContextValue, Property,
    SortedArrayMap,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    let (writer, _guard) = tracing_appender::non_blocking(io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .init();

    tracing::info!(config = ?config(), "starting context data demo");

    thread_context::put("user", "alice")?;
    thread_context::put("request", "7f3a")?;

    let injector = ContextDataInjector::from_config();
    let props = [Property::new("service", "billing")];
    let mut reusable = SortedArrayMap::new();
    let context = injector.inject_context_data(&props, &mut reusable)?;
    let rendered = context.to_string();
    tracing::info!(mode = ?injector.mode(), context = %rendered, "injected context data");

    let frame = ContextDataWriter::compressed().encode(&*context)?;
    let decoded: SortedArrayMap<String> = context_data::decode(&frame)?;
    let matches = decoded == *context;
    tracing::info!(bytes = frame.len(), matches, "round-tripped context frame");

    // mixed values; the opaque one is not serializable and comes back as null
    let mut event: SortedArrayMap<ContextValue> = SortedArrayMap::new();
    event.put("attempt", ContextValue::from(3i64))?;
    event.put("latency", ContextValue::from(12.5))?;
    event.put("handle", ContextValue::opaque(vec![1u8, 2, 3]))?;
    let decoded: SortedArrayMap<ContextValue> =
        context_data::decode(&context_data::encode(&event)?)?;
    let rendered = decoded.to_string();
    tracing::info!(context = %rendered, "round-tripped mixed values");

    Ok(())
}
