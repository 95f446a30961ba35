use lazy_static::lazy_static;

use crate::context_injector::InjectorMode;
use crate::error::MapError;

/// Environment variable holding the initial capacity of thread context maps.
pub const ENV_INITIAL_CAPACITY: &str = "CONTEXT_DATA_THREAD_CONTEXT_INITIAL_CAPACITY";

/// Environment variable selecting the injector mode (`reusable` or `copy-on-write`).
pub const ENV_INJECTOR: &str = "CONTEXT_DATA_INJECTOR";

/// Initial capacity of each thread context copy.
pub const DEFAULT_THREAD_CONTEXT_CAPACITY: usize = 16;

/// Process-wide settings for context data handling.
///
/// Read once from the environment on first use through [`config`]. Malformed
/// values are reported with a warning and replaced by their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Capacity reserved for a fresh thread context copy. Never zero.
    pub thread_context_initial_capacity: usize,
    /// Mode used by [`ContextDataInjector::from_config`](crate::ContextDataInjector::from_config).
    pub injector_mode: InjectorMode,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            thread_context_initial_capacity: DEFAULT_THREAD_CONTEXT_CAPACITY,
            injector_mode: InjectorMode::default(),
        }
    }
}

impl ContextConfig {
    /// Loads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_INITIAL_CAPACITY) {
            match parse_capacity(&raw) {
                Ok(capacity) => config.thread_context_initial_capacity = capacity,
                Err(e) => tracing::warn!(
                    variable = ENV_INITIAL_CAPACITY,
                    error = %e,
                    default = DEFAULT_THREAD_CONTEXT_CAPACITY,
                    "ignoring invalid setting"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_INJECTOR) {
            match raw.parse::<InjectorMode>() {
                Ok(mode) => config.injector_mode = mode,
                Err(e) => tracing::warn!(
                    variable = ENV_INJECTOR,
                    error = %e,
                    "ignoring invalid setting"
                ),
            }
        }

        config
    }
}

/// Parses a thread context capacity setting.
///
/// # Errors
///
/// [`MapError::InvalidArgument`] unless `raw` is a positive integer.
pub fn parse_capacity(raw: &str) -> Result<usize, MapError> {
    let value: i64 = raw.trim().parse().map_err(|_| {
        MapError::invalid_argument(format!("Initial capacity must be an integer: {:?}", raw))
    })?;
    if value <= 0 {
        return Err(MapError::invalid_argument(format!(
            "Initial capacity must be at least one: {}",
            value
        )));
    }
    usize::try_from(value)
        .map_err(|_| MapError::invalid_argument(format!("Initial capacity too large: {}", value)))
}

lazy_static! {
    static ref CONFIG: ContextConfig = {
        let config = ContextConfig::from_env();
        tracing::debug!(?config, "loaded context data configuration");
        config
    };
}

/// Returns the process-wide configuration.
pub fn config() -> &'static ContextConfig {
    &CONFIG
}
