//! Layered configuration for the selfbot runtime.
//!
//! Defaults, config files, `SELFBOT_*` environment variables and programmatic
//! overrides are merged by [`ConfigLoader`] into a [`RuntimeConfig`], which is
//! checked by [`validate_config`] before anything is started.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ClientConfig, CommandConfig, DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    RateLimitConfig, RuntimeConfig, Secret, SpanEventConfig,
};
pub use validation::validate_config;
