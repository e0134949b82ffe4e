//! Configuration module for the Warden runtime.
//!
//! Configuration is loaded with figment from layered sources (defaults,
//! config files, `WARDEN_*` environment variables, programmatic merges) and
//! validated before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{
    DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig, WardenConfig,
};
pub use validation::validate_config;
