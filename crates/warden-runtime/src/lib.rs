//! Warden Runtime - Orchestration layer for the Warden event dispatch framework.
//!
//! This crate provides:
//! - Layered configuration loading (`WardenConfig`, `ConfigLoader`)
//! - Logging configuration (`LoggingBuilder`, `init_from_config`)
//! - Bounded concurrent event intake with cooperative shutdown (`WardenRuntime`)
//!
//! ```rust,ignore
//! use warden_runtime::WardenRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = WardenRuntime::new();
//!     runtime.register_listener(my_listener);
//!
//!     // Feed events from an adapter task
//!     runtime.submit(event);
//!
//!     // Run until Ctrl+C; in-flight dispatches are cancelled on the way out
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, DispatchConfig, LoggingConfig, WardenConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, init_from_config};
pub use runtime::{DispatchOutcome, DispatchSummary, RuntimeBuilder, WardenRuntime};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
