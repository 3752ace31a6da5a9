//! Configuration module for the Braze runtime.
//!
//! Loads the `RuntimeConfig` schema from layered sources (defaults, TOML
//! files, `BRAZE_`-prefixed environment variables) and validates it before
//! the runtime consumes it.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{LogFormat, LogLevel, LogOutput, LoggingConfig, RuntimeConfig, SpanEventConfig};
pub use validation::validate_config;
