//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → WebServerBuilder::from_config
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DispatchMode, InMemoryLogConfig, ListenerConfig, LoggingConfig, ObservabilityConfig,
    ResponseConfig, ServerConfig,
};
pub use validation::{parse_bind_address, validate_config, ValidationError};
