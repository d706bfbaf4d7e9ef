//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (hostnames, parents, duplicates)
//!     → AppConfig (validated, immutable)
//!     → lifecycle::startup builds the application from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AppConfig, ListenerConfig, MountType, ObservabilityConfig, ServiceConfig};
pub use validation::{validate_config, validate_hostname, ValidationError};
