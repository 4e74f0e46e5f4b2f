//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FetchConfig (validated, immutable)
//!     → http::stack builds the decorator chain from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; layers capture what they need at build time
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::FetchConfig;
pub use schema::LogFormat;
pub use schema::LoggingConfig;
pub use schema::RequestIdConfig;
pub use schema::TimerKind;
