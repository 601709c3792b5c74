//! Core configuration and error types shared across the crate.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, ExportConfig, RegistryConfig};
pub use error::{ErrorKind, Result, SightlineError};
