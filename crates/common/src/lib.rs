//! PaperDesk Common Library
//!
//! Shared code for all PaperDesk crates including:
//! - Entity models and the entity store abstraction
//! - Seed fixtures for the sample library
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{EntityStore, MemoryStore};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a prefixed identifier such as `paper-3f2a...`
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
