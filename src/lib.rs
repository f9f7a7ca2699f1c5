/// Error types for collection, configuration and reporting
pub mod error;

/// Pool records and the `zpool` output parsers
pub mod records;

/// Data collectors running the `zpool` commands
pub mod collectors;

/// Report collaborators
pub mod reporting;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{CollectorError, ConfigError, ReportError};
pub use records::{PoolHealth, PoolMap, PoolRecord, StatusUpdate};
