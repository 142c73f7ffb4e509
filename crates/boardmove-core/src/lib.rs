pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use config::{LocatorConfig, MigrationConfig, RetryConfig, TimingConfig};
pub use error::{ErrorKind, MigrationError};
pub use logging::{LogEntry, LogLevel, Loggable};
pub use result::MigrationResult;
