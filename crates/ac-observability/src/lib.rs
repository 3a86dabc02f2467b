//! # ac-observability
//!
//! Logging setup shared by the asset catalog crates.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, parse_level, LoggingConfig};
