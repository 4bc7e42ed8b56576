//! Configuration module for Watchpost providers.
//!
//! This module contains the data-source descriptors handed to provider
//! constructors. There is no process-wide configuration object: every
//! provider receives the descriptor it was built from.

pub mod datasource;

pub use datasource::{
    load_data_sources, BasicAuth, ConfigError, DataSource, DataSourceKind, HttpConfig,
    DEFAULT_TIMEOUT_SECS,
};
