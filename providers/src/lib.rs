//! Watchpost Providers
//!
//! This crate is the data-acquisition layer of the Watchpost alerting
//! platform. It normalizes queries against heterogeneous monitoring backends
//! into one record shape consumed by alert evaluation.
//!
//! # Modules
//!
//! - [`models`] - Records, query options and warning events
//! - [`config`] - Data-source descriptors
//! - [`provider`] - The provider contract and the Loki/Kubernetes backends
//! - [`transport`] - HTTP helpers shared by HTTP-based providers
//! - [`window`] - Time-window defaulting helpers
//!
//! # Example
//!
//! ```
//! use providers::models::{QueryOptions, Record};
//!
//! let options = QueryOptions::new("{app=\"api\"} |= \"error\"").with_limit(50);
//! assert_eq!(options.limit, 50);
//!
//! let record = Record::new("loki");
//! assert!(record.message.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod transport;
pub mod window;

pub use error::ProviderError;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde_json;
pub use tokio_util::sync::CancellationToken;
