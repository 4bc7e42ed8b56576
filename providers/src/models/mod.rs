//! Data models for the Watchpost provider layer.
//!
//! This module contains the normalized record shape, per-call query options
//! and the warning events read from cluster backends.

pub mod event;
pub mod query;
pub mod record;

pub use event::{ObjectReference, WarningEvent};
pub use query::{Direction, QueryOptions, DEFAULT_EVENT_SCOPE_MINUTES, DEFAULT_LIMIT};
pub use record::{Labels, QueryOutput, Record};
