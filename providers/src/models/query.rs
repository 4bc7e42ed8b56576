//! Query options passed to providers on every call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result limit applied when the caller leaves `limit` at zero.
pub const DEFAULT_LIMIT: u32 = 100;

/// Recency window, in minutes, used by cluster providers when no scope is given.
pub const DEFAULT_EVENT_SCOPE_MINUTES: u32 = 60;

/// Scan direction for log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Oldest entries first.
    Forward,
    /// Newest entries first.
    #[default]
    Backward,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(Self::Forward),
            "backward" => Ok(Self::Backward),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// Per-call query parameters.
///
/// Unset fields are defaulted by the provider at call time; see
/// [`crate::window`].
///
/// # Example
///
/// ```
/// use providers::models::{Direction, QueryOptions};
///
/// let options = QueryOptions::new("{job=\"nginx\"}")
///     .with_direction(Direction::Forward)
///     .with_limit(20);
///
/// assert_eq!(options.direction, Some(Direction::Forward));
/// assert!(options.start.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Query expression. For log backends this is the query-language string,
    /// for cluster backends the event reason to match. Empty means no-op.
    #[serde(default)]
    pub query: String,

    /// Scan direction (defaults to backward).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    /// Maximum number of entries (0 means the default of 100).
    #[serde(default)]
    pub limit: u32,

    /// Window start (defaults to one hour before the call).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    /// Window end (defaults to the call time).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,

    /// Recency window in minutes for cluster events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<u32>,
}

impl QueryOptions {
    /// Creates options for the given query expression with every other field unset.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Sets the scan direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Sets the result limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the window start.
    #[must_use]
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets the window end.
    #[must_use]
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Sets the recency scope in minutes.
    #[must_use]
    pub fn with_scope(mut self, minutes: u32) -> Self {
        self.scope = Some(minutes);
        self
    }

    /// Returns true if the query expression is empty.
    ///
    /// Whitespace-only expressions are sent to the backend as-is.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.query.is_empty()
    }

    /// Returns the direction, falling back to backward.
    #[must_use]
    pub fn effective_direction(&self) -> Direction {
        self.direction.unwrap_or_default()
    }

    /// Returns the limit, falling back to [`DEFAULT_LIMIT`] when zero.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        if self.limit == 0 {
            DEFAULT_LIMIT
        } else {
            self.limit
        }
    }

    /// Returns the scope, falling back to [`DEFAULT_EVENT_SCOPE_MINUTES`].
    #[must_use]
    pub fn effective_scope(&self) -> u32 {
        self.scope.unwrap_or(DEFAULT_EVENT_SCOPE_MINUTES)
    }
}
