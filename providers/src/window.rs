//! Time-window defaulting helpers.
//!
//! Providers resolve unset window bounds against the time observed at the
//! start of each call, never against a cached clock.

use chrono::{DateTime, Duration, Utc};

use crate::error::ProviderError;

/// Returns the look-back used when a query has no start time (one hour).
#[must_use]
pub fn default_lookback() -> Duration {
    Duration::hours(1)
}

/// A resolved query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive window start.
    pub start: DateTime<Utc>,
    /// Window end.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Resolves optional bounds against `now`.
    ///
    /// An unset start becomes `now - 1h` and an unset end becomes `now`.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use providers::window::TimeWindow;
    ///
    /// let now = Utc::now();
    /// let window = TimeWindow::resolve(None, None, now);
    /// assert_eq!(window.end, now);
    /// assert_eq!(window.end - window.start, Duration::hours(1));
    /// ```
    #[must_use]
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            start: start.unwrap_or_else(|| now - default_lookback()),
            end: end.unwrap_or(now),
        }
    }

    /// Window start as epoch nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp does not fit in an `i64` nanosecond count.
    pub fn start_nanos(&self) -> Result<i64, ProviderError> {
        epoch_nanos(self.start)
    }

    /// Window end as epoch nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp does not fit in an `i64` nanosecond count.
    pub fn end_nanos(&self) -> Result<i64, ProviderError> {
        epoch_nanos(self.end)
    }
}

fn epoch_nanos(ts: DateTime<Utc>) -> Result<i64, ProviderError> {
    ts.timestamp_nanos_opt().ok_or_else(|| {
        ProviderError::InvalidConfig(format!("timestamp {ts} is outside the nanosecond range"))
    })
}

/// Returns the recency cutoff `now - scope_minutes`.
#[must_use]
pub fn event_cutoff(now: DateTime<Utc>, scope_minutes: u32) -> DateTime<Utc> {
    now - Duration::minutes(i64::from(scope_minutes))
}
